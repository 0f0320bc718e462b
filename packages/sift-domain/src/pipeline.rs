//! Merge-stage transforms applied to every raw batch, in this order: language filter, URL
//! dedup, domain allow/deny filter, scoring, stable sort.

use std::{
	cmp::Ordering,
	collections::{BTreeMap, HashSet},
};

use serde::Serialize;
use url::Url;

use crate::{
	model::ResultItem,
	script::{self, TargetScript},
};

#[derive(Clone, Copy, Debug)]
pub struct PipelineOptions<'a> {
	/// `None` disables the language filter.
	pub language: Option<TargetScript>,
	pub allow_domains: &'a [String],
	pub deny_domains: &'a [String],
	pub domain_weights: &'a BTreeMap<String, f32>,
	pub keywords: &'a [String],
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
	pub input: usize,
	pub language_kept: usize,
	pub language_fallback: bool,
	pub deduped: usize,
	pub domain_kept: usize,
}

#[derive(Debug)]
pub struct PipelineOutput {
	pub items: Vec<ResultItem>,
	pub stats: PipelineStats,
}

/// Outcome of the language filter. An emptied non-empty batch is not silently returned.
#[derive(Debug)]
pub enum LanguageFilter {
	Kept(Vec<ResultItem>),
	/// Nothing matched; carries the untouched input so the caller can bypass the filter.
	FallbackNeeded(Vec<ResultItem>),
}

pub fn process(items: Vec<ResultItem>, opts: &PipelineOptions<'_>) -> PipelineOutput {
	let mut stats = PipelineStats { input: items.len(), ..Default::default() };
	let items = match opts.language {
		Some(target) => match filter_language(items, target) {
			LanguageFilter::Kept(kept) => kept,
			LanguageFilter::FallbackNeeded(original) => {
				stats.language_fallback = true;

				original
			},
		},
		None => items,
	};

	stats.language_kept = items.len();

	let items = dedup_by_url(items);

	stats.deduped = items.len();

	let mut items = filter_domains(items, opts.allow_domains, opts.deny_domains);

	stats.domain_kept = items.len();

	score_items(&mut items, opts.keywords, opts.domain_weights);
	sort_by_score(&mut items);

	PipelineOutput { items, stats }
}

pub fn filter_language(items: Vec<ResultItem>, target: TargetScript) -> LanguageFilter {
	if items.is_empty() {
		return LanguageFilter::Kept(items);
	}

	let matched: Vec<bool> =
		items.iter().map(|item| script::contains_script(&item.summary_text(), target)).collect();

	if !matched.contains(&true) {
		return LanguageFilter::FallbackNeeded(items);
	}

	LanguageFilter::Kept(
		items.into_iter().zip(matched).filter_map(|(item, keep)| keep.then_some(item)).collect(),
	)
}

/// First-seen-wins on the exact URL string. Items without a URL are dropped.
pub fn dedup_by_url(items: Vec<ResultItem>) -> Vec<ResultItem> {
	let mut seen = HashSet::new();

	items
		.into_iter()
		.filter(|item| !item.url.trim().is_empty() && seen.insert(item.url.clone()))
		.collect()
}

/// Allow-list first (only when non-empty), then deny-list.
pub fn filter_domains(
	items: Vec<ResultItem>,
	allow: &[String],
	deny: &[String],
) -> Vec<ResultItem> {
	items
		.into_iter()
		.filter(|item| {
			let domain = item_domain(item);

			(allow.is_empty() || matches_any(&domain, allow)) && !matches_any(&domain, deny)
		})
		.collect()
}

pub fn score_items(
	items: &mut [ResultItem],
	keywords: &[String],
	weights: &BTreeMap<String, f32>,
) {
	for item in items.iter_mut() {
		item.score = score_item(item, keywords, weights);
	}
}

pub fn score_item(item: &ResultItem, keywords: &[String], weights: &BTreeMap<String, f32>) -> f32 {
	let hits = keyword_hit_count(&item.summary_text(), keywords) as f32;

	hits + domain_weight(&item_domain(item), weights)
}

/// Descending by score. `sort_by` is stable, so ties keep arrival order.
pub fn sort_by_score(items: &mut [ResultItem]) {
	items.sort_by(|a, b| cmp_f32_desc(a.score, b.score));
}

/// Sum of case-sensitive, overlapping occurrence counts of every keyword.
pub fn keyword_hit_count(text: &str, keywords: &[String]) -> usize {
	keywords.iter().map(|keyword| count_overlapping(text, keyword)).sum()
}

pub fn count_overlapping(text: &str, needle: &str) -> usize {
	if needle.is_empty() {
		return 0;
	}

	text.char_indices().filter(|(idx, _)| text[*idx..].starts_with(needle)).count()
}

/// Weight of the most specific table key that equals `domain` or is a parent of it.
pub fn domain_weight(domain: &str, weights: &BTreeMap<String, f32>) -> f32 {
	weights
		.iter()
		.filter(|(key, _)| domain_matches(domain, key))
		.max_by_key(|(key, _)| key.len())
		.map(|(_, weight)| *weight)
		.unwrap_or(0.0)
}

pub fn domain_matches(domain: &str, pattern: &str) -> bool {
	let pattern = pattern.trim();

	if pattern.is_empty() || domain.is_empty() {
		return false;
	}

	domain == pattern
		|| (domain.len() > pattern.len()
			&& domain.ends_with(pattern)
			&& domain.as_bytes()[domain.len() - pattern.len() - 1] == b'.')
}

pub fn matches_any(domain: &str, patterns: &[String]) -> bool {
	patterns.iter().any(|pattern| domain_matches(domain, pattern))
}

/// Lowercase URL host, or the adapter-supplied domain when the URL has no host.
pub fn item_domain(item: &ResultItem) -> String {
	host_of(&item.url).unwrap_or_else(|| item.source_domain.trim().to_lowercase())
}

pub fn host_of(raw: &str) -> Option<String> {
	let url = Url::parse(raw.trim()).ok()?;

	url.host_str().map(|host| host.to_lowercase())
}

pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn item(title: &str, url: &str) -> ResultItem {
		ResultItem::new(title, url, "", "").expect("url")
	}

	#[test]
	fn overlapping_occurrences_are_counted() {
		assert_eq!(count_overlapping("aaaa", "aa"), 3);
		assert_eq!(count_overlapping("王家卫王家卫", "王家卫"), 2);
		assert_eq!(count_overlapping("Abc abc", "abc"), 1);
		assert_eq!(count_overlapping("abc", ""), 0);
	}

	#[test]
	fn suffix_match_respects_label_boundary() {
		assert!(domain_matches("news.sina.com.cn", "sina.com.cn"));
		assert!(domain_matches("sina.com.cn", "sina.com.cn"));
		assert!(!domain_matches("notsina.com.cn", "sina.com.cn"));
		assert!(!domain_matches("", "sina.com.cn"));
	}

	#[test]
	fn most_specific_weight_wins() {
		let weights = BTreeMap::from([
			("sina.com.cn".to_string(), 1.0),
			("news.sina.com.cn".to_string(), 3.0),
		]);

		assert_eq!(domain_weight("news.sina.com.cn", &weights), 3.0);
		assert_eq!(domain_weight("blog.sina.com.cn", &weights), 1.0);
		assert_eq!(domain_weight("weibo.com", &weights), 0.0);
	}

	#[test]
	fn item_domain_prefers_url_host() {
		let mut hit = item("t", "https://News.Example.com:8443/a?b=c");

		hit.source_domain = "other.org".to_string();

		assert_eq!(item_domain(&hit), "news.example.com");

		hit.url = "not a url".to_string();

		assert_eq!(item_domain(&hit), "other.org");
	}

	#[test]
	fn nan_scores_sort_last() {
		assert_eq!(cmp_f32_desc(f32::NAN, 1.0), Ordering::Greater);
		assert_eq!(cmp_f32_desc(2.0, 1.0), Ordering::Less);
	}
}
