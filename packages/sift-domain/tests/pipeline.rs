use std::collections::{BTreeMap, HashSet};

use sift_domain::{
	ResultItem, TargetScript,
	pipeline::{self, LanguageFilter, PipelineOptions},
};

fn item(title: &str, url: &str, snippet: &str) -> ResultItem {
	let domain = pipeline::host_of(url).unwrap_or_default();

	ResultItem::new(title, url, snippet, domain).expect("Test item needs a URL.")
}

fn urls(items: &[ResultItem]) -> Vec<&str> {
	items.iter().map(|item| item.url.as_str()).collect()
}

fn keywords(values: &[&str]) -> Vec<String> {
	values.iter().map(|value| value.to_string()).collect()
}

#[test]
fn dedup_is_idempotent_and_first_seen_wins() {
	let items = vec![
		item("first", "https://a.example/1", ""),
		item("second", "https://a.example/2", ""),
		item("duplicate", "https://a.example/1", ""),
		item("trailing slash is distinct", "https://a.example/1/", ""),
	];
	let once = pipeline::dedup_by_url(items);
	let twice = pipeline::dedup_by_url(once.clone());

	assert_eq!(urls(&once), ["https://a.example/1", "https://a.example/2", "https://a.example/1/"]);
	assert_eq!(once[0].title, "first");
	assert_eq!(once, twice);
}

#[test]
fn dedup_drops_items_whose_url_was_blanked() {
	let mut blank = item("blank", "https://a.example/1", "");

	blank.url.clear();

	let out = pipeline::dedup_by_url(vec![blank, item("kept", "https://a.example/2", "")]);

	assert_eq!(urls(&out), ["https://a.example/2"]);
}

#[test]
fn allow_list_applies_before_deny_list() {
	let items = vec![
		item("allowed", "https://news.sina.com.cn/a", ""),
		item("allowed but denied", "https://ads.sina.com.cn/b", ""),
		item("not allowed", "https://weibo.com/c", ""),
	];
	let allow = keywords(&["sina.com.cn"]);
	let deny = keywords(&["ads.sina.com.cn"]);
	let out = pipeline::filter_domains(items, &allow, &deny);

	assert_eq!(urls(&out), ["https://news.sina.com.cn/a"]);
}

#[test]
fn empty_lists_keep_everything() {
	let items = vec![item("a", "https://weibo.com/a", ""), item("b", "https://other.org/b", "")];
	let out = pipeline::filter_domains(items.clone(), &[], &[]);

	assert_eq!(out, items);
}

#[test]
fn pipeline_output_is_a_subset_of_input() {
	let input = vec![
		item("王家卫 新片", "https://news.sina.com.cn/1", "导演 王家卫"),
		item("English only", "https://example.com/2", "no han here"),
		item("王家卫 旧闻", "https://spam.example/3", ""),
		item("王家卫 重复", "https://news.sina.com.cn/1", ""),
	];
	let input_urls: HashSet<String> = input.iter().map(|item| item.url.clone()).collect();
	let weights = BTreeMap::new();
	let deny = keywords(&["spam.example"]);
	let kws = keywords(&["王家卫"]);
	let opts = PipelineOptions {
		language: Some(TargetScript::Han),
		allow_domains: &[],
		deny_domains: &deny,
		domain_weights: &weights,
		keywords: &kws,
	};
	let out = pipeline::process(input, &opts);

	assert!(out.items.iter().all(|item| input_urls.contains(&item.url)));
	assert_eq!(urls(&out.items), ["https://news.sina.com.cn/1"]);
	assert_eq!(out.stats.input, 4);
	assert_eq!(out.stats.language_kept, 3);
	assert_eq!(out.stats.deduped, 2);
	assert_eq!(out.stats.domain_kept, 1);
	assert!(!out.stats.language_fallback);
}

#[test]
fn language_filter_signals_fallback_instead_of_emptying() {
	let items = vec![item("English", "https://example.com/1", "text")];

	match pipeline::filter_language(items.clone(), TargetScript::Han) {
		LanguageFilter::FallbackNeeded(original) => assert_eq!(original, items),
		LanguageFilter::Kept(kept) => panic!("Expected fallback, kept {kept:?}."),
	}

	let weights = BTreeMap::new();
	let opts = PipelineOptions {
		language: Some(TargetScript::Han),
		allow_domains: &[],
		deny_domains: &[],
		domain_weights: &weights,
		keywords: &[],
	};
	let out = pipeline::process(items, &opts);

	assert!(out.stats.language_fallback);
	assert_eq!(out.items.len(), 1);
}

#[test]
fn language_filter_on_empty_batch_is_not_a_fallback() {
	assert!(matches!(
		pipeline::filter_language(Vec::new(), TargetScript::Han),
		LanguageFilter::Kept(items) if items.is_empty()
	));
}

#[test]
fn domain_weight_breaks_equal_keyword_hits() {
	let weights = BTreeMap::from([("example.com".to_string(), 5.0)]);
	let kws = keywords(&["topic"]);
	let opts = PipelineOptions {
		language: None,
		allow_domains: &[],
		deny_domains: &[],
		domain_weights: &weights,
		keywords: &kws,
	};
	let items = vec![
		item("topic other", "https://other.com/a", ""),
		item("topic example", "https://example.com/b", ""),
	];
	let out = pipeline::process(items, &opts);

	assert_eq!(urls(&out.items), ["https://example.com/b", "https://other.com/a"]);
	assert_eq!(out.items[0].score, 6.0);
	assert_eq!(out.items[1].score, 1.0);
}

#[test]
fn score_is_a_pure_function_of_item_text_and_url() {
	let weights = BTreeMap::from([("sina.com.cn".to_string(), 2.5)]);
	let kws = keywords(&["王家卫", "电影"]);
	let hit = item("王家卫 电影 王家卫", "https://news.sina.com.cn/x", "电影节");
	let first = pipeline::score_item(&hit, &kws, &weights);
	let second = pipeline::score_item(&hit.clone(), &kws, &weights);

	assert_eq!(first, second);
	assert_eq!(first, 2.0 + 2.0 + 2.5);
}

#[test]
fn ties_keep_arrival_order() {
	let mut items = vec![
		item("a", "https://x.example/1", ""),
		item("b", "https://x.example/2", ""),
		item("c", "https://x.example/3", ""),
	];

	items[2].score = 1.0;

	pipeline::sort_by_score(&mut items);

	assert_eq!(urls(&items), ["https://x.example/3", "https://x.example/1", "https://x.example/2"]);
}

#[test]
fn unenriched_items_serialize_without_content() {
	let value = serde_json::to_value(item("t", "https://x.example/1", "s")).expect("serialize");

	assert!(value.get("content").is_none());
	assert_eq!(value["score"], 0.0);
}
