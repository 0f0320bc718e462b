use url::Url;

use crate::model::ResultItem;

// TODO: these variants are tuned for film and celebrity topics; make them configurable once
// other verticals need relaxation.
/// Suffixes appended to the topic during the relaxed retry.
pub const RELAXATION_SUFFIXES: [&str; 4] = ["导演", "电影", "舆情", "评价"];

const WIKIPEDIA_BASE: &str = "https://zh.wikipedia.org/wiki/";
const BAIKE_BASE: &str = "https://baike.baidu.com/item/";

/// The topic itself followed by one query per relaxation suffix.
pub fn relaxation_queries(topic: &str) -> Vec<String> {
	let mut out = vec![topic.to_string()];

	out.extend(RELAXATION_SUFFIXES.iter().map(|suffix| format!("{topic} {suffix}")));

	out
}

/// Encyclopedia entries for the topic. Used only when every retrieval attempt came back empty.
pub fn curated_items(topic: &str) -> Vec<ResultItem> {
	let topic = topic.trim();

	[
		(
			WIKIPEDIA_BASE,
			format!("{topic} - 维基百科，自由的百科全书"),
			format!("维基百科上关于“{topic}”的条目，可作为人工复核的起点。"),
			"zh.wikipedia.org",
		),
		(
			BAIKE_BASE,
			format!("{topic}_百度百科"),
			format!("百度百科上关于“{topic}”的条目，可作为人工复核的起点。"),
			"baike.baidu.com",
		),
	]
	.into_iter()
	.filter_map(|(base, title, snippet, domain)| {
		ResultItem::new(title, entry_url(base, topic), snippet, domain)
	})
	.collect()
}

fn entry_url(base: &str, topic: &str) -> String {
	let Ok(mut url) = Url::parse(base) else { return base.to_string() };

	if let Ok(mut segments) = url.path_segments_mut() {
		segments.pop_if_empty().push(topic);
	}

	url.to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn curated_set_has_two_encoded_entries() {
		let items = curated_items("王家卫");

		assert_eq!(items.len(), 2);
		assert_eq!(items[0].url, "https://zh.wikipedia.org/wiki/%E7%8E%8B%E5%AE%B6%E5%8D%AB");
		assert_eq!(items[1].url, "https://baike.baidu.com/item/%E7%8E%8B%E5%AE%B6%E5%8D%AB");
		assert_eq!(items[1].source_domain, "baike.baidu.com");
	}

	#[test]
	fn curated_set_survives_an_empty_topic() {
		assert_eq!(curated_items("").len(), 2);
	}

	#[test]
	fn relaxation_adds_four_variants() {
		let queries = relaxation_queries("某导演");

		assert_eq!(queries.len(), 5);
		assert_eq!(queries[0], "某导演");
		assert_eq!(queries[2], "某导演 电影");
	}
}
