//! Keyword search over the configured RSS 2.0 and Atom feeds.

use color_eyre::Result;
use futures::future;
use quick_xml::{
	Reader,
	events::{BytesStart, Event},
};
use reqwest::Client;
use time::{
	Duration, OffsetDateTime,
	format_description::well_known::{Rfc2822, Rfc3339},
};

use sift_config::Sources;
use sift_domain::{ResultItem, TimeWindow, pipeline};

use crate::html;

const FALLBACK_DOMAIN: &str = "rss";

#[derive(Debug, Default)]
struct Entry {
	title: String,
	link: String,
	summary: String,
	published: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
	Title,
	Link,
	Summary,
	Published,
	ChannelTitle,
}

/// Fetches every feed concurrently and scans them in configuration order. A feed that fails to
/// download or parse is logged and skipped.
pub async fn search(
	cfg: &Sources,
	query: &str,
	quota: u32,
	time_window: TimeWindow,
) -> Result<Vec<ResultItem>> {
	let keywords: Vec<&str> = query.split_whitespace().collect();

	if keywords.is_empty() || cfg.feeds.is_empty() {
		return Ok(Vec::new());
	}

	let client = crate::page_client(cfg.timeout_ms, &cfg.user_agent)?;
	let cutoff = OffsetDateTime::now_utc() - Duration::days(time_window.days());
	let pages = future::join_all(cfg.feeds.iter().map(|feed| fetch_feed(&client, feed))).await;
	let mut out = Vec::new();

	for (feed, page) in cfg.feeds.iter().zip(pages) {
		let items = match page.and_then(|xml| parse_items(&xml, &keywords, cutoff)) {
			Ok(items) => items,
			Err(err) => {
				tracing::warn!(error = %err, feed = %feed, "Feed skipped.");

				continue;
			},
		};

		for item in items {
			if out.len() >= quota as usize {
				return Ok(out);
			}

			out.push(item);
		}
	}

	Ok(out)
}

async fn fetch_feed(client: &Client, feed: &str) -> Result<String> {
	let res = client.get(feed).send().await?;

	Ok(res.error_for_status()?.text().await?)
}

/// Entries published after `cutoff` (undated entries are kept) that mention at least one keyword.
fn parse_items(xml: &str, keywords: &[&str], cutoff: OffsetDateTime) -> Result<Vec<ResultItem>> {
	let (channel_title, entries) = parse_feed(xml)?;
	let fallback_domain = channel_title
		.map(|title| html::collapse_whitespace(&title))
		.filter(|title| !title.is_empty())
		.unwrap_or_else(|| FALLBACK_DOMAIN.to_string());
	let mut out = Vec::new();

	for entry in entries {
		if let Some(published) = entry.published.as_deref().and_then(parse_date)
			&& published < cutoff
		{
			continue;
		}

		let title = html::fragment_text(&entry.title);
		let summary = html::fragment_text(&entry.summary);
		let text = format!("{title} {summary}");

		if !keywords.iter().any(|keyword| text.contains(keyword)) {
			continue;
		}

		let link = entry.link.trim().to_string();
		let domain = pipeline::host_of(&link).unwrap_or_else(|| fallback_domain.clone());

		if let Some(item) = ResultItem::new(title, link, summary, domain) {
			out.push(item);
		}
	}

	Ok(out)
}

fn parse_date(raw: &str) -> Option<OffsetDateTime> {
	let raw = raw.trim();

	OffsetDateTime::parse(raw, &Rfc2822).or_else(|_| OffsetDateTime::parse(raw, &Rfc3339)).ok()
}

fn parse_feed(xml: &str) -> Result<(Option<String>, Vec<Entry>)> {
	let mut reader = Reader::from_str(xml);

	reader.config_mut().trim_text(true);
	reader.config_mut().check_end_names = false;

	let mut channel_title: Option<String> = None;
	let mut entries = Vec::new();
	let mut current: Option<Entry> = None;
	let mut field: Option<Field> = None;

	loop {
		match reader.read_event()? {
			Event::Eof => break,
			Event::Start(tag) => {
				let name = local_name(&tag);

				if name == "item" || name == "entry" {
					current = Some(Entry::default());
					field = None;

					continue;
				}

				field = match (current.as_mut(), name.as_str()) {
					(Some(entry), "link") => {
						if let Some(href) = atom_href(&tag)? {
							entry.link = href;
						}

						Some(Field::Link)
					},
					(Some(_), "title") => Some(Field::Title),
					(Some(_), "description" | "summary") => Some(Field::Summary),
					(Some(entry), "pubdate" | "published" | "updated")
						if entry.published.is_none() =>
						Some(Field::Published),
					(None, "title") if channel_title.is_none() => Some(Field::ChannelTitle),
					_ => None,
				};
			},
			Event::Empty(tag) => {
				if let Some(entry) = current.as_mut()
					&& local_name(&tag) == "link"
					&& let Some(href) = atom_href(&tag)?
				{
					entry.link = href;
				}
			},
			Event::Text(text) => {
				// Escaped markup decodes to tags here; they are stripped with the rest of the entry.
				let decoded = html::fragment_text(&String::from_utf8_lossy(&text));

				append(&mut current, &mut channel_title, field, &decoded);
			},
			Event::CData(data) => {
				let raw = data.into_inner();

				append(&mut current, &mut channel_title, field, &String::from_utf8_lossy(&raw));
			},
			Event::End(tag) => {
				let name = String::from_utf8_lossy(tag.local_name().as_ref()).to_lowercase();

				if (name == "item" || name == "entry")
					&& let Some(entry) = current.take()
				{
					entries.push(entry);
				}

				field = None;
			},
			_ => {},
		}
	}

	Ok((channel_title, entries))
}

fn append(
	current: &mut Option<Entry>,
	channel_title: &mut Option<String>,
	field: Option<Field>,
	text: &str,
) {
	let target = match (field, current.as_mut()) {
		(Some(Field::ChannelTitle), _) => channel_title.get_or_insert_with(String::new),
		(Some(Field::Title), Some(entry)) => &mut entry.title,
		(Some(Field::Summary), Some(entry)) => &mut entry.summary,
		(Some(Field::Link), Some(entry)) => &mut entry.link,
		(Some(Field::Published), Some(entry)) => entry.published.get_or_insert_with(String::new),
		_ => return,
	};

	target.push_str(text);
}

fn local_name(tag: &BytesStart<'_>) -> String {
	String::from_utf8_lossy(tag.local_name().as_ref()).to_lowercase()
}

/// Atom links carry the target in `href`; alternate (or unlabeled) links win.
fn atom_href(tag: &BytesStart<'_>) -> Result<Option<String>> {
	if let Some(rel) = tag.try_get_attribute("rel")?
		&& rel.value.as_ref() != b"alternate"
	{
		return Ok(None);
	}

	let href = tag
		.try_get_attribute("href")?
		.map(|attr| attr.unescape_value().map(|value| value.into_owned()))
		.transpose()?;

	Ok(href)
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>影视快讯</title>
    <item>
      <title>王家卫新片定档</title>
      <link>https://ent.example.cn/a?x=1&amp;y=2</link>
      <description><![CDATA[<p>导演<b>王家卫</b>的新作</p>]]></description>
      <pubDate>Sat, 17 Oct 2026 08:00:00 +0000</pubDate>
    </item>
    <item>
      <title>旧闻</title>
      <link>https://ent.example.cn/old</link>
      <description>王家卫 旧片重映</description>
      <pubDate>Mon, 05 Jan 2026 08:00:00 +0000</pubDate>
    </item>
    <item>
      <title>无关新闻</title>
      <link>https://ent.example.cn/other</link>
      <description>天气预报</description>
    </item>
    <item>
      <title>王家卫访谈</title>
      <link>relative/path</link>
      <description>未标注日期</description>
    </item>
  </channel>
</rss>"#;

	const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Film Weekly</title>
  <entry>
    <title>Wong Kar-wai returns</title>
    <link rel="self" href="https://films.example.org/self.xml"/>
    <link href="https://films.example.org/wkw"/>
    <summary>New project announced</summary>
    <updated>2026-10-16T12:00:00Z</updated>
  </entry>
</feed>"#;

	#[test]
	fn rss_entries_respect_cutoff_and_keywords() {
		let items =
			parse_items(RSS, &["王家卫"], datetime!(2026-09-18 0:00 UTC)).expect("parse rss");

		assert_eq!(items.len(), 2);
		assert_eq!(items[0].url, "https://ent.example.cn/a?x=1&y=2");
		assert_eq!(items[0].snippet, "导演王家卫的新作");
		assert_eq!(items[0].source_domain, "ent.example.cn");
		assert_eq!(items[1].title, "王家卫访谈");
		assert_eq!(items[1].source_domain, "影视快讯");
	}

	#[test]
	fn atom_prefers_alternate_links() {
		let items =
			parse_items(ATOM, &["Wong"], datetime!(2026-10-01 0:00 UTC)).expect("parse atom");

		assert_eq!(items.len(), 1);
		assert_eq!(items[0].url, "https://films.example.org/wkw");
		assert_eq!(items[0].snippet, "New project announced");
	}

	#[test]
	fn escaped_markup_and_html_entities_are_decoded() {
		let xml = r#"<rss version="2.0"><channel><title>快讯</title>
<item>
  <title>王家卫&mdash;新片&hellip;</title>
  <link>https://ent.example.cn/b</link>
  <description>&lt;p&gt;&ldquo;花样&rdquo;&lt;b&gt;重映&lt;/b&gt;&lt;/p&gt;</description>
</item>
</channel></rss>"#;
		let items = parse_items(xml, &["王家卫"], datetime!(2026-09-18 0:00 UTC)).expect("parse");

		assert_eq!(items.len(), 1);
		assert_eq!(items[0].title, "王家卫—新片…");
		assert_eq!(items[0].snippet, "“花样”重映");
	}

	#[test]
	fn parses_both_date_formats() {
		assert!(parse_date("Sat, 17 Oct 2026 08:00:00 +0000").is_some());
		assert!(parse_date("2026-10-16T12:00:00Z").is_some());
		assert!(parse_date("yesterday").is_none());
	}
}
