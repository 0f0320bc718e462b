//! General web search over the DuckDuckGo HTML endpoint.

use color_eyre::Result;
use reqwest::Url;
use scraper::Html;

use sift_config::Sources;
use sift_domain::{ResultItem, TimeWindow, pipeline};

use crate::html;

const FALLBACK_DOMAIN: &str = "duckduckgo.com";
const REGION: &str = "cn-zh";

pub async fn search(
	cfg: &Sources,
	query: &str,
	quota: u32,
	time_window: TimeWindow,
) -> Result<Vec<ResultItem>> {
	if query.trim().is_empty() {
		return Ok(Vec::new());
	}

	let client = crate::page_client(cfg.timeout_ms, &cfg.user_agent)?;
	let res = client
		.get(&cfg.web_endpoint)
		.query(&[("q", query), ("kl", REGION), ("df", date_filter(time_window))])
		.send()
		.await?;
	let page = res.error_for_status()?.text().await?;

	parse_results(&page, &cfg.web_endpoint, quota as usize)
}

/// The endpoint only knows day/week/month/year; a quarter widens to a year.
pub fn date_filter(time_window: TimeWindow) -> &'static str {
	match time_window {
		TimeWindow::Week => "w",
		TimeWindow::Month => "m",
		TimeWindow::Quarter | TimeWindow::Year => "y",
	}
}

/// Reads one item per result container; the snippet comes from inside the same container, so
/// a result without one gets an empty snippet.
fn parse_results(page: &str, endpoint: &str, quota: usize) -> Result<Vec<ResultItem>> {
	let document = Html::parse_document(page);
	let container = html::selector("div.result")?;
	let anchor = html::selector("a.result__a[href]")?;
	let snippet_block =
		html::selector("a.result__snippet, div.result__snippet, td.result__snippet")?;
	let mut out = Vec::new();

	for result in document.select(&container) {
		if out.len() >= quota {
			break;
		}

		let Some(link) = result.select(&anchor).next() else { continue };
		let Some(url) = link.value().attr("href").and_then(|href| resolve_href(endpoint, href))
		else {
			continue;
		};
		let title = html::element_text(link);
		let snippet =
			result.select(&snippet_block).next().map(html::element_text).unwrap_or_default();
		let domain = pipeline::host_of(&url).unwrap_or_else(|| FALLBACK_DOMAIN.to_string());

		if let Some(item) = ResultItem::new(title, url, snippet, domain) {
			out.push(item);
		}
	}

	Ok(out)
}

/// Resolves relative links and unwraps `/l/?uddg=<target>` redirect links.
fn resolve_href(endpoint: &str, raw: &str) -> Option<String> {
	let base = Url::parse(endpoint).ok()?;
	let url = base.join(raw.trim()).ok()?;

	if url.path().starts_with("/l/")
		&& let Some((_, target)) = url.query_pairs().find(|(key, _)| key == "uddg")
	{
		return Some(target.into_owned());
	}

	Some(url.to_string())
}
