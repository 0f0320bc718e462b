//! Local-market search over the Baidu results page. The page has no time filter, so the
//! requested time window is not forwarded.

use color_eyre::Result;
use scraper::Html;

use sift_config::Sources;
use sift_domain::{ResultItem, pipeline};

use crate::html;

const FALLBACK_DOMAIN: &str = "baidu.com";

pub async fn search(cfg: &Sources, query: &str, quota: u32) -> Result<Vec<ResultItem>> {
	if query.trim().is_empty() {
		return Ok(Vec::new());
	}

	let client = crate::page_client(cfg.timeout_ms, &cfg.user_agent)?;
	let rn = quota.to_string();
	let res =
		client.get(&cfg.local_endpoint).query(&[("wd", query), ("rn", rn.as_str())]).send().await?;
	let page = res.error_for_status()?.text().await?;

	parse_results(&page, quota as usize)
}

/// One item per result container, with the abstract read from the same container.
fn parse_results(page: &str, quota: usize) -> Result<Vec<ResultItem>> {
	let document = Html::parse_document(page);
	let container = html::selector("div.c-container, div.result")?;
	let title_link = html::selector("h3 a[href]")?;
	let abstract_block = html::selector(".c-abstract")?;
	let mut out = Vec::new();

	for result in document.select(&container) {
		if out.len() >= quota {
			break;
		}

		let Some(link) = result.select(&title_link).next() else { continue };
		let href = link.value().attr("href").unwrap_or_default().trim().to_string();
		let title = html::element_text(link);
		let snippet =
			result.select(&abstract_block).next().map(html::element_text).unwrap_or_default();
		let domain = pipeline::host_of(&href).unwrap_or_else(|| FALLBACK_DOMAIN.to_string());

		if let Some(item) = ResultItem::new(title, href, snippet, domain) {
			out.push(item);
		}
	}

	Ok(out)
}
