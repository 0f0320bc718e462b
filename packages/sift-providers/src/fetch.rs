use color_eyre::{Result, eyre};

use sift_config::Enrichment;

use crate::html;

/// Downloads a page and extracts its primary text. The body is read chunk by chunk and cut off
/// at `max_bytes`; an empty extraction counts as a failure.
pub async fn fetch_content(cfg: &Enrichment, user_agent: &str, url: &str) -> Result<String> {
	let client = crate::page_client(cfg.timeout_ms, user_agent)?;
	let mut res = client.get(url).send().await?.error_for_status()?;
	let cap = usize::try_from(cfg.max_bytes).unwrap_or(usize::MAX);
	let mut body = Vec::new();

	while let Some(chunk) = res.chunk().await? {
		let room = cap.saturating_sub(body.len());

		body.extend_from_slice(&chunk[..chunk.len().min(room)]);

		if body.len() >= cap {
			break;
		}
	}

	let page = String::from_utf8_lossy(&body);
	let text = html::extract_main_text(&page, cfg.max_paragraphs as usize)?;

	if text.trim().is_empty() {
		return Err(eyre::eyre!("No text could be extracted from {url}."));
	}

	Ok(text)
}
