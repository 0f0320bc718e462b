use std::time::Duration;

use futures::future;
use serde::Serialize;
use tokio::time;

use sift_config::Config;
use sift_domain::ResultItem;

use crate::ContentFetcher;

/// Enrichment never looks further down a result set than this.
pub const MAX_TOP_K: usize = 3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EnrichStats {
	pub success: usize,
	pub fail: usize,
}

/// Fetches full text for the first `top_k` items (capped at [`MAX_TOP_K`]) concurrently, each
/// under its own timeout. Items that already carry content are skipped and not counted.
pub async fn enrich(
	cfg: &Config,
	fetcher: &dyn ContentFetcher,
	items: &mut [ResultItem],
	top_k: usize,
) -> EnrichStats {
	let limit = top_k.min(MAX_TOP_K).min(items.len());
	let targets: Vec<(usize, String)> = items[..limit]
		.iter()
		.enumerate()
		.filter(|(_, item)| item.content.is_none())
		.map(|(idx, item)| (idx, item.url.clone()))
		.collect();

	if targets.is_empty() {
		return EnrichStats::default();
	}

	let timeout = Duration::from_millis(cfg.enrichment.timeout_ms);
	let fetches = targets.iter().map(|(_, url)| {
		time::timeout(timeout, fetcher.fetch(&cfg.enrichment, &cfg.sources.user_agent, url))
	});
	let results = future::join_all(fetches).await;
	let mut stats = EnrichStats::default();

	for ((idx, url), result) in targets.iter().zip(results) {
		match result {
			Ok(Ok(text)) => {
				items[*idx].content = Some(text);
				stats.success += 1;
			},
			Ok(Err(err)) => {
				tracing::warn!(error = %err, url = %url, "Content fetch failed.");

				stats.fail += 1;
			},
			Err(_) => {
				tracing::warn!(
					url = %url,
					timeout_ms = cfg.enrichment.timeout_ms,
					"Content fetch timed out."
				);

				stats.fail += 1;
			},
		}
	}

	tracing::debug!(success = stats.success, fail = stats.fail, "Enrichment finished.");

	stats
}
