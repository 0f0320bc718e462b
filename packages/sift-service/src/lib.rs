pub mod controller;
pub mod enricher;
pub mod judge;
pub mod oracle;
pub mod planner;

mod error;

pub use controller::{Counters, Outcome, RelaxationLevel, RunReport};
pub use error::{Error, Result};
pub use oracle::OracleOutcome;
pub use planner::PlanSource;

use std::{future::Future, pin::Pin, sync::Arc};

use serde::Serialize;
use serde_json::Value;

use sift_config::{Config, Enrichment, LlmProviderConfig, Sources};
use sift_domain::{ResultItem, TimeWindow};
use sift_providers::{completion, feed, fetch, local, web};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub const MAX_TOPIC_CHARS: usize = 256;

/// One retrieval source. Implementations may fail freely; the controller turns errors and
/// timeouts into an empty batch.
pub trait SourceAdapter
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		cfg: &'a Sources,
		query: &'a str,
		quota: u32,
		time_window: TimeWindow,
	) -> BoxFuture<'a, color_eyre::Result<Vec<ResultItem>>>;
}

pub trait CompletionProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

pub trait ContentFetcher
where
	Self: Send + Sync,
{
	fn fetch<'a>(
		&'a self,
		cfg: &'a Enrichment,
		user_agent: &'a str,
		url: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

/// The fixed set of source variants, in merge priority order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
	Web,
	Local,
	Feed,
}
impl SourceKind {
	pub const ALL: [Self; 3] = [Self::Web, Self::Local, Self::Feed];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Web => "web",
			Self::Local => "local",
			Self::Feed => "feed",
		}
	}
}

#[derive(Clone)]
pub struct Providers {
	pub web: Arc<dyn SourceAdapter>,
	pub local: Arc<dyn SourceAdapter>,
	pub feed: Arc<dyn SourceAdapter>,
	pub completion: Arc<dyn CompletionProvider>,
	pub fetcher: Arc<dyn ContentFetcher>,
}
impl Providers {
	pub fn new(
		web: Arc<dyn SourceAdapter>,
		local: Arc<dyn SourceAdapter>,
		feed: Arc<dyn SourceAdapter>,
		completion: Arc<dyn CompletionProvider>,
		fetcher: Arc<dyn ContentFetcher>,
	) -> Self {
		Self { web, local, feed, completion, fetcher }
	}

	pub fn source(&self, kind: SourceKind) -> &dyn SourceAdapter {
		match kind {
			SourceKind::Web => self.web.as_ref(),
			SourceKind::Local => self.local.as_ref(),
			SourceKind::Feed => self.feed.as_ref(),
		}
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self {
			web: Arc::new(WebSearch),
			local: Arc::new(LocalSearch),
			feed: Arc::new(FeedSearch),
			completion: provider.clone(),
			fetcher: provider,
		}
	}
}

pub struct SiftService {
	pub cfg: Config,
	pub providers: Providers,
}
impl SiftService {
	pub fn new(cfg: Config) -> Self {
		Self { cfg, providers: Providers::default() }
	}

	pub fn with_providers(cfg: Config, providers: Providers) -> Self {
		Self { cfg, providers }
	}

	/// Validates the topic, then runs the full retrieval loop.
	pub async fn report(&self, topic: &str) -> Result<RunReport> {
		let topic = validate_topic(topic)?;

		Ok(self.run(topic).await)
	}
}

struct DefaultProviders;
impl CompletionProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(completion::complete(cfg, messages))
	}
}
impl ContentFetcher for DefaultProviders {
	fn fetch<'a>(
		&'a self,
		cfg: &'a Enrichment,
		user_agent: &'a str,
		url: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(fetch::fetch_content(cfg, user_agent, url))
	}
}

struct WebSearch;
impl SourceAdapter for WebSearch {
	fn search<'a>(
		&'a self,
		cfg: &'a Sources,
		query: &'a str,
		quota: u32,
		time_window: TimeWindow,
	) -> BoxFuture<'a, color_eyre::Result<Vec<ResultItem>>> {
		Box::pin(web::search(cfg, query, quota, time_window))
	}
}

struct LocalSearch;
impl SourceAdapter for LocalSearch {
	fn search<'a>(
		&'a self,
		cfg: &'a Sources,
		query: &'a str,
		quota: u32,
		_time_window: TimeWindow,
	) -> BoxFuture<'a, color_eyre::Result<Vec<ResultItem>>> {
		Box::pin(local::search(cfg, query, quota))
	}
}

struct FeedSearch;
impl SourceAdapter for FeedSearch {
	fn search<'a>(
		&'a self,
		cfg: &'a Sources,
		query: &'a str,
		quota: u32,
		time_window: TimeWindow,
	) -> BoxFuture<'a, color_eyre::Result<Vec<ResultItem>>> {
		Box::pin(feed::search(cfg, query, quota, time_window))
	}
}

/// Trimmed topic, or `InvalidRequest` when it is blank or longer than [`MAX_TOPIC_CHARS`].
pub fn validate_topic(topic: &str) -> Result<&str> {
	let topic = topic.trim();

	if topic.is_empty() {
		return Err(Error::InvalidRequest { message: "Topic must not be empty.".to_string() });
	}
	if topic.chars().count() > MAX_TOPIC_CHARS {
		return Err(Error::InvalidRequest {
			message: format!("Topic must be at most {MAX_TOPIC_CHARS} characters."),
		});
	}

	Ok(topic)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn topic_is_trimmed() {
		assert_eq!(validate_topic("  王家卫 ").expect("valid topic"), "王家卫");
	}

	#[test]
	fn blank_and_oversized_topics_are_rejected() {
		assert!(matches!(validate_topic("   "), Err(Error::InvalidRequest { .. })));
		assert!(matches!(validate_topic(&"字".repeat(257)), Err(Error::InvalidRequest { .. })));
		assert!(validate_topic(&"字".repeat(256)).is_ok());
	}
}
