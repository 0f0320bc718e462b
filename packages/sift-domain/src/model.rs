use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
	Week,
	#[default]
	Month,
	Quarter,
	Year,
}
impl TimeWindow {
	/// Accepts the canonical names as well as the short codes used by search front ends
	/// (`w`, `m`, `90`, `y`).
	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_lowercase().as_str() {
			"week" | "w" | "7" => Some(Self::Week),
			"month" | "m" | "30" => Some(Self::Month),
			"quarter" | "q" | "90" => Some(Self::Quarter),
			"year" | "y" | "365" => Some(Self::Year),
			_ => None,
		}
	}

	pub fn longest() -> Self {
		Self::Year
	}

	pub fn days(self) -> i64 {
		match self {
			Self::Week => 7,
			Self::Month => 30,
			Self::Quarter => 90,
			Self::Year => 365,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Week => "week",
			Self::Month => "month",
			Self::Quarter => "quarter",
			Self::Year => "year",
		}
	}
}
impl fmt::Display for TimeWindow {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// The user topic and its whitespace tokens. Built once per request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
	topic: String,
	keywords: Vec<String>,
}
impl SearchQuery {
	pub fn new(topic: impl Into<String>) -> Self {
		let topic = topic.into().trim().to_string();
		let keywords = dedup_ordered(topic.split_whitespace().map(str::to_string));

		Self { topic, keywords }
	}

	pub fn topic(&self) -> &str {
		&self.topic
	}

	pub fn keywords(&self) -> &[String] {
		&self.keywords
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetrievalPlan {
	pub keywords: Vec<String>,
	pub time_window: TimeWindow,
	pub quota: u32,
	pub domestic_only: bool,
	pub enable_web_search: bool,
	pub enable_local_search: bool,
	pub enable_feed_search: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultItem {
	pub title: String,
	pub url: String,
	pub snippet: String,
	pub source_domain: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub content: Option<String>,
	#[serde(default)]
	pub score: f32,
}
impl ResultItem {
	/// Returns `None` when the URL is empty; such hits never enter a result set.
	pub fn new(
		title: impl Into<String>,
		url: impl Into<String>,
		snippet: impl Into<String>,
		source_domain: impl Into<String>,
	) -> Option<Self> {
		let url = url.into().trim().to_string();

		if url.is_empty() {
			return None;
		}

		Some(Self {
			title: title.into(),
			url,
			snippet: snippet.into(),
			source_domain: source_domain.into(),
			content: None,
			score: 0.0,
		})
	}

	/// Title and snippet, the text every stage matches against.
	pub fn summary_text(&self) -> String {
		format!("{} {}", self.title, self.snippet)
	}
}

pub fn dedup_ordered<I>(values: I) -> Vec<String>
where
	I: IntoIterator<Item = String>,
{
	let mut seen = HashSet::new();
	let mut out = Vec::new();

	for value in values {
		if value.is_empty() {
			continue;
		}
		if seen.insert(value.clone()) {
			out.push(value);
		}
	}

	out
}
