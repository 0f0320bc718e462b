use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub search: Search,
	pub sources: Sources,
	pub enrichment: Enrichment,
	#[serde(rename = "loop")]
	pub iteration: Iteration,
	#[serde(default)]
	pub providers: Providers,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Search {
	/// One of "week", "month", "quarter" or "year".
	#[serde(default = "default_time_window")]
	pub time_window: String,
	#[serde(default = "default_quota")]
	pub quota: u32,
	pub language_filter: bool,
	/// Target script of the language filter, e.g. "han".
	#[serde(default = "default_script")]
	pub script: String,
	#[serde(default)]
	pub allow_domains: Vec<String>,
	#[serde(default)]
	pub deny_domains: Vec<String>,
	/// Additive ranking bonus keyed by domain. A key also matches its sub-domains.
	#[serde(default)]
	pub domain_weights: BTreeMap<String, f32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sources {
	pub timeout_ms: u64,
	#[serde(default = "default_user_agent")]
	pub user_agent: String,
	#[serde(default = "default_web_endpoint")]
	pub web_endpoint: String,
	#[serde(default = "default_local_endpoint")]
	pub local_endpoint: String,
	#[serde(default)]
	pub feeds: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Enrichment {
	pub enabled: bool,
	pub top_k: u32,
	pub timeout_ms: u64,
	#[serde(default = "default_max_bytes")]
	pub max_bytes: u64,
	#[serde(default = "default_max_paragraphs")]
	pub max_paragraphs: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Iteration {
	pub iter_size: u32,
	pub max_rounds: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Providers {
	/// Optional. When absent the planner and the judge run in rule mode.
	pub llm: Option<LlmProviderConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

fn default_time_window() -> String {
	"month".to_string()
}

fn default_quota() -> u32 {
	20
}

fn default_script() -> String {
	"han".to_string()
}

fn default_user_agent() -> String {
	"Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36"
		.to_string()
}

fn default_web_endpoint() -> String {
	"https://html.duckduckgo.com/html/".to_string()
}

fn default_local_endpoint() -> String {
	"https://www.baidu.com/s".to_string()
}

fn default_max_bytes() -> u64 {
	1_000_000
}

fn default_max_paragraphs() -> u32 {
	40
}
