//! Turns a topic into a [`RetrievalPlan`], asking the oracle first and falling back to a fixed
//! rule.

use serde::Serialize;
use serde_json::{Map, Value};

use sift_config::{Config, Search};
use sift_domain::{RetrievalPlan, SearchQuery, TimeWindow, model};

use crate::{
	CompletionProvider,
	oracle::{self, OracleOutcome},
};

/// Generic aspect words appended to the topic tokens by the rule planner.
pub const ASPECT_WORDS: [&str; 6] = ["最新", "舆情", "争议", "评价", "事件", "新闻"];

const SYSTEM_PROMPT: &str = "你是检索策略规划助手。";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanSource {
	Oracle,
	#[default]
	Rule,
}

/// Never fails: any oracle problem yields the rule plan.
pub async fn plan(
	cfg: &Config,
	completion: &dyn CompletionProvider,
	query: &SearchQuery,
) -> (RetrievalPlan, PlanSource) {
	let outcome: OracleOutcome<Value> =
		oracle::consult(cfg, completion, "planner", SYSTEM_PROMPT, build_prompt(query)).await;

	match outcome {
		OracleOutcome::Parsed(Value::Object(fields)) =>
			(plan_from_fields(&cfg.search, query, &fields), PlanSource::Oracle),
		OracleOutcome::Parsed(other) => {
			tracing::warn!(payload_kind = value_kind(&other), "Planner payload is not an object.");

			(rule_plan(&cfg.search, query), PlanSource::Rule)
		},
		OracleOutcome::Unavailable | OracleOutcome::ParseFailed =>
			(rule_plan(&cfg.search, query), PlanSource::Rule),
	}
}

/// Topic tokens plus [`ASPECT_WORDS`]; the time window and quota come from `[search]`, the
/// source switches favour domestic sources.
pub fn rule_plan(search: &Search, query: &SearchQuery) -> RetrievalPlan {
	RetrievalPlan {
		keywords: rule_keywords(query),
		time_window: TimeWindow::parse(&search.time_window).unwrap_or_default(),
		quota: search.quota,
		domestic_only: true,
		enable_web_search: false,
		enable_local_search: true,
		enable_feed_search: true,
	}
}

pub fn rule_keywords(query: &SearchQuery) -> Vec<String> {
	model::dedup_ordered(
		query
			.keywords()
			.iter()
			.cloned()
			.chain(ASPECT_WORDS.iter().map(|word| word.to_string())),
	)
}

/// Reads each field independently; a missing or mistyped field takes the rule default.
pub fn plan_from_fields(
	search: &Search,
	query: &SearchQuery,
	fields: &Map<String, Value>,
) -> RetrievalPlan {
	let defaults = rule_plan(search, query);
	let keywords = fields
		.get("keywords")
		.and_then(Value::as_array)
		.map(|values| {
			model::dedup_ordered(
				values.iter().filter_map(Value::as_str).map(|keyword| keyword.trim().to_string()),
			)
		})
		.filter(|keywords| !keywords.is_empty())
		.unwrap_or(defaults.keywords);
	let time_window = field(fields, &["time_window", "timelimit"])
		.and_then(Value::as_str)
		.and_then(TimeWindow::parse)
		.unwrap_or(defaults.time_window);
	let quota = field(fields, &["quota", "max_results"])
		.and_then(Value::as_u64)
		.filter(|quota| *quota > 0)
		.and_then(|quota| u32::try_from(quota).ok())
		.unwrap_or(defaults.quota);
	let flag = |name: &str, default: bool| {
		fields.get(name).and_then(Value::as_bool).unwrap_or(default)
	};

	RetrievalPlan {
		keywords,
		time_window,
		quota,
		domestic_only: flag("domestic_only", defaults.domestic_only),
		enable_web_search: flag("enable_web_search", defaults.enable_web_search),
		enable_local_search: flag("enable_local_search", defaults.enable_local_search),
		enable_feed_search: flag("enable_feed_search", defaults.enable_feed_search),
	}
}

fn field<'a>(fields: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
	names.iter().find_map(|name| fields.get(*name))
}

fn build_prompt(query: &SearchQuery) -> String {
	format!(
		"根据用户的问题输出一个 JSON 对象，字段包括：keywords（字符串数组）、\
		time_window（week/month/quarter/year 之一）、quota（正整数）、domestic_only（布尔）、\
		enable_web_search（布尔）、enable_local_search（布尔）、enable_feed_search（布尔）。\
		默认国内优先。只输出 JSON。问题：{}",
		query.topic()
	)
}

fn value_kind(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "bool",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "array",
		Value::Object(_) => "object",
	}
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeMap;

	use super::*;

	fn search(time_window: &str, quota: u32) -> Search {
		Search {
			time_window: time_window.to_string(),
			quota,
			language_filter: true,
			script: "han".to_string(),
			allow_domains: Vec::new(),
			deny_domains: Vec::new(),
			domain_weights: BTreeMap::new(),
		}
	}

	#[test]
	fn rule_plan_appends_aspect_words_without_duplicates() {
		let plan = rule_plan(&search("month", 20), &SearchQuery::new("王家卫 评价 王家卫"));

		assert_eq!(plan.keywords, vec!["王家卫", "评价", "最新", "舆情", "争议", "事件", "新闻"]);
		assert_eq!(plan.time_window, TimeWindow::Month);
		assert_eq!(plan.quota, 20);
		assert!(plan.domestic_only && !plan.enable_web_search);
		assert!(plan.enable_local_search && plan.enable_feed_search);
	}

	#[test]
	fn rule_plan_takes_window_and_quota_from_config() {
		let plan = rule_plan(&search("week", 5), &SearchQuery::new("王家卫"));

		assert_eq!(plan.time_window, TimeWindow::Week);
		assert_eq!(plan.quota, 5);
	}

	#[test]
	fn invalid_fields_fall_back_individually() {
		let query = SearchQuery::new("王家卫");
		let Value::Object(fields) = serde_json::json!({
			"keywords": ["王家卫", "", 3, "新片"],
			"timelimit": "90",
			"quota": 0,
			"enable_web_search": "yes",
			"domestic_only": false,
		}) else {
			unreachable!("object literal");
		};
		let plan = plan_from_fields(&search("year", 12), &query, &fields);

		assert_eq!(plan.keywords, vec!["王家卫", "新片"]);
		assert_eq!(plan.time_window, TimeWindow::Quarter);
		assert_eq!(plan.quota, 12);
		assert!(!plan.enable_web_search);
		assert!(!plan.domestic_only);
	}

	#[test]
	fn empty_keyword_list_uses_rule_keywords() {
		let query = SearchQuery::new("王家卫");
		let Value::Object(fields) = serde_json::json!({ "keywords": [] }) else {
			unreachable!("object literal");
		};

		let plan = plan_from_fields(&search("month", 20), &query, &fields);

		assert_eq!(plan.keywords, rule_keywords(&query));
		assert_eq!(plan.time_window, TimeWindow::Month);
	}
}
