//! Relevance filtering of candidate batches and the sufficiency verdict over the accepted set.

use serde::{Deserialize, Serialize};

use sift_config::Config;
use sift_domain::{ResultItem, SearchQuery};

use crate::{
	CompletionProvider,
	oracle::{self, OracleOutcome},
};

/// Items sent to the sufficiency oracle.
pub const SUFFICIENCY_SAMPLE: usize = 5;
/// Accepted items needed before the rule considers the corpus sufficient.
pub const RULE_SUFFICIENT_COUNT: usize = 3;

const FILTER_SYSTEM_PROMPT: &str = "你是相关性筛选助手。";
const SUFFICIENCY_SYSTEM_PROMPT: &str = "你是总结与判定助手。";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JudgeMode {
	Oracle,
	Rule,
}

#[derive(Debug)]
pub struct BatchVerdict {
	pub accepted: Vec<ResultItem>,
	pub rejected: Vec<ResultItem>,
	pub mode: JudgeMode,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sufficiency {
	pub satisfied: bool,
	pub synthesis: String,
	pub mode: JudgeMode,
}

#[derive(Debug, Deserialize)]
struct SufficiencyPayload {
	#[serde(alias = "satisfy")]
	satisfied: bool,
	#[serde(default)]
	summary: String,
}

/// Splits `items` into relevant and irrelevant, preserving order on both sides. The oracle
/// verdict is used only when it returns exactly one flag per item.
pub async fn filter_batch(
	cfg: &Config,
	completion: &dyn CompletionProvider,
	query: &SearchQuery,
	keywords: &[String],
	items: Vec<ResultItem>,
) -> BatchVerdict {
	if items.is_empty() {
		return BatchVerdict { accepted: Vec::new(), rejected: Vec::new(), mode: JudgeMode::Rule };
	}

	let prompt = filter_prompt(query, &items);
	let outcome: OracleOutcome<Vec<bool>> =
		oracle::consult(cfg, completion, "filter_batch", FILTER_SYSTEM_PROMPT, prompt).await;

	match outcome {
		OracleOutcome::Parsed(flags) if flags.len() == items.len() => {
			let (accepted, rejected) = partition(items, flags);

			BatchVerdict { accepted, rejected, mode: JudgeMode::Oracle }
		},
		OracleOutcome::Parsed(flags) => {
			tracing::warn!(
				expected = items.len(),
				got = flags.len(),
				"Oracle filter length mismatch; using keyword rule."
			);

			rule_verdict(keywords, items)
		},
		OracleOutcome::Unavailable | OracleOutcome::ParseFailed => rule_verdict(keywords, items),
	}
}

/// Accepts items whose title and snippet mention at least one keyword.
pub fn rule_filter(
	keywords: &[String],
	items: Vec<ResultItem>,
) -> (Vec<ResultItem>, Vec<ResultItem>) {
	let flags = items
		.iter()
		.map(|item| {
			let text = item.summary_text();

			keywords.iter().any(|keyword| !keyword.is_empty() && text.contains(keyword.as_str()))
		})
		.collect();

	partition(items, flags)
}

pub async fn judge_sufficiency(
	cfg: &Config,
	completion: &dyn CompletionProvider,
	query: &SearchQuery,
	accepted: &[ResultItem],
) -> Sufficiency {
	let prompt = sufficiency_prompt(query, accepted);
	let outcome: OracleOutcome<SufficiencyPayload> = oracle::consult(
		cfg,
		completion,
		"judge_sufficiency",
		SUFFICIENCY_SYSTEM_PROMPT,
		prompt,
	)
	.await;

	match outcome {
		OracleOutcome::Parsed(payload) => Sufficiency {
			satisfied: payload.satisfied,
			synthesis: payload.summary,
			mode: JudgeMode::Oracle,
		},
		OracleOutcome::Unavailable | OracleOutcome::ParseFailed => rule_sufficiency(accepted),
	}
}

pub fn rule_sufficiency(accepted: &[ResultItem]) -> Sufficiency {
	Sufficiency {
		satisfied: accepted.len() >= RULE_SUFFICIENT_COUNT,
		synthesis: format!("基于{}条材料的规则版汇总：请人工复核。", accepted.len()),
		mode: JudgeMode::Rule,
	}
}

fn rule_verdict(keywords: &[String], items: Vec<ResultItem>) -> BatchVerdict {
	let (accepted, rejected) = rule_filter(keywords, items);

	BatchVerdict { accepted, rejected, mode: JudgeMode::Rule }
}

fn partition(items: Vec<ResultItem>, flags: Vec<bool>) -> (Vec<ResultItem>, Vec<ResultItem>) {
	let mut accepted = Vec::new();
	let mut rejected = Vec::new();

	for (item, keep) in items.into_iter().zip(flags) {
		if keep {
			accepted.push(item);
		} else {
			rejected.push(item);
		}
	}

	(accepted, rejected)
}

fn filter_prompt(query: &SearchQuery, items: &[ResultItem]) -> String {
	let candidates =
		oracle::numbered(items.iter().map(|item| format!("{}\n{}", item.title, item.snippet)));

	format!(
		"用户问题：{}\n下面是候选摘要列表，请判断每条是否与用户需求高度相关。\
		只输出一个 JSON 布尔数组，如 [true,false,...]，长度必须与候选条数一致。\n\n候选：\n{candidates}",
		query.topic()
	)
}

fn sufficiency_prompt(query: &SearchQuery, accepted: &[ResultItem]) -> String {
	let material = accepted
		.iter()
		.take(SUFFICIENCY_SAMPLE)
		.map(|item| {
			let body = match item.content.as_deref() {
				Some(content) if !content.trim().is_empty() => content.to_string(),
				_ => format!("{}\n{}", item.title, item.snippet),
			};

			format!("- {}\n{body}", item.title)
		})
		.collect::<Vec<_>>()
		.join("\n\n");

	format!(
		"用户问题：{}\n\n请阅读以下材料，只输出一个 JSON：\
		{{\"satisfied\": true/false, \"summary\": \"综合结论与要点\"}}。\n材料：\n{material}",
		query.topic()
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn item(title: &str, snippet: &str) -> ResultItem {
		ResultItem::new(title, format!("https://example.com/{title}"), snippet, "example.com")
			.expect("item")
	}

	#[test]
	fn rule_filter_keeps_keyword_hits_in_order() {
		let keywords = vec!["王家卫".to_string()];
		let items = vec![item("a", "王家卫 新片"), item("b", "天气"), item("王家卫 访谈", "")];
		let (accepted, rejected) = rule_filter(&keywords, items);
		let titles: Vec<&str> = accepted.iter().map(|item| item.title.as_str()).collect();

		assert_eq!(titles, ["a", "王家卫 访谈"]);
		assert_eq!(rejected.len(), 1);
	}

	#[test]
	fn rule_sufficiency_needs_three_items() {
		let two = vec![item("a", ""), item("b", "")];
		let three = vec![item("a", ""), item("b", ""), item("c", "")];

		assert!(!rule_sufficiency(&two).satisfied);
		assert!(rule_sufficiency(&three).satisfied);
		assert!(rule_sufficiency(&three).synthesis.contains("人工复核"));
	}

	#[test]
	fn sufficiency_payload_accepts_the_short_key() {
		let payload: SufficiencyPayload =
			oracle::parse_payload(r#"{"satisfy": true, "summary": "ok"}"#).expect("parse");

		assert!(payload.satisfied);
		assert_eq!(payload.summary, "ok");
	}

	#[test]
	fn sufficiency_prompt_prefers_content_and_caps_sample() {
		let mut items: Vec<ResultItem> =
			(0..7).map(|idx| item(&format!("t{idx}"), "snippet")).collect();

		items[0].content = Some("全文内容".to_string());

		let prompt = sufficiency_prompt(&SearchQuery::new("王家卫"), &items);

		assert!(prompt.contains("全文内容"));
		assert!(prompt.contains("- t4"));
		assert!(!prompt.contains("- t5"));
	}
}
