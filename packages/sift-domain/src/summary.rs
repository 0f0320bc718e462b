use crate::model::ResultItem;

const POSITIVE_WORDS: [&str; 7] = ["好", "赞", "支持", "认可", "优秀", "经典", "佳"];
const NEGATIVE_WORDS: [&str; 7] = ["差", "骂", "争议", "批评", "失望", "不好", "负面"];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SentimentCounts {
	pub positive: usize,
	pub negative: usize,
	pub neutral: usize,
}

/// Classifies each item by which lexicon has more distinct hits, preferring fetched content over
/// the title and snippet.
pub fn sentiment_counts(items: &[ResultItem]) -> SentimentCounts {
	let mut counts = SentimentCounts::default();

	for item in items {
		let text = match item.content.as_deref() {
			Some(content) if !content.is_empty() => content.to_string(),
			_ => item.summary_text(),
		};
		let positive = POSITIVE_WORDS.iter().filter(|word| text.contains(*word)).count();
		let negative = NEGATIVE_WORDS.iter().filter(|word| text.contains(*word)).count();

		if positive > negative {
			counts.positive += 1;
		} else if negative > positive {
			counts.negative += 1;
		} else {
			counts.neutral += 1;
		}
	}

	counts
}

/// Rule-based synthesis for result sets that never went through the sufficiency judge.
pub fn summarize(items: &[ResultItem], topic: &str) -> String {
	if items.is_empty() {
		return format!(
			"围绕‘{topic}’的公开文本检索，未检索到有效中文结果或结果被过滤。\
			请尝试：调整关键词、扩大时间窗或减少白名单限制。"
		);
	}

	let SentimentCounts { positive, negative, neutral } = sentiment_counts(items);
	let total = items.len();

	format!(
		"围绕‘{topic}’的公开文本讨论，初步显示：正面样本约{positive}/{total}，\
		负面样本约{negative}/{total}，中性/不明显约{neutral}/{total}。\
		该结论为规则初判，建议人工复核。"
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn item(title: &str, content: Option<&str>) -> ResultItem {
		let mut item =
			ResultItem::new(title, format!("https://example.com/{title}"), "", "example.com")
				.expect("item");

		item.content = content.map(str::to_string);

		item
	}

	#[test]
	fn content_takes_precedence_over_title() {
		let items = vec![
			item("口碑很好", Some("观众批评剧情，失望")),
			item("经典之作", None),
			item("上映日期", None),
		];

		assert_eq!(
			sentiment_counts(&items),
			SentimentCounts { positive: 1, negative: 1, neutral: 1 }
		);
	}

	#[test]
	fn summary_reports_totals() {
		let text = summarize(&[item("经典", None)], "王家卫");

		assert!(text.contains("正面样本约1/1"));
		assert!(text.contains("王家卫"));
	}
}
