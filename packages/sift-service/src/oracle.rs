//! Shared plumbing for oracle call sites: one completion request, one structured payload.

use serde::de::DeserializeOwned;

use sift_config::Config;

use crate::CompletionProvider;

/// Result of consulting the oracle. Callers map both failure variants to their rule path.
#[derive(Clone, Debug, PartialEq)]
pub enum OracleOutcome<T> {
	Parsed(T),
	/// No oracle configured, or the request itself failed.
	Unavailable,
	/// The oracle answered but the payload did not decode.
	ParseFailed,
}

pub(crate) async fn consult<T>(
	cfg: &Config,
	completion: &dyn CompletionProvider,
	call_site: &'static str,
	system: &str,
	prompt: String,
) -> OracleOutcome<T>
where
	T: DeserializeOwned,
{
	let Some(llm) = cfg.providers.llm.as_ref() else {
		tracing::debug!(call_site, "No oracle configured.");

		return OracleOutcome::Unavailable;
	};
	let messages = vec![
		serde_json::json!({ "role": "system", "content": system }),
		serde_json::json!({ "role": "user", "content": prompt }),
	];
	let text = match completion.complete(llm, &messages).await {
		Ok(text) => text,
		Err(err) => {
			// The alternate form keeps the whole cause chain on one line.
			tracing::warn!(
				error = %format!("{err:#}"),
				call_site,
				provider_id = llm.provider_id.as_str(),
				"Oracle request failed."
			);

			return OracleOutcome::Unavailable;
		},
	};

	match parse_payload(&text) {
		Ok(value) => OracleOutcome::Parsed(value),
		Err(err) => {
			tracing::warn!(
				error = %err,
				call_site,
				provider_id = llm.provider_id.as_str(),
				"Oracle payload did not parse."
			);

			OracleOutcome::ParseFailed
		},
	}
}

pub fn parse_payload<T>(text: &str) -> serde_json::Result<T>
where
	T: DeserializeOwned,
{
	serde_json::from_str(strip_code_fence(text))
}

/// Removes a surrounding Markdown code fence (with or without a language tag).
pub fn strip_code_fence(text: &str) -> &str {
	let trimmed = text.trim();
	let Some(rest) = trimmed.strip_prefix("```") else {
		return trimmed;
	};
	let Some(body) = rest.strip_suffix("```") else {
		return trimmed;
	};
	let body = match body.find('\n') {
		Some(newline) if !body[..newline].trim_start().starts_with(['{', '[']) =>
			&body[newline + 1..],
		_ => body,
	};

	body.trim()
}

/// Numbered candidate list used by batch prompts.
pub(crate) fn numbered(entries: impl IntoIterator<Item = String>) -> String {
	entries
		.into_iter()
		.enumerate()
		.map(|(idx, entry)| format!("[{}]\n{entry}", idx + 1))
		.collect::<Vec<_>>()
		.join("\n\n")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn strips_fences_with_and_without_language_tag() {
		assert_eq!(strip_code_fence("```json\n[true, false]\n```"), "[true, false]");
		assert_eq!(strip_code_fence("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
		assert_eq!(strip_code_fence("```[true]```"), "[true]");
		assert_eq!(strip_code_fence("  [true] "), "[true]");
	}

	#[test]
	fn parses_fenced_payloads() {
		let flags: Vec<bool> = parse_payload("```json\n[true,false]\n```").expect("parse flags");

		assert_eq!(flags, vec![true, false]);
		assert!(parse_payload::<Vec<bool>>("not json").is_err());
	}

	#[test]
	fn numbers_entries_from_one() {
		assert_eq!(numbered(["a".to_string(), "b".to_string()]), "[1]\na\n\n[2]\nb");
	}
}
