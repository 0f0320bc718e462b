use std::time::Duration;

use color_eyre::{
	Result,
	eyre::{self, WrapErr},
};
use reqwest::Client;
use serde_json::Value;

/// One chat completion round trip. Returns the assistant message text as-is; errors name the
/// provider.
pub async fn complete(cfg: &sift_config::LlmProviderConfig, messages: &[Value]) -> Result<String> {
	request(cfg, messages)
		.await
		.wrap_err_with(|| format!("Completion from provider {} failed.", cfg.provider_id))
}

async fn request(cfg: &sift_config::LlmProviderConfig, messages: &[Value]) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
	});
	let res = client
		.post(&url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_completion_content(&json)
}

fn parse_completion_content(json: &Value) -> Result<String> {
	json.pointer("/choices/0/message/content")
		.and_then(Value::as_str)
		.map(str::to_string)
		.ok_or_else(|| eyre::eyre!("Completion response is missing message content."))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_choice_content_text() {
		let json = serde_json::json!({
			"choices": [
				{ "message": { "role": "assistant", "content": "[true, false]" } }
			]
		});
		let parsed = parse_completion_content(&json).expect("parse failed");

		assert_eq!(parsed, "[true, false]");
	}

	#[test]
	fn rejects_response_without_choices() {
		let json = serde_json::json!({ "error": { "message": "quota exceeded" } });

		assert!(parse_completion_content(&json).is_err());
	}
}
