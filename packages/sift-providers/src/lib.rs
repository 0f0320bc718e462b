pub mod completion;
pub mod feed;
pub mod fetch;
pub mod html;
pub mod local;
pub mod web;

use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::{
	Client,
	header::{ACCEPT_LANGUAGE, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue},
};
use serde_json::{Map, Value};

/// Bearer authorization plus the configured extra headers. Header values must be strings.
pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {}", api_key.trim()).parse()?);

	for (name, value) in default_headers {
		let raw = value
			.as_str()
			.ok_or_else(|| eyre::eyre!("Header {name} must have a string value."))?;

		headers.insert(HeaderName::from_bytes(name.as_bytes())?, HeaderValue::from_str(raw)?);
	}

	Ok(headers)
}

/// Client for page and feed requests: browser user agent, Chinese-first content negotiation.
pub fn page_client(timeout_ms: u64, user_agent: &str) -> Result<Client> {
	let mut headers = HeaderMap::new();

	headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("zh-CN,zh;q=0.9"));

	let client = Client::builder()
		.timeout(Duration::from_millis(timeout_ms))
		.user_agent(user_agent)
		.default_headers(headers)
		.build()?;

	Ok(client)
}
