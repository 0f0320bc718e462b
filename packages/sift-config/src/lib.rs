mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Enrichment, Iteration, LlmProviderConfig, Providers, Search, Service, Sources,
};

use std::{env, fs, path::Path};

pub const LLM_API_KEY_ENV: &str = "SIFT_LLM_API_KEY";
pub const TIME_WINDOWS: [&str; 4] = ["week", "month", "quarter", "year"];
pub const SCRIPTS: [&str; 7] =
	["han", "latin", "cyrillic", "arabic", "hangul", "hiragana", "katakana"];

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	if let Ok(key) = env::var(LLM_API_KEY_ENV)
		&& let Some(llm) = cfg.providers.llm.as_mut()
		&& !key.trim().is_empty()
	{
		llm.api_key = key;
	}

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if !TIME_WINDOWS.contains(&cfg.search.time_window.as_str()) {
		return Err(Error::Validation {
			message: "search.time_window must be one of week, month, quarter, or year.".to_string(),
		});
	}
	if cfg.search.quota == 0 {
		return Err(Error::Validation {
			message: "search.quota must be greater than zero.".to_string(),
		});
	}
	if !SCRIPTS.contains(&cfg.search.script.as_str()) {
		return Err(Error::Validation {
			message: format!("search.script must be one of {}.", SCRIPTS.join(", ")),
		});
	}

	for (label, patterns) in [
		("search.allow_domains", &cfg.search.allow_domains),
		("search.deny_domains", &cfg.search.deny_domains),
	] {
		if patterns.iter().any(|pattern| pattern.is_empty()) {
			return Err(Error::Validation { message: format!("{label} entries must be non-empty.") });
		}
	}

	for (domain, weight) in &cfg.search.domain_weights {
		if domain.is_empty() {
			return Err(Error::Validation {
				message: "search.domain_weights keys must be non-empty.".to_string(),
			});
		}
		if !weight.is_finite() {
			return Err(Error::Validation {
				message: format!("search.domain_weights.{domain} must be a finite number."),
			});
		}
	}

	if cfg.sources.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "sources.timeout_ms must be greater than zero.".to_string(),
		});
	}

	for (label, endpoint) in [
		("sources.web_endpoint", &cfg.sources.web_endpoint),
		("sources.local_endpoint", &cfg.sources.local_endpoint),
	] {
		if !is_http_url(endpoint) {
			return Err(Error::Validation { message: format!("{label} must be an http(s) URL.") });
		}
	}

	if let Some(feed) = cfg.sources.feeds.iter().find(|feed| !is_http_url(feed)) {
		return Err(Error::Validation {
			message: format!("sources.feeds entry {feed:?} must be an http(s) URL."),
		});
	}
	if cfg.enrichment.top_k == 0 {
		return Err(Error::Validation {
			message: "enrichment.top_k must be greater than zero.".to_string(),
		});
	}
	if cfg.enrichment.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "enrichment.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.enrichment.max_bytes == 0 {
		return Err(Error::Validation {
			message: "enrichment.max_bytes must be greater than zero.".to_string(),
		});
	}
	if cfg.enrichment.max_paragraphs == 0 {
		return Err(Error::Validation {
			message: "enrichment.max_paragraphs must be greater than zero.".to_string(),
		});
	}
	if cfg.iteration.iter_size == 0 {
		return Err(Error::Validation {
			message: "loop.iter_size must be greater than zero.".to_string(),
		});
	}
	if cfg.iteration.max_rounds == 0 {
		return Err(Error::Validation {
			message: "loop.max_rounds must be greater than zero.".to_string(),
		});
	}

	if let Some(llm) = cfg.providers.llm.as_ref() {
		for (label, value) in [
			("providers.llm.api_base", &llm.api_base),
			("providers.llm.model", &llm.model),
			("providers.llm.path", &llm.path),
		] {
			if value.trim().is_empty() {
				return Err(Error::Validation { message: format!("{label} must be non-empty.") });
			}
		}

		if !is_http_url(&llm.api_base) {
			return Err(Error::Validation {
				message: "providers.llm.api_base must be an http(s) URL.".to_string(),
			});
		}
		if llm.timeout_ms == 0 {
			return Err(Error::Validation {
				message: "providers.llm.timeout_ms must be greater than zero.".to_string(),
			});
		}
		if !llm.temperature.is_finite() || llm.temperature < 0.0 {
			return Err(Error::Validation {
				message: "providers.llm.temperature must be a finite number, zero or greater."
					.to_string(),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.search.time_window = cfg.search.time_window.trim().to_lowercase();
	cfg.search.script = cfg.search.script.trim().to_lowercase();

	for patterns in [&mut cfg.search.allow_domains, &mut cfg.search.deny_domains] {
		for pattern in patterns.iter_mut() {
			*pattern = pattern.trim().to_lowercase();
		}
	}

	cfg.search.domain_weights = std::mem::take(&mut cfg.search.domain_weights)
		.into_iter()
		.map(|(domain, weight)| (domain.trim().to_lowercase(), weight))
		.collect();
	cfg.sources.feeds.retain(|feed| !feed.trim().is_empty());

	// Without a key there is no oracle to call.
	if cfg.providers.llm.as_ref().map(|llm| llm.api_key.trim().is_empty()).unwrap_or(false) {
		cfg.providers.llm = None;
	}
}

fn is_http_url(raw: &str) -> bool {
	raw.starts_with("http://") || raw.starts_with("https://")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn http_url_check_requires_scheme() {
		assert!(is_http_url("https://www.baidu.com/s"));
		assert!(is_http_url("http://127.0.0.1:8080/feed.xml"));
		assert!(!is_http_url("ftp://example.com"));
		assert!(!is_http_url("www.baidu.com"));
	}
}
