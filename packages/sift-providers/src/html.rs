//! HTML text helpers shared by the page adapters, the feed parser and the content fetcher.

use color_eyre::{Result, eyre};
use scraper::{ElementRef, Html, Selector};

const MIN_PARAGRAPH_CHARS: usize = 20;
/// Paragraph scopes in priority order. Each selector yields every paragraph once, in document
/// order, even when containers nest.
const PARAGRAPH_SCOPES: [&str; 4] =
	["article p", "main p", "[class*=content] p, [id*=content] p", "p"];
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

pub fn collapse_whitespace(text: &str) -> String {
	text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of an HTML fragment with tags dropped and entities decoded, whitespace collapsed.
pub fn fragment_text(fragment: &str) -> String {
	let fragment = Html::parse_fragment(fragment);

	element_text(fragment.root_element())
}

pub fn element_text(element: ElementRef<'_>) -> String {
	collapse_whitespace(&element.text().collect::<String>())
}

pub(crate) fn selector(pattern: &str) -> Result<Selector> {
	Selector::parse(pattern).map_err(|err| eyre::eyre!("Invalid selector {pattern:?}: {err}"))
}

/// Primary text of a page: paragraphs of the first scope that has any (`article`, `main`, a
/// `content` block, then the whole page), falling back to the visible page text.
pub fn extract_main_text(page: &str, max_paragraphs: usize) -> Result<String> {
	let document = Html::parse_document(page);

	for scope in PARAGRAPH_SCOPES {
		let scope = selector(scope)?;
		let raw: Vec<String> =
			document.select(&scope).map(element_text).take(max_paragraphs).collect();

		if raw.is_empty() {
			continue;
		}

		let kept: Vec<String> = raw
			.into_iter()
			.filter(|text| text.chars().count() >= MIN_PARAGRAPH_CHARS)
			.collect();

		if !kept.is_empty() {
			return Ok(kept.join("\n"));
		}

		break;
	}

	Ok(visible_text(document.root_element()))
}

/// Every text node outside scripts and styles, separated by spaces.
fn visible_text(root: ElementRef<'_>) -> String {
	let mut out = String::new();

	for node in root.descendants() {
		let Some(text) = node.value().as_text() else { continue };
		let hidden = node
			.parent()
			.and_then(|parent| parent.value().as_element().map(|element| element.name()))
			.is_some_and(|name| HIDDEN_ELEMENTS.contains(&name));

		if !hidden {
			out.push_str(text);
			out.push(' ');
		}
	}

	collapse_whitespace(&out)
}
