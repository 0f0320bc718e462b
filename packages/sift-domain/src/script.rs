use unicode_normalization::UnicodeNormalization;
use unicode_script::{Script, UnicodeScript};

/// Scripts the language filter can target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetScript {
	Han,
	Latin,
	Cyrillic,
	Arabic,
	Hangul,
	Hiragana,
	Katakana,
}
impl TargetScript {
	pub fn from_name(name: &str) -> Option<Self> {
		match name.trim().to_lowercase().as_str() {
			"han" => Some(Self::Han),
			"latin" => Some(Self::Latin),
			"cyrillic" => Some(Self::Cyrillic),
			"arabic" => Some(Self::Arabic),
			"hangul" => Some(Self::Hangul),
			"hiragana" => Some(Self::Hiragana),
			"katakana" => Some(Self::Katakana),
			_ => None,
		}
	}

	fn script(self) -> Script {
		match self {
			Self::Han => Script::Han,
			Self::Latin => Script::Latin,
			Self::Cyrillic => Script::Cyrillic,
			Self::Arabic => Script::Arabic,
			Self::Hangul => Script::Hangul,
			Self::Hiragana => Script::Hiragana,
			Self::Katakana => Script::Katakana,
		}
	}
}

/// True when at least one character of `input` (after NFKC) belongs to `target`.
pub fn contains_script(input: &str, target: TargetScript) -> bool {
	let script = target.script();

	input.nfkc().any(|ch| !ch.is_whitespace() && ch.script() == script)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn detects_han_in_mixed_text() {
		assert!(contains_script("Wong Kar-wai 王家卫", TargetScript::Han));
		assert!(!contains_script("Wong Kar-wai", TargetScript::Han));
	}

	#[test]
	fn cjk_punctuation_alone_is_not_han() {
		assert!(!contains_script("「」。，", TargetScript::Han));
	}

	#[test]
	fn fullwidth_latin_normalizes_to_latin() {
		assert!(contains_script("Ｆｕｌｌ", TargetScript::Latin));
	}

	#[test]
	fn unknown_script_names_are_rejected() {
		assert_eq!(TargetScript::from_name(" Han "), Some(TargetScript::Han));
		assert_eq!(TargetScript::from_name("klingon"), None);
	}
}
