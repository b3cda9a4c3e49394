//! Keyword heuristics for replies that are not usable JSON.
//!
//! Deliberately loose: the flag needs the category keyword plus an
//! affirmative token anywhere in the text, and the confidence is the first
//! integer following a `confidence` token.

use crate::category::Category;
use crate::output::{CategoryDetails, ClassificationResult};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
  static ref CONFIDENCE: Regex =
    Regex::new(r#"(?i)confidence['":\s]*([0-9]+)"#).expect("valid confidence regex");
  static ref EXPLANATION_PREFIX: Regex =
    Regex::new(r#"^.*?"explanation":\s*"?"#).expect("valid explanation regex");
  static ref EXPLANATION_SUFFIX: Regex =
    Regex::new(r#""?\s*\}.*$"#).expect("valid explanation regex");
}

const AFFIRMATIVE_TOKENS: [&str; 2] = ["yes", "true"];

pub fn extract(category: Category, raw_text: &str) -> ClassificationResult {
  let profile = category.profile();
  let lowered = raw_text.to_lowercase();
  let flag_literal = format!("\"{}\": true", profile.flag_field.to_lowercase());

  let detected = lowered.contains(profile.keyword)
    && (AFFIRMATIVE_TOKENS.iter().any(|token| lowered.contains(token))
      || lowered.contains(&flag_literal));

  let confidence = reported_confidence(raw_text)
    .unwrap_or(if detected { 75.0 } else { 25.0 });

  let details = match category {
    Category::Matcha => CategoryDetails::Matcha,
    Category::Labubu => CategoryDetails::Labubu,
    Category::Tote => CategoryDetails::Tote {
      sustainability: None,
      brand_value: None,
      aesthetic_score: None,
    },
    Category::Performative => CategoryDetails::Performative {
      performative_score: if detected { 60.0 } else { 20.0 },
      detected_items: Vec::new(),
      sigma_level: None,
      tiktok_factor: None,
    },
  };

  ClassificationResult::new(
    detected,
    confidence,
    explanation_text(raw_text),
    details,
  )
}

fn reported_confidence(raw_text: &str) -> Option<f64> {
  CONFIDENCE
    .captures(raw_text)
    .and_then(|captures| captures.get(1))
    .and_then(|digits| digits.as_str().parse::<f64>().ok())
}

/// Peel a half-written `"explanation": "...` value out of the reply. Returns
/// the whole reply when nothing is left after stripping.
fn explanation_text(raw_text: &str) -> String {
  let without_prefix = EXPLANATION_PREFIX.replace(raw_text, "");
  let stripped = EXPLANATION_SUFFIX.replace(&without_prefix, "");
  let stripped = stripped.trim();
  if stripped.is_empty() {
    raw_text.to_string()
  } else {
    stripped.to_string()
  }
}
