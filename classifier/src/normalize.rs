//! Turns a free-form model reply into a [`ClassificationResult`].
//!
//! The reply is expected to be a JSON object, but models wrap it in markdown
//! fences, surround it with prose, or skip fields. The JSON path handles the
//! first two; anything that still fails the category schema goes through the
//! heuristic in [`crate::fallback`]. Normalization never fails.

use crate::category::{Category, CategoryProfile};
use crate::fallback;
use crate::output::{CategoryDetails, ClassificationResult, SigmaLevel};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, warn};

lazy_static! {
  static ref FENCE_OPEN: Regex =
    Regex::new(r"^```[A-Za-z0-9_+-]*\s*").expect("valid fence regex");
  static ref FENCE_CLOSE: Regex =
    Regex::new(r"\s*```$").expect("valid fence regex");
  static ref JSON_NUMBER: Regex =
    Regex::new(r"-?[0-9]+(?:\.[0-9]+)?(?:[eE][+-]?[0-9]+)?").expect("valid number regex");
}

/// Why a reply could not be taken at face value.
#[derive(Error, Debug)]
pub enum ReplyRejection {
  #[error("reply is not valid JSON: {0}")]
  NotJson(#[from] serde_json::Error),

  #[error("reply JSON is not an object")]
  NotAnObject,

  #[error("reply is missing a {expected} `{field}` field")]
  InvalidField {
    field: &'static str,
    expected: &'static str,
  },
}

pub fn normalize(category: Category, raw_text: &str) -> ClassificationResult {
  let candidate = extract_json_candidate(raw_text);
  match parse_reply(category.profile(), &candidate) {
    Ok(result) => result,
    Err(rejection) => {
      warn!(
        "Falling back to heuristic extraction for {}: {}",
        category, rejection
      );
      debug!("Rejected reply content: {}", candidate);
      fallback::extract(category, raw_text)
    }
  }
}

/// Trim, unwrap a leading code fence, and cut the text down to the outermost
/// `{ ... }` span when there is one.
pub fn extract_json_candidate(raw_text: &str) -> String {
  let mut text = raw_text.trim().to_string();
  if text.starts_with("```") {
    text = FENCE_OPEN.replace(&text, "").into_owned();
    text = FENCE_CLOSE.replace(&text, "").into_owned();
  }
  match (text.find('{'), text.rfind('}')) {
    (Some(start), Some(end)) if start < end => text[start..=end].to_string(),
    _ => text,
  }
}

/// Parse `candidate` as JSON and check it against the category schema.
pub fn parse_reply(
  profile: &CategoryProfile,
  candidate: &str,
) -> Result<ClassificationResult, ReplyRejection> {
  let value: Value = match serde_json::from_str(candidate) {
    Ok(value) => value,
    Err(err) => match saturate_huge_numbers(candidate) {
      Some(saturated) => serde_json::from_str(&saturated)?,
      None => return Err(err.into()),
    },
  };
  let object = value.as_object().ok_or(ReplyRejection::NotAnObject)?;

  let detected = object
    .get(profile.flag_field)
    .and_then(Value::as_bool)
    .ok_or(ReplyRejection::InvalidField {
      field: profile.flag_field,
      expected: "boolean",
    })?;
  let confidence = object
    .get("confidence")
    .and_then(Value::as_f64)
    .ok_or(ReplyRejection::InvalidField {
      field: "confidence",
      expected: "numeric",
    })?;
  let explanation = object
    .get("explanation")
    .and_then(Value::as_str)
    .filter(|s| !s.trim().is_empty())
    .ok_or(ReplyRejection::InvalidField {
      field: "explanation",
      expected: "non-empty string",
    })?;

  let details = match profile.category {
    Category::Matcha => CategoryDetails::Matcha,
    Category::Labubu => CategoryDetails::Labubu,
    Category::Tote => CategoryDetails::Tote {
      sustainability: optional_score(object, "sustainability"),
      brand_value: optional_score(object, "brandValue"),
      aesthetic_score: optional_score(object, "aestheticScore"),
    },
    Category::Performative => CategoryDetails::Performative {
      performative_score: optional_score(object, "performativeScore")
        .unwrap_or(if detected { 75.0 } else { 25.0 }),
      detected_items: object
        .get("detectedItems")
        .and_then(Value::as_array)
        .map(|items| {
          items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
        })
        .unwrap_or_default(),
      sigma_level: object
        .get("sigmaLevel")
        .and_then(Value::as_str)
        .and_then(|level| SigmaLevel::from_str(level.trim()).ok()),
      tiktok_factor: optional_score(object, "tiktokFactor"),
    },
  };

  Ok(ClassificationResult::new(
    detected,
    confidence,
    explanation.to_string(),
    details,
  ))
}

/// serde_json rejects numbers beyond the f64 range even though they are valid
/// JSON. Rewrite them to the largest finite value so they clamp like any other
/// out-of-range score. Returns `None` when nothing needed rewriting.
fn saturate_huge_numbers(candidate: &str) -> Option<String> {
  let mut changed = false;
  let rewritten = JSON_NUMBER.replace_all(candidate, |caps: &regex::Captures| {
    let literal = &caps[0];
    match literal.parse::<f64>() {
      Ok(value) if value.is_infinite() => {
        changed = true;
        let saturated = if value.is_sign_negative() { "-1e308" } else { "1e308" };
        saturated.to_string()
      }
      _ => literal.to_string(),
    }
  });
  let rewritten = rewritten.into_owned();
  changed.then_some(rewritten)
}

fn optional_score(object: &Map<String, Value>, field: &str) -> Option<f64> {
  object.get(field).and_then(Value::as_f64)
}
