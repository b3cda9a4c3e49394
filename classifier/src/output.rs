use crate::category::Category;
use crate::error::ClassifierErrorType;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Self-reported "sigma level" the performative prompt asks for.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum SigmaLevel {
  Alpha,
  Beta,
  Sigma,
  Omega,
}

/// Per-category fields beyond the flag, confidence, and explanation.
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryDetails {
  Matcha,
  Labubu,
  Tote {
    sustainability: Option<f64>,
    brand_value: Option<f64>,
    aesthetic_score: Option<f64>,
  },
  Performative {
    performative_score: f64,
    detected_items: Vec<String>,
    sigma_level: Option<SigmaLevel>,
    tiktok_factor: Option<f64>,
  },
}

impl CategoryDetails {
  pub fn category(&self) -> Category {
    match self {
      CategoryDetails::Matcha => Category::Matcha,
      CategoryDetails::Labubu => Category::Labubu,
      CategoryDetails::Tote { .. } => Category::Tote,
      CategoryDetails::Performative { .. } => Category::Performative,
    }
  }

  /// Labelled extra fields for human-readable output, in wire order.
  pub fn fields(&self) -> Vec<(&'static str, String)> {
    let mut fields = Vec::new();
    match self {
      CategoryDetails::Matcha | CategoryDetails::Labubu => {}
      CategoryDetails::Tote {
        sustainability,
        brand_value,
        aesthetic_score,
      } => {
        let scores = [
          ("Sustainability", sustainability),
          ("Brand Value", brand_value),
          ("Aesthetic Score", aesthetic_score),
        ];
        for (label, score) in scores {
          if let Some(score) = score {
            fields.push((label, score_value(*score).to_string()));
          }
        }
      }
      CategoryDetails::Performative {
        performative_score,
        detected_items,
        sigma_level,
        tiktok_factor,
      } => {
        fields.push((
          "Performative Score",
          score_value(*performative_score).to_string(),
        ));
        if let Some(level) = sigma_level {
          fields.push(("Sigma Level", level.to_string()));
        }
        if let Some(factor) = tiktok_factor {
          fields.push(("TikTok Factor", score_value(*factor).to_string()));
        }
        let items = if detected_items.is_empty() {
          "none".to_string()
        } else {
          detected_items.join(", ")
        };
        fields.push(("Detected Items", items));
      }
    }
    fields
  }

  fn clamped(self) -> Self {
    match self {
      CategoryDetails::Tote {
        sustainability,
        brand_value,
        aesthetic_score,
      } => CategoryDetails::Tote {
        sustainability: sustainability.map(clamp_score),
        brand_value: brand_value.map(clamp_score),
        aesthetic_score: aesthetic_score.map(clamp_score),
      },
      CategoryDetails::Performative {
        performative_score,
        detected_items,
        sigma_level,
        tiktok_factor,
      } => CategoryDetails::Performative {
        performative_score: clamp_score(performative_score),
        detected_items,
        sigma_level,
        tiktok_factor: tiktok_factor.map(clamp_score),
      },
      other => other,
    }
  }
}

/// Saturate a percentage-style score into [0, 100].
pub fn clamp_score(value: f64) -> f64 {
  if value.is_nan() {
    0.0
  } else {
    value.clamp(0.0, 100.0)
  }
}

/// Validated classification of one image.
///
/// Serializes flat, with the primary flag named after the category
/// (`isMatcha`, `isTote`, ...) and the detail fields alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
  pub detected: bool,
  pub confidence: f64,
  pub explanation: String,
  pub details: CategoryDetails,
}

impl ClassificationResult {
  /// Builds a result with every score already clamped.
  pub fn new(
    detected: bool,
    confidence: f64,
    explanation: String,
    details: CategoryDetails,
  ) -> Self {
    Self {
      detected,
      confidence: clamp_score(confidence),
      explanation,
      details: details.clamped(),
    }
  }

  pub fn category(&self) -> Category {
    self.details.category()
  }

  pub fn to_json(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(self)
  }
}

/// Whole-number scores go out as JSON integers so `90` stays `90`.
fn score_value(value: f64) -> serde_json::Value {
  if value.fract() == 0.0 && value.abs() <= i64::MAX as f64 {
    serde_json::Value::from(value as i64)
  } else {
    serde_json::Value::from(value)
  }
}

impl Serialize for ClassificationResult {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(None)?;
    map.serialize_entry(self.category().profile().flag_field, &self.detected)?;
    map.serialize_entry("confidence", &score_value(self.confidence))?;
    map.serialize_entry("explanation", &self.explanation)?;
    match &self.details {
      CategoryDetails::Matcha | CategoryDetails::Labubu => {}
      CategoryDetails::Tote {
        sustainability,
        brand_value,
        aesthetic_score,
      } => {
        let scores = [
          ("sustainability", sustainability),
          ("brandValue", brand_value),
          ("aestheticScore", aesthetic_score),
        ];
        for (key, score) in scores {
          if let Some(score) = score {
            map.serialize_entry(key, &score_value(*score))?;
          }
        }
      }
      CategoryDetails::Performative {
        performative_score,
        detected_items,
        sigma_level,
        tiktok_factor,
      } => {
        map.serialize_entry(
          "performativeScore",
          &score_value(*performative_score),
        )?;
        if let Some(level) = sigma_level {
          map.serialize_entry("sigmaLevel", level)?;
        }
        if let Some(factor) = tiktok_factor {
          map.serialize_entry("tiktokFactor", &score_value(*factor))?;
        }
        map.serialize_entry("detectedItems", detected_items)?;
      }
    }
    map.end()
  }
}

/// Metadata about the classification process
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ClassificationMetadata {
  pub model: String,
  pub prompt_hash: String,
  pub media_type: String,
}

/// Error information
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorInfo {
  pub error_type: ClassifierErrorType,
  pub message: String,
}

/// Output format for a successful command-line classification
#[derive(Serialize, Debug, Clone)]
pub struct ClassificationOutput {
  pub image: String,
  pub result: String, // "classified"
  pub category: Category,
  pub classification: ClassificationResult,
  pub metadata: ClassificationMetadata,
}

/// Output format for errors
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ErrorOutput {
  pub image: String,
  pub result: String, // "error"
  pub error: ErrorInfo,
  pub metadata: Option<PartialMetadata>,
}

/// Partial metadata available even on error
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PartialMetadata {
  pub model: String,
  pub prompt_hash: String,
}

impl ClassificationOutput {
  pub fn to_json(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(self)
  }
}

impl ErrorOutput {
  pub fn to_json(&self) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_performative_fields_are_listed_for_display() {
    let details = CategoryDetails::Performative {
      performative_score: 82.0,
      detected_items: vec!["tote bag".to_string(), "matcha".to_string()],
      sigma_level: Some(SigmaLevel::Sigma),
      tiktok_factor: Some(64.5),
    };
    assert_eq!(
      details.fields(),
      vec![
        ("Performative Score", "82".to_string()),
        ("Sigma Level", "sigma".to_string()),
        ("TikTok Factor", "64.5".to_string()),
        ("Detected Items", "tote bag, matcha".to_string()),
      ]
    );
  }

  #[test]
  fn test_tote_fields_skip_missing_scores() {
    let details = CategoryDetails::Tote {
      sustainability: Some(70.0),
      brand_value: None,
      aesthetic_score: Some(55.0),
    };
    assert_eq!(
      details.fields(),
      vec![
        ("Sustainability", "70".to_string()),
        ("Aesthetic Score", "55".to_string()),
      ]
    );
    assert!(CategoryDetails::Matcha.fields().is_empty());
  }
}
