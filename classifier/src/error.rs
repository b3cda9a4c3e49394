use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// Semantic error types that provide context about where/when a failure occurred
#[derive(
  Debug, Display, EnumString, Serialize, Deserialize, Clone, Copy, PartialEq,
)]
#[strum(serialize_all = "PascalCase")]
#[serde(rename_all = "PascalCase")]
pub enum ClassifierErrorType {
  ImageReadError,
  UnsupportedMediaType,
  VisionApiNotConfigured,
  VisionApiConnectionError,
  VisionApiTimeoutError,
  VisionApiRateLimitError,
  VisionApiAuthError,
  VisionApiError,
  VisionResponseParseError,
  EmptyModelReply,
}

/// Failures talking to the upstream vision model.
#[derive(Error, Debug)]
pub enum VisionError {
  #[error("vision API rate limit exceeded: {0}")]
  RateLimited(String),

  #[error("vision API rejected the credentials: {0}")]
  InvalidApiKey(String),

  #[error("vision API request timed out")]
  Timeout,

  #[error("vision API returned {status}: {body}")]
  Api { status: u16, body: String },

  #[error("HTTP error: {0}")]
  Http(#[from] reqwest::Error),

  #[error("vision API returned no content")]
  EmptyReply,
}

/// Internal error type with detailed context
#[derive(Error, Debug)]
pub enum ClassifierError {
  #[error("Image read error: {0}")]
  ImageReadError(#[from] std::io::Error),

  #[error("Unsupported media type: {0}")]
  UnsupportedMediaType(String),

  #[error("Vision service not configured")]
  NotConfigured,

  #[error("Vision service error: {0}")]
  Vision(#[from] VisionError),
}

impl ClassifierError {
  /// Convert internal error to semantic error type
  pub fn to_error_type(&self) -> ClassifierErrorType {
    match self {
      ClassifierError::ImageReadError(_) => ClassifierErrorType::ImageReadError,
      ClassifierError::UnsupportedMediaType(_) => {
        ClassifierErrorType::UnsupportedMediaType
      }
      ClassifierError::NotConfigured => {
        ClassifierErrorType::VisionApiNotConfigured
      }
      ClassifierError::Vision(e) => match e {
        VisionError::RateLimited(_) => {
          ClassifierErrorType::VisionApiRateLimitError
        }
        VisionError::InvalidApiKey(_) => ClassifierErrorType::VisionApiAuthError,
        VisionError::Timeout => ClassifierErrorType::VisionApiTimeoutError,
        VisionError::Api { .. } => ClassifierErrorType::VisionApiError,
        VisionError::Http(e) => {
          if e.is_timeout() {
            ClassifierErrorType::VisionApiTimeoutError
          } else if e.is_connect() {
            ClassifierErrorType::VisionApiConnectionError
          } else if e.is_decode() {
            ClassifierErrorType::VisionResponseParseError
          } else {
            ClassifierErrorType::VisionApiError
          }
        }
        VisionError::EmptyReply => ClassifierErrorType::EmptyModelReply,
      },
    }
  }
}
