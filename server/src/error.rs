use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use performative_ai_classifier::error::{
  ClassifierError, ClassifierErrorType, VisionError,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Everything that can stop an analysis request before a result exists.
#[derive(Error, Debug)]
pub enum AnalyzeError {
  #[error("No image file provided")]
  NoImage,

  #[error("Only image files are allowed")]
  NotAnImage,

  #[error("Image exceeds the {0} byte upload limit")]
  TooLarge(usize),

  #[error("Invalid upload: {0}")]
  InvalidUpload(String),

  #[error("AI service not configured")]
  NotConfigured,

  #[error(transparent)]
  Classifier(#[from] ClassifierError),
}

#[derive(Serialize, Debug)]
pub struct ErrorBody {
  pub error: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error_type: Option<ClassifierErrorType>,
}

impl AnalyzeError {
  pub fn status(&self) -> StatusCode {
    match self {
      AnalyzeError::NoImage
      | AnalyzeError::NotAnImage
      | AnalyzeError::TooLarge(_)
      | AnalyzeError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
      AnalyzeError::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
      AnalyzeError::Classifier(e) => match e {
        ClassifierError::UnsupportedMediaType(_) => StatusCode::BAD_REQUEST,
        ClassifierError::Vision(VisionError::RateLimited(_)) => {
          StatusCode::TOO_MANY_REQUESTS
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
      },
    }
  }

  /// Message safe to hand back to the browser. Upstream details stay in the
  /// logs.
  pub fn public_message(&self) -> String {
    match self {
      AnalyzeError::Classifier(e) => match e {
        ClassifierError::UnsupportedMediaType(_) => {
          AnalyzeError::NotAnImage.to_string()
        }
        ClassifierError::NotConfigured => {
          AnalyzeError::NotConfigured.to_string()
        }
        ClassifierError::Vision(VisionError::RateLimited(_)) => {
          "AI service rate limit exceeded. Please try again later.".to_string()
        }
        ClassifierError::Vision(VisionError::InvalidApiKey(_)) => {
          "AI service configuration error".to_string()
        }
        _ => "Failed to analyze image. Please try again.".to_string(),
      },
      other => other.to_string(),
    }
  }

  pub fn error_type(&self) -> Option<ClassifierErrorType> {
    match self {
      AnalyzeError::NotAnImage => Some(ClassifierErrorType::UnsupportedMediaType),
      AnalyzeError::NotConfigured => {
        Some(ClassifierErrorType::VisionApiNotConfigured)
      }
      AnalyzeError::Classifier(e) => Some(e.to_error_type()),
      _ => None,
    }
  }
}

impl IntoResponse for AnalyzeError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
      error!("Error analyzing image: {}", self);
    }
    let body = ErrorBody {
      error: self.public_message(),
      error_type: self.error_type(),
    };
    (status, Json(body)).into_response()
  }
}
