use crate::category::Category;
use crate::error::VisionError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

/// One image to classify.
#[derive(Debug, Clone)]
pub struct ClassificationRequest {
  pub category: Category,
  pub image_bytes: Vec<u8>,
  pub media_type: String,
}

impl ClassificationRequest {
  /// `data:` URL carrying the image inline, as the chat API expects.
  pub fn data_url(&self) -> String {
    format!(
      "data:{};base64,{}",
      self.media_type,
      STANDARD.encode(&self.image_bytes)
    )
  }
}

/// Unprocessed text the vision model produced for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct RawModelReply {
  pub text: String,
}

/// Anything that can look at an image and answer a text instruction.
#[async_trait]
pub trait VisionClient: Send + Sync {
  /// Model identifier, reported in output metadata.
  fn model(&self) -> &str;

  async fn complete(
    &self,
    prompt: &str,
    request: &ClassificationRequest,
  ) -> Result<RawModelReply, VisionError>;
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
  pub api_key: String,
  pub base_url: String,
  pub model: String,
  pub max_tokens: u32,
  pub timeout: Duration,
}

#[derive(Serialize, Debug)]
pub struct ChatCompletionRequest {
  pub model: String,
  pub messages: Vec<ChatMessage>,
  pub max_tokens: u32,
}

#[derive(Serialize, Debug)]
pub struct ChatMessage {
  pub role: String,
  pub content: Vec<ContentPart>,
}

#[derive(Serialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
  Text { text: String },
  ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize, Debug)]
pub struct ImageUrl {
  pub url: String,
  pub detail: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChatCompletionResponse {
  pub choices: Vec<ChatChoice>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChatChoice {
  pub message: ChatChoiceMessage,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChatChoiceMessage {
  #[serde(default)]
  pub content: Option<String>,
}

/// Chat-completions client for OpenAI-compatible vision models.
pub struct OpenAiVisionClient {
  http: reqwest::Client,
  config: OpenAiConfig,
}

impl OpenAiVisionClient {
  pub fn new(config: OpenAiConfig) -> Result<Self, VisionError> {
    let http = reqwest::Client::builder()
      .timeout(config.timeout)
      .gzip(true)
      .build()?;
    Ok(Self { http, config })
  }

  fn endpoint(&self) -> String {
    format!(
      "{}/chat/completions",
      self.config.base_url.trim_end_matches('/')
    )
  }

  pub fn build_request(
    &self,
    prompt: &str,
    request: &ClassificationRequest,
  ) -> ChatCompletionRequest {
    ChatCompletionRequest {
      model: self.config.model.clone(),
      messages: vec![ChatMessage {
        role: "user".to_string(),
        content: vec![
          ContentPart::Text {
            text: prompt.to_string(),
          },
          ContentPart::ImageUrl {
            image_url: ImageUrl {
              url: request.data_url(),
              detail: "high".to_string(),
            },
          },
        ],
      }],
      max_tokens: self.config.max_tokens,
    }
  }
}

/// Sort a failed upstream response into the cases callers treat differently.
fn classify_failure(status: u16, body: String) -> VisionError {
  if status == 429 || body.contains("rate_limit") {
    VisionError::RateLimited(body)
  } else if status == 401 || body.contains("invalid_api_key") {
    VisionError::InvalidApiKey(body)
  } else {
    VisionError::Api { status, body }
  }
}

#[async_trait]
impl VisionClient for OpenAiVisionClient {
  fn model(&self) -> &str {
    &self.config.model
  }

  async fn complete(
    &self,
    prompt: &str,
    request: &ClassificationRequest,
  ) -> Result<RawModelReply, VisionError> {
    info!(
      "Sending {} byte {} image to {}",
      request.image_bytes.len(),
      request.media_type,
      self.config.model
    );

    let response = self
      .http
      .post(self.endpoint())
      .bearer_auth(&self.config.api_key)
      .json(&self.build_request(prompt, request))
      .send()
      .await
      .map_err(|e| {
        if e.is_timeout() {
          error!("Vision API timeout");
          VisionError::Timeout
        } else {
          if e.is_connect() {
            error!("Failed to connect to vision API");
          }
          VisionError::Http(e)
        }
      })?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      error!("Vision API returned error: {}", status);
      return Err(classify_failure(status.as_u16(), body));
    }

    let completion: ChatCompletionResponse =
      response.json().await.map_err(|e| {
        error!("Failed to parse vision API response");
        VisionError::Http(e)
      })?;

    completion
      .choices
      .into_iter()
      .next()
      .and_then(|choice| choice.message.content)
      .filter(|text| !text.trim().is_empty())
      .map(|text| RawModelReply { text })
      .ok_or(VisionError::EmptyReply)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn failures_are_sorted_by_status_and_code() {
    assert!(matches!(
      classify_failure(429, String::new()),
      VisionError::RateLimited(_)
    ));
    assert!(matches!(
      classify_failure(400, r#"{"error":{"code":"rate_limit_exceeded"}}"#.into()),
      VisionError::RateLimited(_)
    ));
    assert!(matches!(
      classify_failure(401, String::new()),
      VisionError::InvalidApiKey(_)
    ));
    assert!(matches!(
      classify_failure(503, "overloaded".into()),
      VisionError::Api { status: 503, .. }
    ));
  }

  #[test]
  fn data_url_embeds_media_type_and_base64() {
    let request = ClassificationRequest {
      category: Category::Matcha,
      image_bytes: b"abc".to_vec(),
      media_type: "image/png".to_string(),
    };
    assert_eq!(request.data_url(), "data:image/png;base64,YWJj");
  }
}
