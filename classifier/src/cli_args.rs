use clap::{Args, Parser};
use std::path::PathBuf;
use std::time::Duration;

use crate::vision::OpenAiConfig;

/// Connection settings for the upstream vision model, shared by the CLI and
/// the server.
#[derive(Args, Debug, Clone)]
pub struct VisionArgs {
  /// API key for the OpenAI-compatible vision endpoint.
  #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
  pub openai_api_key: Option<String>,

  /// Base URL of the OpenAI-compatible API.
  #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
  pub openai_base_url: String,

  /// Vision model to use.
  #[arg(long, env = "OPENAI_MODEL", default_value = "gpt-4o")]
  pub openai_model: String,

  /// Upper bound on tokens in the model reply.
  #[arg(long, env = "OPENAI_MAX_TOKENS", default_value = "500")]
  pub openai_max_tokens: u32,

  /// Upstream request timeout in seconds.
  #[arg(long, env = "OPENAI_TIMEOUT_SEC", default_value = "60")]
  pub openai_timeout_sec: u64,
}

impl VisionArgs {
  /// Client configuration, or `None` when no API key was supplied.
  pub fn openai_config(&self) -> Option<OpenAiConfig> {
    let api_key = self
      .openai_api_key
      .as_deref()
      .map(str::trim)
      .filter(|key| !key.is_empty())?;
    Some(OpenAiConfig {
      api_key: api_key.to_string(),
      base_url: self.openai_base_url.clone(),
      model: self.openai_model.clone(),
      max_tokens: self.openai_max_tokens,
      timeout: Duration::from_secs(self.openai_timeout_sec),
    })
  }
}

#[derive(Parser, Debug)]
#[command(
  name = "performative-ai-classifier",
  version,
  about = "Classify a single image with a vision LLM"
)]
pub struct CliArgs {
  /// Image file to classify.
  #[arg(long, env = "IMAGE")]
  pub image: PathBuf,

  /// Category to detect (matcha, labubu, tote, performative).
  #[arg(long, env = "CATEGORY", default_value = "matcha")]
  pub category: String,

  /// Media type of the image. Inferred from the file extension if omitted.
  #[arg(long, env = "MEDIA_TYPE")]
  pub media_type: Option<String>,

  #[command(flatten)]
  pub vision: VisionArgs,

  /// Output format (json or human-readable).
  #[arg(long, env = "OUTPUT", default_value = "human")]
  pub output: String,
}
