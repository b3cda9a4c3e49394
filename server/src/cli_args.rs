use clap::Parser;
use performative_ai_classifier::cli_args::VisionArgs;
use std::time::Duration;

use crate::app::ServerConfig;
use crate::rate_limit::RateLimitConfig;

#[derive(Parser, Debug)]
#[command(name = "performative-ai-server")]
#[command(about = "Serves image detection backed by a vision LLM")]
pub struct CliArgs {
  /// Address to bind the server to
  #[arg(long, env = "BIND_ADDRESS", default_value = "0.0.0.0:8000")]
  pub bind_address: String,

  #[command(flatten)]
  pub vision: VisionArgs,

  /// Largest accepted image upload, in megabytes
  #[arg(long, env = "MAX_UPLOAD_MB", default_value = "10")]
  pub max_upload_mb: usize,

  /// Origins allowed by CORS. `https://*.example.app` matches any subdomain.
  #[arg(
    long,
    env = "CORS_ALLOWED_ORIGINS",
    value_delimiter = ',',
    default_value = "http://localhost:3000,http://127.0.0.1:3000"
  )]
  pub cors_allowed_origins: Vec<String>,

  /// Requests per client per general window, across all routes
  #[arg(long, env = "RATE_LIMIT_MAX", default_value = "100")]
  pub rate_limit_max: u32,

  /// Length of the general rate limit window, in seconds
  #[arg(long, env = "RATE_LIMIT_WINDOW_SEC", default_value = "900")]
  pub rate_limit_window_sec: u64,

  /// Analysis requests per client per analysis window
  #[arg(long, env = "ANALYZE_RATE_LIMIT_MAX", default_value = "10")]
  pub analyze_rate_limit_max: u32,

  /// Length of the analysis rate limit window, in seconds
  #[arg(long, env = "ANALYZE_RATE_LIMIT_WINDOW_SEC", default_value = "60")]
  pub analyze_rate_limit_window_sec: u64,

  /// Key rate limits on X-Forwarded-For / X-Real-IP. Enable only behind a
  /// reverse proxy that sets those headers itself.
  #[arg(long, env = "TRUST_PROXY")]
  pub trust_proxy: bool,
}

impl From<&CliArgs> for ServerConfig {
  fn from(args: &CliArgs) -> Self {
    ServerConfig {
      max_upload_bytes: args.max_upload_mb.saturating_mul(1024 * 1024),
      allowed_origins: args
        .cors_allowed_origins
        .iter()
        .map(|origin| origin.trim().to_string())
        .filter(|origin| !origin.is_empty())
        .collect(),
      general_limit: RateLimitConfig {
        max_requests: args.rate_limit_max,
        window: Duration::from_secs(args.rate_limit_window_sec),
      },
      analyze_limit: RateLimitConfig {
        max_requests: args.analyze_rate_limit_max,
        window: Duration::from_secs(args.analyze_rate_limit_window_sec),
      },
      trust_proxy: args.trust_proxy,
    }
  }
}
