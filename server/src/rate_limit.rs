//! Per-client request admission.
//!
//! Built on `tower_governor`. A client may burst up to `max_requests`, after
//! which one request is earned back every `window / max_requests`. Clients
//! are keyed by peer address. Forwarding headers are only honoured when the
//! server is told it sits behind a trusted proxy; otherwise any caller could
//! pick a fresh key per request.

use axum::{
  body::Body,
  extract::State,
  http::{header, HeaderValue, StatusCode},
  middleware,
  response::Response,
  Router,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tower_governor::{
  governor::GovernorConfigBuilder,
  key_extractor::{PeerIpKeyExtractor, SmartIpKeyExtractor},
  GovernorLayer,
};
use tracing::warn;

/// Rate limiter configuration
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
  pub max_requests: u32,
  pub window: Duration,
}

impl RateLimitConfig {
  /// Time it takes a client to earn back one request.
  pub fn replenish_period(&self) -> Duration {
    self
      .window
      .checked_div(self.max_requests)
      .unwrap_or(Duration::ZERO)
  }
}

#[derive(Error, Debug)]
#[error("invalid rate limit: {max_requests} requests per {window:?}")]
pub struct InvalidRateLimit {
  pub max_requests: u32,
  pub window: Duration,
}

impl From<RateLimitConfig> for InvalidRateLimit {
  fn from(config: RateLimitConfig) -> Self {
    Self {
      max_requests: config.max_requests,
      window: config.window,
    }
  }
}

type Retain = Arc<dyn Fn() -> usize + Send + Sync>;

/// Handles to every limiter installed on a router, so idle clients can be
/// forgotten periodically.
#[derive(Clone, Default)]
pub struct RateLimiters {
  retainers: Vec<Retain>,
}

impl RateLimiters {
  /// Drop clients whose quota has fully replenished. Returns how many
  /// clients are still tracked across all limiters.
  pub fn retain_recent(&self) -> usize {
    self.retainers.iter().map(|retain| retain()).sum()
  }

  pub fn len(&self) -> usize {
    self.retainers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.retainers.is_empty()
  }
}

/// Wrap `router` in a limiter. Rejections carry `{"error": message}`.
pub fn limit<S>(
  router: Router<S>,
  config: RateLimitConfig,
  message: &'static str,
  trust_proxy: bool,
  limiters: &mut RateLimiters,
) -> Result<Router<S>, InvalidRateLimit>
where
  S: Clone + Send + Sync + 'static,
{
  let period = config.replenish_period();
  if config.max_requests == 0 || period.is_zero() {
    return Err(config.into());
  }

  let router = if trust_proxy {
    let governor = GovernorConfigBuilder::default()
      .period(period)
      .burst_size(config.max_requests)
      .key_extractor(SmartIpKeyExtractor)
      .finish()
      .ok_or(InvalidRateLimit::from(config))?;
    let limiter = governor.limiter().clone();
    limiters.retainers.push(Arc::new(move || {
      limiter.retain_recent();
      limiter.len()
    }));
    router.layer(GovernorLayer {
      config: governor.into(),
    })
  } else {
    let governor = GovernorConfigBuilder::default()
      .period(period)
      .burst_size(config.max_requests)
      .key_extractor(PeerIpKeyExtractor)
      .finish()
      .ok_or(InvalidRateLimit::from(config))?;
    let limiter = governor.limiter().clone();
    limiters.retainers.push(Arc::new(move || {
      limiter.retain_recent();
      limiter.len()
    }));
    router.layer(GovernorLayer {
      config: governor.into(),
    })
  };

  Ok(router.layer(middleware::map_response_with_state(
    message,
    json_rejection,
  )))
}

/// Rewrite the limiter's plain-text 429 into the JSON error shape the rest of
/// the API uses. Responses that are already JSON pass through untouched.
async fn json_rejection(
  State(message): State<&'static str>,
  response: Response,
) -> Response {
  let is_json = response
    .headers()
    .get(header::CONTENT_TYPE)
    .is_some_and(|value| value.as_bytes().starts_with(b"application/json"));
  if response.status() != StatusCode::TOO_MANY_REQUESTS || is_json {
    return response;
  }

  warn!("Rate limit exceeded: {}", message);
  let (mut parts, _) = response.into_parts();
  parts.headers.remove(header::CONTENT_LENGTH);
  parts.headers.insert(
    header::CONTENT_TYPE,
    HeaderValue::from_static("application/json"),
  );
  Response::from_parts(parts, Body::from(json!({ "error": message }).to_string()))
}
