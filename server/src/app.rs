use axum::{
  extract::{
    multipart::{Multipart, MultipartRejection},
    DefaultBodyLimit, State,
  },
  http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri},
  response::IntoResponse,
  routing::{get, post},
  Json, Router,
};
use chrono::Utc;
use performative_ai_classifier::{
  classify, is_image_media_type,
  output::ClassificationResult,
  vision::{ClassificationRequest, VisionClient},
  Category,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::{
  cors::{AllowOrigin, CorsLayer},
  set_header::SetResponseHeaderLayer,
  trace::TraceLayer,
};
use tracing::{error, info};

use crate::error::AnalyzeError;
use crate::rate_limit::{limit, InvalidRateLimit, RateLimitConfig, RateLimiters};

/// Header carrying the category to detect.
pub const MODEL_TYPE_HEADER: &str = "x-model-type";

const GENERAL_LIMIT_MESSAGE: &str =
  "Too many requests from this IP, please try again later.";
const ANALYZE_LIMIT_MESSAGE: &str =
  "Too many analysis requests, please wait before trying again.";

/// Headroom for multipart boundaries and form fields on top of the image.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
  pub max_upload_bytes: usize,
  pub allowed_origins: Vec<String>,
  pub general_limit: RateLimitConfig,
  pub analyze_limit: RateLimitConfig,
  /// Key clients by `X-Forwarded-For` / `X-Real-IP` instead of the peer
  /// address. Only safe behind a proxy that overwrites those headers.
  pub trust_proxy: bool,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      max_upload_bytes: 10 * 1024 * 1024,
      allowed_origins: vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
      ],
      general_limit: RateLimitConfig {
        max_requests: 100,
        window: Duration::from_secs(15 * 60),
      },
      analyze_limit: RateLimitConfig {
        max_requests: 10,
        window: Duration::from_secs(60),
      },
      trust_proxy: false,
    }
  }
}

#[derive(Clone)]
pub struct AppState {
  /// `None` when no API key is configured; analysis then fails with 500.
  pub vision: Option<Arc<dyn VisionClient>>,
  pub max_upload_bytes: usize,
  pub started_at: Instant,
}

impl AppState {
  pub fn new(vision: Option<Arc<dyn VisionClient>>, config: &ServerConfig) -> Self {
    Self {
      vision,
      max_upload_bytes: config.max_upload_bytes,
      started_at: Instant::now(),
    }
  }
}

struct ImageUpload {
  file_name: String,
  media_type: String,
  bytes: Vec<u8>,
}

async fn read_image_field(
  multipart: &mut Multipart,
  max_bytes: usize,
) -> Result<ImageUpload, AnalyzeError> {
  while let Some(field) = multipart
    .next_field()
    .await
    .map_err(|e| AnalyzeError::InvalidUpload(e.body_text()))?
  {
    if field.name() != Some("image") {
      continue;
    }

    let media_type = field.content_type().unwrap_or_default().to_string();
    if !is_image_media_type(&media_type) {
      return Err(AnalyzeError::NotAnImage);
    }
    let file_name = field.file_name().unwrap_or("upload").to_string();

    let bytes = field.bytes().await.map_err(|e| {
      if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AnalyzeError::TooLarge(max_bytes)
      } else {
        AnalyzeError::InvalidUpload(e.body_text())
      }
    })?;

    if bytes.is_empty() {
      return Err(AnalyzeError::NoImage);
    }
    if bytes.len() > max_bytes {
      return Err(AnalyzeError::TooLarge(max_bytes));
    }

    return Ok(ImageUpload {
      file_name,
      media_type,
      bytes: bytes.to_vec(),
    });
  }

  Err(AnalyzeError::NoImage)
}

async fn analyze(
  State(state): State<AppState>,
  headers: HeaderMap,
  multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ClassificationResult>, AnalyzeError> {
  let category = Category::from_selector(
    headers
      .get(MODEL_TYPE_HEADER)
      .and_then(|value| value.to_str().ok()),
  );

  let mut multipart =
    multipart.map_err(|e| AnalyzeError::InvalidUpload(e.body_text()))?;
  let upload = read_image_field(&mut multipart, state.max_upload_bytes).await?;

  let vision = state.vision.as_ref().ok_or_else(|| {
    error!("OPENAI_API_KEY not configured");
    AnalyzeError::NotConfigured
  })?;

  info!(
    "Analyzing image: {} ({} bytes) for {}",
    upload.file_name,
    upload.bytes.len(),
    category
  );

  let request = ClassificationRequest {
    category,
    image_bytes: upload.bytes,
    media_type: upload.media_type,
  };
  let classification = classify(vision.as_ref(), &request).await?;

  Ok(Json(classification))
}

async fn analyze_health(State(state): State<AppState>) -> Json<Value> {
  Json(json!({
    "status": "healthy",
    "openai_configured": state.vision.is_some(),
    "timestamp": Utc::now().to_rfc3339(),
  }))
}

async fn health_check(State(state): State<AppState>) -> Json<Value> {
  Json(json!({
    "status": "healthy",
    "timestamp": Utc::now().to_rfc3339(),
    "uptime": state.started_at.elapsed().as_secs_f64(),
  }))
}

async fn index() -> Json<Value> {
  Json(json!({
    "message": "Performative.AI Backend API",
    "version": env!("CARGO_PKG_VERSION"),
    "endpoints": {
      "health": "/health",
      "analyze": "/api/analyze",
    },
    "categories": Category::all().map(|c| c.to_string()).collect::<Vec<_>>(),
  }))
}

async fn not_found(uri: Uri) -> impl IntoResponse {
  (
    StatusCode::NOT_FOUND,
    Json(json!({
      "error": "Endpoint not found",
      "path": uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/"),
    })),
  )
}

/// Exact origins, or `scheme://*.suffix` patterns matching any subdomain.
pub fn origin_allowed(allowed: &[String], origin: &str) -> bool {
  allowed.iter().any(|pattern| match pattern.split_once('*') {
    Some((prefix, suffix)) => {
      origin.len() > prefix.len() + suffix.len()
        && origin.starts_with(prefix)
        && origin.ends_with(suffix)
    }
    None => pattern == origin,
  })
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
  let allowed = allowed_origins.to_vec();
  CorsLayer::new()
    .allow_origin(AllowOrigin::predicate(
      move |origin: &HeaderValue, _parts: &Parts| {
        origin
          .to_str()
          .map(|origin| origin_allowed(&allowed, origin))
          .unwrap_or(false)
      },
    ))
    .allow_credentials(true)
    .allow_methods([
      Method::GET,
      Method::POST,
      Method::PUT,
      Method::DELETE,
      Method::OPTIONS,
    ])
    .allow_headers([
      header::CONTENT_TYPE,
      header::AUTHORIZATION,
      HeaderName::from_static(MODEL_TYPE_HEADER),
    ])
}

/// Assemble the API. The returned limiters should be pruned periodically.
pub fn build_router(
  state: AppState,
  config: &ServerConfig,
) -> Result<(Router, RateLimiters), InvalidRateLimit> {
  let mut limiters = RateLimiters::default();

  let analyze_routes = Router::new()
    .route("/", post(analyze))
    .route("/health", get(analyze_health))
    .layer(DefaultBodyLimit::max(
      config
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES),
    ));
  let analyze_routes = limit(
    analyze_routes,
    config.analyze_limit,
    ANALYZE_LIMIT_MESSAGE,
    config.trust_proxy,
    &mut limiters,
  )?;

  let routes = Router::new()
    .route("/", get(index))
    .route("/health", get(health_check))
    .nest("/api/analyze", analyze_routes)
    .fallback(not_found);
  let routes = limit(
    routes,
    config.general_limit,
    GENERAL_LIMIT_MESSAGE,
    config.trust_proxy,
    &mut limiters,
  )?;

  let router = routes
    .layer(cors_layer(&config.allowed_origins))
    .layer(SetResponseHeaderLayer::if_not_present(
      header::X_CONTENT_TYPE_OPTIONS,
      HeaderValue::from_static("nosniff"),
    ))
    .layer(SetResponseHeaderLayer::if_not_present(
      header::X_FRAME_OPTIONS,
      HeaderValue::from_static("SAMEORIGIN"),
    ))
    .layer(SetResponseHeaderLayer::if_not_present(
      header::REFERRER_POLICY,
      HeaderValue::from_static("no-referrer"),
    ))
    .layer(TraceLayer::new_for_http())
    .with_state(state);

  Ok((router, limiters))
}
