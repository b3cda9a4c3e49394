pub mod category;
pub mod cli_args;
pub mod error;
pub mod fallback;
pub mod normalize;
pub mod output;
pub mod vision;

use crate::{
  error::{ClassifierError, VisionError},
  output::ClassificationResult,
  vision::{ClassificationRequest, VisionClient},
};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{error, info};

pub use crate::category::Category;
pub use crate::normalize::normalize;

/// Compute SHA256 hash of prompt content
pub fn compute_prompt_hash(content: &str) -> String {
  let mut hasher = Sha256::new();
  hasher.update(content.as_bytes());
  format!("sha256:{}", hex::encode(hasher.finalize()))
}

pub fn is_image_media_type(media_type: &str) -> bool {
  media_type.trim().to_ascii_lowercase().starts_with("image/")
}

/// Guess an image media type from a file extension.
pub fn media_type_for_path(path: &Path) -> Option<&'static str> {
  let extension = path.extension()?.to_str()?.to_ascii_lowercase();
  match extension.as_str() {
    "png" => Some("image/png"),
    "jpg" | "jpeg" => Some("image/jpeg"),
    "gif" => Some("image/gif"),
    "webp" => Some("image/webp"),
    "heic" => Some("image/heic"),
    "bmp" => Some("image/bmp"),
    _ => None,
  }
}

/// Ask the vision model about one image and normalize whatever it says.
///
/// Errors only come from before normalization: a non-image media type, the
/// upstream call itself, or an empty reply.
pub async fn classify(
  client: &dyn VisionClient,
  request: &ClassificationRequest,
) -> Result<ClassificationResult, ClassifierError> {
  if !is_image_media_type(&request.media_type) {
    return Err(ClassifierError::UnsupportedMediaType(
      request.media_type.clone(),
    ));
  }

  info!(
    "Classifying image as {} with {}",
    request.category,
    client.model()
  );

  let reply = client.complete(request.category.prompt(), request).await?;
  if reply.text.trim().is_empty() {
    error!("Vision model returned an empty reply");
    return Err(VisionError::EmptyReply.into());
  }

  info!("LLM response: {}", reply.text);

  let classification = normalize(request.category, &reply.text);

  info!(
    "Classification complete: category={}, detected={}, confidence={}",
    request.category, classification.detected, classification.confidence
  );

  Ok(classification)
}
