use performative_ai_classifier::{
  classify,
  error::{ClassifierError, ClassifierErrorType, VisionError},
  output::CategoryDetails,
  vision::{
    ChatChoice, ChatChoiceMessage, ChatCompletionResponse, ClassificationRequest,
    OpenAiConfig, OpenAiVisionClient, VisionClient,
  },
  Category,
};
use serde_json::json;
use std::time::Duration;
use wiremock::{
  matchers::{body_partial_json, header, method, path},
  Mock, MockServer, ResponseTemplate,
};

/// 1x1 transparent PNG.
const TINY_PNG: &[u8] = &[
  0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49,
  0x48, 0x44, 0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06,
  0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44,
  0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D,
  0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42,
  0x60, 0x82,
];

fn client_for(server: &MockServer) -> OpenAiVisionClient {
  OpenAiVisionClient::new(OpenAiConfig {
    api_key: "test-key".to_string(),
    base_url: format!("{}/v1", server.uri()),
    model: "test-vision-model".to_string(),
    max_tokens: 500,
    timeout: Duration::from_secs(5),
  })
  .expect("client builds")
}

fn request(category: Category) -> ClassificationRequest {
  ClassificationRequest {
    category,
    image_bytes: TINY_PNG.to_vec(),
    media_type: "image/png".to_string(),
  }
}

fn completion(content: &str) -> ChatCompletionResponse {
  ChatCompletionResponse {
    choices: vec![ChatChoice {
      message: ChatChoiceMessage {
        content: Some(content.to_string()),
      },
    }],
  }
}

#[tokio::test]
async fn test_classify_matcha_with_mock_openai() {
  let mock_server = MockServer::start().await;

  let reply = json!({
    "isMatcha": true,
    "confidence": 94,
    "explanation": "A matcha latte with latte art"
  })
  .to_string();

  Mock::given(method("POST"))
    .and(path("/v1/chat/completions"))
    .and(header("authorization", "Bearer test-key"))
    .and(body_partial_json(json!({
      "model": "test-vision-model",
      "max_tokens": 500
    })))
    .respond_with(ResponseTemplate::new(200).set_body_json(completion(&reply)))
    .mount(&mock_server)
    .await;

  let client = client_for(&mock_server);
  let result = classify(&client, &request(Category::Matcha))
    .await
    .expect("Classification should succeed");

  assert!(result.detected);
  assert_eq!(result.confidence, 94.0);
  assert_eq!(result.explanation, "A matcha latte with latte art");
}

#[tokio::test]
async fn test_request_carries_prompt_and_inline_image() {
  let mock_server = MockServer::start().await;

  Mock::given(method("POST"))
    .and(path("/v1/chat/completions"))
    .respond_with(ResponseTemplate::new(200).set_body_json(completion(
      r#"{"isTote": false, "confidence": 12, "explanation": "a backpack"}"#,
    )))
    .mount(&mock_server)
    .await;

  let client = client_for(&mock_server);
  let result = classify(&client, &request(Category::Tote))
    .await
    .expect("Classification should succeed");
  assert!(!result.detected);

  let received = mock_server
    .received_requests()
    .await
    .expect("request recording enabled");
  assert_eq!(received.len(), 1);

  let body: serde_json::Value =
    serde_json::from_slice(&received[0].body).expect("JSON request body");
  let content = &body["messages"][0]["content"];
  assert_eq!(body["messages"][0]["role"], "user");
  assert_eq!(content[0]["type"], "text");
  assert_eq!(content[0]["text"], Category::Tote.prompt());
  assert_eq!(content[1]["type"], "image_url");
  assert_eq!(content[1]["image_url"]["detail"], "high");
  assert!(content[1]["image_url"]["url"]
    .as_str()
    .unwrap()
    .starts_with("data:image/png;base64,iVBORw0KGgo"));
}

#[tokio::test]
async fn test_fenced_performative_reply_is_normalized() {
  let mock_server = MockServer::start().await;

  let reply = "```json\n{\"isPerformative\": true, \"confidence\": 81, \"explanation\": \"Tote and matcha combo\", \"detectedItems\": [\"tote bag\"]}\n```";

  Mock::given(method("POST"))
    .and(path("/v1/chat/completions"))
    .respond_with(ResponseTemplate::new(200).set_body_json(completion(reply)))
    .mount(&mock_server)
    .await;

  let client = client_for(&mock_server);
  let result = classify(&client, &request(Category::Performative))
    .await
    .expect("Classification should succeed");

  assert_eq!(
    result.details,
    CategoryDetails::Performative {
      performative_score: 75.0,
      detected_items: vec!["tote bag".to_string()],
      sigma_level: None,
      tiktok_factor: None,
    }
  );
}

#[tokio::test]
async fn test_rate_limited_upstream() {
  let mock_server = MockServer::start().await;

  Mock::given(method("POST"))
    .and(path("/v1/chat/completions"))
    .respond_with(ResponseTemplate::new(429).set_body_json(json!({
      "error": {"message": "Rate limit reached", "code": "rate_limit_exceeded"}
    })))
    .mount(&mock_server)
    .await;

  let client = client_for(&mock_server);
  let err = classify(&client, &request(Category::Labubu))
    .await
    .expect_err("429 should fail");

  assert!(matches!(
    err,
    ClassifierError::Vision(VisionError::RateLimited(_))
  ));
  assert_eq!(err.to_error_type(), ClassifierErrorType::VisionApiRateLimitError);
}

#[tokio::test]
async fn test_invalid_api_key() {
  let mock_server = MockServer::start().await;

  Mock::given(method("POST"))
    .and(path("/v1/chat/completions"))
    .respond_with(ResponseTemplate::new(401).set_body_json(json!({
      "error": {"message": "Incorrect API key provided", "code": "invalid_api_key"}
    })))
    .mount(&mock_server)
    .await;

  let client = client_for(&mock_server);
  let err = classify(&client, &request(Category::Matcha))
    .await
    .expect_err("401 should fail");

  assert_eq!(err.to_error_type(), ClassifierErrorType::VisionApiAuthError);
}

#[tokio::test]
async fn test_empty_reply_is_an_upstream_failure() {
  let mock_server = MockServer::start().await;

  Mock::given(method("POST"))
    .and(path("/v1/chat/completions"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "choices": [{"message": {"content": null}}]
    })))
    .mount(&mock_server)
    .await;

  let client = client_for(&mock_server);
  let err = client
    .complete(Category::Matcha.prompt(), &request(Category::Matcha))
    .await
    .expect_err("no content should fail");

  assert!(matches!(err, VisionError::EmptyReply));
}

#[tokio::test]
async fn test_upstream_timeout() {
  let mock_server = MockServer::start().await;

  Mock::given(method("POST"))
    .and(path("/v1/chat/completions"))
    .respond_with(
      ResponseTemplate::new(200)
        .set_body_json(completion("{}"))
        .set_delay(Duration::from_secs(3)),
    )
    .mount(&mock_server)
    .await;

  let client = OpenAiVisionClient::new(OpenAiConfig {
    api_key: "test-key".to_string(),
    base_url: format!("{}/v1", mock_server.uri()),
    model: "test-vision-model".to_string(),
    max_tokens: 500,
    timeout: Duration::from_millis(200),
  })
  .expect("client builds");

  let err = classify(&client, &request(Category::Matcha))
    .await
    .expect_err("slow upstream should time out");

  assert_eq!(err.to_error_type(), ClassifierErrorType::VisionApiTimeoutError);
}

#[tokio::test]
async fn test_non_image_media_type_is_rejected_before_upstream() {
  let mock_server = MockServer::start().await;

  Mock::given(method("POST"))
    .respond_with(ResponseTemplate::new(200).set_body_json(completion("{}")))
    .expect(0)
    .mount(&mock_server)
    .await;

  let client = client_for(&mock_server);
  let mut pdf = request(Category::Matcha);
  pdf.media_type = "application/pdf".to_string();

  let err = classify(&client, &pdf).await.expect_err("pdf is not an image");
  assert_eq!(err.to_error_type(), ClassifierErrorType::UnsupportedMediaType);
}
