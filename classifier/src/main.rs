use clap::Parser;
use performative_ai_classifier::{
  classify,
  cli_args::CliArgs,
  compute_prompt_hash,
  error::ClassifierError,
  media_type_for_path,
  output::{
    ClassificationMetadata, ClassificationOutput, ErrorInfo, ErrorOutput,
    PartialMetadata,
  },
  vision::{ClassificationRequest, OpenAiVisionClient},
  Category,
};
use tracing::{error, info};

#[tokio::main]
async fn main() {
  performative_ai_common::logging::init_logging();

  let args = CliArgs::parse();

  info!("Starting Performative.AI Classifier");
  info!("Image: {:?}", args.image);
  info!("Category: {}", args.category);
  info!("Model: {}", args.vision.openai_model);
  info!("Output format: {}", args.output);

  // Run classification and always produce output
  let result = run_classification(&args).await;

  match args.output.as_str() {
    "json" => {
      let json = match result {
        Ok(output) => output.to_json().unwrap_or_else(|e| {
          error!("Failed to serialize output: {}", e);
          r#"{"error": "Failed to serialize output"}"#.to_string()
        }),
        Err(error_output) => error_output.to_json().unwrap_or_else(|e| {
          error!("Failed to serialize error output: {}", e);
          r#"{"error": "Failed to serialize error output"}"#.to_string()
        }),
      };
      println!("{}", json);
    }
    _ => match result {
      Ok(output) => {
        let flag = output.category.profile().flag_field;
        println!("Classification Result:");
        println!("  Image: {}", output.image);
        println!("  Category: {}", output.category);
        println!("  {}: {}", flag, output.classification.detected);
        println!("  Confidence: {}", output.classification.confidence);
        println!("  Explanation: {}", output.classification.explanation);
        for (label, value) in output.classification.details.fields() {
          println!("  {}: {}", label, value);
        }
        println!("  Model: {}", output.metadata.model);
        println!("  Prompt Hash: {}", output.metadata.prompt_hash);
      }
      Err(error_output) => {
        eprintln!("Classification Error:");
        eprintln!("  Image: {}", error_output.image);
        eprintln!("  Error Type: {}", error_output.error.error_type);
        eprintln!("  Message: {}", error_output.error.message);
        std::process::exit(1);
      }
    },
  }
}

fn error_output(
  args: &CliArgs,
  err: &ClassifierError,
  metadata: Option<PartialMetadata>,
) -> ErrorOutput {
  ErrorOutput {
    image: args.image.display().to_string(),
    result: "error".to_string(),
    error: ErrorInfo {
      error_type: err.to_error_type(),
      message: err.to_string(),
    },
    metadata,
  }
}

async fn run_classification(
  args: &CliArgs,
) -> Result<ClassificationOutput, ErrorOutput> {
  let category = Category::from_selector(Some(&args.category));
  let prompt_hash = compute_prompt_hash(category.prompt());
  info!("Prompt hash: {}", prompt_hash);

  let partial = || PartialMetadata {
    model: args.vision.openai_model.clone(),
    prompt_hash: prompt_hash.clone(),
  };

  let media_type = match args.media_type.clone() {
    Some(media_type) => media_type,
    None => media_type_for_path(&args.image)
      .map(str::to_string)
      .ok_or_else(|| {
        let err = ClassifierError::UnsupportedMediaType(format!(
          "cannot infer media type of {:?}",
          args.image
        ));
        error!("{}", err);
        error_output(args, &err, Some(partial()))
      })?,
  };

  let image_bytes = tokio::fs::read(&args.image).await.map_err(|e| {
    error!("Failed to read image from {:?}: {}", args.image, e);
    error_output(args, &ClassifierError::from(e), Some(partial()))
  })?;

  let config = args.vision.openai_config().ok_or_else(|| {
    error!("OPENAI_API_KEY not configured");
    error_output(args, &ClassifierError::NotConfigured, Some(partial()))
  })?;

  let client = OpenAiVisionClient::new(config).map_err(|e| {
    error!("Failed to build vision client: {}", e);
    error_output(args, &ClassifierError::from(e), Some(partial()))
  })?;

  let request = ClassificationRequest {
    category,
    image_bytes,
    media_type: media_type.clone(),
  };

  let classification = classify(&client, &request).await.map_err(|e| {
    error!("Failed to classify: {}", e);
    error_output(args, &e, Some(partial()))
  })?;

  Ok(ClassificationOutput {
    image: args.image.display().to_string(),
    result: "classified".to_string(),
    category,
    classification,
    metadata: ClassificationMetadata {
      model: args.vision.openai_model.clone(),
      prompt_hash,
      media_type,
    },
  })
}
