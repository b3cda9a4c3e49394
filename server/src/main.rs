use clap::Parser;
use performative_ai_classifier::vision::{OpenAiVisionClient, VisionClient};
use performative_ai_server::{
  app::{build_router, AppState, ServerConfig},
  cli_args::CliArgs,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  performative_ai_common::logging::init_logging();

  let args = CliArgs::parse();
  let config = ServerConfig::from(&args);

  info!("Starting Performative.AI Server");
  info!("Model: {}", args.vision.openai_model);
  info!("Allowed origins: {:?}", config.allowed_origins);
  if config.trust_proxy {
    info!("Trusting forwarding headers for client addresses");
  }

  let vision: Option<Arc<dyn VisionClient>> = match args.vision.openai_config() {
    Some(openai) => Some(Arc::new(OpenAiVisionClient::new(openai)?)),
    None => {
      warn!("OPENAI_API_KEY not set; analysis requests will fail");
      None
    }
  };

  let state = AppState::new(vision, &config);
  let (app, limiters) = build_router(state, &config)?;

  tokio::spawn(async move {
    let mut interval = tokio::time::interval(PRUNE_INTERVAL);
    loop {
      interval.tick().await;
      let tracked = limiters.retain_recent();
      debug!("Rate limiter tracking {} clients", tracked);
    }
  });

  // Parse bind address
  let addr: SocketAddr = args
    .bind_address
    .parse()
    .map_err(|e| format!("Invalid bind address: {}", e))?;

  info!("Listening on {}", addr);
  info!("Health check: http://{}/health", addr);

  let listener = tokio::net::TcpListener::bind(addr).await?;
  performative_ai_common::service::notify_ready();
  axum::serve(
    listener,
    app.into_make_service_with_connect_info::<SocketAddr>(),
  )
  .await?;

  Ok(())
}
