use clap::Parser; // for cli
use quiz_gateway::config::Args;
use quiz_gateway::handlers::router;
use quiz_gateway::state::AppState;
use quiz_gateway::upstream::{GeminiClient, Upstream};
use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing(args: &Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    if args.log_json {
        subscriber.json().try_init()
    } else {
        subscriber.compact().try_init()
    }
}

// this is main async function with tokio
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    // parse cli arguments
    let args = Args::parse();
    init_tracing(&args)?;

    let settings = args.gateway_settings();
    let upstream = GeminiClient::new(reqwest::Client::new(), args.gemini_settings());
    if !upstream.is_configured() {
        tracing::warn!("GEMINI_API_KEY is not set, AI endpoints will answer 503");
    }

    // creating shared state
    let state = Arc::new(AppState::new(Arc::new(upstream), settings));
    let app = router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        addr = %addr,
        model = %args.model,
        rate_limit = settings.rate_limit.max_requests,
        rate_window_ms = settings.rate_limit.window.as_millis() as u64,
        chat_timeout_ms = settings.chat_timeout.as_millis() as u64,
        "quiz gateway listening"
    );
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}
