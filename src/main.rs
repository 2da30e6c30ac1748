use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use bookme::config::AppConfig;
use bookme::handlers;
use bookme::services::api::http::HttpBookingApi;
use bookme::services::platform::UserAgentDetector;
use bookme::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();
    tracing::info!(
        api = %config.api_base_url,
        timeout_secs = config.fetch_timeout.as_secs(),
        phone_policy = config.phone_policy.as_str(),
        country_code = %config.country_code,
        "booking backend configured"
    );

    let api = HttpBookingApi::new(config.api_base_url.clone(), config.fetch_timeout)?;
    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::new(api),
        Box::new(UserAgentDetector),
    ));

    let app = handlers::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
