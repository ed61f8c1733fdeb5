mod api;
mod config;
mod engine;
mod error;
mod geo;
mod models;
mod observability;
mod providers;
mod state;
mod stores;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use crate::providers::nominatim::NominatimGeocoder;
use crate::providers::osrm::OsrmRouter;

#[tokio::main]
async fn main() -> Result<(), error::TrackError> {
    let config = config::Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let timeout = Duration::from_millis(config.provider_timeout_ms);
    let geocoder = NominatimGeocoder::new(&config.geocoder_base_url, timeout)
        .map_err(|err| error::TrackError::Internal(format!("geocoder init failed: {err}")))?;
    let router = OsrmRouter::new(&config.router_base_url, timeout)
        .map_err(|err| error::TrackError::Internal(format!("router init failed: {err}")))?;

    let shared_state = Arc::new(state::AppState::new(
        Arc::new(geocoder),
        Arc::new(router),
        config.event_buffer_size,
    ));

    let app = api::rest::router(shared_state);

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| error::TrackError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| error::TrackError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
