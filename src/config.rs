use std::env;

use crate::error::TrackError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub event_buffer_size: usize,
    pub geocoder_base_url: String,
    pub router_base_url: String,
    pub provider_timeout_ms: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, TrackError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", 1024)?,
            geocoder_base_url: env::var("GEOCODER_BASE_URL")
                .unwrap_or_else(|_| "https://nominatim.openstreetmap.org".to_string()),
            router_base_url: env::var("ROUTER_BASE_URL")
                .unwrap_or_else(|_| "https://router.project-osrm.org".to_string()),
            provider_timeout_ms: parse_or_default("PROVIDER_TIMEOUT_MS", 5_000)?,
        })
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, TrackError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| TrackError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
