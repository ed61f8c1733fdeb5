pub mod nominatim;
pub mod osrm;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::models::location::GeoPoint;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("no route between points")]
    NoRoute,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeocodedPlace {
    pub point: GeoPoint,
    pub formatted_address: String,
}

/// A resolved road route: ordered polyline plus total driving distance.
#[derive(Debug, Clone, Serialize)]
pub struct Route {
    pub points: Vec<GeoPoint>,
    pub distance_km: f64,
}

/// What the map layer gets to draw. `Unavailable` tells it to fall back to a
/// straight line between current and destination.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RouteOutcome {
    Resolved { route: Route },
    Unavailable,
}

impl RouteOutcome {
    pub fn distance_km(&self) -> Option<f64> {
        match self {
            RouteOutcome::Resolved { route } => Some(route.distance_km),
            RouteOutcome::Unavailable => None,
        }
    }
}

/// Address/coordinate translation. `Ok(None)` means the provider answered but
/// had no match, distinct from a transport failure.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn forward(&self, address: &str) -> Result<Option<GeocodedPlace>, ProviderError>;

    async fn reverse(&self, point: &GeoPoint) -> Result<Option<String>, ProviderError>;
}

/// Road-route resolution between two coordinate pairs.
#[async_trait]
pub trait RoutePlanner: Send + Sync {
    async fn route(
        &self,
        origin: &GeoPoint,
        destination: &GeoPoint,
    ) -> Result<Route, ProviderError>;
}
