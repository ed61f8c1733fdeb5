use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::models::location::GeoPoint;
use crate::providers::{ProviderError, Route, RoutePlanner};

/// Routing adapter for an OSRM-compatible HTTP API.
pub struct OsrmRouter {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct RouteResponse {
    code: String,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    distance: f64, // meters
    geometry: Geometry,
}

#[derive(Deserialize)]
struct Geometry {
    coordinates: Vec<[f64; 2]>, // [lng, lat] pairs
}

impl OsrmRouter {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RoutePlanner for OsrmRouter {
    async fn route(
        &self,
        origin: &GeoPoint,
        destination: &GeoPoint,
    ) -> Result<Route, ProviderError> {
        let url = format!(
            "{}/route/v1/driving/{},{};{},{}",
            self.base_url, origin.lng, origin.lat, destination.lng, destination.lat
        );

        let response = self
            .client
            .get(&url)
            .query(&[("overview", "full"), ("geometries", "geojson")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }

        let body: RouteResponse = response.json().await?;
        if body.code != "Ok" {
            return Err(ProviderError::NoRoute);
        }

        let Some(best) = body.routes.into_iter().next() else {
            return Err(ProviderError::NoRoute);
        };

        let points = best
            .geometry
            .coordinates
            .into_iter()
            .map(|[lng, lat]| GeoPoint { lat, lng })
            .collect();

        Ok(Route {
            points,
            distance_km: best.distance / 1000.0,
        })
    }
}
