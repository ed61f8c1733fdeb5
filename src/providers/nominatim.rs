use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::models::location::GeoPoint;
use crate::providers::{GeocodedPlace, Geocoder, ProviderError};

const USER_AGENT: &str = concat!("parcel-trace/", env!("CARGO_PKG_VERSION"));

/// Geocoding adapter for a Nominatim-compatible HTTP API.
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
    display_name: String,
}

#[derive(Deserialize)]
struct ReverseHit {
    display_name: Option<String>,
    error: Option<String>,
}

impl NominatimGeocoder {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn forward(&self, address: &str) -> Result<Option<GeocodedPlace>, ProviderError> {
        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }

        let hits: Vec<SearchHit> = response.json().await?;
        let Some(hit) = hits.into_iter().next() else {
            debug!(address, "forward geocode had no match");
            return Ok(None);
        };

        let point = GeoPoint {
            lat: hit
                .lat
                .parse()
                .map_err(|_| ProviderError::Malformed(format!("bad latitude: {}", hit.lat)))?,
            lng: hit
                .lon
                .parse()
                .map_err(|_| ProviderError::Malformed(format!("bad longitude: {}", hit.lon)))?,
        };

        if !point.is_valid() {
            return Err(ProviderError::Malformed(format!(
                "coordinates out of range: {}, {}",
                point.lat, point.lng
            )));
        }

        Ok(Some(GeocodedPlace {
            point,
            formatted_address: hit.display_name,
        }))
    }

    async fn reverse(&self, point: &GeoPoint) -> Result<Option<String>, ProviderError> {
        let url = format!("{}/reverse", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("format", "json".to_string()),
                ("lat", point.lat.to_string()),
                ("lon", point.lng.to_string()),
                ("zoom", "18".to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProviderError::Status(response.status().as_u16()));
        }

        let hit: ReverseHit = response.json().await?;
        if hit.error.is_some() {
            debug!(lat = point.lat, lng = point.lng, "reverse geocode had no match");
            return Ok(None);
        }

        Ok(hit.display_name)
    }
}
