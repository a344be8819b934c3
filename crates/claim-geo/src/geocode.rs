//! Reverse geocoding for claim locations
//!
//! Uses OpenStreetMap Nominatim (free, no API key). The lookup is
//! informational only: failures come back as a readable string, never as
//! an error.

use crate::Coordinate;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

const USER_AGENT: &str = concat!("claim-geo/", env!("CARGO_PKG_VERSION"));

/// Coordinates to a human-readable place name
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn location_name(&self, coordinate: Coordinate) -> String;
}

#[derive(Debug, Deserialize)]
struct NominatimReverse {
    display_name: Option<String>,
}

/// Nominatim reverse geocoding client
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: NOMINATIM_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    async fn lookup(&self, coordinate: Coordinate) -> Result<Option<String>, reqwest::Error> {
        let url = format!("{}/reverse", self.base_url);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .query(&[
                ("format", "jsonv2".to_string()),
                ("lat", format!("{:.6}", coordinate.latitude)),
                ("lon", format!("{:.6}", coordinate.longitude)),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body: NominatimReverse = response.json().await?;
        Ok(body.display_name)
    }
}

impl Default for NominatimGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn location_name(&self, coordinate: Coordinate) -> String {
        match self.lookup(coordinate).await {
            Ok(Some(name)) => name,
            Ok(None) => "Location not found".to_string(),
            Err(e) => {
                warn!(%coordinate, "Reverse geocoding failed: {}", e);
                format!("Error: {}", e)
            }
        }
    }
}

/// Google Maps link for a coordinate
pub fn google_maps_link(coordinate: Coordinate) -> String {
    format!(
        "https://www.google.com/maps?q={},{}",
        coordinate.latitude, coordinate.longitude
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_google_maps_link() {
        let c = Coordinate::new(19.076, 72.8777).unwrap();
        assert_eq!(google_maps_link(c), "https://www.google.com/maps?q=19.076,72.8777");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let geocoder = NominatimGeocoder::new().with_base_url("http://localhost:8080/");
        assert_eq!(geocoder.base_url, "http://localhost:8080");
    }

    #[tokio::test]
    async fn test_unreachable_geocoder_reports_error_string() {
        // Port 9 (discard) on localhost is not an HTTP server
        let geocoder = NominatimGeocoder::new().with_base_url("http://127.0.0.1:9");
        let c = Coordinate::new(19.076, 72.8777).unwrap();
        let name = geocoder.location_name(c).await;
        assert!(name.starts_with("Error: "), "got {name}");
    }
}
