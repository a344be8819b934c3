//! NASA Earth Observatory Natural Event Tracker (EONET v3)
//!
//! API: https://eonet.gsfc.nasa.gov/api/v3/events
//!
//! The query is a fixed bounding box, not the claim location; relevance
//! filtering happens downstream.

use crate::{
    dump, http_client, point_from_lon_lat, send_json, DisasterFeed, EventRecord, FeedError,
    FeedQuery, FeedSource, Result,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

pub const EONET_URL: &str = "https://eonet.gsfc.nasa.gov/api/v3/events";

/// India's bounding box: min lon, min lat, max lon, max lat
pub const INDIA_BBOX: &str = "68.1766451,6.4546608,97.4025614,37.6173922";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EonetConfig {
    pub url: String,
    /// `open`, `closed` or `all`
    pub status: String,
    pub bbox: String,
}

impl Default for EonetConfig {
    fn default() -> Self {
        Self {
            url: EONET_URL.to_string(),
            status: "open".to_string(),
            bbox: INDIA_BBOX.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EonetResponse {
    #[serde(default)]
    events: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct EonetEvent {
    title: Option<String>,
    #[serde(default)]
    categories: Vec<EonetCategory>,
    #[serde(default)]
    sources: Vec<EonetSource>,
    #[serde(default)]
    geometry: Vec<EonetGeometry>,
}

#[derive(Debug, Deserialize)]
struct EonetCategory {
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EonetSource {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EonetGeometry {
    date: Option<String>,
    #[serde(default)]
    coordinates: serde_json::Value,
}

pub struct EonetFeed {
    client: reqwest::Client,
    config: EonetConfig,
    dump_dir: Option<PathBuf>,
}

impl EonetFeed {
    pub fn new(config: EonetConfig, timeout_sec: u64, dump_dir: Option<PathBuf>) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout_sec)?,
            config,
            dump_dir,
        })
    }
}

#[async_trait]
impl DisasterFeed for EonetFeed {
    fn source(&self) -> FeedSource {
        FeedSource::NasaEonet
    }

    async fn fetch(&self, _query: &FeedQuery) -> Result<Vec<EventRecord>> {
        let request = self.client.get(&self.config.url).query(&[
            ("status", self.config.status.as_str()),
            ("bbox", self.config.bbox.as_str()),
        ]);

        let body: EonetResponse = send_json(FeedSource::NasaEonet, request).await?;
        debug!(count = body.events.len(), "EONET events received");

        dump::write_raw(self.dump_dir.as_deref(), FeedSource::NasaEonet, &body.events);

        body.events.iter().map(record_from_event).collect()
    }
}

/// Normalize one raw EONET event. The first geometry entry supplies the
/// event's date and position; only `[lon, lat]` points carry coordinates.
pub fn record_from_event(raw: &serde_json::Value) -> Result<EventRecord> {
    let event: EonetEvent =
        serde_json::from_value(raw.clone()).map_err(|e| FeedError::Parse(e.to_string()))?;

    let first_geometry = event.geometry.first();

    Ok(EventRecord {
        source: FeedSource::NasaEonet,
        category: event
            .categories
            .first()
            .and_then(|c| c.title.clone())
            .unwrap_or_else(|| "Unknown".to_string()),
        title: event.title.unwrap_or_else(|| "Unnamed Event".to_string()),
        occurred_at: first_geometry.and_then(|g| g.date.clone()),
        coordinates: first_geometry.and_then(|g| point_from_lon_lat(&g.coordinates)),
        link: event
            .sources
            .first()
            .and_then(|s| s.url.as_deref())
            .map(|url| url.replace("amp;", "")),
    })
}
