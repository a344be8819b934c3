//! Disaster Feeds
//!
//! Adapters over public disaster-event feeds. Each adapter issues its
//! outbound query and normalizes the feed's native JSON into
//! [`EventRecord`]s. Adapters never decide relevance; that is the
//! verifier's job.
//!
//! | Feed | Query | Auth |
//! |------|-------|------|
//! | NASA EONET | open events inside the India bounding box | none |
//! | ReliefWeb | latest disasters for country 119 (India), one detail call per item | none |
//! | NDMA | reports near the claim location | bearer key |
//! | IMD | agricultural weather alerts near the claim location | bearer key |

use async_trait::async_trait;
use claim_geo::Coordinate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod config;
pub mod dump;
pub mod eonet;
pub mod india;
pub mod reliefweb;

pub use config::{build_feeds, FeedsConfig};
pub use eonet::{EonetConfig, EonetFeed};
pub use india::{ImdFeed, KeyedFeedConfig, NdmaFeed};
pub use reliefweb::{ReliefWebConfig, ReliefWebFeed};

/// Origin of an event record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedSource {
    #[serde(rename = "NASA EONET")]
    NasaEonet,
    #[serde(rename = "ReliefWeb")]
    ReliefWeb,
    #[serde(rename = "NDMA")]
    Ndma,
    #[serde(rename = "IMD")]
    Imd,
}

impl FeedSource {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NasaEonet => "NASA EONET",
            Self::ReliefWeb => "ReliefWeb",
            Self::Ndma => "NDMA",
            Self::Imd => "IMD",
        }
    }

    /// File-name friendly identifier
    pub fn slug(&self) -> &'static str {
        match self {
            Self::NasaEonet => "nasa_eonet",
            Self::ReliefWeb => "reliefweb",
            Self::Ndma => "ndma",
            Self::Imd => "imd",
        }
    }
}

impl std::fmt::Display for FeedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A disaster event normalized from any feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub source: FeedSource,
    /// Feed category or disaster type
    #[serde(rename = "type")]
    pub category: String,
    pub title: String,
    /// Feed-reported ISO-8601 date-time, kept verbatim
    #[serde(rename = "date")]
    pub occurred_at: Option<String>,
    pub coordinates: Option<Coordinate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// What the verifier is looking for
#[derive(Debug, Clone, PartialEq)]
pub struct FeedQuery {
    pub coordinate: Coordinate,
    pub date: Option<String>,
    pub radius_km: f64,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedError {
    #[error("Request failed: {0}")]
    Transport(String),
    #[error("{feed} returned status: {status}")]
    Status { feed: FeedSource, status: u16 },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl FeedError {
    /// Whether trying again later could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Parse(_) | Self::Client(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;

/// One public disaster feed.
///
/// `Ok(vec![])` means the feed answered and had nothing; every failure is
/// an `Err` so callers can tell the two apart.
#[async_trait]
pub trait DisasterFeed: Send + Sync {
    fn source(&self) -> FeedSource;

    async fn fetch(&self, query: &FeedQuery) -> Result<Vec<EventRecord>>;
}

/// Send a request and decode a JSON body, classifying failures
pub(crate) async fn send_json<T: DeserializeOwned>(
    feed: FeedSource,
    request: reqwest::RequestBuilder,
) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| FeedError::Transport(e.to_string()))?;

    if !response.status().is_success() {
        return Err(FeedError::Status {
            feed,
            status: response.status().as_u16(),
        });
    }

    response
        .json()
        .await
        .map_err(|e| FeedError::Parse(e.to_string()))
}

/// Build an HTTP client with the given timeout
pub(crate) fn http_client(timeout_sec: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_sec))
        .build()
        .map_err(|e| FeedError::Client(e.to_string()))
}

/// `[lon, lat]` GeoJSON point to a coordinate
pub(crate) fn point_from_lon_lat(value: &serde_json::Value) -> Option<Coordinate> {
    let pair = value.as_array()?;
    if pair.len() < 2 {
        return None;
    }
    let lon = pair[0].as_f64()?;
    let lat = pair[1].as_f64()?;
    Coordinate::new(lat, lon).ok()
}
