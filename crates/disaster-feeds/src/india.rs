//! Indian government feeds: NDMA disaster reports and IMD weather alerts
//!
//! Both endpoints take the claim location and date directly and require a
//! bearer key. They are only enabled when a key is configured.

use crate::{send_json, DisasterFeed, EventRecord, FeedQuery, FeedSource, Result, http_client};
use async_trait::async_trait;
use claim_geo::Coordinate;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const NDMA_URL: &str = "https://nidm.gov.in/api/disaster-reports";
pub const IMD_URL: &str = "https://mausam.imd.gov.in/api/disaster-alerts";

/// IMD alert types that matter for crop insurance
pub const AGRICULTURAL_DISASTER_TYPES: [&str; 7] = [
    "drought",
    "flood",
    "heavy_rainfall",
    "hailstorm",
    "cyclone",
    "extreme_temperature",
    "landslide",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyedFeedConfig {
    pub url: String,
    pub api_key: String,
}

/// Report shape shared by NDMA `disasters[]` and IMD `alerts[]`
#[derive(Debug, Deserialize)]
struct IndiaReport {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(alias = "name", alias = "headline")]
    title: Option<String>,
    #[serde(alias = "issued_at")]
    date: Option<String>,
    #[serde(alias = "lat")]
    latitude: Option<f64>,
    #[serde(alias = "lon")]
    longitude: Option<f64>,
    #[serde(alias = "url")]
    link: Option<String>,
}

impl IndiaReport {
    fn into_record(self, source: FeedSource) -> EventRecord {
        let coordinates = match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Coordinate::new(lat, lon).ok(),
            _ => None,
        };
        EventRecord {
            source,
            category: self.kind.unwrap_or_else(|| "Unknown".to_string()),
            title: self.title.unwrap_or_else(|| "Unnamed Event".to_string()),
            occurred_at: self.date,
            coordinates,
            link: self.link,
        }
    }
}

#[derive(Debug, Deserialize)]
struct NdmaResponse {
    #[serde(default)]
    disasters: Vec<IndiaReport>,
}

#[derive(Debug, Deserialize)]
struct ImdResponse {
    #[serde(default)]
    alerts: Vec<IndiaReport>,
}

/// National Disaster Management Authority reports
pub struct NdmaFeed {
    client: reqwest::Client,
    config: KeyedFeedConfig,
}

impl NdmaFeed {
    pub fn new(config: KeyedFeedConfig, timeout_sec: u64) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout_sec)?,
            config,
        })
    }
}

#[async_trait]
impl DisasterFeed for NdmaFeed {
    fn source(&self) -> FeedSource {
        FeedSource::Ndma
    }

    async fn fetch(&self, query: &FeedQuery) -> Result<Vec<EventRecord>> {
        let request = self
            .client
            .get(&self.config.url)
            .bearer_auth(&self.config.api_key)
            .query(&[
                ("latitude", query.coordinate.latitude.to_string()),
                ("longitude", query.coordinate.longitude.to_string()),
                ("date", query.date.clone().unwrap_or_default()),
                ("radius", query.radius_km.to_string()),
            ]);

        let body: NdmaResponse = send_json(FeedSource::Ndma, request).await?;
        debug!(count = body.disasters.len(), "NDMA reports received");

        Ok(body
            .disasters
            .into_iter()
            .map(|r| r.into_record(FeedSource::Ndma))
            .collect())
    }
}

/// India Meteorological Department alerts
pub struct ImdFeed {
    client: reqwest::Client,
    config: KeyedFeedConfig,
}

impl ImdFeed {
    pub fn new(config: KeyedFeedConfig, timeout_sec: u64) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout_sec)?,
            config,
        })
    }
}

#[async_trait]
impl DisasterFeed for ImdFeed {
    fn source(&self) -> FeedSource {
        FeedSource::Imd
    }

    async fn fetch(&self, query: &FeedQuery) -> Result<Vec<EventRecord>> {
        let request = self
            .client
            .get(&self.config.url)
            .bearer_auth(&self.config.api_key)
            .query(&[
                ("lat", query.coordinate.latitude.to_string()),
                ("lon", query.coordinate.longitude.to_string()),
                ("date", query.date.clone().unwrap_or_default()),
                ("radius", query.radius_km.to_string()),
            ]);

        let body: ImdResponse = send_json(FeedSource::Imd, request).await?;
        debug!(count = body.alerts.len(), "IMD alerts received");

        Ok(agricultural_alerts(body.alerts))
    }
}

fn agricultural_alerts(alerts: Vec<IndiaReport>) -> Vec<EventRecord> {
    alerts
        .into_iter()
        .filter(|a| {
            a.kind
                .as_deref()
                .is_some_and(|k| AGRICULTURAL_DISASTER_TYPES.contains(&k))
        })
        .map(|a| a.into_record(FeedSource::Imd))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ndma_report_aliases() {
        let body: NdmaResponse = serde_json::from_value(json!({
            "disasters": [{
                "type": "flood",
                "name": "Pune district flooding",
                "date": "2024-07-25",
                "lat": 18.52,
                "lon": 73.85
            }]
        }))
        .unwrap();

        let record = body.disasters.into_iter().next().unwrap().into_record(FeedSource::Ndma);
        assert_eq!(record.category, "flood");
        assert_eq!(record.title, "Pune district flooding");
        assert_eq!(record.occurred_at.as_deref(), Some("2024-07-25"));
        assert!(record.coordinates.is_some());
    }

    #[test]
    fn test_imd_keeps_only_agricultural_alerts() {
        let body: ImdResponse = serde_json::from_value(json!({
            "alerts": [
                { "type": "hailstorm", "headline": "Hailstorm warning", "latitude": 20.0, "longitude": 75.0 },
                { "type": "fog", "headline": "Dense fog" },
                { "headline": "Untyped" }
            ]
        }))
        .unwrap();

        let records = agricultural_alerts(body.alerts);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].category, "hailstorm");
        assert_eq!(records[0].source, FeedSource::Imd);
    }

    #[test]
    fn test_missing_list_means_no_reports() {
        let body: NdmaResponse = serde_json::from_value(json!({ "status": "ok" })).unwrap();
        assert!(body.disasters.is_empty());
    }
}
