//! ReliefWeb disasters API (v1)
//!
//! API: https://api.reliefweb.int/v1/disasters
//!
//! The list call returns summaries with an `href`; each one is fetched
//! individually to get the full `fields` block (type, dates, country
//! location).

use crate::{dump, http_client, send_json, DisasterFeed, EventRecord, FeedError, FeedQuery, FeedSource, Result};
use async_trait::async_trait;
use claim_geo::Coordinate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

pub const RELIEFWEB_URL: &str = "https://api.reliefweb.int/v1/disasters";

/// ReliefWeb country id for India
pub const INDIA_COUNTRY_ID: u32 = 119;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliefWebConfig {
    pub url: String,
    pub country_id: u32,
    pub limit: u32,
    pub preset: String,
    /// Application name sent as `appname`, if any
    pub appname: Option<String>,
}

impl Default for ReliefWebConfig {
    fn default() -> Self {
        Self {
            url: RELIEFWEB_URL.to_string(),
            country_id: INDIA_COUNTRY_ID,
            limit: 3,
            preset: "latest".to_string(),
            appname: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReliefWebList {
    #[serde(default)]
    data: Vec<ReliefWebSummary>,
}

#[derive(Debug, Deserialize)]
struct ReliefWebSummary {
    href: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReliefWebDetail {
    #[serde(default)]
    data: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ReliefWebItem {
    #[serde(default)]
    fields: ReliefWebFields,
}

#[derive(Debug, Default, Deserialize)]
struct ReliefWebFields {
    name: Option<String>,
    #[serde(default, rename = "type")]
    kinds: Vec<Named>,
    #[serde(default)]
    date: ReliefWebDates,
    #[serde(default)]
    country: Vec<ReliefWebCountry>,
    url_alias: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ReliefWebDates {
    created: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReliefWebCountry {
    location: Option<LatLon>,
}

#[derive(Debug, Deserialize)]
struct LatLon {
    lat: Option<f64>,
    lon: Option<f64>,
}

pub struct ReliefWebFeed {
    client: reqwest::Client,
    config: ReliefWebConfig,
    dump_dir: Option<PathBuf>,
}

impl ReliefWebFeed {
    pub fn new(config: ReliefWebConfig, timeout_sec: u64, dump_dir: Option<PathBuf>) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout_sec)?,
            config,
            dump_dir,
        })
    }

    fn list_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("query[value]", format!("country.id:{}", self.config.country_id)),
            ("limit", self.config.limit.to_string()),
            ("preset", self.config.preset.clone()),
        ];
        if let Some(appname) = &self.config.appname {
            params.push(("appname", appname.clone()));
        }
        params
    }

    async fn fetch_detail(&self, href: &str) -> Result<Option<serde_json::Value>> {
        let mut request = self.client.get(href);
        if let Some(appname) = &self.config.appname {
            request = request.query(&[("appname", appname.as_str())]);
        }
        let detail: ReliefWebDetail = send_json(FeedSource::ReliefWeb, request).await?;
        Ok(detail.data.into_iter().next())
    }
}

#[async_trait]
impl DisasterFeed for ReliefWebFeed {
    fn source(&self) -> FeedSource {
        FeedSource::ReliefWeb
    }

    async fn fetch(&self, _query: &FeedQuery) -> Result<Vec<EventRecord>> {
        let request = self.client.get(&self.config.url).query(&self.list_params());
        let list: ReliefWebList = send_json(FeedSource::ReliefWeb, request).await?;
        debug!(count = list.data.len(), "ReliefWeb disasters listed");

        let mut raw_items = Vec::with_capacity(list.data.len());
        for summary in &list.data {
            let Some(href) = summary.href.as_deref() else {
                debug!("ReliefWeb summary without href skipped");
                continue;
            };
            if let Some(item) = self.fetch_detail(href).await? {
                raw_items.push(item);
            }
        }

        dump::write_raw(self.dump_dir.as_deref(), FeedSource::ReliefWeb, &raw_items);

        raw_items.iter().map(record_from_item).collect()
    }
}

/// Normalize one ReliefWeb disaster detail item. Coordinates come from
/// the first country's representative location.
pub fn record_from_item(raw: &serde_json::Value) -> Result<EventRecord> {
    let item: ReliefWebItem =
        serde_json::from_value(raw.clone()).map_err(|e| FeedError::Parse(e.to_string()))?;
    let fields = item.fields;

    let coordinates = fields
        .country
        .first()
        .and_then(|c| c.location.as_ref())
        .and_then(|loc| match (loc.lat, loc.lon) {
            (Some(lat), Some(lon)) => Coordinate::new(lat, lon).ok(),
            _ => None,
        });

    Ok(EventRecord {
        source: FeedSource::ReliefWeb,
        category: fields
            .kinds
            .first()
            .and_then(|t| t.name.clone())
            .unwrap_or_else(|| "Unknown".to_string()),
        title: fields.name.unwrap_or_else(|| "Unnamed Event".to_string()),
        occurred_at: fields.date.created,
        coordinates,
        link: fields.url_alias.filter(|url| !url.is_empty()),
    })
}
