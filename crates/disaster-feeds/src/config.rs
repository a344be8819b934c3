//! Feed configuration and construction
//!
//! Feeds are always built in the same order (EONET, ReliefWeb, NDMA, IMD);
//! verification reports list matches in this order.

use crate::india::{ImdFeed, KeyedFeedConfig, NdmaFeed};
use crate::{DisasterFeed, EonetConfig, EonetFeed, ReliefWebConfig, ReliefWebFeed, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedsConfig {
    /// Request timeout in seconds
    pub timeout_sec: u64,
    /// Dump raw feed payloads here when set
    pub debug_dump_dir: Option<PathBuf>,
    pub eonet: EonetConfig,
    pub reliefweb: ReliefWebConfig,
    /// Enabled when present
    pub ndma: Option<KeyedFeedConfig>,
    /// Enabled when present
    pub imd: Option<KeyedFeedConfig>,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            timeout_sec: 20,
            debug_dump_dir: None,
            eonet: EonetConfig::default(),
            reliefweb: ReliefWebConfig::default(),
            ndma: None,
            imd: None,
        }
    }
}

/// Build the configured feeds in declaration order
pub fn build_feeds(config: &FeedsConfig) -> Result<Vec<Arc<dyn DisasterFeed>>> {
    let mut feeds: Vec<Arc<dyn DisasterFeed>> = vec![
        Arc::new(EonetFeed::new(
            config.eonet.clone(),
            config.timeout_sec,
            config.debug_dump_dir.clone(),
        )?),
        Arc::new(ReliefWebFeed::new(
            config.reliefweb.clone(),
            config.timeout_sec,
            config.debug_dump_dir.clone(),
        )?),
    ];

    if let Some(ndma) = &config.ndma {
        feeds.push(Arc::new(NdmaFeed::new(ndma.clone(), config.timeout_sec)?));
    }
    if let Some(imd) = &config.imd {
        feeds.push(Arc::new(ImdFeed::new(imd.clone(), config.timeout_sec)?));
    }

    let names: Vec<&str> = feeds.iter().map(|f| f.source().name()).collect();
    info!(feeds = ?names, "Disaster feeds configured");

    Ok(feeds)
}
