//! Gateway configuration from environment variables (and `.env`)

use anyhow::{bail, Context, Result};
use claim_verification::DEFAULT_RADIUS_KM;
use disaster_feeds::india::{IMD_URL, NDMA_URL};
use disaster_feeds::{FeedsConfig, KeyedFeedConfig};
use std::path::PathBuf;
use std::str::FromStr;

/// One upload field accepted by `/submit-form`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileField {
    pub name: String,
    /// Whether the field may carry more than one file
    pub multiple: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeConfig {
    pub file_fields: Vec<FileField>,
}

impl IntakeConfig {
    /// Evidence photo as a single-file field, plus multi-file `images` and `pdfs`
    pub fn with_evidence_field(evidence_field: &str) -> Self {
        Self {
            file_fields: vec![
                FileField {
                    name: evidence_field.to_string(),
                    multiple: false,
                },
                FileField {
                    name: "images".to_string(),
                    multiple: true,
                },
                FileField {
                    name: "pdfs".to_string(),
                    multiple: true,
                },
            ],
        }
    }

    pub fn field(&self, name: &str) -> Option<&FileField> {
        self.file_fields.iter().find(|f| f.name == name)
    }
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self::with_evidence_field("receiptImage")
    }
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    // Server
    pub port: u16,
    pub max_upload_bytes: usize,

    // Claims
    pub id_field: String,
    pub evidence_field: String,
    pub crop_field: String,
    pub intake: IntakeConfig,

    // Verification
    pub radius_km: f64,
    pub artifact_dir: Option<PathBuf>,
    pub retry_transient: u32,
    pub feeds: FeedsConfig,

    // Analysis
    pub gemini_api_key: Option<String>,

    // Geocoding
    pub nominatim_url: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: 18700,
            max_upload_bytes: 10 * 1024 * 1024,
            id_field: "claimNumber".to_string(),
            evidence_field: "receiptImage".to_string(),
            crop_field: "cropType".to_string(),
            intake: IntakeConfig::default(),
            radius_km: DEFAULT_RADIUS_KM,
            artifact_dir: None,
            retry_transient: 0,
            feeds: FeedsConfig::default(),
            gemini_api_key: None,
            nominatim_url: None,
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, var: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(var) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {var}: {raw:?}")),
        None => Ok(default),
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, var: &str) -> Option<String> {
    lookup(var).filter(|v| !v.trim().is_empty())
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; unset variables take defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let port = match non_empty(&lookup, "CLAIMS_GATEWAY_PORT") {
            Some(_) => parse_or(&lookup, "CLAIMS_GATEWAY_PORT", defaults.port)?,
            None => parse_or(&lookup, "PORT", defaults.port)?,
        };
        let max_upload_mb: usize = parse_or(&lookup, "CLAIMS_MAX_UPLOAD_MB", 10)?;
        let max_upload_bytes = max_upload_mb
            .checked_mul(1024 * 1024)
            .with_context(|| format!("CLAIMS_MAX_UPLOAD_MB too large: {max_upload_mb}"))?;

        let radius_km: f64 = parse_or(&lookup, "CLAIMS_RADIUS_KM", defaults.radius_km)?;
        if !radius_km.is_finite() || radius_km <= 0.0 {
            bail!("CLAIMS_RADIUS_KM must be a positive number of km, got {radius_km}");
        }

        let evidence_field =
            non_empty(&lookup, "CLAIMS_EVIDENCE_FIELD").unwrap_or(defaults.evidence_field);

        let feeds = FeedsConfig {
            timeout_sec: parse_or(&lookup, "FEEDS_TIMEOUT_SEC", defaults.feeds.timeout_sec)?,
            debug_dump_dir: non_empty(&lookup, "FEEDS_DEBUG_DUMP_DIR").map(PathBuf::from),
            ndma: non_empty(&lookup, "NDMA_API_KEY").map(|api_key| KeyedFeedConfig {
                url: NDMA_URL.to_string(),
                api_key,
            }),
            imd: non_empty(&lookup, "IMD_API_KEY").map(|api_key| KeyedFeedConfig {
                url: IMD_URL.to_string(),
                api_key,
            }),
            ..defaults.feeds
        };

        Ok(Self {
            port,
            max_upload_bytes,
            id_field: non_empty(&lookup, "CLAIMS_ID_FIELD").unwrap_or(defaults.id_field),
            crop_field: non_empty(&lookup, "CLAIMS_CROP_FIELD").unwrap_or(defaults.crop_field),
            intake: IntakeConfig::with_evidence_field(&evidence_field),
            evidence_field,
            radius_km,
            artifact_dir: non_empty(&lookup, "CLAIMS_ARTIFACT_DIR").map(PathBuf::from),
            retry_transient: parse_or(&lookup, "FEEDS_RETRY_TRANSIENT", defaults.retry_transient)?,
            feeds,
            gemini_api_key: non_empty(&lookup, "GEMINI_API_KEY")
                .or_else(|| non_empty(&lookup, "GOOGLE_GEMINI_API_KEY")),
            nominatim_url: non_empty(&lookup, "NOMINATIM_URL"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.port, 18700);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.id_field, "claimNumber");
        assert_eq!(config.evidence_field, "receiptImage");
        assert_eq!(config.radius_km, 50.0);
        assert_eq!(config.intake, IntakeConfig::default());
        assert!(config.feeds.ndma.is_none());
        assert!(config.gemini_api_key.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = GatewayConfig::from_lookup(lookup_from(&[
            ("PORT", "9000"),
            ("CLAIMS_GATEWAY_PORT", "18800"),
            ("CLAIMS_RADIUS_KM", "75.5"),
            ("CLAIMS_EVIDENCE_FIELD", "fieldPhoto"),
            ("FEEDS_RETRY_TRANSIENT", "2"),
            ("NDMA_API_KEY", "ndma-secret"),
            ("GOOGLE_GEMINI_API_KEY", "gemini-secret"),
        ]))
        .unwrap();

        assert_eq!(config.port, 18800);
        assert_eq!(config.radius_km, 75.5);
        assert_eq!(config.retry_transient, 2);
        assert_eq!(config.intake.field("fieldPhoto").map(|f| f.multiple), Some(false));
        assert!(config.intake.field("receiptImage").is_none());
        assert_eq!(config.feeds.ndma.unwrap().api_key, "ndma-secret");
        assert!(config.feeds.imd.is_none());
        assert_eq!(config.gemini_api_key.as_deref(), Some("gemini-secret"));
    }

    #[test]
    fn test_port_falls_back_to_port_var() {
        let config = GatewayConfig::from_lookup(lookup_from(&[("PORT", "9000")])).unwrap();
        assert_eq!(config.port, 9000);
    }

    #[test]
    fn test_invalid_numbers_are_errors() {
        let err = GatewayConfig::from_lookup(lookup_from(&[("CLAIMS_RADIUS_KM", "wide")]))
            .unwrap_err();
        assert!(err.to_string().contains("CLAIMS_RADIUS_KM"));

        assert!(GatewayConfig::from_lookup(lookup_from(&[("PORT", "99999")])).is_err());
    }

    #[test]
    fn test_radius_must_be_positive_and_finite() {
        for raw in ["NaN", "-50", "0", "inf"] {
            let err = GatewayConfig::from_lookup(lookup_from(&[("CLAIMS_RADIUS_KM", raw)]))
                .unwrap_err();
            assert!(err.to_string().contains("CLAIMS_RADIUS_KM"), "{raw}: {err}");
        }
    }

    #[test]
    fn test_upload_limit_overflow_is_an_error() {
        let huge = usize::MAX.to_string();
        let err = GatewayConfig::from_lookup(lookup_from(&[("CLAIMS_MAX_UPLOAD_MB", huge.as_str())]))
            .unwrap_err();
        assert!(err.to_string().contains("CLAIMS_MAX_UPLOAD_MB"));

        let config =
            GatewayConfig::from_lookup(lookup_from(&[("CLAIMS_MAX_UPLOAD_MB", "25")])).unwrap();
        assert_eq!(config.max_upload_bytes, 25 * 1024 * 1024);
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config =
            GatewayConfig::from_lookup(lookup_from(&[("GEMINI_API_KEY", "  "), ("CLAIMS_ARTIFACT_DIR", "")]))
                .unwrap();
        assert!(config.gemini_api_key.is_none());
        assert!(config.artifact_dir.is_none());
    }
}
