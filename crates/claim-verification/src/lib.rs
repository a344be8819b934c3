//! Claim Verification
//!
//! Corroborates a crop insurance claim against public disaster feeds.
//!
//! ```text
//! (coordinate, date) ──► feeds (EONET, ReliefWeb, NDMA, IMD)
//!                          │ EventRecord*
//!                          ▼
//!                   matcher::is_relevant   haversine ≤ radius_km
//!                          │               |Δdays| ≤ 30
//!                          ▼
//!                  VerificationReport ──► InsuranceSummary
//! ```
//!
//! Feed failures never fail a verification: a feed that errors contributes
//! no events and is listed in the diagnostics.

use thiserror::Error;

pub mod artifacts;
pub mod matcher;
pub mod report;
pub mod summary;

pub use artifacts::{write_artifacts, ArtifactPaths};
pub use matcher::{is_date_close, is_relevant, Timestamp, DATE_WINDOW_DAYS};
pub use report::{DisasterVerifier, FeedFailure, VerificationOutcome, VerificationReport};
pub use summary::{generate_insurance_report, InsuranceSummary};

/// Default search radius around the claim location
pub const DEFAULT_RADIUS_KM: f64 = 50.0;

#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, VerificationError>;
