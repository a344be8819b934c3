//! Claim processing
//!
//! ```text
//! claim record ─► evidence photo ─► EXIF gps + timestamp
//!                                        │
//!                    reverse geocode ◄───┤
//!                                        ▼
//!                          disaster feeds ─► verification report
//!                                        │
//!                                        ├─► insurance summary
//!                                        └─► crop check (when a model is configured)
//! ```

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use claim_analysis::{CropIdentifier, CropMatch, InlineData};
use claim_geo::{exif_timestamp_to_iso, extract_exif_data, google_maps_link};
use claim_verification::{
    generate_insurance_report, write_artifacts, FeedFailure, InsuranceSummary, VerificationReport,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::store::lookup_claim;
use crate::{api_error, ApiError, AppState};

#[derive(Debug, Clone, Serialize)]
pub struct ProcessClaimResponse {
    pub claim_id: String,
    pub location_name: String,
    pub maps_link: String,
    pub verification: VerificationReport,
    pub insurance_report: InsuranceSummary,
    pub feed_failures: Vec<FeedFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop_verification: Option<CropMatch>,
}

/// Keep artifact names to `[A-Za-z0-9_-]`
fn artifact_suffix(claim_id: &str) -> String {
    let safe: String = claim_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("_{safe}")
}

pub(crate) async fn run_processing(
    state: &AppState,
    claim_id: &str,
) -> Result<ProcessClaimResponse, ApiError> {
    let config = &state.config;

    let record = lookup_claim(state.store.as_ref(), &config.id_field, claim_id)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Claim not found"))?;

    let photo = record
        .first_file(&config.evidence_field)
        .filter(|f| !f.bytes.is_empty())
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Image not found in the claim data"))?;

    let evidence = extract_exif_data(&photo.bytes).map_err(|e| {
        warn!(claim_id, error = %e, "Evidence photo has no readable EXIF");
        api_error(
            StatusCode::BAD_REQUEST,
            format!("Could not read EXIF data from the image: {e}"),
        )
    })?;

    let coordinate = evidence
        .gps
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "No GPS info found in the image."))?;
    let date = evidence.timestamp.as_deref().map(exif_timestamp_to_iso);

    let location_name = state.geocoder.location_name(coordinate).await;
    let maps_link = google_maps_link(coordinate);

    let outcome = state
        .verifier
        .verify_with_diagnostics(coordinate, date.as_deref(), config.radius_km)
        .await;
    let insurance_report = generate_insurance_report(&outcome.report);

    if let Some(dir) = &config.artifact_dir {
        if let Err(e) = write_artifacts(
            dir,
            &artifact_suffix(claim_id),
            &outcome.report,
            &insurance_report,
        ) {
            warn!(claim_id, error = %e, "Failed to write verification artifacts");
        }
    }

    let expected_crop = record
        .fields
        .get(&config.crop_field)
        .map(|c| c.trim())
        .filter(|c| !c.is_empty());
    let crop_verification = match (&state.model, expected_crop) {
        (Some(model), Some(expected)) => {
            let mime = photo.content_type.as_deref().unwrap_or("image/jpeg");
            let image = InlineData::new(mime, photo.bytes.clone());
            Some(
                CropIdentifier::new(model.clone())
                    .verify_crop_match(&image, expected)
                    .await,
            )
        }
        _ => None,
    };

    info!(
        claim_id,
        location = %location_name,
        disaster_occurred = outcome.report.disaster_occurred,
        matches = outcome.report.disasters.len(),
        failed_feeds = outcome.failures.len(),
        "Claim processed"
    );

    Ok(ProcessClaimResponse {
        claim_id: claim_id.to_string(),
        location_name,
        maps_link,
        verification: outcome.report,
        insurance_report,
        feed_failures: outcome.failures,
        crop_verification,
    })
}

/// Verify a stored claim's evidence photo against the disaster feeds
pub async fn process_claim(
    State(state): State<AppState>,
    Path(claim_id): Path<String>,
) -> Result<Json<ProcessClaimResponse>, ApiError> {
    run_processing(&state, &claim_id).await.map(Json)
}
