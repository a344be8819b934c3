//! Model-backed claim analysis routes
//!
//! Both routes need a configured language model and answer 503 without one.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use claim_analysis::{comprehensive_report, ClaimReport, Document, DocumentAnalyzer, LanguageModel};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

use crate::process::run_processing;
use crate::store::lookup_claim;
use crate::{api_error, ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct DocumentAnalysisResponse {
    pub claim_id: String,
    pub report: ClaimReport,
    pub markdown: String,
}

#[derive(Debug, Serialize)]
pub struct VerificationReportResponse {
    pub claim_id: String,
    pub report: String,
}

fn require_model(state: &AppState) -> Result<Arc<dyn LanguageModel>, ApiError> {
    state.model.clone().ok_or_else(|| {
        api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "Document analysis is not configured",
        )
    })
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value)
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// Coherence and fraud screening over every file uploaded with a claim
pub async fn analyze_documents(
    State(state): State<AppState>,
    Path(claim_id): Path<String>,
) -> Result<Json<DocumentAnalysisResponse>, ApiError> {
    let model = require_model(&state)?;

    let record = lookup_claim(state.store.as_ref(), &state.config.id_field, &claim_id)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Claim not found"))?;

    let documents: Vec<Document> = record
        .files
        .iter()
        .flat_map(|(field, files)| {
            files.iter().map(move |f| {
                let name = if f.filename.is_empty() {
                    field.clone()
                } else {
                    f.filename.clone()
                };
                Document::new(name, f.content_type.as_deref(), f.bytes.clone())
            })
        })
        .collect();

    let report = DocumentAnalyzer::new(model)
        .generate_claim_report(&documents)
        .await;

    info!(
        %claim_id,
        documents = report.total_documents,
        risk = %report.fraud_detection.risk_level,
        "Claim documents analyzed"
    );

    Ok(Json(DocumentAnalysisResponse {
        claim_id,
        markdown: report.to_markdown(),
        report,
    }))
}

/// Narrative report over a fresh verification run
pub async fn verification_report(
    State(state): State<AppState>,
    Path(claim_id): Path<String>,
) -> Result<Json<VerificationReportResponse>, ApiError> {
    let model = require_model(&state)?;
    let processed = run_processing(&state, &claim_id).await?;

    let mut artifacts = Map::new();
    artifacts.insert(
        "disaster_verification".to_string(),
        to_value(&processed.verification)?,
    );
    artifacts.insert(
        "insurance_report".to_string(),
        to_value(&processed.insurance_report)?,
    );
    if let Some(crop) = &processed.crop_verification {
        artifacts.insert("crop_verification".to_string(), to_value(crop)?);
    }

    let report = comprehensive_report(model.as_ref(), &artifacts).await;

    Ok(Json(VerificationReportResponse { claim_id, report }))
}
