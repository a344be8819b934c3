//! Claim intake routes
//!
//! `/submit-form` accepts a multipart claim form. Text parts become string
//! fields; file parts must use a configured upload field, and single-file
//! fields reject a second file.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::store::{lookup_claim, ClaimRecord, ClaimSummary, StoredFile};
use crate::{api_error, ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub id: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ClaimListResponse {
    pub claims: Vec<ClaimSummary>,
    pub total: usize,
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    api_error(e.status(), format!("Invalid form data: {}", e.body_text()))
}

/// Store a submitted claim form
pub async fn submit_form(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SubmitResponse>, ApiError> {
    let intake = &state.config.intake;
    let mut fields = BTreeMap::new();
    let mut files: BTreeMap<String, Vec<StoredFile>> = BTreeMap::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        let Some(filename) = field.file_name().map(str::to_string) else {
            let value = field.text().await.map_err(multipart_error)?;
            fields.insert(name, value);
            continue;
        };

        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;

        // Browsers send an empty part for an untouched file input
        if filename.is_empty() && bytes.is_empty() {
            continue;
        }

        let Some(spec) = intake.field(&name) else {
            warn!(field = %name, "Rejected upload to unknown file field");
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                format!("Unexpected file field '{name}'"),
            ));
        };

        let slot = files.entry(name.clone()).or_default();
        if !spec.multiple && !slot.is_empty() {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                format!("Field '{name}' accepts a single file"),
            ));
        }
        slot.push(StoredFile {
            filename,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    let file_count: usize = files.values().map(Vec::len).sum();
    let record = ClaimRecord::new(fields, files);
    let claim_number = record.fields.get(&state.config.id_field).cloned();

    let id = state
        .store
        .insert(record)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    info!(%id, claim_number = ?claim_number, files = file_count, "Claim form stored");

    Ok(Json(SubmitResponse {
        id,
        message: "Form submitted successfully".to_string(),
    }))
}

/// List claims whose fields match every query parameter
pub async fn list_claims(
    State(state): State<AppState>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<ClaimListResponse>, ApiError> {
    let filter: Vec<(String, String)> = params.into_iter().collect();
    let records = state
        .store
        .find(&filter)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let claims: Vec<ClaimSummary> = records.iter().map(ClaimSummary::from).collect();
    Ok(Json(ClaimListResponse {
        total: claims.len(),
        claims,
    }))
}

pub async fn get_claim(
    State(state): State<AppState>,
    Path(claim_id): Path<String>,
) -> Result<Json<ClaimSummary>, ApiError> {
    let record = lookup_claim(state.store.as_ref(), &state.config.id_field, &claim_id)
        .await
        .map_err(|e| api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, "Claim not found"))?;

    Ok(Json(ClaimSummary::from(&record)))
}

#[cfg(test)]
mod tests {
    use crate::app;
    use crate::config::GatewayConfig;
    use crate::store::{self, ClaimRecord, ClaimStore, StoreError};
    use crate::test_support::*;
    use axum::http::StatusCode;
    use std::sync::Arc;

    fn router() -> axum::Router {
        app(state_with(vec![], None, GatewayConfig::default()))
    }

    #[tokio::test]
    async fn test_submit_and_fetch_claim() {
        let router = router();
        let (status, json) = submit(
            router.clone(),
            vec![
                Part::Text("claimNumber", "CLM-2024-001"),
                Part::Text("cropType", "Grapes"),
                Part::File("receiptImage", "field.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xD9]),
                Part::File("pdfs", "bill.pdf", "application/pdf", b"%PDF-1.4".to_vec()),
                Part::File("pdfs", "land.pdf", "application/pdf", b"%PDF-1.7".to_vec()),
            ],
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Form submitted successfully");
        let id = json["id"].as_str().unwrap().to_string();

        let (status, claim) = send(router.clone(), get("/claims/CLM-2024-001")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(claim["id"], id);
        assert_eq!(claim["fields"]["cropType"], "Grapes");
        assert_eq!(claim["files"]["pdfs"].as_array().unwrap().len(), 2);
        assert_eq!(claim["files"]["receiptImage"][0]["size"], 4);

        let (status, by_id) = send(router, get(&format!("/claims/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(by_id["fields"]["claimNumber"], "CLM-2024-001");
    }

    #[tokio::test]
    async fn test_second_file_in_single_field_rejected() {
        let (status, json) = submit(
            router(),
            vec![
                Part::File("receiptImage", "a.jpg", "image/jpeg", vec![1]),
                Part::File("receiptImage", "b.jpg", "image/jpeg", vec![2]),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("receiptImage"));
    }

    #[tokio::test]
    async fn test_unknown_file_field_rejected() {
        let (status, _) = submit(
            router(),
            vec![Part::File("selfie", "me.jpg", "image/jpeg", vec![1])],
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_empty_file_input_ignored() {
        let router = router();
        let (status, _) = submit(
            router.clone(),
            vec![
                Part::Text("claimNumber", "CLM-7"),
                Part::File("images", "", "application/octet-stream", vec![]),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, claim) = send(router, get("/claims/CLM-7")).await;
        assert!(claim["files"].as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_claims_filters_on_all_pairs() {
        let router = router();
        for (number, crop, district) in [
            ("CLM-1", "Wheat", "Nashik"),
            ("CLM-2", "Wheat", "Pune"),
            ("CLM-3", "Rice", "Nashik"),
        ] {
            submit(
                router.clone(),
                vec![
                    Part::Text("claimNumber", number),
                    Part::Text("cropType", crop),
                    Part::Text("district", district),
                ],
            )
            .await;
        }

        let (status, json) = send(router.clone(), get("/claims?cropType=Wheat&district=Nashik")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total"], 1);
        assert_eq!(json["claims"][0]["fields"]["claimNumber"], "CLM-1");

        let (_, all) = send(router, get("/claims")).await;
        assert_eq!(all["total"], 3);
    }

    struct OfflineStore;

    #[async_trait::async_trait]
    impl ClaimStore for OfflineStore {
        async fn insert(&self, _record: ClaimRecord) -> store::Result<String> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn find(&self, _filter: &[(String, String)]) -> store::Result<Vec<ClaimRecord>> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_store_outage_is_500() {
        let mut state = state_with(vec![], None, GatewayConfig::default());
        state.store = Arc::new(OfflineStore);
        let router = app(state);

        let (status, json) =
            submit(router.clone(), vec![Part::Text("claimNumber", "CLM-1")]).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"].as_str().unwrap().contains("unavailable"));

        let (status, _) = send(router.clone(), get("/claims")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let (status, _) = send(router, get("/claims/CLM-1")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_unknown_claim_is_404() {
        let (status, json) = send(router(), get("/claims/CLM-404")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Claim not found");
    }
}
