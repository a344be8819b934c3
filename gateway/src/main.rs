use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use claim_analysis::{GeminiClient, LanguageModel};
use claim_geo::{NominatimGeocoder, ReverseGeocoder};
use claim_verification::DisasterVerifier;
use disaster_feeds::build_feeds;
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod analysis_routes;
mod config;
mod intake;
mod process;
mod store;

use config::GatewayConfig;
use store::{ClaimStore, MemoryClaimStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub store: Arc<dyn ClaimStore>,
    pub verifier: Arc<DisasterVerifier>,
    pub geocoder: Arc<dyn ReverseGeocoder>,
    /// Present when crop and document analysis is configured
    pub model: Option<Arc<dyn LanguageModel>>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub fn app(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health))
        .route("/submit-form", post(intake::submit_form))
        .route("/claims", get(intake::list_claims))
        .route("/claims/:claim_id", get(intake::get_claim))
        .route(
            "/claims/:claim_id/analyze-documents",
            post(analysis_routes::analyze_documents),
        )
        .route(
            "/claims/:claim_id/verification-report",
            post(analysis_routes::verification_report),
        )
        .route("/process-claim/:claim_id", post(process::process_claim))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "claims_gateway=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = GatewayConfig::from_env()?;

    let feeds = build_feeds(&config.feeds)?;
    let verifier = DisasterVerifier::new(feeds).with_retry_transient(config.retry_transient);

    let geocoder = match &config.nominatim_url {
        Some(url) => NominatimGeocoder::new().with_base_url(url),
        None => NominatimGeocoder::new(),
    };

    let model: Option<Arc<dyn LanguageModel>> = match &config.gemini_api_key {
        Some(key) => {
            let client = GeminiClient::new(key)?;
            tracing::info!("   Analysis model: {}", client.name());
            Some(Arc::new(client))
        }
        None => {
            tracing::warn!("   No Gemini API key - crop and document analysis disabled");
            None
        }
    };

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("🌾 Claims Gateway starting on {}", addr);
    tracing::info!("   Verification radius: {} km", config.radius_km);
    if let Some(dir) = &config.artifact_dir {
        tracing::info!("   Writing artifacts to {}", dir.display());
    }

    let state = AppState {
        config: Arc::new(config),
        store: Arc::new(MemoryClaimStore::new()),
        verifier: Arc::new(verifier),
        geocoder: Arc::new(geocoder),
        model,
    };

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "claims-gateway",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
