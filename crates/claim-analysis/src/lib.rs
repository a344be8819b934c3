//! Claim Analysis
//!
//! Model-assisted checks over the documents attached to a claim:
//!
//! - crop identification from a field photo, matched against the declared crop
//! - OCR and translation of receipts, images and PDFs
//! - TF-IDF coherence scoring across the extracted texts
//! - fraud screening with a model-assigned risk score
//! - a narrative verification report over the JSON artifacts
//!
//! Every model call goes through [`LanguageModel`]; [`GeminiClient`] is the
//! production implementation.

use thiserror::Error;

pub mod coherence;
pub mod crop;
pub mod documents;
pub mod fraud;
pub mod gemini;
pub mod model;
pub mod narrative;

pub use coherence::{analyze_text_coherence, preprocess_text, CoherenceResult};
pub use crop::{CropIdentification, CropIdentifier, CropMatch};
pub use documents::{ClaimReport, Document, DocumentAnalyzer};
pub use fraud::{detect_potential_fraud, FraudAssessment};
pub use gemini::{GeminiClient, GEMINI_API_URL, GEMINI_MODEL};
pub use model::{InlineData, LanguageModel};
pub use narrative::comprehensive_report;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Model returned no text")]
    EmptyResponse,
    #[error("Unsupported document type: {0}")]
    UnsupportedDocument(String),
}

impl From<reqwest::Error> for AnalysisError {
    fn from(e: reqwest::Error) -> Self {
        AnalysisError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for AnalysisError {
    fn from(e: serde_json::Error) -> Self {
        AnalysisError::Parse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
