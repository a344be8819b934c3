//! Claim document analysis
//!
//! Text comes from each document by type: plain text is read as is, images
//! and PDFs go through the model for OCR. Every text is then translated to
//! English (keeping the original if translation fails) and normalized with
//! [`preprocess_text`]. Documents yielding no text are left out of the
//! coherence and fraud checks but still counted.

use crate::coherence::{analyze_text_coherence, preprocess_text, CoherenceResult};
use crate::fraud::{detect_potential_fraud, FraudAssessment};
use crate::model::{InlineData, LanguageModel};
use crate::{AnalysisError, Result};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const OCR_PROMPT: &str =
    "Extract all readable text from this document. Ensure you capture every detail.";

/// An uploaded claim document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Document {
    /// Use the declared content type, or guess one from the file name
    pub fn new(name: impl Into<String>, content_type: Option<&str>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = content_type
            .filter(|ct| !ct.is_empty() && *ct != "application/octet-stream")
            .map(str::to_string)
            .unwrap_or_else(|| mime_from_name(&name).to_string());
        Self {
            name,
            mime_type,
            bytes,
        }
    }
}

fn mime_from_name(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimReport {
    pub report_id: String,
    pub documents_analyzed: Vec<String>,
    pub total_documents: usize,
    /// Length of each non-empty extracted text
    pub extracted_text_length: Vec<usize>,
    pub coherence: CoherenceResult,
    pub fraud_detection: FraudAssessment,
    pub timestamp: DateTime<Utc>,
}

impl ClaimReport {
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        let _ = writeln!(md, "# Insurance Claim Report ({})\n", self.report_id);

        md.push_str("## Documents Analyzed\n\n");
        for (i, doc) in self.documents_analyzed.iter().enumerate() {
            let _ = writeln!(md, "{}. {}", i + 1, doc);
        }
        md.push('\n');

        md.push_str("## Coherence Analysis\n\n");
        let _ = writeln!(md, "Coherence Score: {}", self.coherence.coherence_score);
        let _ = writeln!(md, "Consistency Level: {}", self.coherence.consistency_level);
        let _ = writeln!(md, "Confidence Level: {}\n", self.coherence.confidence);

        md.push_str("## Fraud Detection\n\n");
        let _ = writeln!(
            md,
            "Fraud Analysis:\n\n{}\n",
            self.fraud_detection.fraud_analysis
        );
        let _ = writeln!(md, "Risk Level: {}", self.fraud_detection.risk_level);
        let _ = writeln!(md, "Risk Score: {}\n", self.fraud_detection.risk_score);

        md.push_str("## Timestamp\n\n");
        let _ = writeln!(md, "{}", self.timestamp.to_rfc3339());
        md
    }
}

pub struct DocumentAnalyzer {
    model: Arc<dyn LanguageModel>,
}

impl DocumentAnalyzer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    async fn raw_text(&self, document: &Document) -> Result<String> {
        let mime = document.mime_type.as_str();
        if mime.starts_with("text/") {
            return Ok(String::from_utf8_lossy(&document.bytes).into_owned());
        }
        if mime.starts_with("image/") || mime == "application/pdf" {
            let data = InlineData::new(mime, document.bytes.clone());
            return self.model.generate(OCR_PROMPT, Some(&data)).await;
        }
        Err(AnalysisError::UnsupportedDocument(mime.to_string()))
    }

    /// English translation of `text`, normalized
    pub async fn detect_and_translate_text(&self, text: &str) -> String {
        let prompt = format!(
            "Detect the language of the following text and translate it to English.\n\
             If the text is already in English, just return the original text.\n\n\
             Original Text: {text}\n\n\
             Provide only the translated text in English."
        );
        match self.model.generate(&prompt, None).await {
            Ok(translated) => preprocess_text(&translated),
            Err(e) => {
                warn!(error = %e, "Translation failed, keeping original text");
                preprocess_text(text)
            }
        }
    }

    /// Normalized English text of one document; empty on failure
    pub async fn extract_text(&self, document: &Document) -> String {
        match self.raw_text(document).await {
            Ok(text) => {
                debug!(document = %document.name, chars = text.len(), "Text extracted");
                self.detect_and_translate_text(&text).await
            }
            Err(e) => {
                error!(document = %document.name, error = %e, "Document extraction failed");
                String::new()
            }
        }
    }

    pub async fn generate_claim_report(&self, documents: &[Document]) -> ClaimReport {
        let report_id = Uuid::new_v4().to_string();
        info!(%report_id, documents = documents.len(), "Generating claim report");

        let texts: Vec<String> = join_all(documents.iter().map(|d| self.extract_text(d)))
            .await
            .into_iter()
            .filter(|t| !t.is_empty())
            .collect();

        let coherence = analyze_text_coherence(&texts);
        let fraud_detection = detect_potential_fraud(self.model.as_ref(), &texts).await;

        ClaimReport {
            report_id,
            documents_analyzed: documents.iter().map(|d| d.name.clone()).collect(),
            total_documents: documents.len(),
            extracted_text_length: texts.iter().map(String::len).collect(),
            coherence,
            fraud_detection,
            timestamp: Utc::now(),
        }
    }
}
