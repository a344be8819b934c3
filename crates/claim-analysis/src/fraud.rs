//! Model-assisted fraud screening
//!
//! Two model calls: a free-form analysis of the combined document text,
//! then a request to condense that analysis into a single risk score.

use crate::model::LanguageModel;
use crate::Result;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// Score used when the model's answer is not a number
const DEFAULT_RISK_SCORE: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FraudAssessment {
    pub fraud_analysis: String,
    pub risk_level: String,
    pub risk_score: f64,
}

impl FraudAssessment {
    fn unavailable() -> Self {
        Self {
            fraud_analysis: "Unable to complete comprehensive analysis".to_string(),
            risk_level: "Unknown".to_string(),
            risk_score: DEFAULT_RISK_SCORE,
        }
    }
}

fn analysis_prompt(combined_text: &str) -> String {
    format!(
        "Perform a comprehensive fraud analysis on the following insurance claim documents:\n\n\
         Documents: {combined_text}\n\n\
         Provide a detailed analysis covering:\n\
         1. Detailed examination of document consistency\n\
         2. Identification of potential inconsistencies or red flags\n\
         3. Suspicious patterns or anomalies\n\
         4. Credibility assessment of the claim\n\
         5. Recommended areas for further investigation\n\n\
         Classify the overall fraud risk and provide a confidence level for your assessment."
    )
}

fn risk_prompt(analysis: &str) -> String {
    format!(
        "Based on the following fraud analysis, provide a numerical risk score from 0 to 1:\n\n\
         {analysis}\n\n\
         Consider document inconsistencies, suspicious patterns, and overall claim credibility.\n\
         Respond ONLY with a single numerical value representing the risk score."
    )
}

/// Parse the model's risk score, clamped to [0, 1]
fn parse_risk_score(reply: &str) -> f64 {
    match reply.trim().parse::<f64>() {
        Ok(score) if score.is_finite() => score.clamp(0.0, 1.0),
        _ => {
            warn!(reply = %reply.trim(), "Risk score not numeric, using default");
            DEFAULT_RISK_SCORE
        }
    }
}

fn risk_level(score: f64) -> &'static str {
    if score < 0.3 {
        "Low Risk"
    } else if score < 0.7 {
        "Medium Risk"
    } else {
        "High Risk"
    }
}

async fn assess(model: &dyn LanguageModel, documents: &[String]) -> Result<FraudAssessment> {
    let combined_text = documents.join(" ");
    let fraud_analysis = model.generate(&analysis_prompt(&combined_text), None).await?;
    let risk_reply = model.generate(&risk_prompt(&fraud_analysis), None).await?;
    let risk_score = parse_risk_score(&risk_reply);

    Ok(FraudAssessment {
        fraud_analysis,
        risk_level: risk_level(risk_score).to_string(),
        risk_score,
    })
}

/// Screen claim texts for fraud. Model failures yield an "Unknown" assessment.
pub async fn detect_potential_fraud(
    model: &dyn LanguageModel,
    documents: &[String],
) -> FraudAssessment {
    match assess(model, documents).await {
        Ok(assessment) => assessment,
        Err(e) => {
            error!(error = %e, "Fraud detection failed");
            FraudAssessment::unavailable()
        }
    }
}
