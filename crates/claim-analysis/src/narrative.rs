//! Narrative verification report over a claim's JSON artifacts

use crate::model::LanguageModel;
use chrono::Utc;
use serde_json::{Map, Value};
use tracing::error;

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn report_prompt(artifacts: &Map<String, Value>) -> String {
    let overview: Map<String, Value> = artifacts
        .iter()
        .map(|(name, value)| (name.clone(), Value::from(kind_of(value))))
        .collect();
    let full = serde_json::to_string_pretty(artifacts).unwrap_or_default();

    format!(
        "You are an expert insurance claim verifier for a farming sector insurance company.\n\
         Analyze the following semi-structured JSON data and generate a comprehensive,\n\
         structured markdown report that includes:\n\n\
         1. Detailed overview of the claim\n\
         2. Comprehensive analysis of all submitted documents\n\
         3. Key findings and insights\n\
         4. Potential red flags or inconsistencies\n\
         5. Recommendation for claim processing\n\n\
         JSON Data Overview:\n{}\n\n\
         Full JSON Content:\n{}",
        Value::Object(overview),
        full
    )
}

/// Markdown listing each artifact's kind and size
fn fallback_report(artifacts: &Map<String, Value>) -> String {
    let mut lines = vec![
        "# Claim Verification Report".to_string(),
        format!(
            "**Generated on:** {}",
            Utc::now().format("%Y-%m-%d %H:%M:%S")
        ),
        String::new(),
        "## Overview".to_string(),
        "Unable to generate comprehensive report via the language model.".to_string(),
        String::new(),
        "## Submitted Documents".to_string(),
    ];

    for (name, value) in artifacts {
        lines.push(format!("### {name}"));
        lines.push(format!("- **Type:** {}", kind_of(value)));
        lines.push(format!(
            "- **Size:** Approximately {} characters",
            value.to_string().len()
        ));
    }

    lines.join("\n")
}

/// Ask the model for a markdown verification report over named JSON
/// artifacts, falling back to a plain listing.
pub async fn comprehensive_report(
    model: &dyn LanguageModel,
    artifacts: &Map<String, Value>,
) -> String {
    match model.generate(&report_prompt(artifacts), None).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Report generation failed, using fallback");
            fallback_report(artifacts)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::testing::ScriptedModel;
    use serde_json::json;

    fn artifacts() -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(
            "disaster_verification.json".to_string(),
            json!({ "disaster_occurred": true, "disasters": [] }),
        );
        map.insert("notes.json".to_string(), json!(["a", "b"]));
        map
    }

    #[tokio::test]
    async fn test_model_report_returned() {
        let model = ScriptedModel::new().on("expert insurance claim verifier", "# Report\nApprove.");
        let report = comprehensive_report(&model, &artifacts()).await;
        assert_eq!(report, "# Report\nApprove.");

        let calls = model.calls.lock().unwrap();
        assert!(calls[0].0.contains("\"notes.json\":\"array\""));
        assert!(calls[0].0.contains("\"disaster_occurred\": true"));
    }

    #[tokio::test]
    async fn test_fallback_lists_artifacts() {
        let model = ScriptedModel::new().fail_on("expert insurance claim verifier");
        let report = comprehensive_report(&model, &artifacts()).await;

        assert!(report.starts_with("# Claim Verification Report"));
        assert!(report.contains("### disaster_verification.json\n- **Type:** object"));
        assert!(report.contains("### notes.json\n- **Type:** array\n- **Size:** Approximately 9 characters"));
    }
}
