//! Crop identification from field photos

use crate::model::{InlineData, LanguageModel};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

const IDENTIFY_PROMPT: &str = "Analyze this agricultural image and provide:\n\
1. Crop/Plant Type: Specific botanical/agricultural name\n\
2. Confidence Level: Percentage of confidence in identification\n\
3. Growth Stage: Current growth/maturity stage\n\
4. Additional Observations: Any notable characteristics or potential health issues\n\n\
If the image is unclear or doesn't show a clear agricultural scene, \
state that conclusive identification is not possible.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropIdentification {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identification: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropMatch {
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identified_crop: Option<String>,
    pub expected_crop: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

pub struct CropIdentifier {
    model: Arc<dyn LanguageModel>,
}

impl CropIdentifier {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn identify_crop(&self, image: &InlineData) -> CropIdentification {
        match self.model.generate(IDENTIFY_PROMPT, Some(image)).await {
            Ok(text) => CropIdentification {
                success: true,
                identification: Some(text),
                error: None,
            },
            Err(e) => {
                warn!(error = %e, "Crop identification failed");
                CropIdentification {
                    success: false,
                    identification: None,
                    error: Some(e.to_string()),
                }
            }
        }
    }

    /// Whether the photo shows `expected_crop`: a case-insensitive substring
    /// test against the model's identification text.
    pub async fn verify_crop_match(&self, image: &InlineData, expected_crop: &str) -> CropMatch {
        let identification = self.identify_crop(image).await;

        let Some(identified) = identification.identification else {
            return CropMatch {
                matched: false,
                identified_crop: None,
                expected_crop: expected_crop.to_string(),
                reason: Some(format!(
                    "Unable to identify crop: {}",
                    identification.error.as_deref().unwrap_or("unknown error")
                )),
            };
        };

        let expected = expected_crop.trim();
        let matched = !expected.is_empty()
            && identified.to_lowercase().contains(&expected.to_lowercase());
        info!(expected_crop = %expected, matched, "Crop verification");

        CropMatch {
            matched,
            identified_crop: Some(identified),
            expected_crop: expected_crop.to_string(),
            reason: (!matched).then(|| format!("Identified crop does not mention '{expected}'")),
        }
    }
}
