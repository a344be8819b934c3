//! Insurance summary projection

use crate::report::VerificationReport;
use disaster_feeds::FeedSource;
use serde::{Deserialize, Serialize};

/// What an adjuster needs from a verification report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceSummary {
    pub claim_verifiable: bool,
    /// One entry per matched event, duplicates kept
    pub disaster_types: Vec<String>,
    /// Distinct sources in first-seen order
    pub disaster_sources: Vec<FeedSource>,
}

pub fn generate_insurance_report(report: &VerificationReport) -> InsuranceSummary {
    let mut disaster_sources = Vec::new();
    for event in &report.disasters {
        if !disaster_sources.contains(&event.source) {
            disaster_sources.push(event.source);
        }
    }

    InsuranceSummary {
        claim_verifiable: report.disaster_occurred,
        disaster_types: report.disasters.iter().map(|d| d.category.clone()).collect(),
        disaster_sources,
    }
}
