//! JSON artifacts for a verification run

use crate::report::VerificationReport;
use crate::summary::InsuranceSummary;
use crate::Result;
use serde::Serialize;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub verification: PathBuf,
    pub insurance: PathBuf,
}

/// Write `disaster_verification{suffix}.json` and
/// `insurance_report{suffix}.json` into `dir`, creating it if needed.
pub fn write_artifacts(
    dir: &Path,
    suffix: &str,
    report: &VerificationReport,
    summary: &InsuranceSummary,
) -> Result<ArtifactPaths> {
    fs::create_dir_all(dir)?;

    let paths = ArtifactPaths {
        verification: dir.join(format!("disaster_verification{suffix}.json")),
        insurance: dir.join(format!("insurance_report{suffix}.json")),
    };

    write_pretty(&paths.verification, report)?;
    write_pretty(&paths.insurance, summary)?;

    info!(
        verification = ?paths.verification,
        insurance = ?paths.insurance,
        "Verification artifacts written"
    );

    Ok(paths)
}

fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}
