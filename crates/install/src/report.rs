//! Structured summary of a completed install attempt

use serde::Serialize;
use std::path::PathBuf;

/// Which install procedure the formula selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    BuildFromSource,
    InstallPrebuilt,
}

/// Outcome of the post-install smoke test
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TestOutcome {
    Passed,
    Failed { message: String },
    Skipped,
}

impl TestOutcome {
    /// True unless the smoke test ran and failed
    #[must_use]
    pub fn is_ok(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

/// Result of a successful install pipeline run
///
/// Produced only after placement succeeded; a failed smoke test is recorded
/// here rather than reversing the install.
#[derive(Debug, Clone, Serialize)]
pub struct InstallReport {
    pub package: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub bin_path: PathBuf,
    pub method: MethodKind,
    pub bytes_fetched: u64,
    pub sha256: String,
    pub test: TestOutcome,
}
