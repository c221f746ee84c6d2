//! Build-time toolchain checks
//!
//! Runs before the build command ever starts: a missing toolchain is an
//! unmet-prerequisite failure, not a build failure. Toolchains do not report
//! versions uniformly (`go version go1.14.4 ...`), so the version check
//! scans the tool's own version output for the declared version string.

use forma_errors::{BuildError, Error};
use forma_types::ToolchainSpec;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Verify the toolchain is on PATH and satisfies the declared version
///
/// Returns the resolved tool path.
///
/// # Errors
///
/// Returns `MissingBuildDep` when the tool is not on PATH or produces no
/// version output, and `ToolchainMismatch` when the output does not mention
/// the required version.
pub async fn check(spec: &ToolchainSpec) -> Result<PathBuf, Error> {
    let path = which::which(&spec.name).map_err(|_| BuildError::MissingBuildDep {
        name: spec.to_string(),
    })?;

    let Some(required) = &spec.version else {
        return Ok(path);
    };

    let output = version_output(&path).await.ok_or_else(|| {
        BuildError::MissingBuildDep {
            name: spec.to_string(),
        }
    })?;

    if output.contains(required.as_str()) {
        Ok(path)
    } else {
        Err(BuildError::ToolchainMismatch {
            name: spec.name.clone(),
            required: required.clone(),
            found: output.lines().next().unwrap_or("").trim().to_string(),
        }
        .into())
    }
}

/// Ask the tool for its version, trying the two common conventions
async fn version_output(path: &Path) -> Option<String> {
    for arg in ["version", "--version"] {
        if let Ok(output) = Command::new(path).arg(arg).output().await {
            if output.status.success() {
                let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
                text.push_str(&String::from_utf8_lossy(&output.stderr));
                if !text.trim().is_empty() {
                    return Some(text);
                }
            }
        }
    }
    None
}
