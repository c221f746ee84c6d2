//! Build step error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum BuildError {
    #[error("build failed: {message}")]
    Failed { message: String },

    #[error("missing build dependency: {name}")]
    MissingBuildDep { name: String },

    #[error("build dependency {name} does not satisfy {required}: {found}")]
    ToolchainMismatch {
        name: String,
        required: String,
        found: String,
    },

    #[error("build command failed with exit code {code}: {stderr}")]
    CommandFailed { code: i32, stderr: String },

    #[error("build command terminated by signal")]
    CommandKilled,

    #[error("expected build artifact not found: {path}")]
    ArtifactMissing { path: String },

    #[error("extraction failed: {message}")]
    ExtractionFailed { message: String },

    #[error("unsupported archive format: {file}")]
    UnsupportedArchiveFormat { file: String },
}

impl UserFacingError for BuildError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::MissingBuildDep { .. } => {
                Some("Install the missing build dependency or remove it from the formula.")
            }
            Self::ToolchainMismatch { .. } => {
                Some("Install the toolchain version declared in the formula.")
            }
            Self::CommandFailed { .. } | Self::CommandKilled => {
                Some("Inspect the build tool's output above and fix the source or command.")
            }
            Self::ArtifactMissing { .. } => {
                Some("Ensure the build command produces the artifact path named in the formula.")
            }
            Self::UnsupportedArchiveFormat { .. } => {
                Some("Source archives must be .tar.gz; repackage the source or use a path source.")
            }
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Failed { .. } => "build.failed",
            Self::MissingBuildDep { .. } => "build.missing_build_dep",
            Self::ToolchainMismatch { .. } => "build.toolchain_mismatch",
            Self::CommandFailed { .. } => "build.command_failed",
            Self::CommandKilled => "build.command_killed",
            Self::ArtifactMissing { .. } => "build.artifact_missing",
            Self::ExtractionFailed { .. } => "build.extraction_failed",
            Self::UnsupportedArchiveFormat { .. } => "build.unsupported_archive_format",
        };
        Some(code)
    }
}
