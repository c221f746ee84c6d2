//! Installation pipeline error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum InstallError {
    #[error("installation failed: {message}")]
    Failed { message: String },

    #[error("integrity mismatch for {file}: expected {expected}, got {actual}")]
    IntegrityMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("local source not found: {path}")]
    LocalSourceNotFound { path: String },

    #[error("placement failed: {message}")]
    PlacementFailed { message: String },

    #[error("installed artifact is not executable: {path}")]
    ArtifactNotExecutable { path: String },

    #[error("binary not installed: {path}")]
    NotInstalled { path: String },

    #[error("filesystem operation failed: {operation} on {path}: {message}")]
    FilesystemError {
        operation: String,
        path: String,
        message: String,
    },
}

impl UserFacingError for InstallError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::IntegrityMismatch { .. } => {
                Some("The downloaded artifact does not match the formula's sha256; verify the source and checksum.")
            }
            Self::LocalSourceNotFound { .. } => {
                Some("Check the `path` source in the formula points at an existing file or directory.")
            }
            Self::ArtifactNotExecutable { .. } => {
                Some("Enable `fix_mode` in [install.prebuilt] or ship an artifact with execute permissions.")
            }
            Self::NotInstalled { .. } => Some("Run `forma install` before `forma test`."),
            Self::PlacementFailed { .. } | Self::FilesystemError { .. } => {
                Some("Ensure the bin directory exists and is writable.")
            }
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Failed { .. } => "install.failed",
            Self::IntegrityMismatch { .. } => "install.integrity_mismatch",
            Self::LocalSourceNotFound { .. } => "install.local_source_not_found",
            Self::PlacementFailed { .. } => "install.placement_failed",
            Self::ArtifactNotExecutable { .. } => "install.artifact_not_executable",
            Self::NotInstalled { .. } => "install.not_installed",
            Self::FilesystemError { .. } => "install.filesystem_error",
        };
        Some(code)
    }
}
