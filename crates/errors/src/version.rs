//! Version and toolchain-spec parsing error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum VersionError {
    #[error("invalid version: {input}")]
    InvalidVersion { input: String },

    #[error("invalid toolchain spec: {input}")]
    InvalidToolchainSpec { input: String },

    #[error("version parse error: {message}")]
    ParseError { message: String },
}

impl UserFacingError for VersionError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidVersion { .. } | Self::ParseError { .. } => {
                Some("Use semantic-version strings like 1.2.3.")
            }
            Self::InvalidToolchainSpec { .. } => {
                Some("Toolchain specs use the form name@version, e.g. go@1.14.")
            }
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::InvalidVersion { .. } => "version.invalid_version",
            Self::InvalidToolchainSpec { .. } => "version.invalid_toolchain_spec",
            Self::ParseError { .. } => "version.parse_error",
        };
        Some(code)
    }
}
