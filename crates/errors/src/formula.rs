//! Formula (package descriptor) error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum FormulaError {
    #[error("invalid formula: {message}")]
    Invalid { message: String },

    #[error("parse error: {message}")]
    ParseError { message: String },

    #[error("missing required field: {field}")]
    MissingField { field: String },

    #[error("no install procedure declared (expected [install.build] or [install.prebuilt])")]
    NoInstallProcedure,

    #[error("multiple install procedures declared (exactly one of [install.build], [install.prebuilt] is allowed)")]
    AmbiguousInstallProcedure,

    #[error("no source declared (expected url or path under [source])")]
    NoSource,

    #[error("multiple sources declared (exactly one of url, path is allowed)")]
    AmbiguousSource,

    #[error("unresolved placeholder: ${{{name}}}")]
    UnresolvedPlaceholder { name: String },

    #[error("invalid placeholder syntax in {field}: {snippet}")]
    InvalidPlaceholder { field: String, snippet: String },
}

impl UserFacingError for FormulaError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Invalid { .. } | Self::ParseError { .. } | Self::MissingField { .. } => {
                Some("Fix the formula file and retry the command.")
            }
            Self::NoInstallProcedure | Self::AmbiguousInstallProcedure => {
                Some("Declare exactly one install variant: [install.build] or [install.prebuilt].")
            }
            Self::NoSource | Self::AmbiguousSource => {
                Some("Declare exactly one of `url` or `path` in the [source] section.")
            }
            Self::UnresolvedPlaceholder { .. } => {
                Some("Provide the value with --var NAME=VALUE or export it in the environment.")
            }
            Self::InvalidPlaceholder { .. } => {
                Some("Placeholders use the form ${NAME} with an uppercase identifier.")
            }
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::Invalid { .. } => "formula.invalid",
            Self::ParseError { .. } => "formula.parse_error",
            Self::MissingField { .. } => "formula.missing_field",
            Self::NoInstallProcedure => "formula.no_install_procedure",
            Self::AmbiguousInstallProcedure => "formula.ambiguous_install_procedure",
            Self::NoSource => "formula.no_source",
            Self::AmbiguousSource => "formula.ambiguous_source",
            Self::UnresolvedPlaceholder { .. } => "formula.unresolved_placeholder",
            Self::InvalidPlaceholder { .. } => "formula.invalid_placeholder",
        };
        Some(code)
    }
}
