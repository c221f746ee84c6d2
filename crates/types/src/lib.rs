#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Shared types for forma
//!
//! Small, serializable types used across crate boundaries: toolchain
//! specifications and CLI/config enums.

mod toolchain;

pub use toolchain::ToolchainSpec;

use forma_errors::VersionError;
use serde::{Deserialize, Serialize};

/// Re-export semver version type
pub use semver::Version;

/// Parse a semantic version string
///
/// # Errors
///
/// Returns an error if the input is not a valid semantic version.
pub fn parse_version(input: &str) -> Result<Version, VersionError> {
    Version::parse(input).map_err(|_| VersionError::InvalidVersion {
        input: input.to_string(),
    })
}

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Plain,
    Tty,
    Json,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Tty
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChoice {
    Always,
    Auto,
    Never,
}

impl clap::ValueEnum for ColorChoice {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Always, Self::Auto, Self::Never]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Always => clap::builder::PossibleValue::new("always"),
            Self::Auto => clap::builder::PossibleValue::new("auto"),
            Self::Never => clap::builder::PossibleValue::new("never"),
        })
    }
}

impl Default for ColorChoice {
    fn default() -> Self {
        Self::Auto
    }
}

impl std::str::FromStr for ColorChoice {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "always" => Ok(Self::Always),
            "auto" => Ok(Self::Auto),
            "never" => Ok(Self::Never),
            _ => Err(VersionError::ParseError {
                message: format!("unknown color choice: {s}"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() {
        assert!(parse_version("1.4.0").is_ok());
        assert!(parse_version("not-a-version").is_err());
    }

    #[test]
    fn test_color_choice_from_str() {
        assert_eq!("auto".parse::<ColorChoice>().unwrap(), ColorChoice::Auto);
        assert!("rainbow".parse::<ColorChoice>().is_err());
    }
}
