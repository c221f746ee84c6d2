//! Build-time toolchain specifications

use forma_errors::VersionError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A build-time dependency on an external toolchain, written `name@version`
/// (e.g. `go@1.14`). The version part is optional; `go` alone means any
/// version found on PATH is acceptable.
///
/// The toolchain is required only while the install procedure runs, never by
/// the installed binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainSpec {
    pub name: String,
    pub version: Option<String>,
}

impl ToolchainSpec {
    /// Parse a toolchain spec from `name` or `name@version` form
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or a trailing `@` has no
    /// version after it.
    pub fn parse(s: &str) -> Result<Self, VersionError> {
        let (name, version) = match s.split_once('@') {
            Some((name, version)) => (name.trim(), Some(version.trim())),
            None => (s.trim(), None),
        };

        if name.is_empty() {
            return Err(VersionError::InvalidToolchainSpec {
                input: s.to_string(),
            });
        }

        if let Some(v) = version {
            if v.is_empty() {
                return Err(VersionError::InvalidToolchainSpec {
                    input: s.to_string(),
                });
            }
        }

        Ok(Self {
            name: name.to_string(),
            version: version.map(str::to_string),
        })
    }
}

impl fmt::Display for ToolchainSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}@{}", self.name, version),
            None => write!(f, "{}", self.name),
        }
    }
}

impl Serialize for ToolchainSpec {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ToolchainSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
