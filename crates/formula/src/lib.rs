#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Package formula handling for forma
//!
//! This crate defines the formula.toml format: a declarative descriptor
//! naming a source artifact, its sha256 checksum, one install procedure
//! (build-from-source or prebuilt) and an optional post-install smoke test.
//! A formula is authored once, read at install time, and never mutated; the
//! URL and checksum may carry `${NAME}` placeholders that a separate
//! substitution step resolves before installation.

pub mod template;

use forma_errors::{Error, FormulaError};
use forma_hash::Digest;
use forma_types::{parse_version, ToolchainSpec, Version};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Package formula (formula.toml contents)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Formula {
    pub package: PackageInfo,
    pub source: Source,
    pub install: InstallSection,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<TestProcedure>,
}

/// Package metadata section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
}

/// Source section: where the artifact comes from and its expected checksum
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    /// Remote artifact URL (exactly one of `url`, `path`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Local artifact path (exactly one of `url`, `path`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// SHA-256 of the fetched artifact, hex-encoded; may be a placeholder
    /// until the formula is resolved
    pub sha256: String,
}

/// Where the source artifact is located
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLocation<'a> {
    Url(&'a str),
    Path(&'a Path),
}

/// Install section holding exactly one procedure variant
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildProcedure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prebuilt: Option<PrebuiltProcedure>,
}

/// The active install procedure variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallMethod<'a> {
    BuildFromSource(&'a BuildProcedure),
    InstallPrebuilt(&'a PrebuiltProcedure),
}

/// Build-from-source procedure: run a command in the source tree, then place
/// the produced artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildProcedure {
    /// Build-time toolchain requirement (e.g. `go@1.14`); checked before the
    /// build command runs, never needed at runtime
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toolchain: Option<ToolchainSpec>,
    /// Build command, argv form, executed in the source tree
    pub command: Vec<String>,
    /// Produced binary, relative to the source tree
    pub artifact: String,
}

/// Prebuilt procedure: place the fetched artifact directly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrebuiltProcedure {
    /// Add execute bits after placement (downloads never carry them)
    #[serde(default = "default_fix_mode")]
    pub fix_mode: bool,
}

fn default_fix_mode() -> bool {
    true
}

impl Default for PrebuiltProcedure {
    fn default() -> Self {
        Self {
            fix_mode: default_fix_mode(),
        }
    }
}

/// Post-install smoke test: invoke the installed binary, pass iff exit 0
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestProcedure {
    /// Arguments passed to the installed binary
    pub args: Vec<String>,
}

impl Formula {
    /// Load formula from TOML string
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is malformed.
    pub fn from_toml(content: &str) -> Result<Self, Error> {
        toml::from_str(content).map_err(|e| {
            FormulaError::ParseError {
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Load formula from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is malformed.
    pub async fn from_file(path: &Path) -> Result<Self, Error> {
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| FormulaError::ParseError {
                    message: format!("failed to read formula: {e}"),
                })?;
        Self::from_toml(&content)
    }

    /// Serialize to TOML string
    ///
    /// # Errors
    ///
    /// Returns an error if the formula cannot be serialized to TOML format.
    pub fn to_toml(&self) -> Result<String, Error> {
        toml::to_string_pretty(self).map_err(|e| {
            FormulaError::Invalid {
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Get the active install procedure
    ///
    /// # Errors
    ///
    /// Returns an error unless exactly one of `install.build`,
    /// `install.prebuilt` is declared.
    pub fn method(&self) -> Result<InstallMethod<'_>, Error> {
        match (&self.install.build, &self.install.prebuilt) {
            (Some(build), None) => Ok(InstallMethod::BuildFromSource(build)),
            (None, Some(prebuilt)) => Ok(InstallMethod::InstallPrebuilt(prebuilt)),
            (None, None) => Err(FormulaError::NoInstallProcedure.into()),
            (Some(_), Some(_)) => Err(FormulaError::AmbiguousInstallProcedure.into()),
        }
    }

    /// Get the source location
    ///
    /// # Errors
    ///
    /// Returns an error unless exactly one of `source.url`, `source.path` is
    /// declared.
    pub fn source_location(&self) -> Result<SourceLocation<'_>, Error> {
        match (&self.source.url, &self.source.path) {
            (Some(url), None) => Ok(SourceLocation::Url(url)),
            (None, Some(path)) => Ok(SourceLocation::Path(Path::new(path))),
            (None, None) => Err(FormulaError::NoSource.into()),
            (Some(_), Some(_)) => Err(FormulaError::AmbiguousSource.into()),
        }
    }

    /// Parse the package version, if declared
    ///
    /// # Errors
    ///
    /// Returns an error if the version string is not a valid semantic version.
    pub fn version(&self) -> Result<Option<Version>, Error> {
        match &self.package.version {
            Some(v) => Ok(Some(parse_version(v)?)),
            None => Ok(None),
        }
    }

    /// Parse the expected checksum
    ///
    /// # Errors
    ///
    /// Returns an error if `source.sha256` is not 64 hex characters, which
    /// includes the case where it still holds an unresolved placeholder.
    pub fn sha256(&self) -> Result<Digest, Error> {
        Digest::from_hex(&self.source.sha256)
    }

    /// Collect `${NAME}` placeholders remaining in the late-bound fields
    /// (`source.url`, `source.sha256`)
    ///
    /// # Errors
    ///
    /// Returns an error on malformed placeholder syntax.
    pub fn placeholders(&self) -> Result<Vec<String>, Error> {
        let mut names = Vec::new();
        if let Some(url) = &self.source.url {
            names.extend(template::placeholders(url, "source.url")?);
        }
        if let Some(path) = &self.source.path {
            names.extend(template::placeholders(path, "source.path")?);
        }
        names.extend(template::placeholders(
            &self.source.sha256,
            "source.sha256",
        )?);
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Substitute placeholders in the late-bound fields, producing a fully
    /// resolved formula
    ///
    /// Substitution is pure: the receiver is untouched and the result
    /// depends only on the formula text and `vars`.
    ///
    /// # Errors
    ///
    /// Returns an error if any placeholder has no entry in `vars` or the
    /// placeholder syntax is malformed.
    pub fn resolve(&self, vars: &BTreeMap<String, String>) -> Result<Self, Error> {
        let mut resolved = self.clone();
        if let Some(url) = &self.source.url {
            resolved.source.url = Some(template::render(url, vars, "source.url")?);
        }
        if let Some(path) = &self.source.path {
            resolved.source.path = Some(template::render(path, vars, "source.path")?);
        }
        resolved.source.sha256 = template::render(&self.source.sha256, vars, "source.sha256")?;
        Ok(resolved)
    }

    /// Validate formula fields
    ///
    /// Checks structure only; placeholders may remain in the late-bound
    /// fields. `sha256()` is the gate for installability.
    ///
    /// # Errors
    ///
    /// Returns an error if a required field is empty or invalid, the install
    /// variant or source selection is not exactly one, or the declared
    /// version is not semver.
    pub fn validate(&self) -> Result<(), Error> {
        if self.package.name.is_empty() {
            return Err(FormulaError::MissingField {
                field: "package.name".to_string(),
            }
            .into());
        }
        if self.package.name.contains('/') || self.package.name.contains("..") {
            return Err(FormulaError::Invalid {
                message: format!("package name must be a bare file name: {}", self.package.name),
            }
            .into());
        }
        if self.package.description.is_empty() {
            return Err(FormulaError::MissingField {
                field: "package.description".to_string(),
            }
            .into());
        }

        self.version()?;
        self.source_location()?;

        if self.source.sha256.is_empty() {
            return Err(FormulaError::MissingField {
                field: "source.sha256".to_string(),
            }
            .into());
        }

        match self.method()? {
            InstallMethod::BuildFromSource(build) => {
                if build.command.is_empty() {
                    return Err(FormulaError::MissingField {
                        field: "install.build.command".to_string(),
                    }
                    .into());
                }
                if build.artifact.is_empty() {
                    return Err(FormulaError::MissingField {
                        field: "install.build.artifact".to_string(),
                    }
                    .into());
                }
            }
            InstallMethod::InstallPrebuilt(_) => {}
        }

        if let Some(test) = &self.test {
            if test.args.is_empty() {
                return Err(FormulaError::MissingField {
                    field: "test.args".to_string(),
                }
                .into());
            }
        }

        // Placeholder syntax must be well-formed even while unresolved
        self.placeholders()?;

        Ok(())
    }
}

/// Builder for creating formulas
pub struct FormulaBuilder {
    formula: Formula,
}

impl FormulaBuilder {
    /// Create a new builder for a prebuilt-artifact formula
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            formula: Formula {
                package: PackageInfo {
                    name: name.into(),
                    description: description.into(),
                    version: None,
                    homepage: None,
                    license: None,
                },
                source: Source {
                    url: None,
                    path: None,
                    sha256: String::new(),
                },
                install: InstallSection::default(),
                test: None,
            },
        }
    }

    /// Set package version
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.formula.package.version = Some(version.into());
        self
    }

    /// Set the source URL
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.formula.source.url = Some(url.into());
        self
    }

    /// Set the source path
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.formula.source.path = Some(path.into());
        self
    }

    /// Set the expected checksum
    #[must_use]
    pub fn sha256(mut self, sha256: impl Into<String>) -> Self {
        self.formula.source.sha256 = sha256.into();
        self
    }

    /// Select the build-from-source procedure
    #[must_use]
    pub fn build(mut self, procedure: BuildProcedure) -> Self {
        self.formula.install.build = Some(procedure);
        self
    }

    /// Select the prebuilt procedure
    #[must_use]
    pub fn prebuilt(mut self, procedure: PrebuiltProcedure) -> Self {
        self.formula.install.prebuilt = Some(procedure);
        self
    }

    /// Set the smoke test
    #[must_use]
    pub fn test(mut self, args: Vec<String>) -> Self {
        self.formula.test = Some(TestProcedure { args });
        self
    }

    /// Build the formula
    ///
    /// # Errors
    ///
    /// Returns an error if the formula validation fails.
    pub fn finish(self) -> Result<Formula, Error> {
        self.formula.validate()?;
        Ok(self.formula)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUILD_FORMULA: &str = r#"
[package]
name = "cuckoo"
description = "CLI tool for GitLab CI and Kubernetes deployments"

[source]
url = "https://artifacts.example.com/${CIRCLE_BUILD_NUM}/cuckoo-src.tar.gz"
sha256 = "${ARTIFACT_SHA256}"

[install.build]
toolchain = "go@1.14"
command = ["go", "build", "-v"]
artifact = "cuckoo"

[test]
args = ["help"]
"#;

    const PREBUILT_FORMULA: &str = r#"
[package]
name = "cuckoo"
description = "CLI tool for GitLab CI and Kubernetes deployments"

[source]
url = "https://artifacts.example.com/42/cuckoo"
sha256 = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"

[install.prebuilt]

[test]
args = ["help"]
"#;

    #[test]
    fn test_parse_build_variant() {
        let formula = Formula::from_toml(BUILD_FORMULA).unwrap();
        formula.validate().unwrap();

        match formula.method().unwrap() {
            InstallMethod::BuildFromSource(build) => {
                assert_eq!(build.toolchain.as_ref().unwrap().name, "go");
                assert_eq!(build.command, vec!["go", "build", "-v"]);
                assert_eq!(build.artifact, "cuckoo");
            }
            InstallMethod::InstallPrebuilt(_) => panic!("expected build variant"),
        }
    }

    #[test]
    fn test_parse_prebuilt_variant() {
        let formula = Formula::from_toml(PREBUILT_FORMULA).unwrap();
        formula.validate().unwrap();

        match formula.method().unwrap() {
            InstallMethod::InstallPrebuilt(prebuilt) => assert!(prebuilt.fix_mode),
            InstallMethod::BuildFromSource(_) => panic!("expected prebuilt variant"),
        }
        assert!(formula.sha256().is_ok());
    }

    #[test]
    fn test_both_variants_rejected() {
        let mut formula = Formula::from_toml(PREBUILT_FORMULA).unwrap();
        formula.install.build = Some(BuildProcedure {
            toolchain: None,
            command: vec!["make".to_string()],
            artifact: "cuckoo".to_string(),
        });
        assert!(formula.validate().is_err());
    }

    #[test]
    fn test_neither_variant_rejected() {
        let mut formula = Formula::from_toml(PREBUILT_FORMULA).unwrap();
        formula.install.prebuilt = None;
        assert!(formula.validate().is_err());
    }

    #[test]
    fn test_ambiguous_source_rejected() {
        let mut formula = Formula::from_toml(PREBUILT_FORMULA).unwrap();
        formula.source.path = Some("./cuckoo".to_string());
        assert!(formula.validate().is_err());
    }

    #[test]
    fn test_placeholders_listed() {
        let formula = Formula::from_toml(BUILD_FORMULA).unwrap();
        let names = formula.placeholders().unwrap();
        assert_eq!(names, vec!["ARTIFACT_SHA256", "CIRCLE_BUILD_NUM"]);
    }

    #[test]
    fn test_resolve_substitutes_late_bound_fields() {
        let formula = Formula::from_toml(BUILD_FORMULA).unwrap();
        let mut vars = BTreeMap::new();
        vars.insert("CIRCLE_BUILD_NUM".to_string(), "1234".to_string());
        vars.insert(
            "ARTIFACT_SHA256".to_string(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9".to_string(),
        );

        let resolved = formula.resolve(&vars).unwrap();
        assert_eq!(
            resolved.source.url.as_deref(),
            Some("https://artifacts.example.com/1234/cuckoo-src.tar.gz")
        );
        assert!(resolved.placeholders().unwrap().is_empty());
        assert!(resolved.sha256().is_ok());

        // The receiver is untouched
        assert!(formula.source.sha256.contains("${ARTIFACT_SHA256}"));
    }

    #[test]
    fn test_resolve_missing_var_fails() {
        let formula = Formula::from_toml(BUILD_FORMULA).unwrap();
        let vars = BTreeMap::new();
        assert!(formula.resolve(&vars).is_err());
    }

    #[test]
    fn test_unresolved_sha256_not_installable() {
        let formula = Formula::from_toml(BUILD_FORMULA).unwrap();
        assert!(formula.sha256().is_err());
    }

    #[tokio::test]
    async fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cuckoo.toml");
        tokio::fs::write(&path, PREBUILT_FORMULA).await.unwrap();

        let formula = Formula::from_file(&path).await.unwrap();
        assert_eq!(formula.package.name, "cuckoo");
        assert!(formula.install.prebuilt.is_some());
    }

    #[tokio::test]
    async fn test_from_file_missing_is_parse_error() {
        let err = Formula::from_file(Path::new("/nonexistent/cuckoo.toml"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to read formula"), "{err}");
    }

    #[test]
    fn test_toml_round_trip() {
        let formula = Formula::from_toml(PREBUILT_FORMULA).unwrap();
        let text = formula.to_toml().unwrap();
        let back = Formula::from_toml(&text).unwrap();
        assert_eq!(back.package.name, "cuckoo");
        assert!(back.install.prebuilt.is_some());
    }

    #[test]
    fn test_builder() {
        let formula = FormulaBuilder::new("cuckoo", "example tool")
            .version("1.4.0")
            .path("./cuckoo")
            .sha256("b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9")
            .prebuilt(PrebuiltProcedure::default())
            .test(vec!["help".to_string()])
            .finish()
            .unwrap();
        assert_eq!(formula.package.version.as_deref(), Some("1.4.0"));
    }
}
