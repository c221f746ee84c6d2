#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for forma
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/forma/config.toml)
//! - Environment variables
//! - CLI flags (applied by the CLI itself, highest precedence)

use forma_errors::{ConfigError, Error};
use forma_types::ColorChoice;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub paths: PathConfig,
}

/// General application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_color_choice")]
    pub color: ColorChoice,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            color: default_color_choice(),
        }
    }
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_timeout")]
    pub timeout: u64, // seconds
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_delay")]
    pub retry_delay: u64, // seconds
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            retries: default_retries(),
            retry_delay: default_retry_delay(),
        }
    }
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    /// Install destination for binaries (default: ~/.local/bin)
    pub bin_dir: Option<PathBuf>,
    /// Scratch space for downloads and builds (default: a fresh temp dir)
    pub work_dir: Option<PathBuf>,
}

fn default_color_choice() -> ColorChoice {
    ColorChoice::Auto
}

fn default_timeout() -> u64 {
    300
}

fn default_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    1
}

impl Config {
    /// Load configuration from a specific file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid TOML.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from the default location, falling back to
    /// defaults when no file exists
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed.
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        if let Some(path) = path {
            return Self::load_from_file(path).await;
        }

        if let Some(default_path) = Self::default_path() {
            if fs::try_exists(&default_path).await.unwrap_or(false) {
                return Self::load_from_file(&default_path).await;
            }
        }

        Ok(Self::default())
    }

    /// Default config file location (~/.config/forma/config.toml)
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        std::env::var_os("HOME")
            .map(|home| PathBuf::from(home).join(".config").join("forma").join("config.toml"))
    }

    /// Merge environment variables into the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if an environment variable holds an invalid value.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // FORMA_COLOR
        if let Ok(color) = std::env::var("FORMA_COLOR") {
            self.general.color = color.parse().map_err(|_| ConfigError::InvalidValue {
                field: "FORMA_COLOR".to_string(),
                value: color,
            })?;
        }

        // FORMA_BIN_DIR
        if let Ok(bin_dir) = std::env::var("FORMA_BIN_DIR") {
            self.paths.bin_dir = Some(PathBuf::from(bin_dir));
        }

        // FORMA_WORK_DIR
        if let Ok(work_dir) = std::env::var("FORMA_WORK_DIR") {
            self.paths.work_dir = Some(PathBuf::from(work_dir));
        }

        // FORMA_NET_RETRIES
        if let Ok(retries) = std::env::var("FORMA_NET_RETRIES") {
            self.network.retries = retries.parse().map_err(|_| ConfigError::InvalidValue {
                field: "FORMA_NET_RETRIES".to_string(),
                value: retries,
            })?;
        }

        Ok(())
    }

    /// Install destination, with the built-in fallback applied
    #[must_use]
    pub fn bin_dir(&self) -> PathBuf {
        self.paths.bin_dir.clone().unwrap_or_else(|| {
            std::env::var_os("HOME")
                .map(|home| PathBuf::from(home).join(".local").join("bin"))
                .unwrap_or_else(|| PathBuf::from("bin"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.network.timeout, 300);
        assert_eq!(config.network.retries, 3);
        assert_eq!(config.general.color, ColorChoice::Auto);
    }

    #[test]
    fn test_parse_partial_file() {
        let config: Config = toml::from_str(
            r#"
[network]
retries = 7

[paths]
bin_dir = "/opt/tools/bin"
"#,
        )
        .unwrap();
        assert_eq!(config.network.retries, 7);
        assert_eq!(config.network.timeout, 300); // default fills in
        assert_eq!(
            config.paths.bin_dir.as_deref(),
            Some(Path::new("/opt/tools/bin"))
        );
    }

    #[tokio::test]
    async fn test_load_from_file() {
        use std::io::Write;
        let mut temp = tempfile::NamedTempFile::new().unwrap();
        writeln!(temp, "[general]\ncolor = \"never\"").unwrap();

        let config = Config::load_from_file(temp.path()).await.unwrap();
        assert_eq!(config.general.color, ColorChoice::Never);
    }

    #[tokio::test]
    async fn test_missing_explicit_file_is_error() {
        let result = Config::load_from_file(Path::new("/nonexistent/forma.toml")).await;
        assert!(result.is_err());
    }
}
