//! Command line interface definition

use clap::{Parser, Subcommand};
use forma_types::ColorChoice;
use std::path::PathBuf;

/// forma - formula-driven installer for single-binary tools
#[derive(Parser)]
#[command(name = "forma")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Formula-driven installer for single-binary tools")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Install the binary described by a formula
    #[command(alias = "i")]
    Install {
        /// Path to the formula file (.toml)
        formula: PathBuf,

        /// Install destination directory
        #[arg(long, value_name = "DIR")]
        bin_dir: Option<PathBuf>,

        /// Bind a `${NAME}` placeholder, e.g. --var CIRCLE_BUILD_NUM=1234
        #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        vars: Vec<(String, String)>,

        /// Skip the post-install smoke test
        #[arg(long)]
        skip_test: bool,
    },

    /// Validate a formula without installing anything
    Check {
        /// Path to the formula file (.toml)
        formula: PathBuf,

        /// Bind a `${NAME}` placeholder
        #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        vars: Vec<(String, String)>,
    },

    /// Run the smoke test against an already-installed binary
    Test {
        /// Path to the formula file (.toml)
        formula: PathBuf,

        /// Install destination directory
        #[arg(long, value_name = "DIR")]
        bin_dir: Option<PathBuf>,
    },
}

/// Parse a `KEY=VALUE` placeholder binding
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{s}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("CIRCLE_BUILD_NUM=1234").unwrap(),
            ("CIRCLE_BUILD_NUM".to_string(), "1234".to_string())
        );
        // Values may contain '='
        assert_eq!(
            parse_key_val("K=a=b").unwrap(),
            ("K".to_string(), "a=b".to_string())
        );
        assert!(parse_key_val("novalue").is_err());
        assert!(parse_key_val("=x").is_err());
    }

    #[test]
    fn test_cli_parses_install() {
        let cli = Cli::try_parse_from([
            "forma",
            "install",
            "cuckoo.toml",
            "--var",
            "ARTIFACT_SHA256=abc",
            "--skip-test",
            "--json",
        ])
        .unwrap();
        assert!(cli.global.json);
        match cli.command {
            Commands::Install {
                formula,
                vars,
                skip_test,
                ..
            } => {
                assert_eq!(formula, PathBuf::from("cuckoo.toml"));
                assert_eq!(vars.len(), 1);
                assert!(skip_test);
            }
            _ => panic!("expected install command"),
        }
    }
}
