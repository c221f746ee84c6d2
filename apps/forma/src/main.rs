//! forma - formula-driven installer for single-binary tools
//!
//! The CLI loads a formula, resolves placeholder bindings, and drives the
//! install pipeline while rendering progress events.

mod cli;
mod display;
mod error;
mod events;

use crate::cli::{Cli, Commands};
use crate::display::{CheckSummary, OperationResult, OutputRenderer};
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use forma_config::Config;
use forma_events::EventReceiver;
use forma_formula::{Formula, SourceLocation};
use forma_install::{Installer, InstallerConfig, TestOutcome};
use forma_net::NetConfig;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;
use tokio::select;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        if !json_mode {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting forma v{}", env!("CARGO_PKG_VERSION"));

    // Configuration precedence: file, environment, CLI flags
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
    config.merge_env()?;
    if let Some(color) = cli.global.color {
        config.general.color = color;
    }

    let colors_enabled = match config.general.color {
        forma_types::ColorChoice::Always => true,
        forma_types::ColorChoice::Never => false,
        forma_types::ColorChoice::Auto => console::Term::stdout().features().colors_supported(),
    };

    let renderer = OutputRenderer::new(cli.global.json);
    let mut event_handler = EventHandler::new(colors_enabled && !cli.global.json, cli.global.debug);

    let (event_sender, event_receiver) = forma_events::channel();

    let result = {
        let command_future = execute_command(cli.command, config, event_sender);
        execute_command_with_events(command_future, event_receiver, &mut event_handler).await?
    };

    renderer.render_result(&result)?;

    // A failed smoke test leaves the install in place but the command fails
    let failed_test = match &result {
        OperationResult::Install(report) => match &report.test {
            TestOutcome::Failed { message } => Some(message.clone()),
            _ => None,
        },
        OperationResult::Test { test, .. } => match test {
            TestOutcome::Failed { message } => Some(message.clone()),
            _ => None,
        },
        OperationResult::Check(_) => None,
    };
    if let Some(message) = failed_test {
        return Err(CliError::TestFailed(message));
    }

    info!("Command completed successfully");
    Ok(())
}

/// Drive the command while draining pipeline events concurrently
async fn execute_command_with_events(
    command_future: impl std::future::Future<Output = Result<OperationResult, CliError>>,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<OperationResult, CliError> {
    let mut command_future = Box::pin(command_future);

    loop {
        select! {
            // Command completed
            result = &mut command_future => {
                // Drain any remaining events
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(event);
                }
                return result;
            }

            // Event received
            event = event_receiver.recv() => {
                match event {
                    Some(event) => event_handler.handle_event(event),
                    None => { /* Channel closed: keep waiting for command to finish */ }
                }
            }
        }
    }
}

/// Execute the specified command
async fn execute_command(
    command: Commands,
    config: Config,
    event_sender: forma_events::EventSender,
) -> Result<OperationResult, CliError> {
    match command {
        Commands::Install {
            formula,
            bin_dir,
            vars,
            skip_test,
        } => {
            let formula = load_and_resolve(&formula, &vars).await?;
            let installer = build_installer(&config, bin_dir, skip_test)?
                .with_event_sender(event_sender);
            let report = installer.install(&formula).await?;
            Ok(OperationResult::Install(report))
        }

        Commands::Check { formula, vars } => {
            let formula = Formula::from_file(&formula).await?;
            check_formula(&formula, &vars)
        }

        Commands::Test { formula, bin_dir } => {
            let formula = Formula::from_file(&formula).await?;
            let installer =
                build_installer(&config, bin_dir, false)?.with_event_sender(event_sender);
            let test = installer.test(&formula).await?;
            Ok(OperationResult::Test {
                package: formula.package.name.clone(),
                test,
            })
        }
    }
}

/// Load a formula and substitute `--var` bindings
async fn load_and_resolve(
    path: &Path,
    vars: &[(String, String)],
) -> Result<Formula, CliError> {
    let formula = Formula::from_file(path).await?;
    let bindings = placeholder_bindings(&formula, vars)?;
    Ok(formula.resolve(&bindings)?)
}

/// Collect placeholder values: `--var` flags first, process environment as
/// the fallback
fn placeholder_bindings(
    formula: &Formula,
    vars: &[(String, String)],
) -> Result<BTreeMap<String, String>, CliError> {
    let mut bindings: BTreeMap<String, String> = vars.iter().cloned().collect();
    for name in formula.placeholders()? {
        if !bindings.contains_key(&name) {
            if let Ok(value) = std::env::var(&name) {
                bindings.insert(name, value);
            }
        }
    }
    Ok(bindings)
}

/// Validate a formula without touching the filesystem or network
fn check_formula(
    formula: &Formula,
    vars: &[(String, String)],
) -> Result<OperationResult, CliError> {
    formula.validate()?;

    let bindings = placeholder_bindings(formula, vars)?;
    let unresolved: Vec<String> = formula
        .placeholders()?
        .into_iter()
        .filter(|name| !bindings.contains_key(name))
        .collect();

    let installable = if unresolved.is_empty() {
        let resolved = formula.resolve(&bindings)?;
        resolved.sha256().is_ok()
    } else {
        false
    };

    let source = match formula.source_location()? {
        SourceLocation::Url(url) => url.to_string(),
        SourceLocation::Path(path) => path.display().to_string(),
    };
    let method = match formula.method()? {
        forma_formula::InstallMethod::BuildFromSource(_) => {
            forma_install::MethodKind::BuildFromSource
        }
        forma_formula::InstallMethod::InstallPrebuilt(_) => {
            forma_install::MethodKind::InstallPrebuilt
        }
    };

    Ok(OperationResult::Check(CheckSummary {
        package: formula.package.name.clone(),
        version: formula.package.version.clone(),
        method,
        source,
        unresolved,
        installable,
    }))
}

/// Assemble the installer from configuration and CLI overrides
fn build_installer(
    config: &Config,
    bin_dir: Option<PathBuf>,
    skip_test: bool,
) -> Result<Installer, CliError> {
    let net = NetConfig {
        timeout: Duration::from_secs(config.network.timeout),
        retry_count: config.network.retries,
        retry_delay: Duration::from_secs(config.network.retry_delay),
        ..NetConfig::default()
    };

    let installer_config = InstallerConfig {
        bin_dir: bin_dir.unwrap_or_else(|| config.bin_dir()),
        work_dir: config.paths.work_dir.clone(),
        net,
        skip_test,
        ..InstallerConfig::default()
    };

    Ok(Installer::new(installer_config)?)
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled_flag: bool) {
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_enabled_flag;

    if json_mode {
        // Suppress all console logging to avoid contaminating JSON output
        tracing_subscriber::fmt()
            .with_writer(std::io::sink)
            .with_env_filter("off")
            .init();
    } else if debug_enabled {
        // Structured JSON logs to a file under the scratch directory
        let log_dir = std::env::temp_dir().join("forma-logs");
        if let Err(e) = std::fs::create_dir_all(&log_dir) {
            eprintln!("Warning: Failed to create log directory: {e}");
        }

        let log_file = log_dir.join(format!(
            "forma-{}.log",
            chrono::Utc::now().format("%Y%m%d-%H%M%S")
        ));

        match std::fs::File::create(&log_file) {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .json()
                    .with_writer(file)
                    .with_env_filter(
                        tracing_subscriber::EnvFilter::try_from_default_env()
                            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,forma=debug")),
                    )
                    .init();

                eprintln!("Debug logging enabled: {}", log_file.display());
            }
            Err(e) => {
                eprintln!("Warning: Failed to create log file: {e}");
                tracing_subscriber::fmt()
                    .with_env_filter(
                        tracing_subscriber::EnvFilter::try_from_default_env()
                            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,forma=info")),
                    )
                    .init();
            }
        }
    } else {
        // Normal mode: minimal logging to stderr
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn,forma=warn")),
            )
            .init();
    }
}
