#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Installation pipeline for forma
//!
//! Consumes a resolved formula and drives the sequential install contract:
//! fetch, verify, toolchain check, build, place, smoke test. Every step runs
//! exactly once per attempt and every failure is terminal for the attempt;
//! retries belong to the operator.

mod build;
mod extract;
mod fetch;
mod place;
mod report;
mod smoke;
mod toolchain;

pub use report::{InstallReport, MethodKind, TestOutcome};
pub use smoke::smoke_test;

use forma_errors::{Error, FormulaError};
use forma_events::{Event, EventEmitter, EventSender};
use forma_formula::{Formula, InstallMethod};
use forma_net::{NetClient, NetConfig};
use std::path::PathBuf;
use std::time::Duration;

/// Installer configuration
#[derive(Debug, Clone)]
pub struct InstallerConfig {
    /// Destination directory for installed binaries
    pub bin_dir: PathBuf,
    /// Scratch directory; a fresh temp dir is used when unset
    pub work_dir: Option<PathBuf>,
    /// Network client settings for artifact downloads
    pub net: NetConfig,
    /// Skip the post-install smoke test
    pub skip_test: bool,
    /// Deadline for the smoke test process
    pub test_timeout: Duration,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            bin_dir: PathBuf::from("bin"),
            work_dir: None,
            net: NetConfig::default(),
            skip_test: false,
            test_timeout: Duration::from_secs(60),
        }
    }
}

/// Formula installer
#[derive(Clone)]
pub struct Installer {
    config: InstallerConfig,
    net: NetClient,
    tx: Option<EventSender>,
}

impl EventEmitter for Installer {
    fn event_sender(&self) -> Option<&EventSender> {
        self.tx.as_ref()
    }
}

impl Installer {
    /// Create a new installer
    ///
    /// # Errors
    ///
    /// Returns an error if the network client cannot be created.
    pub fn new(config: InstallerConfig) -> Result<Self, Error> {
        let net = NetClient::new(config.net.clone())?;
        Ok(Self {
            config,
            net,
            tx: None,
        })
    }

    /// Attach an event sender for progress reporting
    #[must_use]
    pub fn with_event_sender(mut self, tx: EventSender) -> Self {
        self.tx = Some(tx);
        self
    }

    /// Install destination for a package name
    #[must_use]
    pub fn bin_path(&self, name: &str) -> PathBuf {
        self.config.bin_dir.join(name)
    }

    /// Run the full install pipeline for a resolved formula
    ///
    /// Order is fixed: fetch, verify, toolchain check, build, place, smoke
    /// test. A checksum mismatch aborts before any build or placement; a
    /// smoke-test failure is recorded in the report without reversing the
    /// completed install.
    ///
    /// # Errors
    ///
    /// Returns an error if the formula is invalid or unresolved, or if any
    /// step up to and including placement fails.
    pub async fn install(&self, formula: &Formula) -> Result<InstallReport, Error> {
        formula.validate()?;
        if let Some(name) = formula.placeholders()?.first() {
            return Err(FormulaError::UnresolvedPlaceholder { name: name.clone() }.into());
        }
        let expected = formula.sha256()?;
        let name = &formula.package.name;

        // Scratch space lives for the duration of the attempt
        let scratch = match &self.config.work_dir {
            Some(dir) => {
                tokio::fs::create_dir_all(dir).await?;
                tempfile::tempdir_in(dir)
            }
            None => tempfile::tempdir(),
        }
        .map_err(|e| Error::internal(format!("failed to create work dir: {e}")))?;

        // Fetch and verify; nothing past this line runs on a hash mismatch
        let fetched = fetch::acquire(
            &self.net,
            formula,
            &expected,
            scratch.path(),
            self.tx.as_ref(),
        )
        .await?;

        let method = formula.method()?;
        let (staged, method_kind) = match method {
            InstallMethod::BuildFromSource(procedure) => {
                if let Some(spec) = &procedure.toolchain {
                    let path = toolchain::check(spec).await?;
                    self.emit(Event::ToolchainFound {
                        name: spec.name.clone(),
                        path: path.display().to_string(),
                    });
                }

                let tree = extract::prepare_source_tree(&fetched.path, scratch.path()).await?;
                let artifact =
                    build::run(name, procedure, &tree, self.tx.as_ref()).await?;
                (place::Staged::built(artifact), MethodKind::BuildFromSource)
            }
            InstallMethod::InstallPrebuilt(procedure) => (
                place::Staged::prebuilt(fetched.path.clone(), *procedure),
                MethodKind::InstallPrebuilt,
            ),
        };

        self.emit(Event::Installing {
            package: name.clone(),
        });
        let bin_path = place::place(&staged, &self.config.bin_dir, name).await?;
        self.emit(Event::Installed {
            package: name.clone(),
            path: bin_path.display().to_string(),
        });

        // The install is complete; the smoke test only annotates the report
        let test = if self.config.skip_test {
            TestOutcome::Skipped
        } else if let Some(procedure) = &formula.test {
            smoke::smoke_test(
                name,
                &bin_path,
                &procedure.args,
                self.config.test_timeout,
                self.tx.as_ref(),
            )
            .await?
        } else {
            TestOutcome::Skipped
        };

        Ok(InstallReport {
            package: name.clone(),
            version: formula.package.version.clone(),
            bin_path,
            method: method_kind,
            bytes_fetched: fetched.bytes,
            sha256: expected.to_hex(),
            test,
        })
    }

    /// Run only the smoke test against an already-installed binary
    ///
    /// # Errors
    ///
    /// Returns an error if the binary is not installed or the test process
    /// cannot be examined.
    pub async fn test(&self, formula: &Formula) -> Result<TestOutcome, Error> {
        formula.validate()?;
        let name = &formula.package.name;
        let bin_path = self.bin_path(name);

        if !tokio::fs::try_exists(&bin_path).await.unwrap_or(false) {
            return Err(forma_errors::InstallError::NotInstalled {
                path: bin_path.display().to_string(),
            }
            .into());
        }

        match &formula.test {
            Some(procedure) => {
                smoke::smoke_test(
                    name,
                    &bin_path,
                    &procedure.args,
                    self.config.test_timeout,
                    self.tx.as_ref(),
                )
                .await
            }
            None => Ok(TestOutcome::Skipped),
        }
    }
}
