//! Event handling and progress display

use console::style;
use forma_events::Event;

/// Renders pipeline events as they arrive
pub struct EventHandler {
    colors_enabled: bool,
    debug_enabled: bool,
    /// Last whole-percent value printed per download, to throttle output
    last_percent: Option<u64>,
}

impl EventHandler {
    pub fn new(colors_enabled: bool, debug_enabled: bool) -> Self {
        Self {
            colors_enabled,
            debug_enabled,
            last_percent: None,
        }
    }

    /// Handle incoming event
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::DownloadStarted { url, size } => {
                self.last_percent = None;
                match size {
                    Some(bytes) => {
                        self.status(&format!("Downloading {url} ({})", format_bytes(bytes)));
                    }
                    None => self.status(&format!("Downloading {url}")),
                }
            }
            Event::DownloadProgress {
                bytes_downloaded,
                total_bytes,
                ..
            } => {
                if total_bytes == 0 {
                    return;
                }
                let percent = bytes_downloaded * 100 / total_bytes;
                // One line per 10% is plenty
                if self.last_percent.is_none_or(|p| percent >= p + 10) {
                    self.last_percent = Some(percent);
                    self.status(&format!(
                        "  {percent}% ({} / {})",
                        format_bytes(bytes_downloaded),
                        format_bytes(total_bytes)
                    ));
                }
            }
            Event::DownloadCompleted { url, bytes } => {
                self.status(&format!("Downloaded {url} ({})", format_bytes(bytes)));
            }
            Event::DownloadFailed { url, error } => {
                self.error(&format!("Download failed for {url}: {error}"));
            }

            Event::IntegrityVerified { file, sha256 } => {
                self.status(&format!("Verified sha256 of {file} ({sha256})"));
            }

            Event::ToolchainFound { name, path } => {
                self.status(&format!("Found toolchain {name} at {path}"));
            }
            Event::BuildStarting { package, command } => {
                self.status(&format!("Building {package}: {command}"));
            }
            Event::BuildCompleted { package } => {
                self.success(&format!("Built {package}"));
            }

            Event::Installing { package } => {
                self.status(&format!("Installing {package}"));
            }
            Event::Installed { package, path } => {
                self.success(&format!("Installed {package} to {path}"));
            }

            Event::SmokeTestStarted { package } => {
                self.status(&format!("Running smoke test for {package}"));
            }
            Event::SmokeTestPassed { package } => {
                self.success(&format!("Smoke test passed for {package}"));
            }
            Event::SmokeTestFailed { package, message } => {
                self.error(&format!("Smoke test failed for {package}: {message}"));
            }

            Event::Warning { message } => self.warning(&message),
            Event::Error { message } => self.error(&message),
            Event::Debug { message } => {
                if self.debug_enabled {
                    eprintln!("  debug: {message}");
                }
            }
        }
    }

    fn status(&self, message: &str) {
        println!("{message}");
    }

    fn success(&self, message: &str) {
        if self.colors_enabled {
            println!("{}", style(message).green());
        } else {
            println!("{message}");
        }
    }

    fn warning(&self, message: &str) {
        if self.colors_enabled {
            eprintln!("{}", style(format!("Warning: {message}")).yellow());
        } else {
            eprintln!("Warning: {message}");
        }
    }

    fn error(&self, message: &str) {
        if self.colors_enabled {
            eprintln!("{}", style(message).red());
        } else {
            eprintln!("{message}");
        }
    }
}

/// Human-readable byte count
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
