//! Output rendering and formatting

use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use forma_install::{InstallReport, MethodKind, TestOutcome};
use serde::Serialize;
use std::io;

/// Final result of a CLI command
#[derive(Debug, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum OperationResult {
    Install(InstallReport),
    Check(CheckSummary),
    Test { package: String, test: TestOutcome },
}

/// What `forma check` learned about a formula
#[derive(Debug, Serialize)]
pub struct CheckSummary {
    pub package: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub method: MethodKind,
    pub source: String,
    /// Placeholders still unresolved after --var bindings
    pub unresolved: Vec<String>,
    /// True when the formula could be installed as-is
    pub installable: bool,
}

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    json_output: bool,
}

impl OutputRenderer {
    pub fn new(json_output: bool) -> Self {
        Self { json_output }
    }

    /// Render operation result
    pub fn render_result(&self, result: &OperationResult) -> io::Result<()> {
        if self.json_output {
            let json = serde_json::to_string_pretty(result).map_err(io::Error::other)?;
            println!("{json}");
            Ok(())
        } else {
            match result {
                OperationResult::Install(report) => Self::render_install_report(report),
                OperationResult::Check(summary) => Self::render_check_summary(summary),
                OperationResult::Test { package, test } => Self::render_test(package, test),
            }
        }
    }

    fn render_install_report(report: &InstallReport) -> io::Result<()> {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        table.set_header(vec![
            Cell::new("Package").add_attribute(Attribute::Bold),
            Cell::new("Version").add_attribute(Attribute::Bold),
            Cell::new("Method").add_attribute(Attribute::Bold),
            Cell::new("Installed To").add_attribute(Attribute::Bold),
            Cell::new("Test").add_attribute(Attribute::Bold),
        ]);

        table.add_row(vec![
            Cell::new(&report.package),
            Cell::new(report.version.as_deref().unwrap_or("-")),
            Cell::new(method_label(report.method)),
            Cell::new(report.bin_path.display().to_string()),
            test_cell(&report.test),
        ]);

        println!("{table}");
        println!("sha256: {}", report.sha256);
        Ok(())
    }

    fn render_check_summary(summary: &CheckSummary) -> io::Result<()> {
        println!("Package: {}", summary.package);
        if let Some(version) = &summary.version {
            println!("Version: {version}");
        }
        println!("Method:  {}", method_label(summary.method));
        println!("Source:  {}", summary.source);

        if summary.unresolved.is_empty() {
            println!("All placeholders resolved.");
        } else {
            println!("Unresolved placeholders:");
            for name in &summary.unresolved {
                println!("  ${{{name}}}");
            }
        }

        if summary.installable {
            println!("Formula is installable.");
        } else {
            println!("Formula is valid but needs --var bindings to install.");
        }
        Ok(())
    }

    fn render_test(package: &str, test: &TestOutcome) -> io::Result<()> {
        match test {
            TestOutcome::Passed => println!("Smoke test passed for {package}."),
            TestOutcome::Failed { message } => {
                println!("Smoke test failed for {package}: {message}");
            }
            TestOutcome::Skipped => println!("No smoke test defined for {package}."),
        }
        Ok(())
    }
}

fn method_label(method: MethodKind) -> &'static str {
    match method {
        MethodKind::BuildFromSource => "build from source",
        MethodKind::InstallPrebuilt => "prebuilt",
    }
}

fn test_cell(test: &TestOutcome) -> Cell {
    match test {
        TestOutcome::Passed => Cell::new("passed").fg(Color::Green),
        TestOutcome::Failed { .. } => Cell::new("failed").fg(Color::Red),
        TestOutcome::Skipped => Cell::new("skipped"),
    }
}
