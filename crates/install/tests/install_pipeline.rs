//! End-to-end pipeline tests against local file sources
//!
//! These exercise the full install contract without any network: local
//! `path` sources are hashed and verified exactly like downloads.

#![cfg(unix)]

use forma_formula::{BuildProcedure, Formula, FormulaBuilder, PrebuiltProcedure};
use forma_hash::Digest;
use forma_install::{Installer, InstallerConfig, MethodKind, TestOutcome};
use forma_types::ToolchainSpec;
use std::path::{Path, PathBuf};

fn write_script(dir: &Path, name: &str, body: &str) -> (PathBuf, String) {
    let content = format!("#!/bin/sh\n{body}\n");
    let path = dir.join(name);
    std::fs::write(&path, &content).unwrap();
    let digest = Digest::from_data(content.as_bytes());
    (path, digest.to_hex())
}

fn installer(bin_dir: &Path) -> Installer {
    Installer::new(InstallerConfig {
        bin_dir: bin_dir.to_path_buf(),
        ..InstallerConfig::default()
    })
    .unwrap()
}

fn prebuilt_formula(source: &Path, sha256: &str) -> Formula {
    FormulaBuilder::new("cuckoo", "Filesystem event watcher")
        .version("1.4.0")
        .path(source.display().to_string())
        .sha256(sha256)
        .prebuilt(PrebuiltProcedure::default())
        .test(vec!["help".to_string()])
        .finish()
        .unwrap()
}

#[tokio::test]
async fn prebuilt_install_places_binary_and_passes_smoke_test() {
    let dir = tempfile::tempdir().unwrap();
    let (source, sha) = write_script(dir.path(), "cuckoo-artifact", "exit 0");
    let bin_dir = dir.path().join("bin");

    let formula = prebuilt_formula(&source, &sha);
    let report = installer(&bin_dir).install(&formula).await.unwrap();

    assert_eq!(report.package, "cuckoo");
    assert_eq!(report.method, MethodKind::InstallPrebuilt);
    assert_eq!(report.sha256, sha);
    assert_eq!(report.test, TestOutcome::Passed);
    assert!(bin_dir.join("cuckoo").exists());
}

#[tokio::test]
async fn checksum_mismatch_aborts_before_placement() {
    let dir = tempfile::tempdir().unwrap();
    let (source, _) = write_script(dir.path(), "cuckoo-artifact", "exit 0");
    let bin_dir = dir.path().join("bin");

    let formula = prebuilt_formula(&source, &"0".repeat(64));
    let err = installer(&bin_dir).install(&formula).await.unwrap_err();

    assert!(err.to_string().contains("integrity mismatch"), "{err}");
    assert!(!bin_dir.join("cuckoo").exists());
}

#[tokio::test]
async fn missing_local_source_fails() {
    let dir = tempfile::tempdir().unwrap();
    let bin_dir = dir.path().join("bin");

    let formula = prebuilt_formula(Path::new("/nonexistent/cuckoo"), &"0".repeat(64));
    let err = installer(&bin_dir).install(&formula).await.unwrap_err();
    assert!(err.to_string().contains("not found"), "{err}");
}

#[tokio::test]
async fn directory_local_source_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let source_dir = dir.path().join("cuckoo-src");
    std::fs::create_dir(&source_dir).unwrap();
    let bin_dir = dir.path().join("bin");

    let formula = prebuilt_formula(&source_dir, &"0".repeat(64));
    let err = installer(&bin_dir).install(&formula).await.unwrap_err();
    assert!(err.to_string().contains("directory"), "{err}");
    assert!(!bin_dir.join("cuckoo").exists());
}

#[tokio::test]
async fn fix_mode_off_rejects_non_executable_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let (source, sha) = write_script(dir.path(), "cuckoo-artifact", "exit 0");
    let bin_dir = dir.path().join("bin");

    let formula = FormulaBuilder::new("cuckoo", "Filesystem event watcher")
        .path(source.display().to_string())
        .sha256(&sha)
        .prebuilt(PrebuiltProcedure { fix_mode: false })
        .test(vec!["help".to_string()])
        .finish()
        .unwrap();

    let err = installer(&bin_dir).install(&formula).await.unwrap_err();
    assert!(err.to_string().contains("not executable"), "{err}");
}

#[tokio::test]
async fn build_from_source_runs_command_and_places_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let (source, sha) = write_script(dir.path(), "main.sh", "echo cuckoo");
    let bin_dir = dir.path().join("bin");

    let formula = FormulaBuilder::new("cuckoo", "Filesystem event watcher")
        .path(source.display().to_string())
        .sha256(&sha)
        .build(BuildProcedure {
            toolchain: Some(ToolchainSpec::parse("sh").unwrap()),
            command: vec![
                "sh".to_string(),
                "-c".to_string(),
                "cp main.sh cuckoo && chmod +x cuckoo".to_string(),
            ],
            artifact: "cuckoo".to_string(),
        })
        .test(vec!["help".to_string()])
        .finish()
        .unwrap();

    let report = installer(&bin_dir).install(&formula).await.unwrap();
    assert_eq!(report.method, MethodKind::BuildFromSource);
    assert_eq!(report.test, TestOutcome::Passed);
    assert!(bin_dir.join("cuckoo").exists());
}

#[tokio::test]
async fn missing_toolchain_aborts_before_build() {
    let dir = tempfile::tempdir().unwrap();
    let (source, sha) = write_script(dir.path(), "main.sh", "echo cuckoo");
    let bin_dir = dir.path().join("bin");

    let formula = FormulaBuilder::new("cuckoo", "Filesystem event watcher")
        .path(source.display().to_string())
        .sha256(&sha)
        .build(BuildProcedure {
            toolchain: Some(ToolchainSpec::parse("no-such-tool-49a1@1.0").unwrap()),
            command: vec!["true".to_string()],
            artifact: "cuckoo".to_string(),
        })
        .finish()
        .unwrap();

    let err = installer(&bin_dir).install(&formula).await.unwrap_err();
    assert!(err.to_string().contains("no-such-tool-49a1"), "{err}");
    assert!(!bin_dir.join("cuckoo").exists());
}

#[tokio::test]
async fn failed_build_command_reports_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let (source, sha) = write_script(dir.path(), "main.sh", "echo cuckoo");
    let bin_dir = dir.path().join("bin");

    let formula = FormulaBuilder::new("cuckoo", "Filesystem event watcher")
        .path(source.display().to_string())
        .sha256(&sha)
        .build(BuildProcedure {
            toolchain: None,
            command: vec![
                "sh".to_string(),
                "-c".to_string(),
                "echo compile error >&2; exit 2".to_string(),
            ],
            artifact: "cuckoo".to_string(),
        })
        .finish()
        .unwrap();

    let err = installer(&bin_dir).install(&formula).await.unwrap_err();
    let message = err.to_string();
    assert!(message.contains("compile error"), "{message}");
}

#[tokio::test]
async fn smoke_test_failure_keeps_install_intact() {
    let dir = tempfile::tempdir().unwrap();
    let (source, sha) = write_script(dir.path(), "cuckoo-artifact", "exit 7");
    let bin_dir = dir.path().join("bin");

    let formula = prebuilt_formula(&source, &sha);
    let report = installer(&bin_dir).install(&formula).await.unwrap();

    assert!(matches!(report.test, TestOutcome::Failed { .. }));
    // The binary stays installed; the failure is advisory
    assert!(bin_dir.join("cuckoo").exists());
}

#[tokio::test]
async fn skip_test_reports_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let (source, sha) = write_script(dir.path(), "cuckoo-artifact", "exit 1");
    let bin_dir = dir.path().join("bin");

    let installer = Installer::new(InstallerConfig {
        bin_dir: bin_dir.clone(),
        skip_test: true,
        ..InstallerConfig::default()
    })
    .unwrap();

    let formula = prebuilt_formula(&source, &sha);
    let report = installer.install(&formula).await.unwrap();
    assert_eq!(report.test, TestOutcome::Skipped);
}

#[tokio::test]
async fn test_command_requires_installed_binary() {
    let dir = tempfile::tempdir().unwrap();
    let (source, sha) = write_script(dir.path(), "cuckoo-artifact", "exit 0");
    let bin_dir = dir.path().join("bin");

    let formula = prebuilt_formula(&source, &sha);
    let installer = installer(&bin_dir);

    let err = installer.test(&formula).await.unwrap_err();
    assert!(err.to_string().contains("not installed"), "{err}");

    installer.install(&formula).await.unwrap();
    let outcome = installer.test(&formula).await.unwrap();
    assert_eq!(outcome, TestOutcome::Passed);
}

#[tokio::test]
async fn unresolved_placeholders_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let bin_dir = dir.path().join("bin");

    let formula = FormulaBuilder::new("cuckoo", "Filesystem event watcher")
        .url("https://artifacts.example.com/${CIRCLE_BUILD_NUM}/cuckoo.tar.gz")
        .sha256("${ARTIFACT_SHA256}")
        .prebuilt(PrebuiltProcedure::default())
        .finish()
        .unwrap();

    let err = installer(&bin_dir).install(&formula).await.unwrap_err();
    assert!(err.to_string().contains("placeholder"), "{err}");
}
