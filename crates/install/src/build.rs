//! Build step: run the formula's build command in the source tree

use forma_errors::{BuildError, Error};
use forma_events::{Event, EventEmitter, EventSender};
use forma_formula::BuildProcedure;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Run the build command and locate the produced artifact
///
/// # Errors
///
/// Returns an error if the command cannot be spawned, exits non-zero (the
/// tool's stderr is surfaced verbatim), or the declared artifact is missing
/// afterwards.
pub async fn run(
    package: &str,
    procedure: &BuildProcedure,
    tree: &Path,
    tx: Option<&EventSender>,
) -> Result<PathBuf, Error> {
    let emitter = tx.cloned();
    let (program, args) = procedure
        .command
        .split_first()
        .ok_or_else(|| BuildError::Failed {
            message: "empty build command".to_string(),
        })?;

    emitter.emit(Event::BuildStarting {
        package: package.to_string(),
        command: procedure.command.join(" "),
    });

    let output = Command::new(program)
        .args(args)
        .current_dir(tree)
        .output()
        .await
        .map_err(|e| BuildError::Failed {
            message: format!("failed to spawn {program}: {e}"),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        return Err(match output.status.code() {
            Some(code) => BuildError::CommandFailed { code, stderr },
            None => BuildError::CommandKilled,
        }
        .into());
    }

    let artifact = tree.join(&procedure.artifact);
    if !tokio::fs::try_exists(&artifact).await.unwrap_or(false) {
        return Err(BuildError::ArtifactMissing {
            path: procedure.artifact.clone(),
        }
        .into());
    }

    emitter.emit(Event::BuildCompleted {
        package: package.to_string(),
    });

    Ok(artifact)
}
