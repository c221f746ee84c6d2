//! Post-install smoke test
//!
//! Runs the installed binary with the formula's test arguments. Exit code 0
//! is a pass; anything else, including a timeout or a signal, is a failure.
//! Failures never reverse the install.

use crate::report::TestOutcome;
use forma_errors::Error;
use forma_events::{Event, EventEmitter, EventSender};
use std::path::Path;
use std::time::Duration;

/// Run the smoke test for an installed binary
///
/// # Errors
///
/// Returns an error only if the test process cannot be spawned or examined;
/// a failing test is reported through the returned [`TestOutcome`].
pub async fn smoke_test(
    package: &str,
    bin_path: &Path,
    args: &[String],
    timeout: Duration,
    tx: Option<&EventSender>,
) -> Result<TestOutcome, Error> {
    tx.emit(Event::SmokeTestStarted {
        package: package.to_string(),
    });

    let mut command = tokio::process::Command::new(bin_path);
    command.args(args).kill_on_drop(true);

    let run = async {
        let output = command.output().await.map_err(|e| {
            Error::internal(format!(
                "failed to spawn smoke test {}: {e}",
                bin_path.display()
            ))
        })?;
        Ok::<_, Error>(output)
    };

    let outcome = match tokio::time::timeout(timeout, run).await {
        Err(_) => TestOutcome::Failed {
            message: format!("timed out after {}s", timeout.as_secs()),
        },
        Ok(Err(e)) => return Err(e),
        Ok(Ok(output)) if output.status.success() => TestOutcome::Passed,
        Ok(Ok(output)) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = match output.status.code() {
                Some(code) if stderr.trim().is_empty() => format!("exited with code {code}"),
                Some(code) => format!("exited with code {code}: {}", stderr.trim()),
                None => "terminated by signal".to_string(),
            };
            TestOutcome::Failed { message }
        }
    };

    match &outcome {
        TestOutcome::Passed => tx.emit(Event::SmokeTestPassed {
            package: package.to_string(),
        }),
        TestOutcome::Failed { message } => tx.emit(Event::SmokeTestFailed {
            package: package.to_string(),
            message: message.clone(),
        }),
        TestOutcome::Skipped => {}
    }

    Ok(outcome)
}
