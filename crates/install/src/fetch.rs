//! Source acquisition and integrity verification
//!
//! The checksum gate lives here: a fetched artifact whose sha256 does not
//! match the formula is deleted and the install aborts before any build or
//! placement step can observe it.

use forma_errors::{Error, InstallError};
use forma_events::{Event, EventEmitter, EventSender};
use forma_formula::{Formula, SourceLocation};
use forma_hash::Digest;
use forma_net::{download_to_path, filename_from_url, NetClient};
use std::path::{Path, PathBuf};

/// A fetched, verified source artifact in the scratch directory
#[derive(Debug)]
pub struct Fetched {
    pub path: PathBuf,
    pub bytes: u64,
}

/// Fetch the formula's source into `scratch` and verify it against
/// `expected`
///
/// # Errors
///
/// Returns an error if the source cannot be fetched, or the computed sha256
/// differs from the formula's (the artifact is removed in that case).
pub async fn acquire(
    net: &NetClient,
    formula: &Formula,
    expected: &Digest,
    scratch: &Path,
    tx: Option<&EventSender>,
) -> Result<Fetched, Error> {
    let emitter = tx.cloned();

    let (dest, actual, bytes) = match formula.source_location()? {
        SourceLocation::Url(url) => {
            let dest = scratch.join(filename_from_url(url)?);
            let result = download_to_path(net, url, &dest, tx).await?;
            (dest, result.digest, result.bytes)
        }
        SourceLocation::Path(path) => {
            let metadata =
                tokio::fs::metadata(path)
                    .await
                    .map_err(|_| InstallError::LocalSourceNotFound {
                        path: path.display().to_string(),
                    })?;
            if metadata.is_dir() {
                return Err(InstallError::Failed {
                    message: format!(
                        "local source must be a file, got a directory: {}",
                        path.display()
                    ),
                }
                .into());
            }
            let file_name = path.file_name().ok_or_else(|| InstallError::LocalSourceNotFound {
                path: path.display().to_string(),
            })?;
            let dest = scratch.join(file_name);
            tokio::fs::copy(path, &dest)
                .await
                .map_err(|e| Error::io_with_path(&e, path))?;
            let actual = Digest::hash_file(&dest).await?;
            let bytes = tokio::fs::metadata(&dest).await?.len();
            (dest, actual, bytes)
        }
    };

    if actual != *expected {
        // Fail closed: nothing downstream may see the bad artifact
        tokio::fs::remove_file(&dest).await?;
        let file = dest
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();
        return Err(InstallError::IntegrityMismatch {
            file,
            expected: expected.to_hex(),
            actual: actual.to_hex(),
        }
        .into());
    }

    emitter.emit(Event::IntegrityVerified {
        file: dest.display().to_string(),
        sha256: actual.to_hex(),
    });

    Ok(Fetched { path: dest, bytes })
}
