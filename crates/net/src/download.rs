//! Artifact download with streaming hash computation

use crate::NetClient;
use forma_errors::{Error, NetworkError};
use forma_events::{Event, EventEmitter, EventSender};
use forma_hash::Digest;
use futures::StreamExt;
use sha2::{Digest as Sha2Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Outcome of a completed download
#[derive(Debug, Clone)]
pub struct DownloadResult {
    /// SHA-256 of the bytes written to disk
    pub digest: Digest,
    /// Total bytes downloaded
    pub bytes: u64,
}

/// Extract the trailing path segment of a URL as a filename
///
/// # Errors
///
/// Returns an error if the URL has no usable trailing segment.
pub fn filename_from_url(url: &str) -> Result<&str, Error> {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    without_scheme
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty() && without_scheme.trim_end_matches('/').contains('/'))
        .ok_or_else(|| NetworkError::InvalidUrl(url.to_string()).into())
}

/// Download a URL to a path, hashing the stream as it is written
///
/// The digest is computed over exactly the bytes placed on disk, so a later
/// integrity check never has to re-read the file.
///
/// # Errors
///
/// Returns an error if the request fails, the destination cannot be written,
/// or the stream is interrupted.
pub async fn download_to_path(
    client: &NetClient,
    url: &str,
    dest: &Path,
    tx: Option<&EventSender>,
) -> Result<DownloadResult, Error> {
    let emitter = tx.cloned();

    let response = client.get(url).await.inspect_err(|e| {
        emitter.emit(Event::DownloadFailed {
            url: url.to_string(),
            error: e.to_string(),
        });
    })?;

    let total_size = response.content_length().unwrap_or(0);
    emitter.emit(Event::DownloadStarted {
        url: url.to_string(),
        size: response.content_length(),
    });

    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| Error::io_with_path(&e, dest))?;
    let mut stream = response.bytes_stream();
    let mut hasher = Sha256::new();
    let mut downloaded = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                emitter.emit(Event::DownloadFailed {
                    url: url.to_string(),
                    error: e.to_string(),
                });
                return Err(NetworkError::DownloadFailed(e.to_string()).into());
            }
        };

        Sha2Digest::update(&mut hasher, &chunk);
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;

        emitter.emit(Event::DownloadProgress {
            url: url.to_string(),
            bytes_downloaded: downloaded,
            total_bytes: total_size,
        });
    }

    file.flush().await?;
    emitter.emit(Event::DownloadCompleted {
        url: url.to_string(),
        bytes: downloaded,
    });

    Ok(DownloadResult {
        digest: Digest::from_bytes(hasher.finalize().into()),
        bytes: downloaded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_from_url() {
        assert_eq!(
            filename_from_url("https://example.com/dist/cuckoo.tar.gz").unwrap(),
            "cuckoo.tar.gz"
        );
        assert_eq!(
            filename_from_url("https://example.com/cuckoo/").unwrap(),
            "cuckoo"
        );
        assert!(filename_from_url("https://").is_err());
        assert!(filename_from_url("https://example.com").is_err());
    }
}
