//! Source tree preparation
//!
//! Build-from-source formulas fetch either a tar.gz archive or a single
//! source file. Archives are extracted with their leading path component
//! stripped (the common layout for source tarballs); plain files are copied
//! into the tree as-is.

use forma_errors::{BuildError, Error};
use std::path::{Path, PathBuf};

/// Prepare the source tree under `scratch` from a fetched artifact
///
/// # Errors
///
/// Returns an error if extraction or the file copy fails.
pub async fn prepare_source_tree(fetched: &Path, scratch: &Path) -> Result<PathBuf, Error> {
    let tree = scratch.join("src");
    tokio::fs::create_dir_all(&tree).await?;

    if is_gzip(fetched).await {
        extract_tar_gz(fetched, &tree).await?;
    } else {
        let file_name = fetched
            .file_name()
            .ok_or_else(|| BuildError::ExtractionFailed {
                message: format!("source artifact has no file name: {}", fetched.display()),
            })?;
        tokio::fs::copy(fetched, tree.join(file_name))
            .await
            .map_err(|e| Error::io_with_path(&e, fetched))?;
    }

    Ok(tree)
}

/// Detect gzip by extension, falling back to the magic number for archives
/// without one
async fn is_gzip(path: &Path) -> bool {
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        if matches!(ext, "gz" | "tgz") {
            return true;
        }
    }
    let bytes = tokio::fs::read(path).await.unwrap_or_default();
    bytes.len() >= 2 && bytes[0] == 0x1f && bytes[1] == 0x8b
}

/// Extract a tar.gz archive into `base_dir`, stripping the leading path
/// component of every entry
async fn extract_tar_gz(path: &Path, base_dir: &Path) -> Result<(), Error> {
    use async_compression::tokio::bufread::GzipDecoder;
    use tokio::io::{AsyncWriteExt, BufReader};

    // Decompress to a temporary tar file first
    let temp_dir = tempfile::tempdir().map_err(|e| BuildError::ExtractionFailed {
        message: format!("failed to create temp directory: {e}"),
    })?;
    let temp_path = temp_dir.path().join("archive.tar");

    {
        use tokio::fs::File;

        let input_file = File::open(path)
            .await
            .map_err(|e| BuildError::ExtractionFailed {
                message: format!("failed to open archive: {e}"),
            })?;
        let mut output_file =
            File::create(&temp_path)
                .await
                .map_err(|e| BuildError::ExtractionFailed {
                    message: format!("failed to create temp file: {e}"),
                })?;

        let mut decoder = GzipDecoder::new(BufReader::new(input_file));
        tokio::io::copy(&mut decoder, &mut output_file)
            .await
            .map_err(|e| BuildError::ExtractionFailed {
                message: format!("failed to decompress gzip archive: {e}"),
            })?;
        output_file
            .flush()
            .await
            .map_err(|e| BuildError::ExtractionFailed {
                message: format!("failed to flush temp file: {e}"),
            })?;
    }

    let base_dir = base_dir.to_path_buf();
    tokio::task::spawn_blocking(move || {
        use std::fs::File;
        use tar::Archive;

        let tar = File::open(&temp_path).map_err(|e| BuildError::ExtractionFailed {
            message: format!("failed to open decompressed file: {e}"),
        })?;
        let mut archive = Archive::new(tar);

        // Strip the first component (common for source archives)
        for entry in archive.entries()? {
            let mut entry = entry?;
            let path = entry.path()?;

            // Entries must stay inside the tree
            if path
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
            {
                continue;
            }

            let components: Vec<_> = path.components().collect();
            if components.len() <= 1 {
                // The leading directory itself; a file here means the
                // archive has no directory to strip
                if entry.header().entry_type().is_file() {
                    return Err(BuildError::ExtractionFailed {
                        message: format!(
                            "archive entry has no leading directory: {}",
                            path.display()
                        ),
                    }
                    .into());
                }
                continue;
            }

            let new_path = components[1..].iter().collect::<PathBuf>();
            let dest_path = base_dir.join(&new_path);

            if let Some(parent) = dest_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| BuildError::ExtractionFailed {
                    message: format!("failed to create parent directory: {e}"),
                })?;
            }

            entry
                .unpack(&dest_path)
                .map_err(|e| BuildError::ExtractionFailed {
                    message: format!("failed to extract entry: {e}"),
                })?;
        }

        Ok::<(), Error>(())
    })
    .await
    .map_err(|e| BuildError::ExtractionFailed {
        message: format!("task join error: {e}"),
    })??;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    async fn make_tar_gz(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            // Write the name bytes directly: `append_data`/`set_path` refuse
            // entries containing `..`, which the escape test needs to create
            header.as_gnu_mut().unwrap().name[..name.len()].copy_from_slice(name.as_bytes());
            header.set_cksum();
            builder
                .append(&header, std::io::Cursor::new(*data))
                .unwrap();
        }
        let tar_bytes = builder.into_inner().unwrap();

        let mut encoder = async_compression::tokio::write::GzipEncoder::new(Vec::new());
        encoder.write_all(&tar_bytes).await.unwrap();
        encoder.shutdown().await.unwrap();
        encoder.into_inner()
    }

    #[tokio::test]
    async fn test_extract_strips_leading_component() {
        let gz = make_tar_gz(&[
            ("cuckoo-src/main.go", b"package main".as_slice()),
            ("cuckoo-src/cmd/help.go", b"package cmd".as_slice()),
        ])
        .await;

        let scratch = tempfile::tempdir().unwrap();
        let archive = scratch.path().join("cuckoo-src.tar.gz");
        tokio::fs::write(&archive, &gz).await.unwrap();

        let tree = prepare_source_tree(&archive, scratch.path()).await.unwrap();
        let main = tokio::fs::read_to_string(tree.join("main.go")).await.unwrap();
        assert_eq!(main, "package main");
        assert!(tree.join("cmd/help.go").exists());
    }

    #[tokio::test]
    async fn test_plain_file_copied_into_tree() {
        let scratch = tempfile::tempdir().unwrap();
        let source = scratch.path().join("main.sh");
        tokio::fs::write(&source, "#!/bin/sh\nexit 0\n").await.unwrap();

        let tree = prepare_source_tree(&source, scratch.path()).await.unwrap();
        assert!(tree.join("main.sh").exists());
    }

    #[tokio::test]
    async fn test_root_level_file_is_an_error() {
        let gz = make_tar_gz(&[("cuckoo", b"binary bytes".as_slice())]).await;

        let scratch = tempfile::tempdir().unwrap();
        let archive = scratch.path().join("cuckoo.tar.gz");
        tokio::fs::write(&archive, &gz).await.unwrap();

        let err = prepare_source_tree(&archive, scratch.path())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no leading directory"), "{err}");
    }

    #[tokio::test]
    async fn test_parent_dir_entries_do_not_escape_tree() {
        let gz = make_tar_gz(&[
            ("pkg/main.go", b"package main".as_slice()),
            ("pkg/../../evil.txt", b"outside".as_slice()),
        ])
        .await;

        let scratch = tempfile::tempdir().unwrap();
        let archive = scratch.path().join("pkg.tar.gz");
        tokio::fs::write(&archive, &gz).await.unwrap();

        let tree = prepare_source_tree(&archive, scratch.path()).await.unwrap();
        assert!(tree.join("main.go").exists());
        assert!(!scratch.path().join("evil.txt").exists());
        assert!(!scratch.path().parent().unwrap().join("evil.txt").exists());
    }

    #[tokio::test]
    async fn test_gzip_magic_detected_without_extension() {
        let gz = make_tar_gz(&[("pkg/file.txt", b"data".as_slice())]).await;

        let scratch = tempfile::tempdir().unwrap();
        let archive = scratch.path().join("artifact");
        tokio::fs::write(&archive, &gz).await.unwrap();

        let tree = prepare_source_tree(&archive, scratch.path()).await.unwrap();
        assert!(tree.join("file.txt").exists());
    }
}
