//! Binary placement into the install destination

use forma_errors::{Error, InstallError};
use forma_formula::PrebuiltProcedure;
use std::path::{Path, PathBuf};

/// A binary staged for placement, with its permission policy
#[derive(Debug)]
pub struct Staged {
    path: PathBuf,
    fix_mode: bool,
}

impl Staged {
    /// Stage a freshly built artifact; the build command owns its mode
    #[must_use]
    pub fn built(path: PathBuf) -> Self {
        Self {
            path,
            fix_mode: false,
        }
    }

    /// Stage a fetched prebuilt artifact
    #[must_use]
    pub fn prebuilt(path: PathBuf, procedure: PrebuiltProcedure) -> Self {
        Self {
            path,
            fix_mode: procedure.fix_mode,
        }
    }
}

/// Place a staged binary at `<bin_dir>/<name>` and verify the result
///
/// # Errors
///
/// Returns an error if the copy fails or the placed file is not executable.
pub async fn place(staged: &Staged, bin_dir: &Path, name: &str) -> Result<PathBuf, Error> {
    tokio::fs::create_dir_all(bin_dir)
        .await
        .map_err(|e| InstallError::FilesystemError {
            operation: "create_dir_all".to_string(),
            path: bin_dir.display().to_string(),
            message: e.to_string(),
        })?;

    let dest = bin_dir.join(name);
    tokio::fs::copy(&staged.path, &dest)
        .await
        .map_err(|e| InstallError::PlacementFailed {
            message: format!(
                "failed to copy {} to {}: {e}",
                staged.path.display(),
                dest.display()
            ),
        })?;

    if staged.fix_mode {
        fix_file_permissions(&dest).map_err(|e| InstallError::PlacementFailed {
            message: format!("failed to set permissions on {}: {e}", dest.display()),
        })?;
    }

    verify_executable(&dest)?;
    Ok(dest)
}

/// Add execute permissions matching read permissions, if none are set
#[cfg(unix)]
fn fix_file_permissions(path: &Path) -> Result<bool, std::io::Error> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = std::fs::metadata(path)?;
    let mut perms = metadata.permissions();
    let current_mode = perms.mode();

    if current_mode & 0o111 != 0 {
        return Ok(false); // Already has execute permissions
    }

    // Convert read bits to execute bits
    let new_mode = current_mode | ((current_mode & 0o444) >> 2);

    perms.set_mode(new_mode);
    std::fs::set_permissions(path, perms)?;

    Ok(true)
}

#[cfg(not(unix))]
fn fix_file_permissions(_path: &Path) -> Result<bool, std::io::Error> {
    Ok(false)
}

/// The placement contract: the installed file must exist and be executable
fn verify_executable(path: &Path) -> Result<(), Error> {
    let metadata = std::fs::metadata(path).map_err(|_| InstallError::PlacementFailed {
        message: format!("placed artifact missing: {}", path.display()),
    })?;

    if !metadata.is_file() {
        return Err(InstallError::PlacementFailed {
            message: format!("placed artifact is not a regular file: {}", path.display()),
        }
        .into());
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(InstallError::ArtifactNotExecutable {
                path: path.display().to_string(),
            }
            .into());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn write_with_mode(path: &Path, mode: u32) {
        use std::os::unix::fs::PermissionsExt;
        std::fs::write(path, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_fix_mode_makes_prebuilt_executable() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("cuckoo");
        write_with_mode(&artifact, 0o644);

        let staged = Staged::prebuilt(artifact, PrebuiltProcedure::default());
        let bin_dir = dir.path().join("bin");
        let dest = place(&staged, &bin_dir, "cuckoo").await.unwrap();

        use std::os::unix::fs::PermissionsExt;
        let mode = std::fs::metadata(&dest).unwrap().permissions().mode();
        assert_ne!(mode & 0o111, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_executable_without_fix_mode_fails() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("cuckoo");
        write_with_mode(&artifact, 0o644);

        let staged = Staged::prebuilt(artifact, PrebuiltProcedure { fix_mode: false });
        let bin_dir = dir.path().join("bin");
        let err = place(&staged, &bin_dir, "cuckoo").await.unwrap_err();
        assert!(err.to_string().contains("not executable"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_built_artifact_keeps_its_mode() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("cuckoo");
        write_with_mode(&artifact, 0o755);

        let staged = Staged::built(artifact);
        let bin_dir = dir.path().join("bin");
        assert!(place(&staged, &bin_dir, "cuckoo").await.is_ok());
    }
}
