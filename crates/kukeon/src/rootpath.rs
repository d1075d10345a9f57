//! Resolution of the metadata root (`run_path`).
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use nix::unistd::getuid;

fn create_dir_all_private(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    fs::set_permissions(path, fs::Permissions::from_mode(0o700))
        .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    Ok(())
}

/// Picks the run path: an explicit `--run-path` wins, root uses
/// `/run/kukeon`, rootless users fall through `$XDG_RUNTIME_DIR`, `$HOME`
/// and finally `/tmp`.
pub fn determine_run_path(run_path: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = run_path {
        if !path.exists() {
            create_dir_all_private(&path)?;
        }
        let path = path.canonicalize()?;
        return Ok(path);
    }

    if getuid().is_root() {
        let path = PathBuf::from("/run/kukeon");
        create_dir_all_private(&path)?;
        return Ok(path);
    }

    // see https://specifications.freedesktop.org/basedir-spec/basedir-spec-latest.html
    if let Ok(path) = std::env::var("XDG_RUNTIME_DIR") {
        let path = Path::new(&path).join("kukeon");
        if create_dir_all_private(&path).is_ok() {
            return Ok(path);
        }
    }

    if let Ok(path) = std::env::var("HOME") {
        if let Ok(resolved) = fs::canonicalize(path) {
            let run_dir = resolved.join(".kukeon/run");
            if create_dir_all_private(&run_dir).is_ok() {
                return Ok(run_dir);
            }
        }
    }

    let tmp_dir = PathBuf::from(format!("/tmp/kukeon-{}", getuid().as_raw()));
    if create_dir_all_private(&tmp_dir).is_ok() {
        return Ok(tmp_dir);
    }

    bail!("could not find a storage location with suitable permissions for the current user");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determine_run_path_use_specified_by_user() {
        let temp = tempfile::tempdir().expect("failed to create temp dir");
        let specified = temp.path().join("state");
        let path = determine_run_path(Some(specified.clone()))
            .expect("failed with specified path");
        assert_eq!(path, specified.canonicalize().unwrap());
        assert!(path.is_dir());
    }

    #[test]
    #[serial_test::serial]
    fn test_determine_run_path_rootless_xdg() {
        if getuid().is_root() {
            return;
        }
        let temp = tempfile::tempdir().expect("failed to create temp dir");
        std::env::set_var("XDG_RUNTIME_DIR", temp.path());
        let path = determine_run_path(None).expect("failed with $XDG_RUNTIME_DIR path");
        assert_eq!(path, temp.path().join("kukeon"));
        assert!(path.is_dir());
        std::env::remove_var("XDG_RUNTIME_DIR");
    }
}
