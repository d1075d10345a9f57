//! Cgroup v2 subtrees backing the entity hierarchy.
//!
//! Every entity owns a directory under `<mount>/<kukeon-root>/...` whose
//! components are the entity names, e.g. `/sys/fs/cgroup/kukeon/r1/s1/t1/c1`
//! for a cell. The manager only creates, probes, freezes and removes these
//! directories; resource limits are the daemon's business.
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use nix::unistd::Pid;

pub const DEFAULT_CGROUP_MOUNT: &str = "/sys/fs/cgroup";
/// Directory under the mountpoint that roots every kukeon-owned subtree.
pub const KUKEON_CGROUP_ROOT: &str = "kukeon";
pub const CGROUP_PROCS: &str = "cgroup.procs";
pub const CGROUP_FREEZE: &str = "cgroup.freeze";

#[derive(Debug, thiserror::Error)]
pub enum CgroupError {
    #[error("cgroup {path:?} not found")]
    NotFound { path: PathBuf },
    #[error("cgroup {path:?} has children")]
    HasChildren { path: PathBuf },
    #[error("failed to open {path:?}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {data} to {path:?}")]
    Write {
        path: PathBuf,
        data: String,
        source: std::io::Error,
    },
    #[error("failed to read {path:?}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to create cgroup {path:?}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to remove cgroup {path:?}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[inline]
fn write_cgroup_file(path: &Path, data: &str) -> Result<(), CgroupError> {
    OpenOptions::new()
        .create(false)
        .write(true)
        .truncate(false)
        .open(path)
        .map_err(|source| CgroupError::Open {
            path: path.to_path_buf(),
            source,
        })?
        .write_all(data.as_bytes())
        .map_err(|source| CgroupError::Write {
            path: path.to_path_buf(),
            data: data.to_owned(),
            source,
        })
}

/// The cgroup path of the current process on the v2 hierarchy, relative to
/// the mountpoint. Hybrid hosts list several lines; the v2 entry is the one
/// with an empty controller list (`0::/path`).
fn parse_self_cgroup(content: &str) -> Option<PathBuf> {
    for line in content.lines() {
        if let Some(path) = line.strip_prefix("0::") {
            let path = path.trim_start_matches('/');
            if path.is_empty() {
                return None;
            }
            return Some(PathBuf::from(path));
        }
    }
    None
}

/// Picks the directory the kukeon root lives under. Normally the mountpoint
/// itself; when the process is confined to a delegated subtree the on-disk
/// path is longer than the logical one, so an existing root is also looked
/// for under the process's own cgroup.
fn resolve_base(mount: &Path) -> PathBuf {
    if mount.join(KUKEON_CGROUP_ROOT).is_dir() {
        return mount.to_path_buf();
    }
    if let Ok(content) = fs::read_to_string("/proc/self/cgroup") {
        if let Some(rel) = parse_self_cgroup(&content) {
            let nested = mount.join(rel);
            if nested.join(KUKEON_CGROUP_ROOT).is_dir() {
                return nested;
            }
        }
    }
    mount.to_path_buf()
}

#[derive(Debug, Clone)]
pub struct CgroupManager {
    base: PathBuf,
}

impl CgroupManager {
    /// Constructs a manager over the cgroup v2 filesystem mounted at
    /// `mount`, resolving where the kukeon root lives (see `resolve_base`).
    pub fn new<P: AsRef<Path>>(mount: P) -> Self {
        CgroupManager {
            base: resolve_base(mount.as_ref()),
        }
    }

    /// The logical cgroup path of an entity, usable as the daemon-side
    /// `cgroupsPath` value: `/kukeon/<segments...>`.
    pub fn relative_path(segments: &[&str]) -> PathBuf {
        let mut path = PathBuf::from("/").join(KUKEON_CGROUP_ROOT);
        for segment in segments {
            path = path.join(segment);
        }
        path
    }

    /// Absolute on-disk path of an entity's cgroup.
    pub fn full_path(&self, segments: &[&str]) -> PathBuf {
        let mut path = self.base.join(KUKEON_CGROUP_ROOT);
        for segment in segments {
            path = path.join(segment);
        }
        path
    }

    /// Creates every missing component of the path. Idempotent; returns the
    /// absolute on-disk path.
    pub fn ensure(&self, segments: &[&str]) -> Result<PathBuf, CgroupError> {
        let mut current = self.base.clone();
        let mut components = vec![KUKEON_CGROUP_ROOT];
        components.extend_from_slice(segments);

        for component in components {
            current = current.join(component);
            if !current.exists() {
                fs::create_dir(&current).map_err(|source| CgroupError::Create {
                    path: current.clone(),
                    source,
                })?;
                if let Ok(metadata) = fs::metadata(&current) {
                    metadata.permissions().set_mode(0o755);
                }
            }
        }

        tracing::debug!(path = ?current, "ensured cgroup");
        Ok(current)
    }

    pub fn exists(&self, segments: &[&str]) -> bool {
        self.full_path(segments).is_dir()
    }

    /// Removes the leaf directory. An absent leaf is success; a leaf with
    /// child cgroups is `HasChildren`.
    pub fn remove(&self, segments: &[&str]) -> Result<(), CgroupError> {
        let path = self.full_path(segments);
        let entries = match fs::read_dir(&path) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(source) => return Err(CgroupError::Read { path, source }),
        };
        for entry in entries {
            let entry = entry.map_err(|source| CgroupError::Read {
                path: path.clone(),
                source,
            })?;
            if entry.path().is_dir() {
                return Err(CgroupError::HasChildren { path });
            }
        }

        tracing::debug!(path = ?path, "removing cgroup");
        match fs::remove_dir(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(CgroupError::Remove { path, source }),
        }
    }

    /// Removes the subtree depth-first, for best-effort sweeps over state
    /// that may have been damaged out-of-band. Absent paths are success.
    /// Only directories are touched; the kernel drops the control files
    /// with them.
    pub fn remove_tree(&self, segments: &[&str]) -> Result<(), CgroupError> {
        fn remove_tree_at(path: &std::path::Path) -> Result<(), CgroupError> {
            let entries = match fs::read_dir(path) {
                Ok(entries) => entries,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
                Err(source) => {
                    return Err(CgroupError::Read {
                        path: path.to_path_buf(),
                        source,
                    })
                }
            };
            for entry in entries {
                let entry = entry.map_err(|source| CgroupError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                if entry.path().is_dir() {
                    remove_tree_at(&entry.path())?;
                }
            }
            match fs::remove_dir(path) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(source) => Err(CgroupError::Remove {
                    path: path.to_path_buf(),
                    source,
                }),
            }
        }

        let path = self.full_path(segments);
        tracing::debug!(path = ?path, "removing cgroup subtree");
        remove_tree_at(&path)
    }

    pub fn freeze(&self, segments: &[&str]) -> Result<(), CgroupError> {
        write_cgroup_file(&self.full_path(segments).join(CGROUP_FREEZE), "1")
    }

    pub fn thaw(&self, segments: &[&str]) -> Result<(), CgroupError> {
        write_cgroup_file(&self.full_path(segments).join(CGROUP_FREEZE), "0")
    }

    /// Moves a task into the cgroup by writing its pid to `cgroup.procs`.
    pub fn enter(&self, segments: &[&str], pid: Pid) -> Result<(), CgroupError> {
        let path = self.full_path(segments).join(CGROUP_PROCS);
        if !path.exists() {
            return Err(CgroupError::NotFound {
                path: self.full_path(segments),
            });
        }
        write_cgroup_file(&path, &pid.as_raw().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> (tempfile::TempDir, CgroupManager) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let manager = CgroupManager::new(dir.path());
        (dir, manager)
    }

    #[test]
    fn test_ensure_creates_all_components() {
        let (dir, manager) = manager();
        let path = manager.ensure(&["r1", "s1", "t1"]).unwrap();
        assert_eq!(path, dir.path().join("kukeon/r1/s1/t1"));
        assert!(path.is_dir());
        // Idempotent.
        assert_eq!(manager.ensure(&["r1", "s1", "t1"]).unwrap(), path);
        assert!(manager.exists(&["r1", "s1"]));
    }

    #[test]
    fn test_remove_leaf_and_missing() {
        let (_dir, manager) = manager();
        manager.ensure(&["r1"]).unwrap();
        manager.remove(&["r1"]).unwrap();
        assert!(!manager.exists(&["r1"]));
        // Removing again reports success.
        manager.remove(&["r1"]).unwrap();
    }

    #[test]
    fn test_remove_refuses_children() {
        let (_dir, manager) = manager();
        manager.ensure(&["r1", "s1"]).unwrap();
        assert!(matches!(
            manager.remove(&["r1"]),
            Err(CgroupError::HasChildren { .. })
        ));
        manager.remove(&["r1", "s1"]).unwrap();
        manager.remove(&["r1"]).unwrap();
    }

    #[test]
    fn test_remove_tree_sweeps_descendants() {
        let (_dir, manager) = manager();
        manager.ensure(&["r1", "s1", "t1"]).unwrap();
        manager.ensure(&["r1", "s2"]).unwrap();
        manager.remove_tree(&["r1"]).unwrap();
        assert!(!manager.exists(&["r1"]));
        // Absent subtree is success.
        manager.remove_tree(&["r1"]).unwrap();
    }

    #[test]
    fn test_freeze_writes_freeze_file() {
        let (_dir, manager) = manager();
        let path = manager.ensure(&["r1"]).unwrap();
        // The kernel provides this file on a real hierarchy.
        fs::write(path.join(CGROUP_FREEZE), "0").unwrap();
        manager.freeze(&["r1"]).unwrap();
        assert_eq!(fs::read_to_string(path.join(CGROUP_FREEZE)).unwrap(), "1");
        manager.thaw(&["r1"]).unwrap();
        assert_eq!(fs::read_to_string(path.join(CGROUP_FREEZE)).unwrap(), "0");
    }

    #[test]
    fn test_enter_requires_procs_file() {
        let (_dir, manager) = manager();
        let path = manager.ensure(&["r1"]).unwrap();
        assert!(matches!(
            manager.enter(&["r1"], Pid::from_raw(1234)),
            Err(CgroupError::NotFound { .. })
        ));
        fs::write(path.join(CGROUP_PROCS), "").unwrap();
        manager.enter(&["r1"], Pid::from_raw(1234)).unwrap();
        assert_eq!(fs::read_to_string(path.join(CGROUP_PROCS)).unwrap(), "1234");
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(
            CgroupManager::relative_path(&["r1", "s1"]),
            PathBuf::from("/kukeon/r1/s1")
        );
    }

    #[test]
    fn test_parse_self_cgroup_picks_v2_line() {
        let hybrid = "12:pids:/user.slice\n0::/user.slice/user-1000.slice/session-2.scope\n";
        assert_eq!(
            parse_self_cgroup(hybrid),
            Some(PathBuf::from("user.slice/user-1000.slice/session-2.scope"))
        );
        assert_eq!(parse_self_cgroup("0::/\n"), None);
        assert_eq!(parse_self_cgroup("12:pids:/foo\n"), None);
    }
}
