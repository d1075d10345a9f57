//! Persistent metadata store.
//!
//! One JSON file per entity under a path hierarchy mirroring the logical
//! hierarchy. Files are self-describing external documents (they carry
//! `apiVersion` and `kind`); the conversion to and from the internal model
//! happens here, at the store boundary, so no other component ever sees the
//! versioned representation. There are no transactions across files —
//! consistency across siblings is the controller's responsibility.
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::model::{Cell, Kind, Realm, Space, Stack};
use crate::scheme::{self, v1beta1, Version};

pub const REALM_FILE: &str = "realm.json";
pub const SPACE_FILE: &str = "space.json";
pub const STACK_FILE: &str = "stack.json";
pub const CELL_FILE: &str = "cell.json";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} {name:?} not found")]
    NotFound { kind: Kind, name: String },
    #[error("failed to open {path:?}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path:?}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read {path:?}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to remove {path:?}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path:?}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Scheme(#[from] scheme::SchemeError),
}

// ------------------------------------------------------------ path layout --

pub fn realm_dir(run_path: &Path, realm: &str) -> PathBuf {
    run_path.join("realms").join(realm)
}

pub fn space_dir(run_path: &Path, realm: &str, space: &str) -> PathBuf {
    realm_dir(run_path, realm).join("spaces").join(space)
}

pub fn networks_dir(run_path: &Path, realm: &str, space: &str) -> PathBuf {
    space_dir(run_path, realm, space).join("networks")
}

/// Location of the per-space CNI conflist inside the metadata tree.
pub fn conflist_path(run_path: &Path, realm: &str, space: &str) -> PathBuf {
    networks_dir(run_path, realm, space).join(format!("{space}.conflist"))
}

pub fn stack_dir(run_path: &Path, realm: &str, space: &str, stack: &str) -> PathBuf {
    space_dir(run_path, realm, space).join("stacks").join(stack)
}

pub fn cell_dir(run_path: &Path, realm: &str, space: &str, stack: &str, cell: &str) -> PathBuf {
    stack_dir(run_path, realm, space, stack)
        .join("cells")
        .join(cell)
}

/// Atomically replaces `path` with `data`: sibling temp file, fsync, rename.
pub(crate) fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StoreError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("/"));
    fs::create_dir_all(parent).map_err(|source| StoreError::Write {
        path: parent.to_path_buf(),
        source,
    })?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let mut file = File::create(&tmp).map_err(|source| StoreError::Open {
        path: tmp.clone(),
        source,
    })?;
    file.write_all(data).map_err(|source| StoreError::Write {
        path: tmp.clone(),
        source,
    })?;
    file.sync_all().map_err(|source| StoreError::Write {
        path: tmp.clone(),
        source,
    })?;
    drop(file);

    fs::rename(&tmp, path).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// The on-disk metadata store rooted at `run_path`.
#[derive(Debug, Clone)]
pub struct MetaStore {
    run_path: PathBuf,
}

impl MetaStore {
    pub fn new<P: Into<PathBuf>>(run_path: P) -> Self {
        MetaStore {
            run_path: run_path.into(),
        }
    }

    pub fn run_path(&self) -> &Path {
        &self.run_path
    }

    pub fn conflist_path(&self, realm: &str, space: &str) -> PathBuf {
        conflist_path(&self.run_path, realm, space)
    }

    fn write_doc<T: Serialize>(&self, path: &Path, doc: &T) -> Result<(), StoreError> {
        let mut data = serde_json::to_vec_pretty(doc).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        data.push(b'\n');
        write_atomic(path, &data)?;
        tracing::trace!(path = ?path, "wrote metadata");
        Ok(())
    }

    fn read_doc<T: DeserializeOwned>(
        &self,
        path: &Path,
        kind: Kind,
        name: &str,
    ) -> Result<T, StoreError> {
        let file = File::open(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound {
                    kind,
                    name: name.to_owned(),
                }
            } else {
                StoreError::Open {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Removes the entity file, then prunes now-empty ancestor directories
    /// up to (not including) the run path. Missing files are fine; delete
    /// is idempotent.
    fn delete_doc(&self, path: &Path) -> Result<(), StoreError> {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(StoreError::Remove {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
        let mut dir = path.parent();
        while let Some(current) = dir {
            if current == self.run_path || !current.starts_with(&self.run_path) {
                break;
            }
            // Only an empty directory goes; ENOTEMPTY means siblings remain.
            if fs::remove_dir(current).is_err() {
                break;
            }
            dir = current.parent();
        }
        Ok(())
    }

    fn list_dirs(&self, parent: &Path) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(parent) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: parent.to_path_buf(),
                    source,
                })
            }
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Read {
                path: parent.to_path_buf(),
                source,
            })?;
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    // ------------------------------------------------------------- realms --

    pub fn write_realm(&self, realm: &Realm) -> Result<(), StoreError> {
        let doc = v1beta1::realm_to_external(realm, Version::V1Beta1);
        let path = realm_dir(&self.run_path, &realm.name).join(REALM_FILE);
        self.write_doc(&path, &doc)
    }

    pub fn read_realm(&self, name: &str) -> Result<Realm, StoreError> {
        let path = realm_dir(&self.run_path, name).join(REALM_FILE);
        let doc: v1beta1::RealmDoc = self.read_doc(&path, Kind::Realm, name)?;
        Ok(v1beta1::realm_to_internal(doc)?)
    }

    pub fn realm_exists(&self, name: &str) -> bool {
        realm_dir(&self.run_path, name).join(REALM_FILE).is_file()
    }

    pub fn delete_realm(&self, name: &str) -> Result<(), StoreError> {
        self.delete_doc(&realm_dir(&self.run_path, name).join(REALM_FILE))
    }

    pub fn list_realms(&self) -> Result<Vec<Realm>, StoreError> {
        let mut realms = Vec::new();
        for name in self.list_dirs(&self.run_path.join("realms"))? {
            match self.read_realm(&name) {
                Ok(realm) => realms.push(realm),
                // A directory without its entity file is a crash window
                // artifact; skip it rather than fail the listing.
                Err(StoreError::NotFound { .. }) => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(realms)
    }

    // ------------------------------------------------------------- spaces --

    pub fn write_space(&self, space: &Space) -> Result<(), StoreError> {
        let doc = v1beta1::space_to_external(space, Version::V1Beta1);
        let path = space_dir(&self.run_path, &space.realm_name, &space.name).join(SPACE_FILE);
        self.write_doc(&path, &doc)
    }

    pub fn read_space(&self, realm: &str, name: &str) -> Result<Space, StoreError> {
        let path = space_dir(&self.run_path, realm, name).join(SPACE_FILE);
        let doc: v1beta1::SpaceDoc = self.read_doc(&path, Kind::Space, name)?;
        Ok(v1beta1::space_to_internal(doc)?)
    }

    pub fn space_exists(&self, realm: &str, name: &str) -> bool {
        space_dir(&self.run_path, realm, name)
            .join(SPACE_FILE)
            .is_file()
    }

    pub fn delete_space(&self, realm: &str, name: &str) -> Result<(), StoreError> {
        self.delete_doc(&space_dir(&self.run_path, realm, name).join(SPACE_FILE))
    }

    pub fn list_spaces(&self, realm: &str) -> Result<Vec<Space>, StoreError> {
        let parent = realm_dir(&self.run_path, realm).join("spaces");
        let mut spaces = Vec::new();
        for name in self.list_dirs(&parent)? {
            match self.read_space(realm, &name) {
                Ok(space) => spaces.push(space),
                Err(StoreError::NotFound { .. }) => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(spaces)
    }

    // ------------------------------------------------------------- stacks --

    pub fn write_stack(&self, stack: &Stack) -> Result<(), StoreError> {
        let doc = v1beta1::stack_to_external(stack, Version::V1Beta1);
        let path = stack_dir(
            &self.run_path,
            &stack.realm_name,
            &stack.space_name,
            &stack.name,
        )
        .join(STACK_FILE);
        self.write_doc(&path, &doc)
    }

    pub fn read_stack(&self, realm: &str, space: &str, name: &str) -> Result<Stack, StoreError> {
        let path = stack_dir(&self.run_path, realm, space, name).join(STACK_FILE);
        let doc: v1beta1::StackDoc = self.read_doc(&path, Kind::Stack, name)?;
        Ok(v1beta1::stack_to_internal(doc)?)
    }

    pub fn stack_exists(&self, realm: &str, space: &str, name: &str) -> bool {
        stack_dir(&self.run_path, realm, space, name)
            .join(STACK_FILE)
            .is_file()
    }

    pub fn delete_stack(&self, realm: &str, space: &str, name: &str) -> Result<(), StoreError> {
        self.delete_doc(&stack_dir(&self.run_path, realm, space, name).join(STACK_FILE))
    }

    pub fn list_stacks(&self, realm: &str, space: &str) -> Result<Vec<Stack>, StoreError> {
        let parent = space_dir(&self.run_path, realm, space).join("stacks");
        let mut stacks = Vec::new();
        for name in self.list_dirs(&parent)? {
            match self.read_stack(realm, space, &name) {
                Ok(stack) => stacks.push(stack),
                Err(StoreError::NotFound { .. }) => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(stacks)
    }

    // -------------------------------------------------------------- cells --

    pub fn write_cell(&self, cell: &Cell) -> Result<(), StoreError> {
        let doc = v1beta1::cell_to_external(cell, Version::V1Beta1);
        let path = cell_dir(
            &self.run_path,
            &cell.realm_name,
            &cell.space_name,
            &cell.stack_name,
            &cell.name,
        )
        .join(CELL_FILE);
        self.write_doc(&path, &doc)
    }

    pub fn read_cell(
        &self,
        realm: &str,
        space: &str,
        stack: &str,
        name: &str,
    ) -> Result<Cell, StoreError> {
        let path = cell_dir(&self.run_path, realm, space, stack, name).join(CELL_FILE);
        let doc: v1beta1::CellDoc = self.read_doc(&path, Kind::Cell, name)?;
        Ok(v1beta1::cell_to_internal(doc)?)
    }

    pub fn cell_exists(&self, realm: &str, space: &str, stack: &str, name: &str) -> bool {
        cell_dir(&self.run_path, realm, space, stack, name)
            .join(CELL_FILE)
            .is_file()
    }

    pub fn delete_cell(
        &self,
        realm: &str,
        space: &str,
        stack: &str,
        name: &str,
    ) -> Result<(), StoreError> {
        self.delete_doc(&cell_dir(&self.run_path, realm, space, stack, name).join(CELL_FILE))
    }

    pub fn list_cells(
        &self,
        realm: &str,
        space: &str,
        stack: &str,
    ) -> Result<Vec<Cell>, StoreError> {
        let parent = stack_dir(&self.run_path, realm, space, stack).join("cells");
        let mut cells = Vec::new();
        for name in self.list_dirs(&parent)? {
            match self.read_cell(realm, space, stack, &name) {
                Ok(cell) => cells.push(cell),
                Err(StoreError::NotFound { .. }) => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::state::RealmState;
    use crate::model::ContainerSpec;

    fn store() -> (tempfile::TempDir, MetaStore) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let store = MetaStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_realm_round_trip() {
        let (_dir, store) = store();
        let mut realm = Realm::new("alpha");
        realm.state = RealmState::Ready;
        realm.cgroup_path = Some(PathBuf::from("/sys/fs/cgroup/kukeon/alpha"));
        store.write_realm(&realm).unwrap();

        let read = store.read_realm("alpha").unwrap();
        assert_eq!(read.name, "alpha");
        assert_eq!(read.namespace, "alpha");
        assert_eq!(read.state, RealmState::Ready);
        assert_eq!(
            read.cgroup_path.as_deref(),
            Some(Path::new("/sys/fs/cgroup/kukeon/alpha"))
        );
    }

    #[test]
    fn test_metadata_files_are_self_describing() {
        let (dir, store) = store();
        store.write_realm(&Realm::new("alpha")).unwrap();
        let raw =
            fs::read_to_string(realm_dir(dir.path(), "alpha").join(REALM_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["apiVersion"], "v1beta1");
        assert_eq!(value["kind"], "Realm");
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let (_dir, store) = store();
        assert!(matches!(
            store.read_realm("ghost"),
            Err(StoreError::NotFound { kind: Kind::Realm, ref name }) if name == "ghost"
        ));
        assert!(matches!(
            store.read_cell("r", "s", "t", "ghost"),
            Err(StoreError::NotFound { kind: Kind::Cell, .. })
        ));
    }

    #[test]
    fn test_list_on_missing_directories_is_empty() {
        let (_dir, store) = store();
        assert!(store.list_realms().unwrap().is_empty());
        assert!(store.list_spaces("ghost").unwrap().is_empty());
        assert!(store.list_cells("r", "s", "t").unwrap().is_empty());
    }

    #[test]
    fn test_delete_is_idempotent_and_prunes() {
        let (dir, store) = store();
        store.write_realm(&Realm::new("alpha")).unwrap();
        store.delete_realm("alpha").unwrap();
        assert!(!realm_dir(dir.path(), "alpha").exists());
        // Second delete is a no-op.
        store.delete_realm("alpha").unwrap();
    }

    #[test]
    fn test_delete_keeps_directory_with_children() {
        let (dir, store) = store();
        store.write_realm(&Realm::new("alpha")).unwrap();
        store.write_space(&Space::new("s1", "alpha")).unwrap();
        store.delete_realm("alpha").unwrap();
        // The spaces subtree keeps the realm directory alive.
        assert!(realm_dir(dir.path(), "alpha").exists());
        assert!(store.space_exists("alpha", "s1"));
    }

    #[test]
    fn test_write_leaves_no_temp_file() {
        let (dir, store) = store();
        store.write_realm(&Realm::new("alpha")).unwrap();
        let entries: Vec<_> = fs::read_dir(realm_dir(dir.path(), "alpha"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, vec![REALM_FILE.to_owned()]);
    }

    #[test]
    fn test_hierarchy_layout() {
        let (dir, store) = store();
        let mut cell = Cell::new("c1", "r1", "s1", "t1");
        cell.containers.push(ContainerSpec {
            id: "web".into(),
            realm_name: "r1".into(),
            space_name: "s1".into(),
            stack_name: "t1".into(),
            cell_id: "c1".into(),
            image: "nginx:1.25".into(),
            root: true,
            ..Default::default()
        });
        store.write_cell(&cell).unwrap();

        let expected = dir
            .path()
            .join("realms/r1/spaces/s1/stacks/t1/cells/c1/cell.json");
        assert!(expected.is_file());

        let read = store.read_cell("r1", "s1", "t1", "c1").unwrap();
        assert_eq!(read.containers.len(), 1);
        assert_eq!(read.root_container().unwrap().id, "web");
    }

    #[test]
    fn test_list_skips_directories_without_entity_file() {
        let (dir, store) = store();
        store.write_realm(&Realm::new("alpha")).unwrap();
        fs::create_dir_all(realm_dir(dir.path(), "half-written")).unwrap();
        let realms = store.list_realms().unwrap();
        assert_eq!(realms.len(), 1);
        assert_eq!(realms[0].name, "alpha");
    }

    #[test]
    fn test_conflist_path_layout() {
        let (dir, store) = store();
        assert_eq!(
            store.conflist_path("r1", "s1"),
            dir.path().join("realms/r1/spaces/s1/networks/s1.conflist")
        );
    }
}
