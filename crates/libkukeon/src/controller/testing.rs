//! In-memory fakes for the out-of-process collaborators, plus the
//! controller test-bench built on them.
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::process::Output;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use nix::sys::signal::Signal;

use crate::model::RegistryCredential;
use crate::network::CniExec;
use crate::runtime::{
    ContainerCreateOpts, ContainerInfo, RuntimeAdapter, RuntimeError, TaskInfo, TaskStatus,
};

#[derive(Debug, Clone)]
pub(crate) struct FakeTask {
    pub status: TaskStatus,
    pub pid: u32,
}

#[derive(Debug, Default)]
pub(crate) struct FakeState {
    pub namespaces: BTreeSet<String>,
    pub pulled: BTreeSet<(String, String)>,
    pub containers: BTreeMap<(String, String), ContainerCreateOpts>,
    pub tasks: BTreeMap<(String, String), FakeTask>,
    pub snapshots: BTreeSet<(String, String)>,
    /// Daemon container names in creation order, for ordering assertions.
    pub creation_order: Vec<String>,
}

/// A daemon that lives entirely in memory and enforces the same
/// preconditions the real one does (no container delete while a task
/// exists, no task delete while running, namespace must be empty).
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeRuntime {
    state: Arc<Mutex<FakeState>>,
    next_pid: Arc<AtomicU32>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        FakeRuntime {
            state: Arc::new(Mutex::new(FakeState::default())),
            next_pid: Arc::new(AtomicU32::new(1000)),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn task_of(&self, ns: &str, name: &str) -> Option<FakeTask> {
        self.state()
            .tasks
            .get(&(ns.to_owned(), name.to_owned()))
            .cloned()
    }

    pub fn has_container(&self, ns: &str, name: &str) -> bool {
        self.state()
            .containers
            .contains_key(&(ns.to_owned(), name.to_owned()))
    }
}

impl RuntimeAdapter for FakeRuntime {
    fn namespace_ensure(&self, ns: &str) -> Result<(), RuntimeError> {
        self.state().namespaces.insert(ns.to_owned());
        Ok(())
    }

    fn namespace_remove(&self, ns: &str) -> Result<(), RuntimeError> {
        let mut state = self.state();
        if state.containers.keys().any(|(n, _)| n == ns) {
            return Err(RuntimeError::HasResources {
                namespace: ns.to_owned(),
            });
        }
        state.namespaces.remove(ns);
        Ok(())
    }

    fn namespace_exists(&self, ns: &str) -> Result<bool, RuntimeError> {
        Ok(self.state().namespaces.contains(ns))
    }

    fn image_pull(
        &self,
        ns: &str,
        image: &str,
        _credential: Option<&RegistryCredential>,
    ) -> Result<(), RuntimeError> {
        self.state().pulled.insert((ns.to_owned(), image.to_owned()));
        Ok(())
    }

    fn container_create(&self, ns: &str, opts: &ContainerCreateOpts) -> Result<(), RuntimeError> {
        let mut state = self.state();
        let key = (ns.to_owned(), opts.name.clone());
        if state.containers.contains_key(&key) {
            return Err(RuntimeError::AlreadyExists {
                resource: format!("container {:?}", opts.name),
            });
        }
        state.snapshots.insert(key.clone());
        state.creation_order.push(opts.name.clone());
        state.containers.insert(key, opts.clone());
        Ok(())
    }

    fn container_get(&self, ns: &str, name: &str) -> Result<ContainerInfo, RuntimeError> {
        let state = self.state();
        let opts = state
            .containers
            .get(&(ns.to_owned(), name.to_owned()))
            .ok_or_else(|| RuntimeError::ContainerNotFound {
                name: name.to_owned(),
            })?;
        Ok(ContainerInfo {
            name: opts.name.clone(),
            image: opts.image.clone(),
            labels: opts.labels.clone(),
            snapshot_key: Some(opts.name.clone()),
        })
    }

    fn container_list(&self, ns: &str, prefix: Option<&str>) -> Result<Vec<String>, RuntimeError> {
        Ok(self
            .state()
            .containers
            .keys()
            .filter(|(n, _)| n == ns)
            .map(|(_, name)| name.clone())
            .filter(|name| prefix.map_or(true, |p| name.starts_with(p)))
            .collect())
    }

    fn container_delete(&self, ns: &str, name: &str) -> Result<(), RuntimeError> {
        let mut state = self.state();
        let key = (ns.to_owned(), name.to_owned());
        if state.tasks.contains_key(&key) {
            return Err(RuntimeError::Daemon {
                context: format!("containers delete {name}"),
                stderr: "container has an active task".to_owned(),
            });
        }
        if state.containers.remove(&key).is_none() {
            return Err(RuntimeError::ContainerNotFound {
                name: name.to_owned(),
            });
        }
        Ok(())
    }

    fn task_create(&self, ns: &str, name: &str) -> Result<(), RuntimeError> {
        let mut state = self.state();
        let key = (ns.to_owned(), name.to_owned());
        if !state.containers.contains_key(&key) {
            return Err(RuntimeError::ContainerNotFound {
                name: name.to_owned(),
            });
        }
        if state.tasks.contains_key(&key) {
            return Err(RuntimeError::AlreadyExists {
                resource: format!("task {name:?}"),
            });
        }
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        state.tasks.insert(
            key,
            FakeTask {
                status: TaskStatus::Created,
                pid,
            },
        );
        Ok(())
    }

    fn task_start(&self, ns: &str, name: &str) -> Result<(), RuntimeError> {
        let mut state = self.state();
        let key = (ns.to_owned(), name.to_owned());
        match state.tasks.get_mut(&key) {
            Some(task) if task.status == TaskStatus::Running => Err(RuntimeError::AlreadyExists {
                resource: format!("task {name:?}"),
            }),
            Some(task) => {
                task.status = TaskStatus::Running;
                Ok(())
            }
            None => Err(RuntimeError::TaskNotFound {
                container: name.to_owned(),
            }),
        }
    }

    fn task_kill(&self, ns: &str, name: &str, _signal: Signal) -> Result<(), RuntimeError> {
        let mut state = self.state();
        match state.tasks.get_mut(&(ns.to_owned(), name.to_owned())) {
            Some(task) => {
                task.status = TaskStatus::Stopped;
                Ok(())
            }
            None => Err(RuntimeError::TaskNotFound {
                container: name.to_owned(),
            }),
        }
    }

    fn task_delete(&self, ns: &str, name: &str) -> Result<(), RuntimeError> {
        let mut state = self.state();
        let key = (ns.to_owned(), name.to_owned());
        match state.tasks.get(&key) {
            Some(task) if task.status == TaskStatus::Running => Err(RuntimeError::Daemon {
                context: format!("tasks delete {name}"),
                stderr: "task must be stopped before delete".to_owned(),
            }),
            Some(_) => {
                state.tasks.remove(&key);
                Ok(())
            }
            None => Err(RuntimeError::TaskNotFound {
                container: name.to_owned(),
            }),
        }
    }

    fn task_status(&self, ns: &str, name: &str) -> Result<TaskInfo, RuntimeError> {
        let state = self.state();
        match state.tasks.get(&(ns.to_owned(), name.to_owned())) {
            Some(task) => Ok(TaskInfo {
                container: name.to_owned(),
                pid: Some(task.pid),
                status: task.status,
            }),
            None => Err(RuntimeError::TaskNotFound {
                container: name.to_owned(),
            }),
        }
    }

    fn snapshot_remove(&self, ns: &str, key: &str) -> Result<(), RuntimeError> {
        self.state().snapshots.remove(&(ns.to_owned(), key.to_owned()));
        Ok(())
    }
}

/// CNI plugin fake: records invocations and answers ADD with a fixed
/// address assignment.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeCni {
    pub invocations: Arc<Mutex<Vec<(String, String, String)>>>,
}

impl CniExec for FakeCni {
    fn run(
        &self,
        _bin: &Path,
        env: &[(String, String)],
        _stdin: &[u8],
    ) -> std::io::Result<Output> {
        use std::os::unix::process::ExitStatusExt;

        let lookup = |key: &str| {
            env.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        };
        let command = lookup("CNI_COMMAND");
        self.invocations.lock().unwrap().push((
            command.clone(),
            lookup("CNI_CONTAINERID"),
            lookup("CNI_NETNS"),
        ));

        let stdout = if command == "ADD" {
            br#"{"cniVersion":"1.0.0","ips":[{"address":"10.20.30.5/24","gateway":"10.20.30.1"}]}"#
                .to_vec()
        } else {
            Vec::new()
        };
        Ok(Output {
            status: std::process::ExitStatus::from_raw(0),
            stdout,
            stderr: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgroup::CgroupManager;
    use crate::controller::{Controller, ControllerError, DoOptions};
    use crate::model::state::{CellState, ContainerState, RealmState};
    use crate::model::{naming, Cell, ContainerSpec, Realm, Space, Stack};
    use crate::network::NetworkManager;
    use crate::store::MetaStore;

    struct Bench {
        _dir: tempfile::TempDir,
        ctrl: Controller,
        runtime: FakeRuntime,
        cni: FakeCni,
        run_path: std::path::PathBuf,
        cgroup_mount: std::path::PathBuf,
    }

    fn bench() -> Bench {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let run_path = dir.path().join("run");
        let cgroup_mount = dir.path().join("cgroup");
        std::fs::create_dir_all(&cgroup_mount).unwrap();

        let runtime = FakeRuntime::new();
        let cni = FakeCni::default();
        let ctrl = Controller::new(
            MetaStore::new(&run_path),
            CgroupManager::new(&cgroup_mount),
            Box::new(runtime.clone()),
            NetworkManager::with_exec(&run_path, "/opt/cni/bin", Box::new(cni.clone())),
        );

        Bench {
            _dir: dir,
            ctrl,
            runtime,
            cni,
            run_path,
            cgroup_mount,
        }
    }

    fn opts() -> DoOptions {
        DoOptions::default()
    }

    fn cascade() -> DoOptions {
        DoOptions {
            cascade: true,
            ..Default::default()
        }
    }

    /// Realm, space and stack, ready for cell tests.
    fn seeded(bench: &Bench) {
        bench.ctrl.create_realm(Realm::new("r1"), &opts()).unwrap();
        bench
            .ctrl
            .create_space(Space::new("s1", "r1"), &opts())
            .unwrap();
        bench
            .ctrl
            .create_stack(Stack::new("t1", "r1", "s1"), &opts())
            .unwrap();
    }

    #[test]
    fn test_realm_create_then_delete_clears_all_backing() {
        let bench = bench();
        let realm = bench.ctrl.create_realm(Realm::new("alpha"), &opts()).unwrap();
        assert_eq!(realm.state, RealmState::Ready);
        assert_eq!(realm.namespace, "alpha");
        assert!(realm.cgroup_path.is_some());

        assert!(bench.run_path.join("realms/alpha/realm.json").is_file());
        assert!(bench.runtime.state().namespaces.contains("alpha"));
        assert!(bench.cgroup_mount.join("kukeon/alpha").is_dir());

        bench.ctrl.delete_realm("alpha", &opts()).unwrap();
        assert!(!bench.run_path.join("realms/alpha").exists());
        assert!(!bench.runtime.state().namespaces.contains("alpha"));
        assert!(!bench.cgroup_mount.join("kukeon/alpha").exists());
    }

    #[test]
    fn test_realm_create_and_delete_are_idempotent() {
        let bench = bench();
        bench.ctrl.create_realm(Realm::new("alpha"), &opts()).unwrap();
        bench.ctrl.create_realm(Realm::new("alpha"), &opts()).unwrap();
        bench.ctrl.delete_realm("alpha", &opts()).unwrap();
        bench.ctrl.delete_realm("alpha", &opts()).unwrap();
    }

    #[test]
    fn test_realm_name_validation() {
        let bench = bench();
        assert!(matches!(
            bench.ctrl.create_realm(Realm::new(""), &opts()),
            Err(ControllerError::NameRequired { .. })
        ));
        assert!(matches!(
            bench.ctrl.create_realm(Realm::new("Bad_Name"), &opts()),
            Err(ControllerError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_space_requires_ready_realm() {
        let bench = bench();
        assert!(matches!(
            bench.ctrl.create_space(Space::new("s1", "ghost"), &opts()),
            Err(ControllerError::NotFound { .. })
        ));
    }

    #[test]
    fn test_space_create_writes_conflist() {
        let bench = bench();
        bench.ctrl.create_realm(Realm::new("r1"), &opts()).unwrap();
        let space = bench
            .ctrl
            .create_space(Space::new("s1", "r1"), &opts())
            .unwrap();
        let conf = space.cni_config_path.unwrap();
        assert!(conf.is_file());
        assert!(conf.ends_with("realms/r1/spaces/s1/networks/s1.conflist"));
        assert!(bench.cgroup_mount.join("kukeon/r1/s1").is_dir());
    }

    #[test]
    fn test_delete_with_children_requires_cascade() {
        let bench = bench();
        bench.ctrl.create_realm(Realm::new("r1"), &opts()).unwrap();
        bench
            .ctrl
            .create_space(Space::new("s1", "r1"), &opts())
            .unwrap();

        assert!(matches!(
            bench.ctrl.delete_realm("r1", &opts()),
            Err(ControllerError::HasChildren { .. })
        ));

        bench.ctrl.delete_realm("r1", &cascade()).unwrap();
        assert!(!bench.run_path.join("realms/r1").exists());
        assert!(!bench
            .run_path
            .join("realms/r1/spaces/s1/networks/s1.conflist")
            .exists());
        assert!(!bench.runtime.state().namespaces.contains("r1"));
        assert!(!bench.cgroup_mount.join("kukeon/r1").exists());
    }

    #[test]
    fn test_cell_create_synthesizes_pause_root() {
        let bench = bench();
        seeded(&bench);

        let cell = bench
            .ctrl
            .create_cell(Cell::new("c1", "r1", "s1", "t1"), &opts())
            .unwrap();
        assert_eq!(cell.state, CellState::Ready);
        assert_eq!(cell.root_container_id.as_deref(), Some("root"));
        assert_eq!(cell.containers.len(), 1);

        // The daemon container carries the deterministic name and runs.
        assert!(bench.runtime.has_container("r1", "s1_t1_c1_root"));
        let task = bench.runtime.task_of("r1", "s1_t1_c1_root").unwrap();
        assert_eq!(task.status, crate::runtime::TaskStatus::Running);

        // Root was attached to the space network exactly once.
        let invocations = bench.cni.invocations.lock().unwrap();
        assert_eq!(invocations.len(), 1);
        let (command, container_id, netns) = &invocations[0];
        assert_eq!(command, "ADD");
        assert_eq!(container_id, "s1_t1_c1_root");
        assert!(netns.starts_with("/proc/"));

        assert!(bench.cgroup_mount.join("kukeon/r1/s1/t1/c1").is_dir());
    }

    #[test]
    fn test_cell_create_orders_root_before_sidecars() {
        let bench = bench();
        seeded(&bench);

        let mut cell = Cell::new("c1", "r1", "s1", "t1");
        cell.containers = vec![
            ContainerSpec {
                id: "web".into(),
                image: "nginx:1.25".into(),
                ..Default::default()
            },
            ContainerSpec {
                id: "root".into(),
                root: true,
                image: "registry.k8s.io/pause:3.9".into(),
                ..Default::default()
            },
        ];
        bench.ctrl.create_cell(cell, &opts()).unwrap();

        let state = bench.runtime.state();
        assert_eq!(
            state.creation_order,
            vec!["s1_t1_c1_root", "s1_t1_c1_web"]
        );
        // The sidecar joins the root's network namespace.
        let web = &state.containers[&("r1".to_owned(), "s1_t1_c1_web".to_owned())];
        assert_eq!(web.join_netns_of.as_deref(), Some("s1_t1_c1_root"));
        assert_eq!(web.cgroup_path.as_deref(), Some("/kukeon/r1/s1/t1/c1"));
        // Both images were pulled into the realm namespace.
        assert!(state.pulled.contains(&("r1".to_owned(), "nginx:1.25".to_owned())));
    }

    #[test]
    fn test_cell_create_is_idempotent() {
        let bench = bench();
        seeded(&bench);
        bench
            .ctrl
            .create_cell(Cell::new("c1", "r1", "s1", "t1"), &opts())
            .unwrap();
        let again = bench
            .ctrl
            .create_cell(Cell::new("c1", "r1", "s1", "t1"), &opts())
            .unwrap();
        assert_eq!(again.state, CellState::Ready);
        assert_eq!(bench.runtime.state().creation_order.len(), 1);
    }

    #[test]
    fn test_cell_requires_ready_stack() {
        let bench = bench();
        bench.ctrl.create_realm(Realm::new("r1"), &opts()).unwrap();
        assert!(matches!(
            bench
                .ctrl
                .create_cell(Cell::new("c1", "r1", "s1", "t1"), &opts()),
            Err(ControllerError::NotFound { .. })
        ));
    }

    #[test]
    fn test_cell_stop_start_kill_lifecycle() {
        let bench = bench();
        seeded(&bench);
        bench
            .ctrl
            .create_cell(Cell::new("c1", "r1", "s1", "t1"), &opts())
            .unwrap();

        // Stop removes the task but keeps the container record.
        let cell = bench.ctrl.stop_cell("r1", "s1", "t1", "c1").unwrap();
        assert_eq!(cell.state, CellState::Stopped);
        assert!(bench.runtime.task_of("r1", "s1_t1_c1_root").is_none());
        assert!(bench.runtime.has_container("r1", "s1_t1_c1_root"));
        let get = bench.ctrl.get_cell("r1", "s1", "t1", "c1").unwrap();
        assert_eq!(get.cell.unwrap().state, CellState::Stopped);

        // Start brings the task back.
        let cell = bench.ctrl.start_cell("r1", "s1", "t1", "c1").unwrap();
        assert_eq!(cell.state, CellState::Ready);
        let task = bench.runtime.task_of("r1", "s1_t1_c1_root").unwrap();
        assert_eq!(task.status, crate::runtime::TaskStatus::Running);

        // Kill leaves the stopped task observable.
        let cell = bench
            .ctrl
            .kill_cell("r1", "s1", "t1", "c1", Signal::SIGKILL)
            .unwrap();
        assert_eq!(cell.state, CellState::Stopped);
        let task = bench.runtime.task_of("r1", "s1_t1_c1_root").unwrap();
        assert_eq!(task.status, crate::runtime::TaskStatus::Stopped);
        let get = bench.ctrl.get_cell("r1", "s1", "t1", "c1").unwrap();
        assert_eq!(get.cell.unwrap().state, CellState::Stopped);
    }

    #[test]
    fn test_cell_delete_clears_daemon_and_detaches() {
        let bench = bench();
        seeded(&bench);
        bench
            .ctrl
            .create_cell(Cell::new("c1", "r1", "s1", "t1"), &opts())
            .unwrap();

        bench.ctrl.delete_cell("r1", "s1", "t1", "c1", &opts()).unwrap();
        assert!(!bench.runtime.has_container("r1", "s1_t1_c1_root"));
        assert!(!bench.cgroup_mount.join("kukeon/r1/s1/t1/c1").exists());
        assert!(!bench
            .run_path
            .join("realms/r1/spaces/s1/stacks/t1/cells/c1")
            .exists());

        let invocations = bench.cni.invocations.lock().unwrap();
        assert_eq!(invocations.last().unwrap().0, "DEL");
    }

    #[test]
    fn test_container_hot_attach_and_delete() {
        let bench = bench();
        seeded(&bench);
        bench
            .ctrl
            .create_cell(Cell::new("c1", "r1", "s1", "t1"), &opts())
            .unwrap();

        let container = bench
            .ctrl
            .create_container(
                ContainerSpec {
                    id: "web".into(),
                    realm_name: "r1".into(),
                    space_name: "s1".into(),
                    stack_name: "t1".into(),
                    cell_id: "c1".into(),
                    image: "nginx:1.25".into(),
                    ..Default::default()
                },
                &opts(),
            )
            .unwrap();
        assert_eq!(container.status.state, ContainerState::Running);

        let cell = bench
            .ctrl
            .get_cell("r1", "s1", "t1", "c1")
            .unwrap()
            .cell
            .unwrap();
        assert_eq!(cell.state, CellState::Ready);
        assert_eq!(cell.containers.len(), 2);
        assert!(bench.runtime.has_container("r1", "s1_t1_c1_web"));

        // The root cannot be removed on its own.
        assert!(matches!(
            bench
                .ctrl
                .delete_container("r1", "s1", "t1", "c1", "root", &opts()),
            Err(ControllerError::RootContainerInUse { .. })
        ));

        bench
            .ctrl
            .delete_container("r1", "s1", "t1", "c1", "web", &opts())
            .unwrap();
        assert!(!bench.runtime.has_container("r1", "s1_t1_c1_web"));
        let cell = bench
            .ctrl
            .get_cell("r1", "s1", "t1", "c1")
            .unwrap()
            .cell
            .unwrap();
        assert_eq!(cell.containers.len(), 1);
    }

    #[test]
    fn test_container_create_requires_running_root() {
        let bench = bench();
        seeded(&bench);
        bench
            .ctrl
            .create_cell(Cell::new("c1", "r1", "s1", "t1"), &opts())
            .unwrap();
        bench.ctrl.stop_cell("r1", "s1", "t1", "c1").unwrap();

        assert!(matches!(
            bench.ctrl.create_container(
                ContainerSpec {
                    id: "web".into(),
                    realm_name: "r1".into(),
                    space_name: "s1".into(),
                    stack_name: "t1".into(),
                    cell_id: "c1".into(),
                    image: "nginx:1.25".into(),
                    ..Default::default()
                },
                &opts(),
            ),
            Err(ControllerError::ParentNotReady { .. })
        ));
    }

    #[test]
    fn test_get_realm_probes_partial_presence() {
        let bench = bench();
        bench.ctrl.create_realm(Realm::new("r1"), &opts()).unwrap();

        // Damage the cgroup out-of-band.
        std::fs::remove_dir(bench.cgroup_mount.join("kukeon/r1")).unwrap();

        let get = bench.ctrl.get_realm("r1").unwrap();
        assert!(get.realm.is_some());
        assert!(get.probe.metadata);
        assert!(!get.probe.cgroup);
        assert!(get.probe.namespace);

        let ghost = bench.ctrl.get_realm("ghost").unwrap();
        assert!(ghost.realm.is_none());
        assert!(!ghost.probe.metadata);
    }

    #[test]
    fn test_purge_tolerates_partial_damage() {
        let bench = bench();
        seeded(&bench);
        bench
            .ctrl
            .create_cell(Cell::new("c1", "r1", "s1", "t1"), &opts())
            .unwrap();

        // Remove the whole cgroup subtree out-of-band.
        std::fs::remove_dir_all(bench.cgroup_mount.join("kukeon")).unwrap();

        bench.ctrl.purge_realm("r1", &opts()).unwrap();
        assert!(!bench.run_path.join("realms/r1").exists());
        assert!(!bench.runtime.state().namespaces.contains("r1"));
        assert!(bench.runtime.state().containers.is_empty());
        assert!(bench.runtime.state().snapshots.is_empty());
    }

    #[test]
    fn test_purge_sweeps_orphan_containers() {
        let bench = bench();
        seeded(&bench);

        // An orphan left behind in the daemon with no metadata.
        bench
            .runtime
            .container_create(
                "r1",
                &crate::runtime::ContainerCreateOpts {
                    name: naming::container_name("s1", "t1", "ghost", "root"),
                    image: "registry.k8s.io/pause:3.9".into(),
                    ..Default::default()
                },
            )
            .unwrap();

        bench.ctrl.purge_realm("r1", &opts()).unwrap();
        assert!(bench.runtime.state().containers.is_empty());
    }

    #[test]
    fn test_dry_run_has_no_side_effects() {
        let bench = bench();
        let dry = DoOptions {
            dry_run: true,
            ..Default::default()
        };
        bench.ctrl.create_realm(Realm::new("r1"), &dry).unwrap();
        assert!(!bench.run_path.join("realms/r1").exists());
        assert!(bench.runtime.state().namespaces.is_empty());
    }
}
