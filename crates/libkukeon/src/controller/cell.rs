//! Cell lifecycle: a cgroup subtree, a root container owning the network
//! namespace, sidecars sharing it, and a metadata file.
use std::collections::BTreeMap;
use std::time::Instant;

use chrono::Utc;
use nix::sys::signal::Signal;
use tracing::instrument;

use super::{
    allow_runtime_not_found, allow_store_not_found, cascade, container_state_from_task, step_err,
    Controller, ControllerError, DoOptions, STOP_POLL_INTERVAL, STOP_TIMEOUT,
};
use crate::cgroup::CgroupManager;
use crate::model::naming::validate_name;
use crate::model::state::{join_cell_state, CellState, ContainerState, StackState};
use crate::model::{Cell, ContainerSpec, Kind, Realm};
use crate::network::NetworkError;
use crate::runtime::{ContainerCreateOpts, RuntimeError, TaskStatus};

#[derive(Debug, Clone)]
pub struct ContainerProbe {
    pub id: String,
    pub daemon_name: String,
    pub task: Option<TaskStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct CellProbe {
    pub metadata: bool,
    pub cgroup: bool,
    pub root_container: bool,
    pub containers: Vec<ContainerProbe>,
}

#[derive(Debug)]
pub struct GetCell {
    pub cell: Option<Cell>,
    pub probe: CellProbe,
}

impl Controller {
    #[instrument(level = "debug", skip_all, fields(cell = %cell.name))]
    pub fn create_cell(&self, mut cell: Cell, opts: &DoOptions) -> Result<Cell, ControllerError> {
        if cell.name.is_empty() {
            return Err(ControllerError::NameRequired { kind: Kind::Cell });
        }
        if cell.realm_name.is_empty() {
            return Err(ControllerError::NameRequired { kind: Kind::Realm });
        }
        if cell.space_name.is_empty() {
            return Err(ControllerError::NameRequired { kind: Kind::Space });
        }
        if cell.stack_name.is_empty() {
            return Err(ControllerError::NameRequired { kind: Kind::Stack });
        }
        validate_name(&cell.name).map_err(|source| ControllerError::InvalidName {
            kind: Kind::Cell,
            source,
        })?;
        if cell.id.is_empty() {
            cell.id = cell.name.clone();
        }
        validate_name(&cell.id).map_err(|source| ControllerError::InvalidName {
            kind: Kind::Cell,
            source,
        })?;

        let stack = match self
            .store
            .read_stack(&cell.realm_name, &cell.space_name, &cell.stack_name)
        {
            Ok(stack) => stack,
            Err(crate::store::StoreError::NotFound { .. }) => {
                return Err(ControllerError::NotFound {
                    kind: Kind::Stack,
                    name: cell.stack_name.clone(),
                })
            }
            Err(err) => return Err(err.into()),
        };
        if stack.state != StackState::Ready {
            return Err(ControllerError::ParentNotReady {
                kind: Kind::Cell,
                name: cell.name.clone(),
                parent_kind: Kind::Stack,
                parent_name: stack.name.clone(),
            });
        }
        let realm = self.read_realm_of(&cell.realm_name)?;

        for container in &mut cell.containers {
            container.realm_name = cell.realm_name.clone();
            container.space_name = cell.space_name.clone();
            container.stack_name = cell.stack_name.clone();
            container.cell_id = cell.id.clone();
        }
        if cell.root_container().is_none() {
            let pause = ContainerSpec::pause(
                &cell.realm_name,
                &cell.space_name,
                &cell.stack_name,
                &cell.id,
            );
            cell.root_container_id = Some(pause.id.clone());
            cell.containers.insert(0, pause);
        }
        if opts.dry_run {
            return Ok(cell);
        }

        cell.state = CellState::Creating;
        self.store.write_cell(&cell)?;

        let segments = [
            cell.realm_name.as_str(),
            cell.space_name.as_str(),
            cell.stack_name.as_str(),
            cell.name.as_str(),
        ];
        let cgroup = self
            .cgroups
            .ensure(&segments)
            .map_err(step_err(Kind::Cell, &cell.name, "ensure cgroup"))?;
        let cgroup_rel = CgroupManager::relative_path(&segments)
            .to_string_lossy()
            .into_owned();
        cell.cgroup_path = Some(cgroup);

        self.pull_cell_images(&realm, &cell)?;

        // Root first; it owns the netns every sidecar joins.
        let root = cell
            .root_container()
            .expect("root resolved above")
            .clone();
        let root_name = root.daemon_name();
        self.ensure_container_created(&realm.namespace, &root, &cgroup_rel, None)
            .map_err(step_err(Kind::Cell, &cell.name, "create root container"))?;
        self.ensure_task_running(&realm.namespace, &root_name)
            .map_err(step_err(Kind::Cell, &cell.name, "start root container"))?;
        self.attach_root(&realm.namespace, &cell, &root)?;

        self.mark_running(&mut cell, &root.id);
        self.store.write_cell(&cell)?;

        let sidecar_ids: Vec<String> =
            cell.sidecars().iter().map(|c| c.id.clone()).collect();
        for id in sidecar_ids {
            let spec = cell.container(&id).expect("listed above").clone();
            self.ensure_container_created(
                &realm.namespace,
                &spec,
                &cgroup_rel,
                Some(&root_name),
            )
            .map_err(step_err(Kind::Container, &id, "create container"))?;
            self.ensure_task_running(&realm.namespace, &spec.daemon_name())
                .map_err(step_err(Kind::Container, &id, "start container"))?;
            self.mark_running(&mut cell, &id);
            self.store.write_cell(&cell)?;
        }

        cell.state = CellState::Ready;
        self.store.write_cell(&cell)?;
        tracing::info!(cell = %cell.name, "cell ready");
        Ok(cell)
    }

    pub fn get_cell(
        &self,
        realm: &str,
        space: &str,
        stack: &str,
        name: &str,
    ) -> Result<GetCell, ControllerError> {
        self.require_cell_scope(realm, space, stack, name)?;
        let cell = match self.store.read_cell(realm, space, stack, name) {
            Ok(cell) => Some(cell),
            Err(crate::store::StoreError::NotFound { .. }) => None,
            Err(err) => return Err(err.into()),
        };

        let mut probe = CellProbe {
            metadata: cell.is_some(),
            cgroup: self.cgroups.exists(&[realm, space, stack, name]),
            ..Default::default()
        };

        let cell = match cell {
            Some(mut cell) => {
                let namespace = self.realm_namespace(realm);
                let mut states = Vec::new();
                let ids: Vec<String> = cell.containers.iter().map(|c| c.id.clone()).collect();
                for id in ids {
                    let daemon_name = cell.container(&id).expect("listed above").daemon_name();
                    let (task, state) = match self.runtime.task_status(&namespace, &daemon_name)
                    {
                        Ok(info) => (Some(info.status), container_state_from_task(Some(info.status))),
                        Err(RuntimeError::TaskNotFound { .. }) => (None, ContainerState::Stopped),
                        Err(_) => (None, ContainerState::Unknown),
                    };
                    states.push(state);
                    if let Some(container) = cell.container_mut(&id) {
                        container.status.state = state;
                    }
                    probe.containers.push(ContainerProbe {
                        id,
                        daemon_name,
                        task,
                    });
                }
                probe.root_container = cell
                    .root_container()
                    .map(|root| {
                        self.runtime
                            .container_get(&namespace, &root.daemon_name())
                            .is_ok()
                    })
                    .unwrap_or(false);
                cell.state = join_cell_state(&states);
                Some(cell)
            }
            None => None,
        };

        Ok(GetCell { cell, probe })
    }

    pub fn list_cells(
        &self,
        realm: &str,
        space: &str,
        stack: &str,
    ) -> Result<Vec<Cell>, ControllerError> {
        Ok(self.store.list_cells(realm, space, stack)?)
    }

    #[instrument(level = "debug", skip_all, fields(cell = name))]
    pub fn delete_cell(
        &self,
        realm: &str,
        space: &str,
        stack: &str,
        name: &str,
        opts: &DoOptions,
    ) -> Result<(), ControllerError> {
        self.require_cell_scope(realm, space, stack, name)?;
        let mut cell = match self.store.read_cell(realm, space, stack, name) {
            Ok(cell) => cell,
            Err(crate::store::StoreError::NotFound { .. }) => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        if opts.dry_run {
            return Ok(());
        }

        cell.state = CellState::Deleting;
        self.store.write_cell(&cell)?;
        let namespace = self.realm_namespace(realm);

        // Reverse of creation: sidecars in reverse declaration order, the
        // root and its network attachment last.
        let sidecar_names: Vec<String> = cell
            .sidecars()
            .iter()
            .rev()
            .map(|c| c.daemon_name())
            .collect();
        for daemon_name in sidecar_names {
            self.teardown_container(&namespace, &daemon_name)
                .map_err(step_err(Kind::Cell, name, "remove container"))?;
        }

        if let Some(root) = cell.root_container().cloned() {
            self.detach_root(&namespace, &cell, &root)
                .map_err(step_err(Kind::Cell, name, "detach root from space network"))?;
            self.teardown_container(&namespace, &root.daemon_name())
                .map_err(step_err(Kind::Cell, name, "remove root container"))?;
        }

        self.cgroups
            .remove(&[realm, space, stack, name])
            .map_err(step_err(Kind::Cell, name, "remove cgroup"))?;

        self.store.delete_cell(realm, space, stack, name)?;
        tracing::info!(cell = name, "cell deleted");
        Ok(())
    }

    #[instrument(level = "debug", skip_all, fields(cell = name))]
    pub fn start_cell(
        &self,
        realm: &str,
        space: &str,
        stack: &str,
        name: &str,
    ) -> Result<Cell, ControllerError> {
        self.require_cell_scope(realm, space, stack, name)?;
        let mut cell = self.read_cell_or_err(realm, space, stack, name)?;
        let namespace = self.realm_namespace(realm);

        let ids: Vec<String> = cell.containers.iter().map(|c| c.id.clone()).collect();
        for id in ids {
            let daemon_name = cell.container(&id).expect("listed above").daemon_name();
            self.ensure_task_running(&namespace, &daemon_name)
                .map_err(step_err(Kind::Container, &id, "start container"))?;
            self.mark_running(&mut cell, &id);
        }

        cell.state = CellState::Ready;
        self.store.write_cell(&cell)?;
        Ok(cell)
    }

    #[instrument(level = "debug", skip_all, fields(cell = name))]
    pub fn stop_cell(
        &self,
        realm: &str,
        space: &str,
        stack: &str,
        name: &str,
    ) -> Result<Cell, ControllerError> {
        self.require_cell_scope(realm, space, stack, name)?;
        let mut cell = self.read_cell_or_err(realm, space, stack, name)?;
        let namespace = self.realm_namespace(realm);

        let ids: Vec<String> = cell.containers.iter().rev().map(|c| c.id.clone()).collect();
        for id in ids {
            let daemon_name = cell.container(&id).expect("listed above").daemon_name();
            self.stop_task(&namespace, &daemon_name)
                .map_err(step_err(Kind::Container, &id, "stop container"))?;
            self.mark_stopped(&mut cell, &id, None);
        }

        cell.state = CellState::Stopped;
        self.store.write_cell(&cell)?;
        Ok(cell)
    }

    #[instrument(level = "debug", skip_all, fields(cell = name))]
    pub fn kill_cell(
        &self,
        realm: &str,
        space: &str,
        stack: &str,
        name: &str,
        signal: Signal,
    ) -> Result<Cell, ControllerError> {
        self.require_cell_scope(realm, space, stack, name)?;
        let mut cell = self.read_cell_or_err(realm, space, stack, name)?;
        let namespace = self.realm_namespace(realm);

        let ids: Vec<String> = cell.containers.iter().rev().map(|c| c.id.clone()).collect();
        for id in ids {
            let daemon_name = cell.container(&id).expect("listed above").daemon_name();
            allow_runtime_not_found(self.runtime.task_kill(&namespace, &daemon_name, signal))
                .map_err(step_err(Kind::Container, &id, "kill container"))?;
            self.mark_stopped(&mut cell, &id, Some(signal as i32));
        }

        cell.state = CellState::Stopped;
        self.store.write_cell(&cell)?;
        Ok(cell)
    }

    /// Best-effort teardown of the cell, its daemon-side containers (listed
    /// or orphaned), snapshots and network attachment.
    #[instrument(level = "debug", skip_all, fields(cell = name))]
    pub fn purge_cell(
        &self,
        realm: &str,
        space: &str,
        stack: &str,
        name: &str,
        opts: &DoOptions,
    ) -> Result<(), ControllerError> {
        self.require_cell_scope(realm, space, stack, name)?;
        let mut errors = Vec::new();

        let cell = match self.store.read_cell(realm, space, stack, name) {
            Ok(cell) => Some(cell),
            Err(crate::store::StoreError::NotFound { .. }) => None,
            Err(err) => {
                errors.push(err.into());
                None
            }
        };
        let namespace = self.realm_namespace(realm);

        if let Some(cell) = &cell {
            if let Some(root) = cell.root_container().cloned() {
                if let Err(err) = self.detach_root(&namespace, cell, &root) {
                    errors.push(step_err(Kind::Cell, name, "detach root from space network")(err));
                }
            }
        }

        // Cell id defaults to the name, which is also the best guess when
        // the metadata is already gone.
        let cell_id = cell.as_ref().map(|c| c.id.clone()).unwrap_or_else(|| name.to_owned());
        let prefix = crate::model::naming::cell_name_prefix(space, stack, &cell_id);
        cascade::purge_daemon_containers(self, &namespace, Some(&prefix), &mut errors);

        if let Err(err) = self.cgroups.remove_tree(&[realm, space, stack, name]) {
            errors.push(step_err(Kind::Cell, name, "remove cgroup")(err));
        }
        if let Err(err) = allow_store_not_found(self.store.delete_cell(realm, space, stack, name))
        {
            errors.push(err.into());
        }

        if errors.is_empty() {
            tracing::info!(cell = name, "cell purged");
            Ok(())
        } else {
            Err(super::AggregateError(errors).into())
        }
    }

    // --------------------------------------------------------- internals --

    fn require_cell_scope(
        &self,
        realm: &str,
        space: &str,
        stack: &str,
        name: &str,
    ) -> Result<(), ControllerError> {
        if name.is_empty() {
            return Err(ControllerError::NameRequired { kind: Kind::Cell });
        }
        if realm.is_empty() {
            return Err(ControllerError::NameRequired { kind: Kind::Realm });
        }
        if space.is_empty() {
            return Err(ControllerError::NameRequired { kind: Kind::Space });
        }
        if stack.is_empty() {
            return Err(ControllerError::NameRequired { kind: Kind::Stack });
        }
        Ok(())
    }

    pub(crate) fn read_realm_of(&self, realm: &str) -> Result<Realm, ControllerError> {
        match self.store.read_realm(realm) {
            Ok(realm) => Ok(realm),
            Err(crate::store::StoreError::NotFound { .. }) => Err(ControllerError::NotFound {
                kind: Kind::Realm,
                name: realm.to_owned(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    pub(crate) fn read_cell_or_err(
        &self,
        realm: &str,
        space: &str,
        stack: &str,
        name: &str,
    ) -> Result<Cell, ControllerError> {
        match self.store.read_cell(realm, space, stack, name) {
            Ok(cell) => Ok(cell),
            Err(crate::store::StoreError::NotFound { .. }) => Err(ControllerError::NotFound {
                kind: Kind::Cell,
                name: name.to_owned(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    fn mark_running(&self, cell: &mut Cell, id: &str) {
        if let Some(container) = cell.container_mut(id) {
            container.status.state = ContainerState::Running;
            if container.status.start_time.is_none() {
                container.status.start_time = Some(Utc::now());
            }
            container.status.finish_time = None;
        }
    }

    fn mark_stopped(&self, cell: &mut Cell, id: &str, exit_signal: Option<i32>) {
        if let Some(container) = cell.container_mut(id) {
            container.status.state = ContainerState::Stopped;
            container.status.finish_time = Some(Utc::now());
            container.status.exit_signal = exit_signal;
        }
    }

    /// Distinct images of a cell are pulled concurrently; the pulls are
    /// independent, only task starts are ordered.
    pub(crate) fn pull_cell_images(
        &self,
        realm: &Realm,
        cell: &Cell,
    ) -> Result<(), ControllerError> {
        let mut images: Vec<&str> = cell.containers.iter().map(|c| c.image.as_str()).collect();
        images.sort_unstable();
        images.dedup();

        let results: Vec<Result<(), RuntimeError>> = std::thread::scope(|scope| {
            let handles: Vec<_> = images
                .iter()
                .map(|image| {
                    scope.spawn(move || {
                        self.runtime.image_pull(
                            &realm.namespace,
                            image,
                            realm.credential_for_image(image),
                        )
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("pull thread panicked"))
                .collect()
        });

        for result in results {
            result.map_err(step_err(Kind::Cell, &cell.name, "pull image"))?;
        }
        Ok(())
    }

    /// `probe → skip-if-present | do`: adopt an existing daemon container,
    /// otherwise create it bound to the cell's cgroup.
    pub(crate) fn ensure_container_created(
        &self,
        namespace: &str,
        spec: &ContainerSpec,
        cgroup_rel: &str,
        join_netns_of: Option<&str>,
    ) -> Result<(), RuntimeError> {
        let name = spec.daemon_name();
        match self.runtime.container_get(namespace, &name) {
            Ok(_) => return Ok(()),
            Err(RuntimeError::ContainerNotFound { .. }) => {}
            Err(err) => return Err(err),
        }

        let mut labels = BTreeMap::new();
        labels.insert("kukeon.realm".to_owned(), spec.realm_name.clone());
        labels.insert("kukeon.space".to_owned(), spec.space_name.clone());
        labels.insert("kukeon.stack".to_owned(), spec.stack_name.clone());
        labels.insert("kukeon.cell".to_owned(), spec.cell_id.clone());
        labels.insert("kukeon.container".to_owned(), spec.id.clone());

        let opts = ContainerCreateOpts {
            name: name.clone(),
            image: spec.image.clone(),
            args: spec.argv(),
            env: spec.env_pairs(),
            privileged: spec.privileged,
            cgroup_path: Some(cgroup_rel.to_owned()),
            join_netns_of: join_netns_of.map(str::to_owned),
            labels,
            mounts: spec.volumes.clone(),
        };
        match self.runtime.container_create(namespace, &opts) {
            Ok(()) => Ok(()),
            // A concurrent invocation got there first; adopt.
            Err(RuntimeError::AlreadyExists { .. }) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Brings a container's task to running, whatever its current state.
    pub(crate) fn ensure_task_running(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<(), RuntimeError> {
        match self.runtime.task_status(namespace, name) {
            Ok(info) => match info.status {
                TaskStatus::Running | TaskStatus::Paused => Ok(()),
                TaskStatus::Created => self.runtime.task_start(namespace, name),
                TaskStatus::Stopped | TaskStatus::Unknown => {
                    allow_runtime_not_found(self.runtime.task_delete(namespace, name))?;
                    self.runtime.task_create(namespace, name)?;
                    self.runtime.task_start(namespace, name)
                }
            },
            Err(RuntimeError::TaskNotFound { .. }) => {
                self.runtime.task_create(namespace, name)?;
                self.runtime.task_start(namespace, name)
            }
            Err(err) => Err(err),
        }
    }

    /// SIGTERM, bounded wait, then SIGKILL; finally removes the task state.
    /// The container record stays.
    pub(crate) fn stop_task(&self, namespace: &str, name: &str) -> Result<(), RuntimeError> {
        match self.runtime.task_status(namespace, name) {
            Ok(_) => {}
            Err(RuntimeError::TaskNotFound { .. }) => return Ok(()),
            Err(err) => return Err(err),
        }

        allow_runtime_not_found(self.runtime.task_kill(namespace, name, Signal::SIGTERM))?;

        let deadline = Instant::now() + STOP_TIMEOUT;
        let mut running = true;
        while Instant::now() < deadline {
            match self.runtime.task_status(namespace, name) {
                Ok(info) if info.status == TaskStatus::Running => {
                    std::thread::sleep(STOP_POLL_INTERVAL)
                }
                _ => {
                    running = false;
                    break;
                }
            }
        }
        if running {
            tracing::warn!(container = name, "graceful stop timed out, killing");
            allow_runtime_not_found(self.runtime.task_kill(namespace, name, Signal::SIGKILL))?;
        }

        allow_runtime_not_found(self.runtime.task_delete(namespace, name))
    }

    /// Kills (if needed) and removes a container's task and record. Every
    /// step reports NotFound as success.
    pub(crate) fn teardown_container(
        &self,
        namespace: &str,
        daemon_name: &str,
    ) -> Result<(), RuntimeError> {
        allow_runtime_not_found(self.runtime.task_kill(
            namespace,
            daemon_name,
            Signal::SIGKILL,
        ))?;
        allow_runtime_not_found(self.runtime.task_delete(namespace, daemon_name))?;
        allow_runtime_not_found(self.runtime.container_delete(namespace, daemon_name))
    }

    /// Resolves the conflist for a cell's root container: an explicit
    /// per-container path wins, then the space's recorded path, then the
    /// store-derived location.
    fn root_conf_path(&self, cell: &Cell, root: &ContainerSpec) -> std::path::PathBuf {
        root.cni_config_path
            .clone()
            .or_else(|| {
                self.store
                    .read_space(&cell.realm_name, &cell.space_name)
                    .ok()
                    .and_then(|space| space.cni_config_path)
            })
            .unwrap_or_else(|| self.store.conflist_path(&cell.realm_name, &cell.space_name))
    }

    fn attach_root(
        &self,
        namespace: &str,
        cell: &Cell,
        root: &ContainerSpec,
    ) -> Result<(), ControllerError> {
        let name = root.daemon_name();
        let pid = self
            .runtime
            .task_pid(namespace, &name)
            .map_err(step_err(Kind::Cell, &cell.name, "resolve root task pid"))?;
        let netns = format!("/proc/{pid}/ns/net");
        let conf = self.root_conf_path(cell, root);

        match self.network.attach(&conf, &netns, &name) {
            Ok(result) => {
                tracing::debug!(cell = %cell.name, ips = ?result.ips.iter().map(|ip| ip.address.clone()).collect::<Vec<_>>(), "attached root to space network");
                Ok(())
            }
            // Re-running create over a live cell; the attachment is there.
            Err(NetworkError::Plugin { message, .. }) if message.contains("already") => Ok(()),
            Err(err) => Err(step_err(Kind::Cell, &cell.name, "attach root to space network")(err)),
        }
    }

    fn detach_root(
        &self,
        namespace: &str,
        cell: &Cell,
        root: &ContainerSpec,
    ) -> Result<(), NetworkError> {
        let name = root.daemon_name();
        // After a kill the pid is gone; DEL still runs with an empty netns.
        let netns = self
            .runtime
            .task_pid(namespace, &name)
            .map(|pid| format!("/proc/{pid}/ns/net"))
            .unwrap_or_default();
        let conf = self.root_conf_path(cell, root);
        self.network.detach(&conf, &netns, &name)
    }
}
