//! Standalone container operations against an existing cell.
//!
//! Creating a container on a ready cell hot-attaches it: the cell keeps
//! running, the new container joins the root's netns and is appended to the
//! cell's container list.
use nix::sys::signal::Signal;
use tracing::instrument;

use super::{
    allow_runtime_not_found, container_state_from_task, step_err, Controller, ControllerError,
    DoOptions,
};
use crate::cgroup::CgroupManager;
use crate::model::naming::validate_name;
use crate::model::state::{join_cell_state, CellState};
use crate::model::{ContainerSpec, Kind};
use crate::runtime::{RuntimeError, TaskStatus};

#[derive(Debug)]
pub struct GetContainer {
    pub container: Option<ContainerSpec>,
    pub task: Option<TaskStatus>,
}

impl Controller {
    #[instrument(level = "debug", skip_all, fields(container = %container.id, cell = %container.cell_id))]
    pub fn create_container(
        &self,
        mut container: ContainerSpec,
        opts: &DoOptions,
    ) -> Result<ContainerSpec, ControllerError> {
        if container.id.is_empty() {
            return Err(ControllerError::NameRequired {
                kind: Kind::Container,
            });
        }
        validate_name(&container.id).map_err(|source| ControllerError::InvalidName {
            kind: Kind::Container,
            source,
        })?;

        let mut cell = self.read_cell_or_err(
            &container.realm_name,
            &container.space_name,
            &container.stack_name,
            &container.cell_id,
        )?;
        if cell.state != CellState::Ready {
            return Err(ControllerError::ParentNotReady {
                kind: Kind::Container,
                name: container.id.clone(),
                parent_kind: Kind::Cell,
                parent_name: cell.name.clone(),
            });
        }
        if cell.container(&container.id).is_some() {
            return Err(ControllerError::AlreadyExists {
                kind: Kind::Container,
                name: container.id.clone(),
            });
        }
        if container.root && cell.root_container().is_some() {
            return Err(ControllerError::RootAlreadyDefined {
                cell: cell.name.clone(),
            });
        }
        let root = cell
            .root_container()
            .cloned()
            .ok_or_else(|| ControllerError::RootNotRunning {
                cell: cell.name.clone(),
            })?;

        let realm = self.read_realm_of(&container.realm_name)?;
        let root_name = root.daemon_name();
        match self.runtime.task_status(&realm.namespace, &root_name) {
            Ok(info) if info.status == TaskStatus::Running => {}
            _ => {
                return Err(ControllerError::RootNotRunning {
                    cell: cell.name.clone(),
                })
            }
        }
        container.cell_id = cell.id.clone();
        if opts.dry_run {
            return Ok(container);
        }

        self.runtime
            .image_pull(
                &realm.namespace,
                &container.image,
                realm.credential_for_image(&container.image),
            )
            .map_err(step_err(Kind::Container, &container.id, "pull image"))?;

        let cgroup_rel = CgroupManager::relative_path(&[
            &cell.realm_name,
            &cell.space_name,
            &cell.stack_name,
            &cell.name,
        ])
        .to_string_lossy()
        .into_owned();
        self.ensure_container_created(&realm.namespace, &container, &cgroup_rel, Some(&root_name))
            .map_err(step_err(Kind::Container, &container.id, "create container"))?;
        self.ensure_task_running(&realm.namespace, &container.daemon_name())
            .map_err(step_err(Kind::Container, &container.id, "start container"))?;

        container.status.state = crate::model::state::ContainerState::Running;
        container.status.start_time = Some(chrono::Utc::now());

        cell.containers.push(container.clone());
        self.store.write_cell(&cell)?;
        tracing::info!(container = %container.id, cell = %cell.name, "container attached");
        Ok(container)
    }

    pub fn get_container(
        &self,
        realm: &str,
        space: &str,
        stack: &str,
        cell: &str,
        id: &str,
    ) -> Result<GetContainer, ControllerError> {
        if id.is_empty() {
            return Err(ControllerError::NameRequired {
                kind: Kind::Container,
            });
        }
        let cell = self.read_cell_or_err(realm, space, stack, cell)?;
        let container = match cell.container(id) {
            Some(container) => container.clone(),
            None => {
                return Ok(GetContainer {
                    container: None,
                    task: None,
                })
            }
        };

        let namespace = self.realm_namespace(realm);
        let task = self
            .runtime
            .task_status(&namespace, &container.daemon_name())
            .ok()
            .map(|info| info.status);

        let mut container = container;
        container.status.state = container_state_from_task(task);
        Ok(GetContainer {
            container: Some(container),
            task,
        })
    }

    #[instrument(level = "debug", skip_all, fields(container = id, cell = cell_name))]
    pub fn delete_container(
        &self,
        realm: &str,
        space: &str,
        stack: &str,
        cell_name: &str,
        id: &str,
        opts: &DoOptions,
    ) -> Result<(), ControllerError> {
        if id.is_empty() {
            return Err(ControllerError::NameRequired {
                kind: Kind::Container,
            });
        }
        let mut cell = match self.store.read_cell(realm, space, stack, cell_name) {
            Ok(cell) => cell,
            Err(crate::store::StoreError::NotFound { .. }) => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        let Some(container) = cell.container(id).cloned() else {
            return Ok(());
        };
        // The root holds the cell's netns; it only goes down with the cell.
        if cell.root_container().map(|r| r.id == container.id) == Some(true) {
            return Err(ControllerError::RootContainerInUse {
                cell: cell.name.clone(),
                id: id.to_owned(),
            });
        }
        if opts.dry_run {
            return Ok(());
        }

        let namespace = self.realm_namespace(realm);
        self.teardown_container(&namespace, &container.daemon_name())
            .map_err(step_err(Kind::Container, id, "remove container"))?;

        cell.containers.retain(|c| c.id != container.id);
        self.store.write_cell(&cell)?;
        tracing::info!(container = id, cell = cell_name, "container removed");
        Ok(())
    }

    pub fn start_container(
        &self,
        realm: &str,
        space: &str,
        stack: &str,
        cell_name: &str,
        id: &str,
    ) -> Result<(), ControllerError> {
        let mut cell = self.read_cell_or_err(realm, space, stack, cell_name)?;
        let Some(container) = cell.container(id).cloned() else {
            return Err(ControllerError::NotFound {
                kind: Kind::Container,
                name: id.to_owned(),
            });
        };
        let namespace = self.realm_namespace(realm);
        self.ensure_task_running(&namespace, &container.daemon_name())
            .map_err(step_err(Kind::Container, id, "start container"))?;

        if let Some(entry) = cell.container_mut(id) {
            entry.status.state = crate::model::state::ContainerState::Running;
            if entry.status.start_time.is_none() {
                entry.status.start_time = Some(chrono::Utc::now());
            }
        }
        self.refresh_cell_join(&mut cell, &namespace);
        self.store.write_cell(&cell)?;
        Ok(())
    }

    pub fn stop_container(
        &self,
        realm: &str,
        space: &str,
        stack: &str,
        cell_name: &str,
        id: &str,
    ) -> Result<(), ControllerError> {
        let mut cell = self.read_cell_or_err(realm, space, stack, cell_name)?;
        let Some(container) = cell.container(id).cloned() else {
            return Err(ControllerError::NotFound {
                kind: Kind::Container,
                name: id.to_owned(),
            });
        };
        let namespace = self.realm_namespace(realm);
        self.stop_task(&namespace, &container.daemon_name())
            .map_err(step_err(Kind::Container, id, "stop container"))?;

        if let Some(entry) = cell.container_mut(id) {
            entry.status.state = crate::model::state::ContainerState::Stopped;
            entry.status.finish_time = Some(chrono::Utc::now());
        }
        self.refresh_cell_join(&mut cell, &namespace);
        self.store.write_cell(&cell)?;
        Ok(())
    }

    pub fn kill_container(
        &self,
        realm: &str,
        space: &str,
        stack: &str,
        cell_name: &str,
        id: &str,
        signal: Signal,
    ) -> Result<(), ControllerError> {
        let mut cell = self.read_cell_or_err(realm, space, stack, cell_name)?;
        let Some(container) = cell.container(id).cloned() else {
            return Err(ControllerError::NotFound {
                kind: Kind::Container,
                name: id.to_owned(),
            });
        };
        let namespace = self.realm_namespace(realm);
        allow_runtime_not_found(self.runtime.task_kill(
            &namespace,
            &container.daemon_name(),
            signal,
        ))
        .map_err(step_err(Kind::Container, id, "kill container"))?;

        if let Some(entry) = cell.container_mut(id) {
            entry.status.state = crate::model::state::ContainerState::Stopped;
            entry.status.finish_time = Some(chrono::Utc::now());
            entry.status.exit_signal = Some(signal as i32);
        }
        self.refresh_cell_join(&mut cell, &namespace);
        self.store.write_cell(&cell)?;
        Ok(())
    }

    /// Re-derives the cell state from live task states after a single
    /// container changed.
    fn refresh_cell_join(&self, cell: &mut crate::model::Cell, namespace: &str) {
        let states: Vec<_> = cell
            .containers
            .iter()
            .map(|c| {
                let status = match self.runtime.task_status(namespace, &c.daemon_name()) {
                    Ok(info) => Some(info.status),
                    Err(RuntimeError::TaskNotFound { .. }) => None,
                    Err(_) => Some(TaskStatus::Unknown),
                };
                container_state_from_task(status)
            })
            .collect();
        cell.state = join_cell_state(&states);
    }
}
