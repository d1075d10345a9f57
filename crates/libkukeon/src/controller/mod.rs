//! The orchestration core.
//!
//! One `Controller` per CLI invocation owns the four collaborators and
//! translates `(verb, kind)` requests into the fixed per-kind plans. Every
//! step is idempotent (`probe → skip-if-present | do | persist`); nothing
//! rolls back. A failed create leaves whatever was done for the user to
//! retry or purge.
mod cascade;
mod cell;
mod container;
mod realm;
mod space;
mod stack;

#[cfg(test)]
pub(crate) mod testing;

use std::time::Duration;

use crate::cgroup::CgroupManager;
use crate::error::LibkukeonError;
use crate::model::naming::InvalidName;
use crate::model::state::ContainerState;
use crate::model::{Entity, Kind};
use crate::network::NetworkManager;
use crate::runtime::{RuntimeAdapter, RuntimeError, TaskStatus};
use crate::store::{MetaStore, StoreError};

pub use cell::{CellProbe, ContainerProbe, GetCell};
pub use container::GetContainer;
pub use realm::{GetRealm, RealmProbe};
pub use space::{GetSpace, SpaceProbe};
pub use stack::{GetStack, StackProbe};

/// How long a graceful stop waits for SIGTERM to land before escalating.
pub(crate) const STOP_TIMEOUT: Duration = Duration::from_secs(10);
pub(crate) const STOP_POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, Default)]
pub struct DoOptions {
    /// Delete descendants before the target instead of refusing.
    pub cascade: bool,
    /// Keep going on non-NotFound errors and aggregate them.
    pub force: bool,
    /// Validate and plan only; no side effects.
    pub dry_run: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("{kind} name is required")]
    NameRequired { kind: Kind },
    #[error("invalid {kind} name")]
    InvalidName {
        kind: Kind,
        #[source]
        source: InvalidName,
    },
    #[error("{kind} {name:?} not found")]
    NotFound { kind: Kind, name: String },
    #[error("{kind} {name:?}: parent {parent_kind} {parent_name:?} is not ready")]
    ParentNotReady {
        kind: Kind,
        name: String,
        parent_kind: Kind,
        parent_name: String,
    },
    #[error("{kind} {name:?} still has children; re-run with --cascade")]
    HasChildren { kind: Kind, name: String },
    #[error("{kind} {name:?} already exists")]
    AlreadyExists { kind: Kind, name: String },
    #[error("cell {cell:?} already has a root container")]
    RootAlreadyDefined { cell: String },
    #[error("container {id:?} is the root of cell {cell:?}; delete the cell instead")]
    RootContainerInUse { cell: String, id: String },
    #[error("cell {cell:?} has no running root container")]
    RootNotRunning { cell: String },
    #[error("failed to {step} for {kind} {name:?}")]
    Step {
        kind: Kind,
        name: String,
        step: &'static str,
        #[source]
        source: Box<LibkukeonError>,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Aggregate(#[from] AggregateError),
}

/// Errors collected across a forced cascade or a purge, joined for display.
#[derive(Debug)]
pub struct AggregateError(pub Vec<ControllerError>);

impl std::fmt::Display for AggregateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for err in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{err}")?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

pub struct Controller {
    pub(crate) store: MetaStore,
    pub(crate) cgroups: CgroupManager,
    pub(crate) runtime: Box<dyn RuntimeAdapter>,
    pub(crate) network: NetworkManager,
}

impl Controller {
    /// Dependencies are constructed once per invocation by the caller and
    /// handed over; no process-wide singletons.
    pub fn new(
        store: MetaStore,
        cgroups: CgroupManager,
        runtime: Box<dyn RuntimeAdapter>,
        network: NetworkManager,
    ) -> Self {
        Controller {
            store,
            cgroups,
            runtime,
            network,
        }
    }

    pub fn store(&self) -> &MetaStore {
        &self.store
    }

    /// Create dispatch for the apply planner.
    pub fn create_entity(
        &self,
        entity: Entity,
        opts: &DoOptions,
    ) -> Result<Entity, ControllerError> {
        match entity {
            Entity::Realm(realm) => self.create_realm(realm, opts).map(Entity::Realm),
            Entity::Space(space) => self.create_space(space, opts).map(Entity::Space),
            Entity::Stack(stack) => self.create_stack(stack, opts).map(Entity::Stack),
            Entity::Cell(cell) => self.create_cell(cell, opts).map(Entity::Cell),
            Entity::Container(container) => self
                .create_container(container, opts)
                .map(Entity::Container),
        }
    }

    /// Delete dispatch for `delete -f` and the cascade engine.
    pub fn delete_entity(
        &self,
        entity: &Entity,
        opts: &DoOptions,
    ) -> Result<(), ControllerError> {
        match entity {
            Entity::Realm(realm) => self.delete_realm(&realm.name, opts),
            Entity::Space(space) => self.delete_space(&space.realm_name, &space.name, opts),
            Entity::Stack(stack) => {
                self.delete_stack(&stack.realm_name, &stack.space_name, &stack.name, opts)
            }
            Entity::Cell(cell) => self.delete_cell(
                &cell.realm_name,
                &cell.space_name,
                &cell.stack_name,
                &cell.name,
                opts,
            ),
            Entity::Container(container) => self.delete_container(
                &container.realm_name,
                &container.space_name,
                &container.stack_name,
                &container.cell_id,
                &container.id,
                opts,
            ),
        }
    }
}

// ------------------------------------------------------------- helpers --

/// Wraps a collaborator error with the identity of the entity being worked
/// on and the step that failed.
pub(crate) fn step_err<'a, E: Into<LibkukeonError>>(
    kind: Kind,
    name: &'a str,
    step: &'static str,
) -> impl FnOnce(E) -> ControllerError + 'a {
    move |source| ControllerError::Step {
        kind,
        name: name.to_owned(),
        step,
        source: Box::new(source.into()),
    }
}

/// Idempotent delete steps report daemon NotFound as success.
pub(crate) fn allow_runtime_not_found(result: Result<(), RuntimeError>) -> Result<(), RuntimeError> {
    match result {
        Err(RuntimeError::NamespaceNotFound { .. })
        | Err(RuntimeError::ContainerNotFound { .. })
        | Err(RuntimeError::TaskNotFound { .. }) => Ok(()),
        other => other,
    }
}

pub(crate) fn allow_store_not_found(result: Result<(), StoreError>) -> Result<(), StoreError> {
    match result {
        Err(StoreError::NotFound { .. }) => Ok(()),
        other => other,
    }
}

/// Maps an observed task status onto the container state used by the cell
/// join. No task at all reads as stopped.
pub(crate) fn container_state_from_task(status: Option<TaskStatus>) -> ContainerState {
    match status {
        None => ContainerState::Stopped,
        Some(TaskStatus::Running) => ContainerState::Running,
        Some(TaskStatus::Stopped) => ContainerState::Stopped,
        Some(TaskStatus::Created) | Some(TaskStatus::Paused) => ContainerState::Pending,
        Some(TaskStatus::Unknown) => ContainerState::Unknown,
    }
}
