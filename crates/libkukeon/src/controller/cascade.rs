//! Downward walks over the metadata tree.
//!
//! Deletion runs in reverse dependency order: containers go with their
//! cells, then cells, stacks, spaces, realm. A `NotFound` anywhere is not
//! fatal. Without `force` the walk aborts on the first real error; with
//! `force` it continues and the errors come back aggregated.
use super::{
    allow_runtime_not_found, step_err, AggregateError, Controller, ControllerError, DoOptions,
};
use crate::model::Kind;
use crate::runtime::RuntimeError;
use nix::sys::signal::Signal;

pub(crate) fn delete_children_of_realm(
    ctrl: &Controller,
    realm: &str,
    opts: &DoOptions,
) -> Result<(), ControllerError> {
    let mut errors = Vec::new();
    for space in ctrl.store.list_spaces(realm)? {
        match ctrl.delete_space(realm, &space.name, opts) {
            Ok(()) => {}
            Err(err) if opts.force => errors.push(err),
            Err(err) => return Err(err),
        }
    }
    finish(errors)
}

pub(crate) fn delete_children_of_space(
    ctrl: &Controller,
    realm: &str,
    space: &str,
    opts: &DoOptions,
) -> Result<(), ControllerError> {
    let mut errors = Vec::new();
    for stack in ctrl.store.list_stacks(realm, space)? {
        match ctrl.delete_stack(realm, space, &stack.name, opts) {
            Ok(()) => {}
            Err(err) if opts.force => errors.push(err),
            Err(err) => return Err(err),
        }
    }
    finish(errors)
}

pub(crate) fn delete_children_of_stack(
    ctrl: &Controller,
    realm: &str,
    space: &str,
    stack: &str,
    opts: &DoOptions,
) -> Result<(), ControllerError> {
    let mut errors = Vec::new();
    for cell in ctrl.store.list_cells(realm, space, stack)? {
        match ctrl.delete_cell(realm, space, stack, &cell.name, opts) {
            Ok(()) => {}
            Err(err) if opts.force => errors.push(err),
            Err(err) => return Err(err),
        }
    }
    finish(errors)
}

fn finish(errors: Vec<ControllerError>) -> Result<(), ControllerError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AggregateError(errors).into())
    }
}

/// Best-effort removal of daemon-side containers matching a name prefix:
/// kill, task delete, snapshot delete, container delete. Used by purge to
/// catch orphans the metadata no longer knows about.
pub(crate) fn purge_daemon_containers(
    ctrl: &Controller,
    namespace: &str,
    prefix: Option<&str>,
    errors: &mut Vec<ControllerError>,
) {
    match ctrl.runtime.namespace_exists(namespace) {
        Ok(true) => {}
        Ok(false) => return,
        Err(err) => {
            errors.push(step_err(Kind::Realm, namespace, "probe daemon namespace")(err));
            return;
        }
    }

    let names = match ctrl.runtime.container_list(namespace, prefix) {
        Ok(names) => names,
        Err(RuntimeError::NamespaceNotFound { .. }) => return,
        Err(err) => {
            errors.push(step_err(Kind::Realm, namespace, "list daemon containers")(err));
            return;
        }
    };

    for name in names {
        tracing::debug!(namespace, container = %name, "purging daemon container");
        if let Err(err) =
            allow_runtime_not_found(ctrl.runtime.task_kill(namespace, &name, Signal::SIGKILL))
        {
            errors.push(step_err(Kind::Container, &name, "kill task")(err));
        }
        if let Err(err) = allow_runtime_not_found(ctrl.runtime.task_delete(namespace, &name)) {
            errors.push(step_err(Kind::Container, &name, "delete task")(err));
        }
        if let Err(err) = ctrl.runtime.snapshot_remove(namespace, &name) {
            errors.push(step_err(Kind::Container, &name, "remove snapshot")(err));
        }
        if let Err(err) = allow_runtime_not_found(ctrl.runtime.container_delete(namespace, &name))
        {
            errors.push(step_err(Kind::Container, &name, "delete container")(err));
        }
    }
}
