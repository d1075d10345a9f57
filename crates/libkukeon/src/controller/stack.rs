//! Stack lifecycle. Purely a cgroup and metadata layer.
use tracing::instrument;

use super::{allow_store_not_found, cascade, step_err, Controller, ControllerError, DoOptions};
use crate::model::naming::{self, validate_name};
use crate::model::state::{SpaceState, StackState};
use crate::model::{Kind, Stack};

#[derive(Debug, Clone, Copy, Default)]
pub struct StackProbe {
    pub metadata: bool,
    pub cgroup: bool,
}

#[derive(Debug)]
pub struct GetStack {
    pub stack: Option<Stack>,
    pub probe: StackProbe,
}

impl Controller {
    #[instrument(level = "debug", skip_all, fields(realm = %stack.realm_name, space = %stack.space_name, stack = %stack.name))]
    pub fn create_stack(&self, mut stack: Stack, opts: &DoOptions) -> Result<Stack, ControllerError> {
        if stack.name.is_empty() {
            return Err(ControllerError::NameRequired { kind: Kind::Stack });
        }
        if stack.realm_name.is_empty() {
            return Err(ControllerError::NameRequired { kind: Kind::Realm });
        }
        if stack.space_name.is_empty() {
            return Err(ControllerError::NameRequired { kind: Kind::Space });
        }
        validate_name(&stack.name).map_err(|source| ControllerError::InvalidName {
            kind: Kind::Stack,
            source,
        })?;

        let space = match self.store.read_space(&stack.realm_name, &stack.space_name) {
            Ok(space) => space,
            Err(crate::store::StoreError::NotFound { .. }) => {
                return Err(ControllerError::NotFound {
                    kind: Kind::Space,
                    name: stack.space_name.clone(),
                })
            }
            Err(err) => return Err(err.into()),
        };
        if space.state != SpaceState::Ready {
            return Err(ControllerError::ParentNotReady {
                kind: Kind::Stack,
                name: stack.name.clone(),
                parent_kind: Kind::Space,
                parent_name: space.name.clone(),
            });
        }
        if opts.dry_run {
            return Ok(stack);
        }

        let cgroup = self
            .cgroups
            .ensure(&[&stack.realm_name, &stack.space_name, &stack.name])
            .map_err(step_err(Kind::Stack, &stack.name, "ensure cgroup"))?;
        stack.cgroup_path = Some(cgroup);

        stack.state = StackState::Ready;
        self.store.write_stack(&stack)?;
        tracing::info!(stack = %stack.name, "stack ready");
        Ok(stack)
    }

    pub fn get_stack(
        &self,
        realm: &str,
        space: &str,
        name: &str,
    ) -> Result<GetStack, ControllerError> {
        if name.is_empty() {
            return Err(ControllerError::NameRequired { kind: Kind::Stack });
        }
        if realm.is_empty() {
            return Err(ControllerError::NameRequired { kind: Kind::Realm });
        }
        if space.is_empty() {
            return Err(ControllerError::NameRequired { kind: Kind::Space });
        }
        let stack = match self.store.read_stack(realm, space, name) {
            Ok(stack) => Some(stack),
            Err(crate::store::StoreError::NotFound { .. }) => None,
            Err(err) => return Err(err.into()),
        };

        let probe = StackProbe {
            metadata: stack.is_some(),
            cgroup: self.cgroups.exists(&[realm, space, name]),
        };

        Ok(GetStack { stack, probe })
    }

    pub fn list_stacks(&self, realm: &str, space: &str) -> Result<Vec<Stack>, ControllerError> {
        Ok(self.store.list_stacks(realm, space)?)
    }

    #[instrument(level = "debug", skip_all, fields(realm = realm, space = space, stack = name))]
    pub fn delete_stack(
        &self,
        realm: &str,
        space: &str,
        name: &str,
        opts: &DoOptions,
    ) -> Result<(), ControllerError> {
        if name.is_empty() {
            return Err(ControllerError::NameRequired { kind: Kind::Stack });
        }
        if realm.is_empty() {
            return Err(ControllerError::NameRequired { kind: Kind::Realm });
        }
        if space.is_empty() {
            return Err(ControllerError::NameRequired { kind: Kind::Space });
        }
        if !self.store.stack_exists(realm, space, name) {
            return Ok(());
        }
        if opts.dry_run {
            return Ok(());
        }

        let cells = self.store.list_cells(realm, space, name)?;
        let mut pending = None;
        if !cells.is_empty() {
            if !opts.cascade {
                return Err(ControllerError::HasChildren {
                    kind: Kind::Stack,
                    name: name.to_owned(),
                });
            }
            if let Err(err) = cascade::delete_children_of_stack(self, realm, space, name, opts) {
                if !opts.force {
                    return Err(err);
                }
                pending = Some(err);
            }
        }

        self.cgroups
            .remove(&[realm, space, name])
            .map_err(step_err(Kind::Stack, name, "remove cgroup"))?;

        self.store.delete_stack(realm, space, name)?;
        tracing::info!(realm, space, stack = name, "stack deleted");
        match pending {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    #[instrument(level = "debug", skip_all, fields(realm = realm, space = space, stack = name))]
    pub fn purge_stack(
        &self,
        realm: &str,
        space: &str,
        name: &str,
        opts: &DoOptions,
    ) -> Result<(), ControllerError> {
        if name.is_empty() {
            return Err(ControllerError::NameRequired { kind: Kind::Stack });
        }
        let mut errors = Vec::new();

        match self.store.list_cells(realm, space, name) {
            Ok(cells) => {
                for cell in cells {
                    if let Err(err) = self.purge_cell(realm, space, name, &cell.name, opts) {
                        errors.push(err);
                    }
                }
            }
            Err(err) => errors.push(err.into()),
        }

        let namespace = self.realm_namespace(realm);
        cascade::purge_daemon_containers(
            self,
            &namespace,
            Some(&naming::stack_name_prefix(space, name)),
            &mut errors,
        );

        if let Err(err) = self.cgroups.remove_tree(&[realm, space, name]) {
            errors.push(step_err(Kind::Stack, name, "remove cgroup")(err));
        }
        if let Err(err) = allow_store_not_found(self.store.delete_stack(realm, space, name)) {
            errors.push(err.into());
        }

        if errors.is_empty() {
            tracing::info!(realm, space, stack = name, "stack purged");
            Ok(())
        } else {
            Err(super::AggregateError(errors).into())
        }
    }
}
