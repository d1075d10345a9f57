//! Space lifecycle: a CNI bridge network, a cgroup subtree and a metadata
//! file under the parent realm.
use tracing::instrument;

use super::{allow_store_not_found, cascade, step_err, Controller, ControllerError, DoOptions};
use crate::model::naming::{self, validate_name};
use crate::model::state::{RealmState, SpaceState};
use crate::model::{Kind, Space};

#[derive(Debug, Clone, Copy, Default)]
pub struct SpaceProbe {
    pub metadata: bool,
    pub cgroup: bool,
    pub network_config: bool,
}

#[derive(Debug)]
pub struct GetSpace {
    pub space: Option<Space>,
    pub probe: SpaceProbe,
}

impl Controller {
    #[instrument(level = "debug", skip_all, fields(realm = %space.realm_name, space = %space.name))]
    pub fn create_space(&self, mut space: Space, opts: &DoOptions) -> Result<Space, ControllerError> {
        if space.name.is_empty() {
            return Err(ControllerError::NameRequired { kind: Kind::Space });
        }
        if space.realm_name.is_empty() {
            return Err(ControllerError::NameRequired { kind: Kind::Realm });
        }
        validate_name(&space.name).map_err(|source| ControllerError::InvalidName {
            kind: Kind::Space,
            source,
        })?;

        let realm = match self.store.read_realm(&space.realm_name) {
            Ok(realm) => realm,
            Err(crate::store::StoreError::NotFound { .. }) => {
                return Err(ControllerError::NotFound {
                    kind: Kind::Realm,
                    name: space.realm_name.clone(),
                })
            }
            Err(err) => return Err(err.into()),
        };
        if realm.state != RealmState::Ready {
            return Err(ControllerError::ParentNotReady {
                kind: Kind::Space,
                name: space.name.clone(),
                parent_kind: Kind::Realm,
                parent_name: realm.name.clone(),
            });
        }
        if opts.dry_run {
            return Ok(space);
        }

        space.state = SpaceState::Creating;
        self.store.write_space(&space)?;

        let conf = self
            .network
            .space_network_ensure(&space.realm_name, &space.name)
            .map_err(step_err(Kind::Space, &space.name, "ensure space network"))?;
        space.cni_config_path = Some(conf);

        let cgroup = self
            .cgroups
            .ensure(&[&space.realm_name, &space.name])
            .map_err(step_err(Kind::Space, &space.name, "ensure cgroup"))?;
        space.cgroup_path = Some(cgroup);

        space.state = SpaceState::Ready;
        self.store.write_space(&space)?;
        tracing::info!(realm = %space.realm_name, space = %space.name, "space ready");
        Ok(space)
    }

    pub fn get_space(&self, realm: &str, name: &str) -> Result<GetSpace, ControllerError> {
        if name.is_empty() {
            return Err(ControllerError::NameRequired { kind: Kind::Space });
        }
        if realm.is_empty() {
            return Err(ControllerError::NameRequired { kind: Kind::Realm });
        }
        let space = match self.store.read_space(realm, name) {
            Ok(space) => Some(space),
            Err(crate::store::StoreError::NotFound { .. }) => None,
            Err(err) => return Err(err.into()),
        };

        let probe = SpaceProbe {
            metadata: space.is_some(),
            cgroup: self.cgroups.exists(&[realm, name]),
            network_config: self.store.conflist_path(realm, name).is_file(),
        };

        Ok(GetSpace { space, probe })
    }

    pub fn list_spaces(&self, realm: &str) -> Result<Vec<Space>, ControllerError> {
        Ok(self.store.list_spaces(realm)?)
    }

    #[instrument(level = "debug", skip_all, fields(realm = realm, space = name))]
    pub fn delete_space(
        &self,
        realm: &str,
        name: &str,
        opts: &DoOptions,
    ) -> Result<(), ControllerError> {
        if name.is_empty() {
            return Err(ControllerError::NameRequired { kind: Kind::Space });
        }
        if realm.is_empty() {
            return Err(ControllerError::NameRequired { kind: Kind::Realm });
        }
        let mut space = match self.store.read_space(realm, name) {
            Ok(space) => space,
            Err(crate::store::StoreError::NotFound { .. }) => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        if opts.dry_run {
            return Ok(());
        }

        let stacks = self.store.list_stacks(realm, name)?;
        let mut pending = None;
        if !stacks.is_empty() {
            if !opts.cascade {
                return Err(ControllerError::HasChildren {
                    kind: Kind::Space,
                    name: name.to_owned(),
                });
            }
            if let Err(err) = cascade::delete_children_of_space(self, realm, name, opts) {
                if !opts.force {
                    return Err(err);
                }
                pending = Some(err);
            }
        }

        space.state = SpaceState::Deleting;
        self.store.write_space(&space)?;

        self.cgroups
            .remove(&[realm, name])
            .map_err(step_err(Kind::Space, name, "remove cgroup"))?;

        self.network
            .space_network_remove(realm, name)
            .map_err(step_err(Kind::Space, name, "remove space network"))?;

        self.store.delete_space(realm, name)?;
        tracing::info!(realm, space = name, "space deleted");
        match pending {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    /// Best-effort teardown of the space, its descendants and daemon-side
    /// orphans named under it.
    #[instrument(level = "debug", skip_all, fields(realm = realm, space = name))]
    pub fn purge_space(
        &self,
        realm: &str,
        name: &str,
        opts: &DoOptions,
    ) -> Result<(), ControllerError> {
        if name.is_empty() {
            return Err(ControllerError::NameRequired { kind: Kind::Space });
        }
        if realm.is_empty() {
            return Err(ControllerError::NameRequired { kind: Kind::Realm });
        }
        let mut errors = Vec::new();

        match self.store.list_stacks(realm, name) {
            Ok(stacks) => {
                for stack in stacks {
                    if let Err(err) = self.purge_stack(realm, name, &stack.name, opts) {
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
            Some(&naming::space_name_prefix(name)),
            &mut errors,
        );

        if let Err(err) = self.cgroups.remove_tree(&[realm, name]) {
            errors.push(step_err(Kind::Space, name, "remove cgroup")(err));
        }
        if let Err(err) = self.network.space_network_remove(realm, name) {
            errors.push(step_err(Kind::Space, name, "remove space network")(err));
        }
        if let Err(err) = allow_store_not_found(self.store.delete_space(realm, name)) {
            errors.push(err.into());
        }

        if errors.is_empty() {
            tracing::info!(realm, space = name, "space purged");
            Ok(())
        } else {
            Err(super::AggregateError(errors).into())
        }
    }

    /// Daemon namespace of a realm, falling back to the realm name when the
    /// metadata is unreadable.
    pub(crate) fn realm_namespace(&self, realm: &str) -> String {
        self.store
            .read_realm(realm)
            .map(|r| r.namespace)
            .unwrap_or_else(|_| realm.to_owned())
    }
}
