//! Realm lifecycle: a daemon namespace, a cgroup root and a metadata file.
use tracing::instrument;

use super::{allow_store_not_found, cascade, step_err, Controller, ControllerError, DoOptions};
use crate::model::naming::validate_name;
use crate::model::state::RealmState;
use crate::model::{Kind, Realm};
use crate::runtime::RuntimeError;

/// Existence of each backing resource of a realm. The caller decides what
/// a partial presence means.
#[derive(Debug, Clone, Copy, Default)]
pub struct RealmProbe {
    pub metadata: bool,
    pub cgroup: bool,
    pub namespace: bool,
}

#[derive(Debug)]
pub struct GetRealm {
    pub realm: Option<Realm>,
    pub probe: RealmProbe,
}

impl Controller {
    #[instrument(level = "debug", skip_all, fields(realm = %realm.name))]
    pub fn create_realm(&self, mut realm: Realm, opts: &DoOptions) -> Result<Realm, ControllerError> {
        if realm.name.is_empty() {
            return Err(ControllerError::NameRequired { kind: Kind::Realm });
        }
        validate_name(&realm.name).map_err(|source| ControllerError::InvalidName {
            kind: Kind::Realm,
            source,
        })?;
        if realm.namespace.is_empty() {
            realm.namespace = realm.name.clone();
        }
        if opts.dry_run {
            return Ok(realm);
        }

        realm.state = RealmState::Creating;
        self.store.write_realm(&realm)?;

        self.runtime
            .namespace_ensure(&realm.namespace)
            .map_err(step_err(Kind::Realm, &realm.name, "ensure daemon namespace"))?;

        let cgroup = self
            .cgroups
            .ensure(&[&realm.name])
            .map_err(step_err(Kind::Realm, &realm.name, "ensure cgroup"))?;
        realm.cgroup_path = Some(cgroup);

        realm.state = RealmState::Ready;
        self.store.write_realm(&realm)?;
        tracing::info!(realm = %realm.name, "realm ready");
        Ok(realm)
    }

    pub fn get_realm(&self, name: &str) -> Result<GetRealm, ControllerError> {
        if name.is_empty() {
            return Err(ControllerError::NameRequired { kind: Kind::Realm });
        }
        let realm = match self.store.read_realm(name) {
            Ok(realm) => Some(realm),
            Err(crate::store::StoreError::NotFound { .. }) => None,
            Err(err) => return Err(err.into()),
        };

        let namespace_name = realm
            .as_ref()
            .map(|r| r.namespace.clone())
            .unwrap_or_else(|| name.to_owned());
        let probe = RealmProbe {
            metadata: realm.is_some(),
            cgroup: self.cgroups.exists(&[name]),
            namespace: self.runtime.namespace_exists(&namespace_name).unwrap_or(false),
        };

        Ok(GetRealm { realm, probe })
    }

    pub fn list_realms(&self) -> Result<Vec<Realm>, ControllerError> {
        Ok(self.store.list_realms()?)
    }

    #[instrument(level = "debug", skip_all, fields(realm = name))]
    pub fn delete_realm(&self, name: &str, opts: &DoOptions) -> Result<(), ControllerError> {
        if name.is_empty() {
            return Err(ControllerError::NameRequired { kind: Kind::Realm });
        }
        let mut realm = match self.store.read_realm(name) {
            Ok(realm) => realm,
            Err(crate::store::StoreError::NotFound { .. }) => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        if opts.dry_run {
            return Ok(());
        }

        let spaces = self.store.list_spaces(name)?;
        let mut pending = None;
        if !spaces.is_empty() {
            if !opts.cascade {
                return Err(ControllerError::HasChildren {
                    kind: Kind::Realm,
                    name: name.to_owned(),
                });
            }
            if let Err(err) = cascade::delete_children_of_realm(self, name, opts) {
                if !opts.force {
                    return Err(err);
                }
                pending = Some(err);
            }
        }

        realm.state = RealmState::Deleting;
        self.store.write_realm(&realm)?;

        match self.runtime.namespace_remove(&realm.namespace) {
            Ok(()) => {}
            Err(RuntimeError::NamespaceNotFound { .. }) => {}
            Err(err) => {
                return Err(step_err(Kind::Realm, name, "remove daemon namespace")(err))
            }
        }

        self.cgroups
            .remove(&[name])
            .map_err(step_err(Kind::Realm, name, "remove cgroup"))?;

        self.store.delete_realm(name)?;
        tracing::info!(realm = name, "realm deleted");
        match pending {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    /// Best-effort teardown of the realm and everything below it. Missing
    /// pieces are fine; real failures are collected and returned joined,
    /// after the metadata is gone.
    #[instrument(level = "debug", skip_all, fields(realm = name))]
    pub fn purge_realm(&self, name: &str, opts: &DoOptions) -> Result<(), ControllerError> {
        if name.is_empty() {
            return Err(ControllerError::NameRequired { kind: Kind::Realm });
        }
        let mut errors = Vec::new();

        let realm = match self.store.read_realm(name) {
            Ok(realm) => Some(realm),
            Err(crate::store::StoreError::NotFound { .. }) => None,
            Err(err) => {
                errors.push(err.into());
                None
            }
        };
        let namespace = realm
            .as_ref()
            .map(|r| r.namespace.clone())
            .unwrap_or_else(|| name.to_owned());

        match self.store.list_spaces(name) {
            Ok(spaces) => {
                for space in spaces {
                    if let Err(err) = self.purge_space(name, &space.name, opts) {
                        errors.push(err);
                    }
                }
            }
            Err(err) => errors.push(err.into()),
        }

        // Orphans: the namespace is realm-owned, so every container left in
        // it belongs to kukeon.
        cascade::purge_daemon_containers(self, &namespace, None, &mut errors);

        match self.runtime.namespace_remove(&namespace) {
            Ok(()) => {}
            Err(RuntimeError::NamespaceNotFound { .. }) => {}
            Err(err) => errors.push(step_err(Kind::Realm, name, "remove daemon namespace")(err)),
        }

        if let Err(err) = self.cgroups.remove_tree(&[name]) {
            errors.push(step_err(Kind::Realm, name, "remove cgroup")(err));
        }

        if let Err(err) = allow_store_not_found(self.store.delete_realm(name)) {
            errors.push(err.into());
        }

        if errors.is_empty() {
            tracing::info!(realm = name, "realm purged");
            Ok(())
        } else {
            Err(super::AggregateError(errors).into())
        }
    }
}
