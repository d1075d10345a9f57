use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::state::RealmState;

/// Credentials for pulling images from a private registry.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegistryCredential {
    pub username: String,
    pub password: String,
    pub server: String,
}

/// Top-level isolation unit. Owns a runtime-daemon namespace and the root of
/// a cgroup subtree.
#[derive(Debug, Clone, Default)]
pub struct Realm {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    // The runtime-daemon namespace owned by this realm, defaulting to the
    // realm name at the boundary.
    pub namespace: String,
    pub registry_credentials: Vec<RegistryCredential>,
    pub state: RealmState,
    pub cgroup_path: Option<PathBuf>,
}

impl Realm {
    pub fn new(name: &str) -> Self {
        Realm {
            name: name.to_owned(),
            namespace: name.to_owned(),
            ..Default::default()
        }
    }

    /// Credential to use for a pull from `server`, falling back to the
    /// first configured credential when no server matches.
    pub fn credential_for(&self, server: &str) -> Option<&RegistryCredential> {
        self.registry_credentials
            .iter()
            .find(|c| c.server == server)
            .or_else(|| self.registry_credentials.first())
    }

    /// Credential for an image reference, keyed by its registry host
    /// component when it has one.
    pub fn credential_for_image(&self, image: &str) -> Option<&RegistryCredential> {
        let head = image.split('/').next().unwrap_or_default();
        if head.contains('.') || head.contains(':') {
            self.credential_for(head)
        } else {
            self.registry_credentials.first()
        }
    }
}
