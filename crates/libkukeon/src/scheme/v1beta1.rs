//! External document types for the `v1beta1` boundary and their field-by-
//! field conversions to and from the internal model.
use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{SchemeError, Version};
use crate::model::state::{CellState, ContainerState, RealmState, SpaceState, StackState};
use crate::model::{
    Cell, ContainerSpec, ContainerStatus, Kind, PortMapping, Realm, RegistryCredential,
    RestartPolicy, Space, Stack, VolumeMount,
};

/// Minimal envelope used to sniff the kind before a full parse.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeMeta {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

// ---------------------------------------------------------------- Realm --

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmDoc {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub spec: RealmSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RealmStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmSpec {
    /// The runtime-daemon namespace this realm owns. Empty defaults to the
    /// realm name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub registry_credentials: Vec<RegistryCredential>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmStatus {
    #[serde(default)]
    pub state: RealmState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cgroup_path: Option<PathBuf>,
}

pub fn realm_to_internal(doc: RealmDoc) -> Result<Realm, SchemeError> {
    if doc.metadata.name.is_empty() {
        return Err(SchemeError::NameRequired { kind: Kind::Realm });
    }
    let status = doc.status.unwrap_or_default();
    let namespace = match doc.spec.namespace {
        Some(ns) if !ns.is_empty() => ns,
        _ => doc.metadata.name.clone(),
    };

    Ok(Realm {
        name: doc.metadata.name,
        labels: doc.metadata.labels,
        namespace,
        registry_credentials: doc.spec.registry_credentials,
        state: status.state,
        cgroup_path: status.cgroup_path,
    })
}

pub fn realm_to_external(realm: &Realm, version: Version) -> RealmDoc {
    RealmDoc {
        api_version: version.as_str().to_owned(),
        kind: Kind::Realm.as_str().to_owned(),
        metadata: Metadata {
            name: realm.name.clone(),
            labels: realm.labels.clone(),
        },
        spec: RealmSpec {
            namespace: Some(realm.namespace.clone()),
            registry_credentials: realm.registry_credentials.clone(),
        },
        status: Some(RealmStatus {
            state: realm.state,
            cgroup_path: realm.cgroup_path.clone(),
        }),
    }
}

// ---------------------------------------------------------------- Space --

/// External space state. The internal enum additionally has `Creating` and
/// `Deleting`; both render as `Pending` here.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SpaceStateDoc {
    #[default]
    Pending,
    Ready,
    Failed,
    Unknown,
}

pub fn space_state_to_external(state: SpaceState) -> SpaceStateDoc {
    match state {
        SpaceState::Pending | SpaceState::Creating | SpaceState::Deleting => SpaceStateDoc::Pending,
        SpaceState::Ready => SpaceStateDoc::Ready,
        SpaceState::Failed => SpaceStateDoc::Failed,
        SpaceState::Unknown => SpaceStateDoc::Unknown,
    }
}

pub fn space_state_to_internal(state: SpaceStateDoc) -> SpaceState {
    match state {
        SpaceStateDoc::Pending => SpaceState::Pending,
        SpaceStateDoc::Ready => SpaceState::Ready,
        SpaceStateDoc::Failed => SpaceState::Failed,
        SpaceStateDoc::Unknown => SpaceState::Unknown,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceDoc {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub spec: SpaceSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SpaceStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceSpec {
    #[serde(default)]
    pub realm_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cni_config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceStatus {
    #[serde(default)]
    pub state: SpaceStateDoc,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cgroup_path: Option<PathBuf>,
}

pub fn space_to_internal(doc: SpaceDoc) -> Result<Space, SchemeError> {
    if doc.metadata.name.is_empty() {
        return Err(SchemeError::NameRequired { kind: Kind::Space });
    }
    let status = doc.status.unwrap_or_default();

    Ok(Space {
        name: doc.metadata.name,
        realm_name: doc.spec.realm_id,
        cni_config_path: doc.spec.cni_config_path,
        state: space_state_to_internal(status.state),
        cgroup_path: status.cgroup_path,
    })
}

pub fn space_to_external(space: &Space, version: Version) -> SpaceDoc {
    SpaceDoc {
        api_version: version.as_str().to_owned(),
        kind: Kind::Space.as_str().to_owned(),
        metadata: Metadata {
            name: space.name.clone(),
            labels: BTreeMap::new(),
        },
        spec: SpaceSpec {
            realm_id: space.realm_name.clone(),
            cni_config_path: space.cni_config_path.clone(),
        },
        status: Some(SpaceStatus {
            state: space_state_to_external(space.state),
            cgroup_path: space.cgroup_path.clone(),
        }),
    }
}

// ---------------------------------------------------------------- Stack --

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackDoc {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub spec: StackSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<StackStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackSpec {
    #[serde(default)]
    pub realm_id: String,
    #[serde(default)]
    pub space_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackStatus {
    #[serde(default)]
    pub state: StackState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cgroup_path: Option<PathBuf>,
}

pub fn stack_to_internal(doc: StackDoc) -> Result<Stack, SchemeError> {
    if doc.metadata.name.is_empty() {
        return Err(SchemeError::NameRequired { kind: Kind::Stack });
    }
    let status = doc.status.unwrap_or_default();

    Ok(Stack {
        name: doc.metadata.name,
        realm_name: doc.spec.realm_id,
        space_name: doc.spec.space_id,
        state: status.state,
        cgroup_path: status.cgroup_path,
    })
}

pub fn stack_to_external(stack: &Stack, version: Version) -> StackDoc {
    StackDoc {
        api_version: version.as_str().to_owned(),
        kind: Kind::Stack.as_str().to_owned(),
        metadata: Metadata {
            name: stack.name.clone(),
            labels: BTreeMap::new(),
        },
        spec: StackSpec {
            realm_id: stack.realm_name.clone(),
            space_id: stack.space_name.clone(),
        },
        status: Some(StackStatus {
            state: stack.state,
            cgroup_path: stack.cgroup_path.clone(),
        }),
    }
}

// ----------------------------------------------------------------- Cell --

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellDoc {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub spec: CellSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CellStatus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellSpec {
    /// Stable internal id, defaulting to the metadata name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub realm_id: String,
    #[serde(default)]
    pub space_id: String,
    #[serde(default)]
    pub stack_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_container_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<CellContainerDoc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellStatus {
    #[serde(default)]
    pub state: CellState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cgroup_path: Option<PathBuf>,
}

/// A container spec embedded in a cell document. Ancestry is implied by the
/// enclosing cell and not repeated here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellContainerDoc {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub root: bool,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<PortMapping>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<VolumeMount>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks_aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub privileged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cni_config_path: Option<PathBuf>,
    #[serde(default)]
    pub restart_policy: RestartPolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ContainerStatusDoc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStatusDoc {
    #[serde(default)]
    pub state: ContainerState,
    #[serde(default)]
    pub restart_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_signal: Option<i32>,
}

fn container_status_to_internal(doc: Option<ContainerStatusDoc>) -> ContainerStatus {
    let doc = doc.unwrap_or_default();
    ContainerStatus {
        state: doc.state,
        restart_count: doc.restart_count,
        start_time: doc.start_time,
        finish_time: doc.finish_time,
        exit_code: doc.exit_code,
        exit_signal: doc.exit_signal,
    }
}

fn container_status_to_external(status: &ContainerStatus) -> ContainerStatusDoc {
    ContainerStatusDoc {
        state: status.state,
        restart_count: status.restart_count,
        start_time: status.start_time,
        finish_time: status.finish_time,
        exit_code: status.exit_code,
        exit_signal: status.exit_signal,
    }
}

pub fn cell_to_internal(doc: CellDoc) -> Result<Cell, SchemeError> {
    if doc.metadata.name.is_empty() {
        return Err(SchemeError::NameRequired { kind: Kind::Cell });
    }
    if let Some(root_id) = &doc.spec.root_container_id {
        if !root_id.is_empty() && !doc.spec.containers.iter().any(|c| &c.id == root_id) {
            return Err(SchemeError::RootContainerNotInList {
                cell: doc.metadata.name.clone(),
                id: root_id.clone(),
            });
        }
    }

    let cell_id = match doc.spec.id {
        Some(id) if !id.is_empty() => id,
        _ => doc.metadata.name.clone(),
    };
    let status = doc.status.unwrap_or_default();
    let root_container_id = doc.spec.root_container_id.filter(|id| !id.is_empty());

    let containers = doc
        .spec
        .containers
        .into_iter()
        .map(|c| ContainerSpec {
            id: c.id,
            realm_name: doc.spec.realm_id.clone(),
            space_name: doc.spec.space_id.clone(),
            stack_name: doc.spec.stack_id.clone(),
            cell_id: cell_id.clone(),
            root: c.root,
            image: c.image,
            command: c.command,
            args: c.args,
            env: c.env,
            ports: c.ports,
            volumes: c.volumes,
            networks: c.networks,
            network_aliases: c.networks_aliases,
            privileged: c.privileged,
            cni_config_path: c.cni_config_path,
            restart_policy: c.restart_policy,
            status: container_status_to_internal(c.status),
        })
        .collect();

    Ok(Cell {
        name: doc.metadata.name,
        id: cell_id,
        realm_name: doc.spec.realm_id,
        space_name: doc.spec.space_id,
        stack_name: doc.spec.stack_id,
        root_container_id,
        containers,
        state: status.state,
        cgroup_path: status.cgroup_path,
    })
}

pub fn cell_to_external(cell: &Cell, version: Version) -> CellDoc {
    let containers = cell
        .containers
        .iter()
        .map(|c| CellContainerDoc {
            id: c.id.clone(),
            root: c.root,
            image: c.image.clone(),
            command: c.command.clone(),
            args: c.args.clone(),
            env: c.env.clone(),
            ports: c.ports.clone(),
            volumes: c.volumes.clone(),
            networks: c.networks.clone(),
            networks_aliases: c.network_aliases.clone(),
            privileged: c.privileged,
            cni_config_path: c.cni_config_path.clone(),
            restart_policy: c.restart_policy,
            status: Some(container_status_to_external(&c.status)),
        })
        .collect();

    CellDoc {
        api_version: version.as_str().to_owned(),
        kind: Kind::Cell.as_str().to_owned(),
        metadata: Metadata {
            name: cell.name.clone(),
            labels: BTreeMap::new(),
        },
        spec: CellSpec {
            id: Some(cell.id.clone()),
            realm_id: cell.realm_name.clone(),
            space_id: cell.space_name.clone(),
            stack_id: cell.stack_name.clone(),
            root_container_id: cell.root_container_id.clone(),
            containers,
        },
        status: Some(CellStatus {
            state: cell.state,
            cgroup_path: cell.cgroup_path.clone(),
        }),
    }
}

// ------------------------------------------------------------ Container --

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDoc {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub spec: ContainerDocSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ContainerStatusDoc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDocSpec {
    /// Id within the parent cell, defaulting to the metadata name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub realm_id: String,
    #[serde(default)]
    pub space_id: String,
    #[serde(default)]
    pub stack_id: String,
    #[serde(default)]
    pub cell_id: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub root: bool,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<PortMapping>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<VolumeMount>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks_aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub privileged: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cni_config_path: Option<PathBuf>,
    #[serde(default)]
    pub restart_policy: RestartPolicy,
}

pub fn container_to_internal(doc: ContainerDoc) -> Result<ContainerSpec, SchemeError> {
    if doc.metadata.name.is_empty() {
        return Err(SchemeError::NameRequired {
            kind: Kind::Container,
        });
    }
    let id = match doc.spec.id {
        Some(id) if !id.is_empty() => id,
        _ => doc.metadata.name.clone(),
    };

    Ok(ContainerSpec {
        id,
        realm_name: doc.spec.realm_id,
        space_name: doc.spec.space_id,
        stack_name: doc.spec.stack_id,
        cell_id: doc.spec.cell_id,
        root: doc.spec.root,
        image: doc.spec.image,
        command: doc.spec.command,
        args: doc.spec.args,
        env: doc.spec.env,
        ports: doc.spec.ports,
        volumes: doc.spec.volumes,
        networks: doc.spec.networks,
        network_aliases: doc.spec.networks_aliases,
        privileged: doc.spec.privileged,
        cni_config_path: doc.spec.cni_config_path,
        restart_policy: doc.spec.restart_policy,
        status: container_status_to_internal(doc.status),
    })
}

pub fn container_to_external(container: &ContainerSpec, version: Version) -> ContainerDoc {
    ContainerDoc {
        api_version: version.as_str().to_owned(),
        kind: Kind::Container.as_str().to_owned(),
        metadata: Metadata {
            name: container.id.clone(),
            labels: BTreeMap::new(),
        },
        spec: ContainerDocSpec {
            id: Some(container.id.clone()),
            realm_id: container.realm_name.clone(),
            space_id: container.space_name.clone(),
            stack_id: container.stack_name.clone(),
            cell_id: container.cell_id.clone(),
            root: container.root,
            image: container.image.clone(),
            command: container.command.clone(),
            args: container.args.clone(),
            env: container.env.clone(),
            ports: container.ports.clone(),
            volumes: container.volumes.clone(),
            networks: container.networks.clone(),
            networks_aliases: container.network_aliases.clone(),
            privileged: container.privileged,
            cni_config_path: container.cni_config_path.clone(),
            restart_policy: container.restart_policy,
        },
        status: Some(container_status_to_external(&container.status)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REALM_YAML: &str = r#"
apiVersion: v1beta1
kind: Realm
metadata:
  name: alpha
  labels:
    tier: dev
spec:
  namespace: alpha-ns
  registryCredentials:
    - username: bot
      password: hunter2
      server: registry.example.com
"#;

    #[test]
    fn test_realm_round_trip() {
        let doc: RealmDoc = serde_yaml::from_str(REALM_YAML).unwrap();
        let realm = realm_to_internal(doc.clone()).unwrap();
        assert_eq!(realm.name, "alpha");
        assert_eq!(realm.namespace, "alpha-ns");
        assert_eq!(realm.labels["tier"], "dev");
        assert_eq!(realm.registry_credentials[0].server, "registry.example.com");

        let rebuilt = realm_to_external(&realm, Version::V1Beta1);
        assert_eq!(rebuilt.metadata, doc.metadata);
        assert_eq!(rebuilt.spec.namespace.as_deref(), Some("alpha-ns"));
        assert_eq!(rebuilt.api_version, "v1beta1");
    }

    #[test]
    fn test_realm_namespace_defaults_to_name() {
        let doc: RealmDoc =
            serde_yaml::from_str("kind: Realm\nmetadata:\n  name: alpha\n").unwrap();
        let realm = realm_to_internal(doc).unwrap();
        assert_eq!(realm.namespace, "alpha");
    }

    #[test]
    fn test_realm_requires_name() {
        let doc: RealmDoc = serde_yaml::from_str("kind: Realm\n").unwrap();
        assert!(matches!(
            realm_to_internal(doc),
            Err(SchemeError::NameRequired { kind: Kind::Realm })
        ));
    }

    #[test]
    fn test_space_state_mapping_folds_internal_only_states() {
        assert_eq!(
            space_state_to_external(SpaceState::Creating),
            SpaceStateDoc::Pending
        );
        assert_eq!(
            space_state_to_external(SpaceState::Deleting),
            SpaceStateDoc::Pending
        );
        assert_eq!(
            space_state_to_external(SpaceState::Ready),
            SpaceStateDoc::Ready
        );
        // The external set embeds unchanged.
        for doc in [
            SpaceStateDoc::Pending,
            SpaceStateDoc::Ready,
            SpaceStateDoc::Failed,
            SpaceStateDoc::Unknown,
        ] {
            assert_eq!(space_state_to_external(space_state_to_internal(doc)), doc);
        }
    }

    #[test]
    fn test_cell_rejects_unlisted_root_container() {
        let yaml = r#"
kind: Cell
metadata:
  name: c1
spec:
  realmId: r1
  spaceId: s1
  stackId: t1
  rootContainerId: missing
  containers:
    - id: web
      image: nginx:1.25
"#;
        let doc: CellDoc = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(
            cell_to_internal(doc),
            Err(SchemeError::RootContainerNotInList { ref id, .. }) if id == "missing"
        ));
    }

    #[test]
    fn test_cell_propagates_ancestry_into_containers() {
        let yaml = r#"
kind: Cell
metadata:
  name: c1
spec:
  realmId: r1
  spaceId: s1
  stackId: t1
  rootContainerId: web
  containers:
    - id: web
      image: nginx:1.25
      networksAliases: [www]
"#;
        let doc: CellDoc = serde_yaml::from_str(yaml).unwrap();
        let cell = cell_to_internal(doc).unwrap();
        assert_eq!(cell.id, "c1");
        let web = cell.container("web").unwrap();
        assert_eq!(web.realm_name, "r1");
        assert_eq!(web.space_name, "s1");
        assert_eq!(web.stack_name, "t1");
        assert_eq!(web.cell_id, "c1");
        assert_eq!(web.network_aliases, vec!["www"]);
        assert_eq!(web.daemon_name(), "s1_t1_c1_web");
        assert_eq!(cell.root_container().unwrap().id, "web");
    }

    #[test]
    fn test_cell_round_trip_preserves_containers() {
        let yaml = r#"
kind: Cell
metadata:
  name: c1
spec:
  id: cid
  realmId: r1
  spaceId: s1
  stackId: t1
  containers:
    - id: web
      root: true
      image: nginx:1.25
      env:
        PORT: "80"
      ports:
        - containerPort: 80
          hostPort: 8080
"#;
        let doc: CellDoc = serde_yaml::from_str(yaml).unwrap();
        let cell = cell_to_internal(doc).unwrap();
        let rebuilt = cell_to_external(&cell, Version::V1Beta1);
        assert_eq!(rebuilt.spec.id.as_deref(), Some("cid"));
        assert_eq!(rebuilt.spec.containers.len(), 1);
        let web = &rebuilt.spec.containers[0];
        assert!(web.root);
        assert_eq!(web.env["PORT"], "80");
        assert_eq!(web.ports[0].protocol, "tcp");
    }

    #[test]
    fn test_container_id_defaults_to_name() {
        let yaml = r#"
kind: Container
metadata:
  name: web
spec:
  realmId: r1
  spaceId: s1
  stackId: t1
  cellId: c1
  image: nginx:1.25
"#;
        let doc: ContainerDoc = serde_yaml::from_str(yaml).unwrap();
        let container = container_to_internal(doc).unwrap();
        assert_eq!(container.id, "web");
        assert_eq!(container.daemon_name(), "s1_t1_c1_web");
    }
}
