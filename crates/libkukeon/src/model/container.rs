use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::naming;
use super::state::ContainerState;

/// Image used for a synthesized root container when a cell declares none.
/// The pause binary parks in a long-running no-op and owns the cell's
/// network namespace.
pub const PAUSE_IMAGE: &str = "registry.k8s.io/pause:3.9";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RestartPolicy {
    #[default]
    Never,
    OnFailure,
    Always,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    pub container_port: u16,
    pub host_port: u16,
    #[serde(default = "default_protocol")]
    pub protocol: String,
}

fn default_protocol() -> String {
    "tcp".to_owned()
}

/// A bind mount passed through to the daemon untouched.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    pub host_path: String,
    pub container_path: String,
    #[serde(default)]
    pub read_only: bool,
}

/// Observed status of a single container, persisted next to its spec.
#[derive(Debug, Clone, Default)]
pub struct ContainerStatus {
    pub state: ContainerState,
    pub restart_count: u32,
    pub start_time: Option<DateTime<Utc>>,
    pub finish_time: Option<DateTime<Utc>>,
    pub exit_code: Option<i32>,
    pub exit_signal: Option<i32>,
}

/// A single OCI workload within a cell.
#[derive(Debug, Clone, Default)]
pub struct ContainerSpec {
    // Unique within the parent cell.
    pub id: String,
    pub realm_name: String,
    pub space_name: String,
    pub stack_name: String,
    pub cell_id: String,
    // The network-namespace owner of the cell.
    pub root: bool,
    pub image: String,
    pub command: Vec<String>,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub ports: Vec<PortMapping>,
    pub volumes: Vec<VolumeMount>,
    pub networks: Vec<String>,
    pub network_aliases: Vec<String>,
    pub privileged: bool,
    pub cni_config_path: Option<PathBuf>,
    pub restart_policy: RestartPolicy,
    pub status: ContainerStatus,
}

impl ContainerSpec {
    /// The deterministic daemon-side name of this container.
    pub fn daemon_name(&self) -> String {
        naming::container_name(&self.space_name, &self.stack_name, &self.cell_id, &self.id)
    }

    /// Full argv handed to the daemon, command followed by args.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = self.command.clone();
        argv.extend(self.args.iter().cloned());
        argv
    }

    /// Environment rendered as `KEY=VALUE` pairs in key order.
    pub fn env_pairs(&self) -> Vec<String> {
        self.env.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }

    /// Synthesized pause-style root container for a cell that declares none.
    pub fn pause(realm: &str, space: &str, stack: &str, cell_id: &str) -> Self {
        ContainerSpec {
            id: naming::ROOT_CONTAINER_ID.to_owned(),
            realm_name: realm.to_owned(),
            space_name: space.to_owned(),
            stack_name: stack.to_owned(),
            cell_id: cell_id.to_owned(),
            root: true,
            image: PAUSE_IMAGE.to_owned(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_daemon_name_uses_all_coordinates() {
        let container = ContainerSpec {
            id: "web".into(),
            space_name: "s1".into(),
            stack_name: "t1".into(),
            cell_id: "c1".into(),
            ..Default::default()
        };
        assert_eq!(container.daemon_name(), "s1_t1_c1_web");
    }

    #[test]
    fn test_argv_joins_command_and_args() {
        let container = ContainerSpec {
            command: vec!["nginx".into()],
            args: vec!["-g".into(), "daemon off;".into()],
            ..Default::default()
        };
        assert_eq!(container.argv(), vec!["nginx", "-g", "daemon off;"]);
    }

    #[test]
    fn test_env_pairs_are_sorted() {
        let mut container = ContainerSpec::default();
        container.env.insert("B".into(), "2".into());
        container.env.insert("A".into(), "1".into());
        assert_eq!(container.env_pairs(), vec!["A=1", "B=2"]);
    }

    #[test]
    fn test_pause_container_is_root() {
        let pause = ContainerSpec::pause("r1", "s1", "t1", "c1");
        assert!(pause.root);
        assert_eq!(pause.id, naming::ROOT_CONTAINER_ID);
        assert_eq!(pause.daemon_name(), "s1_t1_c1_root");
        assert_eq!(pause.image, PAUSE_IMAGE);
    }
}
