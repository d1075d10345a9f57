//! Façade over the container runtime daemon.
//!
//! The controller only sees the `RuntimeAdapter` trait: namespaces,
//! images, containers, tasks and snapshots, all scoped by a namespace
//! argument. The shipped implementation drives the containerd `ctr` CLI
//! against the daemon's local socket (`ctr` module); tests substitute an
//! in-memory fake.
pub mod ctr;

use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::PathBuf;

use nix::sys::signal::Signal;

pub use ctr::CtrRuntime;

use crate::model::{RegistryCredential, VolumeMount};

pub const DEFAULT_CONTAINERD_SOCKET: &str = "/run/containerd/containerd.sock";
pub const DEFAULT_CTR_BIN: &str = "ctr";

/// Status of a daemon task as the daemon reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Created,
    Running,
    Stopped,
    Paused,
    Unknown,
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let print = match self {
            Self::Created => "Created",
            Self::Running => "Running",
            Self::Stopped => "Stopped",
            Self::Paused => "Paused",
            Self::Unknown => "Unknown",
        };

        write!(f, "{print}")
    }
}

/// Options for creating a daemon container.
#[derive(Debug, Clone, Default)]
pub struct ContainerCreateOpts {
    pub name: String,
    pub image: String,
    pub args: Vec<String>,
    /// `KEY=VALUE` pairs.
    pub env: Vec<String>,
    pub privileged: bool,
    /// Daemon-side cgroupsPath, e.g. `/kukeon/r1/s1/t1/c1`.
    pub cgroup_path: Option<String>,
    /// Name of a running container whose network namespace to join.
    pub join_netns_of: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub mounts: Vec<VolumeMount>,
}

#[derive(Debug, Clone, Default)]
pub struct ContainerInfo {
    pub name: String,
    pub image: String,
    pub labels: BTreeMap<String, String>,
    pub snapshot_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub container: String,
    pub pid: Option<u32>,
    pub status: TaskStatus,
}

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("namespace {name:?} not found")]
    NamespaceNotFound { name: String },
    #[error("container {name:?} not found")]
    ContainerNotFound { name: String },
    #[error("task for container {container:?} not found")]
    TaskNotFound { container: String },
    #[error("{resource} already exists")]
    AlreadyExists { resource: String },
    #[error("namespace {namespace:?} still has resources")]
    HasResources { namespace: String },
    #[error("failed to execute {bin:?}")]
    Exec {
        bin: PathBuf,
        source: std::io::Error,
    },
    #[error("daemon rejected `{context}`: {stderr}")]
    Daemon { context: String, stderr: String },
    #[error("failed to parse daemon output for `{context}`")]
    Parse {
        context: String,
        source: serde_json::Error,
    },
    #[error("unexpected daemon output for `{context}`: {output}")]
    UnexpectedOutput { context: String, output: String },
}

/// The contract the controller programs against. All operations are scoped
/// by the owning realm's daemon namespace.
pub trait RuntimeAdapter: Send + Sync {
    /// Idempotently creates the namespace.
    fn namespace_ensure(&self, ns: &str) -> Result<(), RuntimeError>;
    /// Removes the namespace; `HasResources` if any container remains.
    /// An absent namespace is success.
    fn namespace_remove(&self, ns: &str) -> Result<(), RuntimeError>;
    fn namespace_exists(&self, ns: &str) -> Result<bool, RuntimeError>;

    /// Returns once the image is fetched and unpacked by the snapshotter.
    fn image_pull(
        &self,
        ns: &str,
        image: &str,
        credential: Option<&RegistryCredential>,
    ) -> Result<(), RuntimeError>;

    fn container_create(&self, ns: &str, opts: &ContainerCreateOpts) -> Result<(), RuntimeError>;
    fn container_get(&self, ns: &str, name: &str) -> Result<ContainerInfo, RuntimeError>;
    /// Names of containers in the namespace, optionally restricted to a
    /// name prefix.
    fn container_list(&self, ns: &str, prefix: Option<&str>) -> Result<Vec<String>, RuntimeError>;
    fn container_delete(&self, ns: &str, name: &str) -> Result<(), RuntimeError>;

    /// Materializes the init process without running it.
    fn task_create(&self, ns: &str, name: &str) -> Result<(), RuntimeError>;
    fn task_start(&self, ns: &str, name: &str) -> Result<(), RuntimeError>;
    fn task_kill(&self, ns: &str, name: &str, signal: Signal) -> Result<(), RuntimeError>;
    /// Removes stopped task state; the container record stays.
    fn task_delete(&self, ns: &str, name: &str) -> Result<(), RuntimeError>;
    fn task_status(&self, ns: &str, name: &str) -> Result<TaskInfo, RuntimeError>;

    fn snapshot_remove(&self, ns: &str, key: &str) -> Result<(), RuntimeError>;

    /// Pid of a container's running init process, needed to join its netns
    /// and to file it into cgroups.
    fn task_pid(&self, ns: &str, name: &str) -> Result<u32, RuntimeError> {
        let info = self.task_status(ns, name)?;
        info.pid.ok_or_else(|| RuntimeError::UnexpectedOutput {
            context: format!("task status {name}"),
            output: "no pid reported".to_owned(),
        })
    }
}
