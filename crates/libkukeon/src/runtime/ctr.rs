//! `RuntimeAdapter` implementation driving the containerd `ctr` CLI over
//! the daemon's local socket.
//!
//! The daemon itself is out of scope; this adapter only shapes argv
//! vectors, classifies the daemon's error strings into the typed error
//! kinds, and parses the JSON/tabular output. The process invocation goes
//! through the `ExecCommand` seam so tests can script outputs.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use nix::sys::signal::Signal;
use serde::Deserialize;

use super::{
    ContainerCreateOpts, ContainerInfo, RuntimeAdapter, RuntimeError, TaskInfo, TaskStatus,
};
use crate::model::RegistryCredential;

/// Invocation seam for the `ctr` binary.
pub trait ExecCommand: Send + Sync + std::fmt::Debug {
    fn run(&self, bin: &Path, args: &[String]) -> std::io::Result<Output>;
}

/// Runs the binary on the host, inheriting the environment.
#[derive(Debug, Default, Clone)]
pub struct HostExec;

impl ExecCommand for HostExec {
    fn run(&self, bin: &Path, args: &[String]) -> std::io::Result<Output> {
        Command::new(bin).args(args).output()
    }
}

pub struct CtrRuntime {
    bin: PathBuf,
    address: PathBuf,
    exec: Box<dyn ExecCommand>,
}

impl std::fmt::Debug for CtrRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CtrRuntime")
            .field("bin", &self.bin)
            .field("address", &self.address)
            .finish()
    }
}

fn is_not_found(stderr: &str) -> bool {
    stderr.contains("not found") || stderr.contains("NotFound")
}

fn is_already_exists(stderr: &str) -> bool {
    stderr.contains("already exists") || stderr.contains("AlreadyExists")
}

fn is_has_resources(stderr: &str) -> bool {
    stderr.contains("must be empty") || stderr.contains("failed precondition")
}

fn parse_task_status(raw: &str) -> TaskStatus {
    match raw.to_ascii_uppercase().as_str() {
        "CREATED" => TaskStatus::Created,
        "RUNNING" => TaskStatus::Running,
        "STOPPED" => TaskStatus::Stopped,
        "PAUSED" | "PAUSING" => TaskStatus::Paused,
        _ => TaskStatus::Unknown,
    }
}

/// Shape of `ctr containers info` output; only the fields the adapter
/// surfaces are parsed.
#[derive(Debug, Deserialize)]
struct CtrContainerInfo {
    #[serde(rename = "ID", default)]
    id: String,
    #[serde(rename = "Image", default)]
    image: String,
    #[serde(rename = "Labels", default)]
    labels: Option<BTreeMap<String, String>>,
    #[serde(rename = "SnapshotKey", default)]
    snapshot_key: Option<String>,
}

impl CtrRuntime {
    pub fn new<B: Into<PathBuf>, A: Into<PathBuf>>(bin: B, address: A) -> Self {
        Self::with_exec(bin, address, Box::new(HostExec))
    }

    pub fn with_exec<B: Into<PathBuf>, A: Into<PathBuf>>(
        bin: B,
        address: A,
        exec: Box<dyn ExecCommand>,
    ) -> Self {
        CtrRuntime {
            bin: bin.into(),
            address: address.into(),
            exec,
        }
    }

    /// Runs one `ctr` invocation, returning stdout on success.
    fn run(&self, ns: Option<&str>, args: &[&str]) -> Result<String, RuntimeError> {
        let mut argv = vec![
            "--address".to_owned(),
            self.address.to_string_lossy().into_owned(),
        ];
        if let Some(ns) = ns {
            argv.push("--namespace".to_owned());
            argv.push(ns.to_owned());
        }
        argv.extend(args.iter().map(|s| (*s).to_owned()));

        tracing::trace!(bin = ?self.bin, args = ?argv, "invoking ctr");
        let output = self
            .exec
            .run(&self.bin, &argv)
            .map_err(|source| RuntimeError::Exec {
                bin: self.bin.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(RuntimeError::Daemon {
                context: argv.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl RuntimeAdapter for CtrRuntime {
    fn namespace_ensure(&self, ns: &str) -> Result<(), RuntimeError> {
        match self.run(None, &["namespaces", "create", ns]) {
            Ok(_) => Ok(()),
            Err(RuntimeError::Daemon { stderr, .. }) if is_already_exists(&stderr) => Ok(()),
            Err(err) => Err(err),
        }
    }

    fn namespace_remove(&self, ns: &str) -> Result<(), RuntimeError> {
        match self.run(None, &["namespaces", "remove", ns]) {
            Ok(_) => Ok(()),
            Err(RuntimeError::Daemon { stderr, .. }) if is_not_found(&stderr) => Ok(()),
            Err(RuntimeError::Daemon { stderr, .. }) if is_has_resources(&stderr) => {
                Err(RuntimeError::HasResources {
                    namespace: ns.to_owned(),
                })
            }
            Err(err) => Err(err),
        }
    }

    fn namespace_exists(&self, ns: &str) -> Result<bool, RuntimeError> {
        let stdout = self.run(None, &["namespaces", "list", "--quiet"])?;
        Ok(stdout.lines().any(|line| line.trim() == ns))
    }

    fn image_pull(
        &self,
        ns: &str,
        image: &str,
        credential: Option<&RegistryCredential>,
    ) -> Result<(), RuntimeError> {
        let mut args = vec!["images", "pull"];
        let user;
        if let Some(credential) = credential {
            user = format!("{}:{}", credential.username, credential.password);
            args.push("--user");
            args.push(&user);
        }
        args.push(image);
        tracing::debug!(namespace = ns, image, "pulling image");
        self.run(Some(ns), &args).map(|_| ())
    }

    fn container_create(&self, ns: &str, opts: &ContainerCreateOpts) -> Result<(), RuntimeError> {
        let mut args: Vec<String> = vec!["containers".into(), "create".into()];
        for pair in &opts.env {
            args.push("--env".into());
            args.push(pair.clone());
        }
        if opts.privileged {
            args.push("--privileged".into());
        }
        if let Some(cgroup) = &opts.cgroup_path {
            args.push("--cgroup".into());
            args.push(cgroup.clone());
        }
        if let Some(peer) = &opts.join_netns_of {
            let pid = self.task_pid(ns, peer)?;
            args.push("--with-ns".into());
            args.push(format!("network:/proc/{pid}/ns/net"));
        }
        for mount in &opts.mounts {
            let mode = if mount.read_only { "ro" } else { "rw" };
            args.push("--mount".into());
            args.push(format!(
                "type=bind,src={},dst={},options=rbind:{mode}",
                mount.host_path, mount.container_path
            ));
        }
        for (key, value) in &opts.labels {
            args.push("--label".into());
            args.push(format!("{key}={value}"));
        }
        args.push(opts.image.clone());
        args.push(opts.name.clone());
        args.extend(opts.args.iter().cloned());

        let borrowed: Vec<&str> = args.iter().map(String::as_str).collect();
        match self.run(Some(ns), &borrowed) {
            Ok(_) => Ok(()),
            Err(RuntimeError::Daemon { stderr, .. }) if is_already_exists(&stderr) => {
                Err(RuntimeError::AlreadyExists {
                    resource: format!("container {:?}", opts.name),
                })
            }
            Err(err) => Err(err),
        }
    }

    fn container_get(&self, ns: &str, name: &str) -> Result<ContainerInfo, RuntimeError> {
        let context = format!("containers info {name}");
        let stdout = match self.run(Some(ns), &["containers", "info", name]) {
            Ok(stdout) => stdout,
            Err(RuntimeError::Daemon { stderr, .. }) if is_not_found(&stderr) => {
                return Err(RuntimeError::ContainerNotFound {
                    name: name.to_owned(),
                })
            }
            Err(err) => return Err(err),
        };
        let info: CtrContainerInfo =
            serde_json::from_str(&stdout).map_err(|source| RuntimeError::Parse {
                context,
                source,
            })?;

        Ok(ContainerInfo {
            name: info.id,
            image: info.image,
            labels: info.labels.unwrap_or_default(),
            snapshot_key: info.snapshot_key.filter(|k| !k.is_empty()),
        })
    }

    fn container_list(&self, ns: &str, prefix: Option<&str>) -> Result<Vec<String>, RuntimeError> {
        let stdout = self.run(Some(ns), &["containers", "list", "--quiet"])?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .filter(|line| prefix.map_or(true, |p| line.starts_with(p)))
            .map(str::to_owned)
            .collect())
    }

    fn container_delete(&self, ns: &str, name: &str) -> Result<(), RuntimeError> {
        match self.run(Some(ns), &["containers", "delete", name]) {
            Ok(_) => Ok(()),
            Err(RuntimeError::Daemon { stderr, .. }) if is_not_found(&stderr) => {
                Err(RuntimeError::ContainerNotFound {
                    name: name.to_owned(),
                })
            }
            Err(err) => Err(err),
        }
    }

    fn task_create(&self, ns: &str, name: &str) -> Result<(), RuntimeError> {
        // ctr materializes and runs the init process in one step, so task
        // creation only probes that the container record exists; the real
        // work happens in task_start.
        self.container_get(ns, name).map(|_| ())
    }

    fn task_start(&self, ns: &str, name: &str) -> Result<(), RuntimeError> {
        match self.run(Some(ns), &["tasks", "start", "--detach", name]) {
            Ok(_) => Ok(()),
            Err(RuntimeError::Daemon { stderr, .. }) if is_already_exists(&stderr) => {
                Err(RuntimeError::AlreadyExists {
                    resource: format!("task {name:?}"),
                })
            }
            Err(RuntimeError::Daemon { stderr, .. }) if is_not_found(&stderr) => {
                Err(RuntimeError::ContainerNotFound {
                    name: name.to_owned(),
                })
            }
            Err(err) => Err(err),
        }
    }

    fn task_kill(&self, ns: &str, name: &str, signal: Signal) -> Result<(), RuntimeError> {
        let args = ["tasks", "kill", "--signal", signal.as_str(), name];
        match self.run(Some(ns), &args) {
            Ok(_) => Ok(()),
            Err(RuntimeError::Daemon { stderr, .. }) if is_not_found(&stderr) => {
                Err(RuntimeError::TaskNotFound {
                    container: name.to_owned(),
                })
            }
            Err(err) => Err(err),
        }
    }

    fn task_delete(&self, ns: &str, name: &str) -> Result<(), RuntimeError> {
        match self.run(Some(ns), &["tasks", "delete", name]) {
            Ok(_) => Ok(()),
            Err(RuntimeError::Daemon { stderr, .. }) if is_not_found(&stderr) => {
                Err(RuntimeError::TaskNotFound {
                    container: name.to_owned(),
                })
            }
            Err(err) => Err(err),
        }
    }

    fn task_status(&self, ns: &str, name: &str) -> Result<TaskInfo, RuntimeError> {
        let stdout = self.run(Some(ns), &["tasks", "list"])?;
        for line in stdout.lines().skip(1) {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 3 || fields[0] != name {
                continue;
            }
            return Ok(TaskInfo {
                container: name.to_owned(),
                pid: fields[1].parse().ok(),
                status: parse_task_status(fields[2]),
            });
        }

        Err(RuntimeError::TaskNotFound {
            container: name.to_owned(),
        })
    }

    fn snapshot_remove(&self, ns: &str, key: &str) -> Result<(), RuntimeError> {
        match self.run(Some(ns), &["snapshots", "remove", key]) {
            Ok(_) => Ok(()),
            Err(RuntimeError::Daemon { stderr, .. }) if is_not_found(&stderr) => Ok(()),
            Err(err) => Err(err),
        }
    }
}
