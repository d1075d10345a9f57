//! Per-space CNI bridge networks.
//!
//! Every space owns exactly one bridge network described by a conflist file
//! inside the metadata tree. Bridge name, subnet and gateway are pure
//! functions of `(realm, space)`, so re-creating a space always yields the
//! same network and two spaces on one host cannot collide. Attach and
//! detach shell out to the CNI plugin binaries with the standard CNI
//! environment; only a cell's root container is ever attached.
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use serde::{Deserialize, Serialize};

use crate::store;

pub const CNI_VERSION: &str = "1.0.0";
pub const DEFAULT_CNI_BIN_DIR: &str = "/opt/cni/bin";
/// Interface name given to the container side of the veth pair.
pub const CNI_IFNAME: &str = "eth0";

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("network config {path:?} not found")]
    ConfigNotFound { path: PathBuf },
    #[error("network config {path:?} has no plugins")]
    EmptyConfig { path: PathBuf },
    #[error("failed to read {path:?}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path:?}")]
    Write {
        path: PathBuf,
        source: Box<crate::store::StoreError>,
    },
    #[error("failed to remove {path:?}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path:?}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to execute CNI plugin {bin:?}")]
    Exec {
        bin: PathBuf,
        source: std::io::Error,
    },
    #[error("CNI plugin {plugin} failed for container {container_id:?}: {message}")]
    Plugin {
        plugin: String,
        container_id: String,
        message: String,
    },
    #[error("failed to parse CNI result for container {container_id:?}")]
    ParseResult {
        container_id: String,
        source: serde_json::Error,
    },
}

// ------------------------------------------------------------ conflist --

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetConfList {
    pub cni_version: String,
    pub name: String,
    pub plugins: Vec<NetConf>,
}

/// A single plugin entry of a conflist. Only the bridge fields kukeon
/// writes are typed; anything else rides along in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetConf {
    #[serde(rename = "type")]
    pub plugin_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_gateway: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_masq: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipam: Option<IpamConf>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IpamConf {
    #[serde(rename = "type")]
    pub ipam_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
}

/// Result of a CNI `ADD`, reduced to the assigned addresses.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CniResult {
    #[serde(default)]
    pub ips: Vec<CniIp>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CniIp {
    pub address: String,
    #[serde(default)]
    pub gateway: Option<String>,
}

// ------------------------------------------------- deterministic naming --

/// 32-bit FNV-1a over `<realm>/<space>`.
fn space_hash(realm: &str, space: &str) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for byte in realm
        .as_bytes()
        .iter()
        .chain(b"/")
        .chain(space.as_bytes())
    {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    hash
}

/// Bridge device name for a space. Stays within IFNAMSIZ.
pub fn bridge_name(realm: &str, space: &str) -> String {
    format!("kk-{:08x}", space_hash(realm, space))
}

/// Deterministic `10.x.y.0/24` subnet for a space, derived from the folded
/// hash of `(realm, space)`.
pub fn space_subnet(realm: &str, space: &str) -> (String, String) {
    let hash = space_hash(realm, space);
    let folded = (hash ^ (hash >> 16)) & 0xffff;
    let hi = (folded >> 8) as u8;
    let lo = (folded & 0xff) as u8;
    (
        format!("10.{hi}.{lo}.0/24"),
        format!("10.{hi}.{lo}.1"),
    )
}

/// Network name embedded in the conflist, scoped by realm and space.
pub fn network_name(realm: &str, space: &str) -> String {
    format!("kukeon-{realm}-{space}")
}

fn build_conflist(realm: &str, space: &str) -> NetConfList {
    let (subnet, gateway) = space_subnet(realm, space);
    NetConfList {
        cni_version: CNI_VERSION.to_owned(),
        name: network_name(realm, space),
        plugins: vec![NetConf {
            plugin_type: "bridge".to_owned(),
            bridge: Some(bridge_name(realm, space)),
            is_gateway: Some(true),
            ip_masq: Some(true),
            ipam: Some(IpamConf {
                ipam_type: "host-local".to_owned(),
                subnet: Some(subnet),
                gateway: Some(gateway),
            }),
            extra: BTreeMap::new(),
        }],
    }
}

// ----------------------------------------------------- plugin invocation --

/// Invocation seam for CNI plugin binaries. The plugin reads its config
/// from stdin and takes everything else from the environment.
pub trait CniExec: Send + Sync + std::fmt::Debug {
    fn run(
        &self,
        bin: &Path,
        env: &[(String, String)],
        stdin: &[u8],
    ) -> std::io::Result<Output>;
}

#[derive(Debug, Default, Clone)]
pub struct HostCniExec;

impl CniExec for HostCniExec {
    fn run(
        &self,
        bin: &Path,
        env: &[(String, String)],
        stdin: &[u8],
    ) -> std::io::Result<Output> {
        let mut child = Command::new(bin)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        child
            .stdin
            .take()
            .expect("stdin was piped")
            .write_all(stdin)?;
        child.wait_with_output()
    }
}

/// Builds the standard CNI environment for one plugin invocation.
fn cni_env(
    command: &str,
    container_id: &str,
    netns: &str,
    bin_dir: &Path,
) -> Vec<(String, String)> {
    vec![
        ("CNI_COMMAND".to_owned(), command.to_owned()),
        ("CNI_CONTAINERID".to_owned(), container_id.to_owned()),
        ("CNI_NETNS".to_owned(), netns.to_owned()),
        ("CNI_IFNAME".to_owned(), CNI_IFNAME.to_owned()),
        (
            "CNI_PATH".to_owned(),
            bin_dir.to_string_lossy().into_owned(),
        ),
    ]
}

pub struct NetworkManager {
    run_path: PathBuf,
    cni_bin_dir: PathBuf,
    exec: Box<dyn CniExec>,
}

impl std::fmt::Debug for NetworkManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkManager")
            .field("run_path", &self.run_path)
            .field("cni_bin_dir", &self.cni_bin_dir)
            .finish()
    }
}

impl NetworkManager {
    pub fn new<P: Into<PathBuf>, B: Into<PathBuf>>(run_path: P, cni_bin_dir: B) -> Self {
        Self::with_exec(run_path, cni_bin_dir, Box::new(HostCniExec))
    }

    pub fn with_exec<P: Into<PathBuf>, B: Into<PathBuf>>(
        run_path: P,
        cni_bin_dir: B,
        exec: Box<dyn CniExec>,
    ) -> Self {
        NetworkManager {
            run_path: run_path.into(),
            cni_bin_dir: cni_bin_dir.into(),
            exec,
        }
    }

    pub fn conflist_path(&self, realm: &str, space: &str) -> PathBuf {
        store::conflist_path(&self.run_path, realm, space)
    }

    /// Writes the space's conflist. Re-writing identical content is a
    /// no-op, so repeated creates never churn the file.
    pub fn space_network_ensure(&self, realm: &str, space: &str) -> Result<PathBuf, NetworkError> {
        let path = self.conflist_path(realm, space);
        let conflist = build_conflist(realm, space);
        let mut data = serde_json::to_vec_pretty(&conflist).map_err(|source| {
            NetworkError::Parse {
                path: path.clone(),
                source,
            }
        })?;
        data.push(b'\n');

        match fs::read(&path) {
            Ok(existing) if existing == data => return Ok(path),
            _ => {}
        }

        store::write_atomic(&path, &data).map_err(|source| NetworkError::Write {
            path: path.clone(),
            source: Box::new(source),
        })?;
        tracing::debug!(realm, space, path = ?path, "wrote space network config");
        Ok(path)
    }

    /// Deletes the conflist; an absent file is success.
    pub fn space_network_remove(&self, realm: &str, space: &str) -> Result<(), NetworkError> {
        let path = self.conflist_path(realm, space);
        match fs::remove_file(&path) {
            Ok(()) => {
                // Prune the networks directory if this was the last file.
                if let Some(dir) = path.parent() {
                    let _ = fs::remove_dir(dir);
                }
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(NetworkError::Remove { path, source }),
        }
    }

    fn load_conflist(&self, conf_path: &Path) -> Result<NetConfList, NetworkError> {
        let data = fs::read(conf_path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                NetworkError::ConfigNotFound {
                    path: conf_path.to_path_buf(),
                }
            } else {
                NetworkError::Read {
                    path: conf_path.to_path_buf(),
                    source,
                }
            }
        })?;
        serde_json::from_slice(&data).map_err(|source| NetworkError::Parse {
            path: conf_path.to_path_buf(),
            source,
        })
    }

    /// Renders the per-plugin stdin config: the plugin entry plus the
    /// conflist-level `cniVersion` and `name`.
    fn plugin_stdin(
        &self,
        conflist: &NetConfList,
        conf_path: &Path,
    ) -> Result<(String, Vec<u8>), NetworkError> {
        let plugin = conflist
            .plugins
            .first()
            .ok_or_else(|| NetworkError::EmptyConfig {
                path: conf_path.to_path_buf(),
            })?;
        let mut value =
            serde_json::to_value(plugin).map_err(|source| NetworkError::Parse {
                path: conf_path.to_path_buf(),
                source,
            })?;
        value["cniVersion"] = serde_json::Value::String(conflist.cni_version.clone());
        value["name"] = serde_json::Value::String(conflist.name.clone());
        let data = serde_json::to_vec(&value).map_err(|source| NetworkError::Parse {
            path: conf_path.to_path_buf(),
            source,
        })?;
        Ok((plugin.plugin_type.clone(), data))
    }

    fn invoke(
        &self,
        command: &str,
        conf_path: &Path,
        netns: &str,
        container_id: &str,
    ) -> Result<Output, NetworkError> {
        let conflist = self.load_conflist(conf_path)?;
        let (plugin_type, stdin) = self.plugin_stdin(&conflist, conf_path)?;
        let bin = self.cni_bin_dir.join(&plugin_type);
        let env = cni_env(command, container_id, netns, &self.cni_bin_dir);

        tracing::debug!(command, plugin = %plugin_type, container_id, netns, "invoking CNI plugin");
        let output = self
            .exec
            .run(&bin, &env, &stdin)
            .map_err(|source| NetworkError::Exec {
                bin: bin.clone(),
                source,
            })?;

        if !output.status.success() {
            // Plugins report errors as JSON on stdout; fall back to stderr.
            let message = if output.stdout.is_empty() {
                String::from_utf8_lossy(&output.stderr).trim().to_owned()
            } else {
                String::from_utf8_lossy(&output.stdout).trim().to_owned()
            };
            return Err(NetworkError::Plugin {
                plugin: plugin_type,
                container_id: container_id.to_owned(),
                message,
            });
        }
        Ok(output)
    }

    /// CNI `ADD`: attaches the container's netns to the space network and
    /// returns the assigned addresses.
    pub fn attach(
        &self,
        conf_path: &Path,
        netns: &str,
        container_id: &str,
    ) -> Result<CniResult, NetworkError> {
        let output = self.invoke("ADD", conf_path, netns, container_id)?;
        serde_json::from_slice(&output.stdout).map_err(|source| NetworkError::ParseResult {
            container_id: container_id.to_owned(),
            source,
        })
    }

    /// CNI `DEL`. Idempotent: a missing attachment or an already-deleted
    /// netns is success.
    pub fn detach(
        &self,
        conf_path: &Path,
        netns: &str,
        container_id: &str,
    ) -> Result<(), NetworkError> {
        match self.invoke("DEL", conf_path, netns, container_id) {
            Ok(_) => Ok(()),
            Err(NetworkError::ConfigNotFound { .. }) => Ok(()),
            Err(NetworkError::Plugin { message, .. })
                if message.contains("not found") || message.contains("no such") =>
            {
                Ok(())
            }
            Err(err) => Err(err),
        }
    }
}
