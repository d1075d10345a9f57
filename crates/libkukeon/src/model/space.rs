use std::path::PathBuf;

use super::state::SpaceState;

/// Network isolation unit within a realm. Owns one CNI bridge network whose
/// config file lives in the metadata tree.
#[derive(Debug, Clone, Default)]
pub struct Space {
    pub name: String,
    pub realm_name: String,
    pub cni_config_path: Option<PathBuf>,
    pub state: SpaceState,
    pub cgroup_path: Option<PathBuf>,
}

impl Space {
    pub fn new(name: &str, realm_name: &str) -> Self {
        Space {
            name: name.to_owned(),
            realm_name: realm_name.to_owned(),
            ..Default::default()
        }
    }
}
