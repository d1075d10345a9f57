use std::path::PathBuf;

use super::state::StackState;

/// Logical grouping within a space. Purely a cgroup and metadata layer; no
/// network, no daemon resource.
#[derive(Debug, Clone, Default)]
pub struct Stack {
    pub name: String,
    pub realm_name: String,
    pub space_name: String,
    pub state: StackState,
    pub cgroup_path: Option<PathBuf>,
}

impl Stack {
    pub fn new(name: &str, realm_name: &str, space_name: &str) -> Self {
        Stack {
            name: name.to_owned(),
            realm_name: realm_name.to_owned(),
            space_name: space_name.to_owned(),
            ..Default::default()
        }
    }
}
