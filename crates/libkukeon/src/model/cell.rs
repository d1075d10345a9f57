use std::path::PathBuf;

use super::container::ContainerSpec;
use super::naming;
use super::state::CellState;

/// The workload unit. Owns a cgroup subtree, one root container holding the
/// network namespace, and zero or more sidecars sharing it.
#[derive(Debug, Clone, Default)]
pub struct Cell {
    pub name: String,
    // Stable internal id, defaulting to the name at the boundary. Daemon
    // container names embed the id, not the name.
    pub id: String,
    pub realm_name: String,
    pub space_name: String,
    pub stack_name: String,
    // Labels an entry of `containers` by id. Validated at the boundary.
    pub root_container_id: Option<String>,
    pub containers: Vec<ContainerSpec>,
    pub state: CellState,
    pub cgroup_path: Option<PathBuf>,
}

impl Cell {
    pub fn new(name: &str, realm_name: &str, space_name: &str, stack_name: &str) -> Self {
        Cell {
            name: name.to_owned(),
            id: name.to_owned(),
            realm_name: realm_name.to_owned(),
            space_name: space_name.to_owned(),
            stack_name: stack_name.to_owned(),
            ..Default::default()
        }
    }

    /// The declared root container: the entry named by `root_container_id`
    /// if set, otherwise the first entry flagged `root`.
    pub fn root_container(&self) -> Option<&ContainerSpec> {
        if let Some(id) = &self.root_container_id {
            return self.containers.iter().find(|c| &c.id == id);
        }
        self.containers.iter().find(|c| c.root)
    }

    /// Containers other than the root, in declaration order.
    pub fn sidecars(&self) -> Vec<&ContainerSpec> {
        let root_id = self.root_container().map(|c| c.id.clone());
        self.containers
            .iter()
            .filter(|c| Some(&c.id) != root_id.as_ref())
            .collect()
    }

    pub fn container(&self, id: &str) -> Option<&ContainerSpec> {
        self.containers.iter().find(|c| c.id == id)
    }

    pub fn container_mut(&mut self, id: &str) -> Option<&mut ContainerSpec> {
        self.containers.iter_mut().find(|c| c.id == id)
    }

    /// Daemon name of the root container of this cell.
    pub fn root_daemon_name(&self) -> String {
        naming::container_name(
            &self.space_name,
            &self.stack_name,
            &self.id,
            naming::ROOT_CONTAINER_ID,
        )
    }

    /// Name prefix shared by every daemon container of this cell.
    pub fn daemon_name_prefix(&self) -> String {
        naming::cell_name_prefix(&self.space_name, &self.stack_name, &self.id)
    }
}
