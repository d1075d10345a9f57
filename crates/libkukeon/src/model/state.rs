//! Lifecycle state enums for the entity kinds.
//!
//! These are the internal enums. The external (document) enums live in the
//! scheme; the two sets drift for spaces, where the document format has no
//! `Creating`/`Deleting`.
use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// State of a realm.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum RealmState {
    #[default]
    Pending,
    Creating,
    Ready,
    Failed,
    Deleting,
    Unknown,
}

impl Display for RealmState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let print = match self {
            Self::Pending => "Pending",
            Self::Creating => "Creating",
            Self::Ready => "Ready",
            Self::Failed => "Failed",
            Self::Deleting => "Deleting",
            Self::Unknown => "Unknown",
        };

        write!(f, "{print}")
    }
}

/// Internal state of a space. The external document enum has no
/// `Creating`/`Deleting`; both render as `Pending` at the boundary.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SpaceState {
    #[default]
    Pending,
    Creating,
    Ready,
    Failed,
    Deleting,
    Unknown,
}

impl Display for SpaceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let print = match self {
            Self::Pending => "Pending",
            Self::Creating => "Creating",
            Self::Ready => "Ready",
            Self::Failed => "Failed",
            Self::Deleting => "Deleting",
            Self::Unknown => "Unknown",
        };

        write!(f, "{print}")
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum StackState {
    #[default]
    Pending,
    Ready,
    Failed,
    Unknown,
}

impl Display for StackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let print = match self {
            Self::Pending => "Pending",
            Self::Ready => "Ready",
            Self::Failed => "Failed",
            Self::Unknown => "Unknown",
        };

        write!(f, "{print}")
    }
}

/// State of a cell. `Ready`, `Stopped` and `Failed` are the join over the
/// cell's container states; see `join_cell_state`.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum CellState {
    #[default]
    Pending,
    Creating,
    Ready,
    Stopped,
    Failed,
    Deleting,
    Unknown,
}

impl Display for CellState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let print = match self {
            Self::Pending => "Pending",
            Self::Creating => "Creating",
            Self::Ready => "Ready",
            Self::Stopped => "Stopped",
            Self::Failed => "Failed",
            Self::Deleting => "Deleting",
            Self::Unknown => "Unknown",
        };

        write!(f, "{print}")
    }
}

/// State of a single container within a cell.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ContainerState {
    #[default]
    Pending,
    Creating,
    Running,
    Stopped,
    Failed,
    Unknown,
}

impl Display for ContainerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let print = match self {
            Self::Pending => "Pending",
            Self::Creating => "Creating",
            Self::Running => "Running",
            Self::Stopped => "Stopped",
            Self::Failed => "Failed",
            Self::Unknown => "Unknown",
        };

        write!(f, "{print}")
    }
}

/// Joins the observed container states of a cell into the cell state.
///
/// A single failure taints the whole cell, even when other probes errored.
/// All running means ready; all stopped (or no task at all) means stopped;
/// `Unknown` is only the residual fallback for probe errors, and anything
/// else in between is still pending. An empty cell has nothing running and
/// reports stopped.
pub fn join_cell_state(containers: &[ContainerState]) -> CellState {
    if containers.iter().any(|s| *s == ContainerState::Failed) {
        return CellState::Failed;
    }
    if containers.is_empty() || containers.iter().all(|s| *s == ContainerState::Stopped) {
        return CellState::Stopped;
    }
    if containers.iter().all(|s| *s == ContainerState::Running) {
        return CellState::Ready;
    }
    if containers.iter().any(|s| *s == ContainerState::Unknown) {
        return CellState::Unknown;
    }

    CellState::Pending
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_all_running_is_ready() {
        assert_eq!(
            join_cell_state(&[ContainerState::Running, ContainerState::Running]),
            CellState::Ready
        );
    }

    #[test]
    fn test_join_any_failed_is_failed() {
        assert_eq!(
            join_cell_state(&[ContainerState::Running, ContainerState::Failed]),
            CellState::Failed
        );
    }

    #[test]
    fn test_join_all_stopped_is_stopped() {
        assert_eq!(
            join_cell_state(&[ContainerState::Stopped, ContainerState::Stopped]),
            CellState::Stopped
        );
        assert_eq!(join_cell_state(&[]), CellState::Stopped);
    }

    #[test]
    fn test_join_mixed_is_pending() {
        assert_eq!(
            join_cell_state(&[ContainerState::Running, ContainerState::Creating]),
            CellState::Pending
        );
        assert_eq!(
            join_cell_state(&[ContainerState::Running, ContainerState::Stopped]),
            CellState::Pending
        );
    }

    #[test]
    fn test_join_failed_beats_probe_error() {
        assert_eq!(
            join_cell_state(&[ContainerState::Failed, ContainerState::Unknown]),
            CellState::Failed
        );
    }

    #[test]
    fn test_join_unknown_is_residual_fallback() {
        assert_eq!(
            join_cell_state(&[ContainerState::Running, ContainerState::Unknown]),
            CellState::Unknown
        );
        assert_eq!(
            join_cell_state(&[ContainerState::Stopped, ContainerState::Unknown]),
            CellState::Unknown
        );
    }
}
