//! The canonical in-memory model of the five entity kinds.
mod cell;
mod container;
pub mod naming;
mod realm;
mod space;
mod stack;
pub mod state;

use std::fmt::Display;
use std::str::FromStr;

pub use cell::Cell;
pub use container::{ContainerSpec, ContainerStatus, PortMapping, RestartPolicy, VolumeMount};
pub use realm::{Realm, RegistryCredential};
pub use space::Space;
pub use stack::Stack;

/// The entity kinds, ordered by dependency: a kind may only reference
/// parents of strictly lower priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    Realm,
    Space,
    Stack,
    Cell,
    Container,
}

impl Kind {
    /// Topological priority used by the apply planner. Parents sort first.
    pub fn priority(&self) -> u8 {
        match self {
            Kind::Realm => 0,
            Kind::Space => 1,
            Kind::Stack => 2,
            Kind::Cell => 3,
            Kind::Container => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Realm => "Realm",
            Kind::Space => "Space",
            Kind::Stack => "Stack",
            Kind::Cell => "Cell",
            Kind::Container => "Container",
        }
    }
}

impl Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Kind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "realm" => Ok(Kind::Realm),
            "space" => Ok(Kind::Space),
            "stack" => Ok(Kind::Stack),
            "cell" => Ok(Kind::Cell),
            "container" => Ok(Kind::Container),
            _ => Err(UnknownKind(s.to_owned())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown kind {0:?}")]
pub struct UnknownKind(pub String);

/// A normalized entity of any kind, as produced by the boundary codec and
/// consumed by the controller and the apply planner.
#[derive(Debug, Clone)]
pub enum Entity {
    Realm(Realm),
    Space(Space),
    Stack(Stack),
    Cell(Cell),
    Container(ContainerSpec),
}

impl Entity {
    pub fn kind(&self) -> Kind {
        match self {
            Entity::Realm(_) => Kind::Realm,
            Entity::Space(_) => Kind::Space,
            Entity::Stack(_) => Kind::Stack,
            Entity::Cell(_) => Kind::Cell,
            Entity::Container(_) => Kind::Container,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Entity::Realm(realm) => &realm.name,
            Entity::Space(space) => &space.name,
            Entity::Stack(stack) => &stack.name,
            Entity::Cell(cell) => &cell.name,
            Entity::Container(container) => &container.id,
        }
    }
}
