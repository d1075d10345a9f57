//! Deterministic naming of daemon-side resources.
//!
//! Container names in the runtime daemon are a pure function of the logical
//! coordinates, so two distinct logical containers can never share a name
//! and orphans can be found again by prefix.

/// Id of the network-namespace-owning container within a cell.
pub const ROOT_CONTAINER_ID: &str = "root";

/// Separator between the coordinate components of a daemon container name.
/// Entity names themselves must never contain it; see `validate_name`.
pub const NAME_SEPARATOR: &str = "_";

/// Daemon-side name of a logical container: `<space>_<stack>_<cellId>_<id>`.
pub fn container_name(space: &str, stack: &str, cell_id: &str, container_id: &str) -> String {
    format!("{space}{NAME_SEPARATOR}{stack}{NAME_SEPARATOR}{cell_id}{NAME_SEPARATOR}{container_id}")
}

/// Name prefix shared by every container of a cell, used to enumerate
/// orphans in the daemon during purge.
pub fn cell_name_prefix(space: &str, stack: &str, cell_id: &str) -> String {
    format!("{space}{NAME_SEPARATOR}{stack}{NAME_SEPARATOR}{cell_id}{NAME_SEPARATOR}")
}

/// Name prefix shared by every container under a stack.
pub fn stack_name_prefix(space: &str, stack: &str) -> String {
    format!("{space}{NAME_SEPARATOR}{stack}{NAME_SEPARATOR}")
}

/// Name prefix shared by every container under a space.
pub fn space_name_prefix(space: &str) -> String {
    format!("{space}{NAME_SEPARATOR}")
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InvalidName {
    #[error("name must not be empty")]
    Empty,
    #[error("name {0:?} is longer than 63 characters")]
    TooLong(String),
    #[error("name {name:?} contains invalid character {ch:?}")]
    InvalidCharacter { name: String, ch: char },
    #[error("name {0:?} must start and end with an alphanumeric character")]
    InvalidBoundary(String),
}

/// Validates an entity name or container id.
///
/// Names become path components, cgroup directories and daemon name
/// components, so the accepted alphabet is lowercase alphanumerics plus
/// `-` and `.`, starting and ending alphanumeric. The daemon name
/// separator `_` is rejected outright.
pub fn validate_name(name: &str) -> Result<(), InvalidName> {
    if name.is_empty() {
        return Err(InvalidName::Empty);
    }
    if name.len() > 63 {
        return Err(InvalidName::TooLong(name.to_owned()));
    }
    for ch in name.chars() {
        if !(ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '.') {
            return Err(InvalidName::InvalidCharacter {
                name: name.to_owned(),
                ch,
            });
        }
    }
    let first = name.chars().next().unwrap();
    let last = name.chars().last().unwrap();
    if !first.is_ascii_alphanumeric() || !last.is_ascii_alphanumeric() {
        return Err(InvalidName::InvalidBoundary(name.to_owned()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_name_is_deterministic() {
        assert_eq!(container_name("s1", "t1", "c1", "root"), "s1_t1_c1_root");
        assert_eq!(
            container_name("s1", "t1", "c1", "web"),
            container_name("s1", "t1", "c1", "web")
        );
    }

    #[test]
    fn test_cell_prefix_matches_member_names() {
        let prefix = cell_name_prefix("s1", "t1", "c1");
        assert!(container_name("s1", "t1", "c1", "root").starts_with(&prefix));
        assert!(!container_name("s1", "t1", "c2", "root").starts_with(&prefix));
    }

    #[test]
    fn test_validate_name_accepts_dns_labels() {
        for name in ["alpha", "r1", "my-realm", "a.b-c9"] {
            assert_eq!(validate_name(name), Ok(()));
        }
    }

    #[test]
    fn test_validate_name_rejects_separator_and_junk() {
        assert!(matches!(
            validate_name("a_b"),
            Err(InvalidName::InvalidCharacter { ch: '_', .. })
        ));
        assert!(matches!(
            validate_name("a/b"),
            Err(InvalidName::InvalidCharacter { ch: '/', .. })
        ));
        assert!(matches!(
            validate_name("Upper"),
            Err(InvalidName::InvalidCharacter { .. })
        ));
        assert_eq!(validate_name(""), Err(InvalidName::Empty));
        assert!(matches!(
            validate_name("-edge"),
            Err(InvalidName::InvalidBoundary(_))
        ));
        assert!(validate_name(&"x".repeat(64)).is_err());
    }
}
