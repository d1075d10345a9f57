//! Boundary codec between external versioned documents and the internal
//! model.
//!
//! External documents carry `apiVersion` and `kind` and use `realmId`,
//! `spaceId`, ... to name parents; the internal model uses `realm_name`,
//! `space_name`, ... for the same values. A single version exists today
//! (`v1beta1`); the entry points are written so a second version slots in as
//! another module.
pub mod v1beta1;

use std::fmt::Display;

use crate::model::{Entity, Kind, UnknownKind};

pub const API_VERSION_V1BETA1: &str = "v1beta1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Version {
    #[default]
    V1Beta1,
}

impl Version {
    pub fn as_str(&self) -> &'static str {
        match self {
            Version::V1Beta1 => API_VERSION_V1BETA1,
        }
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Defaults an empty `apiVersion` to `v1beta1`; any other value is rejected.
pub fn parse_api_version(raw: &str) -> Result<Version, SchemeError> {
    match raw {
        "" | API_VERSION_V1BETA1 => Ok(Version::V1Beta1),
        other => Err(SchemeError::UnsupportedApiVersion(other.to_owned())),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemeError {
    #[error("unsupported apiVersion {0:?}")]
    UnsupportedApiVersion(String),
    #[error(transparent)]
    UnknownKind(#[from] UnknownKind),
    #[error("metadata.name is required for kind {kind}")]
    NameRequired { kind: Kind },
    #[error("cell {cell:?}: root container {id:?} is not in the container list")]
    RootContainerNotInList { cell: String, id: String },
    #[error("failed to convert document as {kind}")]
    ConversionFailed {
        kind: Kind,
        source: serde_yaml::Error,
    },
    #[error("document is not a mapping with a kind field")]
    MissingKind,
}

/// An external document of any kind, still in the versioned representation.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(untagged)]
pub enum Document {
    Realm(v1beta1::RealmDoc),
    Space(v1beta1::SpaceDoc),
    Stack(v1beta1::StackDoc),
    Cell(v1beta1::CellDoc),
    Container(v1beta1::ContainerDoc),
}

impl Document {
    pub fn kind(&self) -> Kind {
        match self {
            Document::Realm(_) => Kind::Realm,
            Document::Space(_) => Kind::Space,
            Document::Stack(_) => Kind::Stack,
            Document::Cell(_) => Kind::Cell,
            Document::Container(_) => Kind::Container,
        }
    }

    pub fn api_version(&self) -> &str {
        match self {
            Document::Realm(doc) => &doc.api_version,
            Document::Space(doc) => &doc.api_version,
            Document::Stack(doc) => &doc.api_version,
            Document::Cell(doc) => &doc.api_version,
            Document::Container(doc) => &doc.api_version,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Document::Realm(doc) => &doc.metadata.name,
            Document::Space(doc) => &doc.metadata.name,
            Document::Stack(doc) => &doc.metadata.name,
            Document::Cell(doc) => &doc.metadata.name,
            Document::Container(doc) => &doc.metadata.name,
        }
    }
}

/// Parses one YAML/JSON document into its typed external form, dispatching
/// on the `kind` field.
pub fn parse_document(value: &serde_yaml::Value) -> Result<Document, SchemeError> {
    let meta: v1beta1::TypeMeta =
        serde_yaml::from_value(value.clone()).map_err(|_| SchemeError::MissingKind)?;
    if meta.kind.is_empty() {
        return Err(SchemeError::MissingKind);
    }
    let kind: Kind = meta.kind.parse()?;

    let conversion = |source| SchemeError::ConversionFailed { kind, source };
    let doc = match kind {
        Kind::Realm => Document::Realm(serde_yaml::from_value(value.clone()).map_err(conversion)?),
        Kind::Space => Document::Space(serde_yaml::from_value(value.clone()).map_err(conversion)?),
        Kind::Stack => Document::Stack(serde_yaml::from_value(value.clone()).map_err(conversion)?),
        Kind::Cell => Document::Cell(serde_yaml::from_value(value.clone()).map_err(conversion)?),
        Kind::Container => {
            Document::Container(serde_yaml::from_value(value.clone()).map_err(conversion)?)
        }
    };

    Ok(doc)
}

/// Normalize: default the apiVersion, then convert to the internal model.
pub fn normalize(doc: Document) -> Result<(Entity, Version), SchemeError> {
    let version = parse_api_version(doc.api_version())?;
    let entity = to_internal(doc)?;
    Ok((entity, version))
}

/// Field-by-field conversion from external to internal, without version
/// defaulting.
pub fn to_internal(doc: Document) -> Result<Entity, SchemeError> {
    match doc {
        Document::Realm(doc) => Ok(Entity::Realm(v1beta1::realm_to_internal(doc)?)),
        Document::Space(doc) => Ok(Entity::Space(v1beta1::space_to_internal(doc)?)),
        Document::Stack(doc) => Ok(Entity::Stack(v1beta1::stack_to_internal(doc)?)),
        Document::Cell(doc) => Ok(Entity::Cell(v1beta1::cell_to_internal(doc)?)),
        Document::Container(doc) => Ok(Entity::Container(v1beta1::container_to_internal(doc)?)),
    }
}

/// Inverse of `to_internal`.
pub fn to_external(entity: &Entity, version: Version) -> Document {
    match entity {
        Entity::Realm(realm) => Document::Realm(v1beta1::realm_to_external(realm, version)),
        Entity::Space(space) => Document::Space(v1beta1::space_to_external(space, version)),
        Entity::Stack(stack) => Document::Stack(v1beta1::stack_to_external(stack, version)),
        Entity::Cell(cell) => Document::Cell(v1beta1::cell_to_external(cell, version)),
        Entity::Container(container) => {
            Document::Container(v1beta1::container_to_external(container, version))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_version_defaulting() {
        assert_eq!(parse_api_version("").unwrap(), Version::V1Beta1);
        assert_eq!(parse_api_version("v1beta1").unwrap(), Version::V1Beta1);
        assert!(matches!(
            parse_api_version("v2"),
            Err(SchemeError::UnsupportedApiVersion(v)) if v == "v2"
        ));
    }

    #[test]
    fn test_parse_document_dispatches_on_kind() {
        let value: serde_yaml::Value = serde_yaml::from_str(
            "apiVersion: v1beta1\nkind: Realm\nmetadata:\n  name: alpha\n",
        )
        .unwrap();
        let doc = parse_document(&value).unwrap();
        assert_eq!(doc.kind(), Kind::Realm);
        assert_eq!(doc.name(), "alpha");
    }

    #[test]
    fn test_parse_document_rejects_unknown_kind() {
        let value: serde_yaml::Value =
            serde_yaml::from_str("kind: Pod\nmetadata:\n  name: x\n").unwrap();
        assert!(matches!(
            parse_document(&value),
            Err(SchemeError::UnknownKind(_))
        ));
    }

    #[test]
    fn test_parse_document_requires_kind() {
        let value: serde_yaml::Value = serde_yaml::from_str("metadata:\n  name: x\n").unwrap();
        assert!(matches!(
            parse_document(&value),
            Err(SchemeError::MissingKind)
        ));
    }
}
