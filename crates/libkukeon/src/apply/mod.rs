//! Declarative batch processing for `apply -f` and `delete -f`.
//!
//! A multi-document YAML stream is parsed and normalized document by
//! document, ordered topologically by kind (parents first, declaration
//! order breaking ties), and driven through the controller one document at
//! a time. Validation failures are per-document: the valid documents are
//! still applied and the failures come back in the report. Only a stream
//! with nothing applicable fails as a whole, as `YamlParse` when every
//! document failed to parse and as grouped `Validation` otherwise.
use std::fmt::Write as _;

use crate::controller::{Controller, ControllerError, DoOptions};
use crate::model::{Entity, Kind};
use crate::scheme::{self, SchemeError};
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error("failed to parse YAML stream: {}", join_messages(.0))]
    YamlParse(Vec<DocError>),
    #[error("invalid documents: {}", join_messages(.0))]
    Validation(Vec<DocError>),
    #[error("empty input: no documents found")]
    Empty,
}

/// A per-document failure, indexed by position in the stream.
#[derive(Debug)]
pub struct DocError {
    pub index: usize,
    pub parse_failure: bool,
    pub message: String,
}

fn join_messages(errors: &[DocError]) -> String {
    let mut out = String::new();
    for (i, err) in errors.iter().enumerate() {
        if i > 0 {
            let _ = write!(out, "; ");
        }
        let _ = write!(out, "document {}: {}", err.index, err.message);
    }
    out
}

/// Outcome of driving one document through the controller.
#[derive(Debug)]
pub struct DocOutcome {
    pub index: usize,
    pub kind: Kind,
    pub name: String,
    pub result: Result<(), ControllerError>,
}

#[derive(Debug, Default)]
pub struct ApplyReport {
    pub outcomes: Vec<DocOutcome>,
    /// Documents that never reached the controller.
    pub invalid: Vec<DocError>,
    /// True when `atomic` stopped the batch early.
    pub aborted: bool,
}

impl ApplyReport {
    pub fn ok(&self) -> bool {
        !self.aborted && self.invalid.is_empty() && self.outcomes.iter().all(|o| o.result.is_ok())
    }
}

/// Parses and normalizes every document in the stream, returning the valid
/// entities alongside the per-document failures.
///
/// Only a stream with no usable document at all is an error: `YamlParse`
/// when every failure is a parse failure, grouped `Validation` otherwise.
pub fn parse_documents(input: &str) -> Result<(Vec<(usize, Entity)>, Vec<DocError>), ApplyError> {
    let mut entities = Vec::new();
    let mut errors = Vec::new();

    for (index, document) in serde_yaml::Deserializer::from_str(input).enumerate() {
        let value = match serde_yaml::Value::deserialize(document) {
            Ok(value) => value,
            Err(err) => {
                errors.push(DocError {
                    index,
                    parse_failure: true,
                    message: err.to_string(),
                });
                continue;
            }
        };
        if value.is_null() {
            // Empty documents between separators are not an error.
            continue;
        }

        match scheme::parse_document(&value).and_then(scheme::normalize) {
            Ok((entity, _version)) => entities.push((index, entity)),
            Err(err) => errors.push(DocError {
                index,
                parse_failure: matches!(err, SchemeError::MissingKind),
                message: err.to_string(),
            }),
        }
    }

    if entities.is_empty() {
        if errors.is_empty() {
            return Err(ApplyError::Empty);
        }
        if errors.iter().all(|e| e.parse_failure) {
            return Err(ApplyError::YamlParse(errors));
        }
        return Err(ApplyError::Validation(errors));
    }
    Ok((entities, errors))
}

/// Parents before children, declaration order within a kind.
fn topo_sort(entities: &mut [(usize, Entity)]) {
    entities.sort_by_key(|(index, entity)| (entity.kind().priority(), *index));
}

/// Creates every valid document in topological order. Per-document
/// failures do not stop the batch unless `atomic` is set; already-applied
/// side effects are left in place either way and reported to the caller.
pub fn apply(
    controller: &Controller,
    input: &str,
    opts: &DoOptions,
    atomic: bool,
) -> Result<ApplyReport, ApplyError> {
    let (mut entities, invalid) = parse_documents(input)?;
    if atomic && !invalid.is_empty() {
        return Err(ApplyError::Validation(invalid));
    }
    topo_sort(&mut entities);

    let mut report = ApplyReport {
        invalid,
        ..Default::default()
    };
    for (index, entity) in entities {
        let kind = entity.kind();
        let name = entity.name().to_owned();
        tracing::debug!(%kind, name = %name, "applying document");
        let result = controller.create_entity(entity, opts).map(|_| ());
        let failed = result.is_err();
        report.outcomes.push(DocOutcome {
            index,
            kind,
            name,
            result,
        });
        if failed && atomic {
            report.aborted = true;
            break;
        }
    }
    Ok(report)
}

/// Deletes every valid document in reverse topological order, children
/// first.
pub fn delete(
    controller: &Controller,
    input: &str,
    opts: &DoOptions,
) -> Result<ApplyReport, ApplyError> {
    let (mut entities, invalid) = parse_documents(input)?;
    topo_sort(&mut entities);
    entities.reverse();

    let mut report = ApplyReport {
        invalid,
        ..Default::default()
    };
    for (index, entity) in entities {
        let kind = entity.kind();
        let name = entity.name().to_owned();
        tracing::debug!(%kind, name = %name, "deleting document");
        let result = controller.delete_entity(&entity, opts);
        report.outcomes.push(DocOutcome {
            index,
            kind,
            name,
            result,
        });
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgroup::CgroupManager;
    use crate::controller::testing::{FakeCni, FakeRuntime};
    use crate::network::NetworkManager;
    use crate::store::MetaStore;

    const REALM_THEN_SPACE: &str = r#"
apiVersion: v1beta1
kind: Realm
metadata:
  name: r1
---
apiVersion: v1beta1
kind: Space
metadata:
  name: s1
spec:
  realmId: r1
"#;

    const SPACE_THEN_REALM: &str = r#"
apiVersion: v1beta1
kind: Space
metadata:
  name: s1
spec:
  realmId: r1
---
apiVersion: v1beta1
kind: Realm
metadata:
  name: r1
"#;

    fn bench() -> (tempfile::TempDir, Controller) {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let run_path = dir.path().join("run");
        let cgroup_mount = dir.path().join("cgroup");
        std::fs::create_dir_all(&cgroup_mount).unwrap();
        let ctrl = Controller::new(
            MetaStore::new(&run_path),
            CgroupManager::new(&cgroup_mount),
            Box::new(FakeRuntime::new()),
            NetworkManager::with_exec(&run_path, "/opt/cni/bin", Box::new(FakeCni::default())),
        );
        (dir, ctrl)
    }

    #[test]
    fn test_parse_documents_multi_doc() {
        let (entities, errors) = parse_documents(REALM_THEN_SPACE).unwrap();
        assert_eq!(entities.len(), 2);
        assert!(errors.is_empty());
        assert_eq!(entities[0].1.kind(), Kind::Realm);
        assert_eq!(entities[1].1.kind(), Kind::Space);
    }

    #[test]
    fn test_topo_sort_is_order_independent() {
        let (mut entities, _) = parse_documents(SPACE_THEN_REALM).unwrap();
        topo_sort(&mut entities);
        assert_eq!(entities[0].1.kind(), Kind::Realm);
        assert_eq!(entities[1].1.kind(), Kind::Space);
    }

    #[test]
    fn test_apply_is_order_independent() {
        for input in [REALM_THEN_SPACE, SPACE_THEN_REALM] {
            let (_dir, ctrl) = bench();
            let report = apply(&ctrl, input, &DoOptions::default(), false).unwrap();
            assert!(report.ok(), "apply failed: {report:?}");
            assert_eq!(report.outcomes[0].kind, Kind::Realm);
            assert_eq!(report.outcomes[1].kind, Kind::Space);
            assert!(ctrl.store().realm_exists("r1"));
            assert!(ctrl.store().space_exists("r1", "s1"));
        }
    }

    #[test]
    fn test_apply_continues_past_invalid_documents() {
        let input = r#"
apiVersion: v1beta1
kind: Realm
metadata:
  name: r1
---
apiVersion: v1beta1
kind: Cell
metadata:
  name: c1
spec:
  realmId: r1
  spaceId: s1
  stackId: t1
  rootContainerId: ghost
  containers:
    - id: web
      image: nginx:1.25
"#;
        let (_dir, ctrl) = bench();
        let report = apply(&ctrl, input, &DoOptions::default(), false).unwrap();
        // The realm applied; the cell never reached the controller.
        assert!(!report.ok());
        assert_eq!(report.outcomes.len(), 1);
        assert!(report.outcomes[0].result.is_ok());
        assert_eq!(report.invalid.len(), 1);
        assert!(report.invalid[0].message.contains("root container"));
        assert!(ctrl.store().realm_exists("r1"));
    }

    #[test]
    fn test_apply_atomic_stops_at_first_failure() {
        // The space references a realm that does not exist, so it fails;
        // the stack after it must not run.
        let input = r#"
apiVersion: v1beta1
kind: Space
metadata:
  name: s1
spec:
  realmId: ghost
---
apiVersion: v1beta1
kind: Stack
metadata:
  name: t1
spec:
  realmId: ghost
  spaceId: s1
"#;
        let (_dir, ctrl) = bench();
        let report = apply(&ctrl, input, &DoOptions::default(), true).unwrap();
        assert!(report.aborted);
        assert_eq!(report.outcomes.len(), 1);
        assert!(report.outcomes[0].result.is_err());
    }

    #[test]
    fn test_delete_runs_children_first() {
        let (_dir, ctrl) = bench();
        apply(&ctrl, REALM_THEN_SPACE, &DoOptions::default(), false).unwrap();

        let report = delete(&ctrl, REALM_THEN_SPACE, &DoOptions::default()).unwrap();
        assert!(report.ok(), "delete failed: {report:?}");
        assert_eq!(report.outcomes[0].kind, Kind::Space);
        assert_eq!(report.outcomes[1].kind, Kind::Realm);
        assert!(!ctrl.store().realm_exists("r1"));
    }

    #[test]
    fn test_unparseable_stream_is_yaml_parse_error() {
        let result = parse_documents("{unclosed");
        assert!(matches!(result, Err(ApplyError::YamlParse(_))));
    }

    #[test]
    fn test_all_invalid_groups_as_validation() {
        let input = r#"
apiVersion: v2
kind: Realm
metadata:
  name: r1
"#;
        match parse_documents(input) {
            Err(ApplyError::Validation(errors)) => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].message.contains("unsupported apiVersion"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_root_container_validation_is_not_a_parse_error() {
        let input = r#"
kind: Cell
metadata:
  name: c1
spec:
  realmId: r1
  spaceId: s1
  stackId: t1
  rootContainerId: ghost
  containers:
    - id: web
      image: nginx:1.25
"#;
        match parse_documents(input) {
            Err(ApplyError::Validation(errors)) => {
                assert!(!errors[0].parse_failure);
                assert!(errors[0].message.contains("root container"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_stream() {
        assert!(matches!(parse_documents("---\n"), Err(ApplyError::Empty)));
    }
}
