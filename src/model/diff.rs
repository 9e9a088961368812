//! Structural diff and the update outcome
//!
//! [`update`] has three distinct results that bulk callers rely on:
//! failure (merge or diff error), "no change", and applied.

use super::merge::Meta;
use super::Resource;
use crate::common::{display_value, Status};
use crate::error::Result;
use serde_json::{Map, Value};
use std::fmt;

/// One changed field, addressed by dotted path
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub path: String,
    pub from: Value,
    pub to: Value,
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} -> {}",
            self.path,
            display_value(&self.from),
            display_value(&self.to)
        )
    }
}

/// Field-level differences between two resources
///
/// A field that is absent on one side and null on the other is not a change.
pub fn diff<R: Resource>(original: &R, candidate: &R) -> Result<Vec<Change>> {
    let before = original.field_map()?;
    let after = candidate.field_map()?;
    let mut changes = Vec::new();
    diff_maps("", &before, &after, &mut changes);
    Ok(changes)
}

fn diff_maps(
    prefix: &str,
    before: &Map<String, Value>,
    after: &Map<String, Value>,
    out: &mut Vec<Change>,
) {
    for (key, old) in before {
        let path = join_path(prefix, key);
        match after.get(key) {
            Some(new) => diff_values(path, old, new, out),
            None if old.is_null() => {}
            None => out.push(Change {
                path,
                from: old.clone(),
                to: Value::Null,
            }),
        }
    }
    for (key, new) in after {
        if before.contains_key(key) || new.is_null() {
            continue;
        }
        out.push(Change {
            path: join_path(prefix, key),
            from: Value::Null,
            to: new.clone(),
        });
    }
}

fn diff_values(path: String, old: &Value, new: &Value, out: &mut Vec<Change>) {
    match (old, new) {
        (Value::Object(a), Value::Object(b)) => diff_maps(&path, a, b, out),
        _ if old != new => out.push(Change {
            path,
            from: old.clone(),
            to: new.clone(),
        }),
        _ => {}
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

/// Render changes as `field: old -> new, ...`
pub fn summarize(changes: &[Change]) -> String {
    changes
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Merge `meta` into `resource` and apply it when it changes something
///
/// - merge or diff failure: failed status carrying the error, resource untouched
/// - no differences: failed status with "no change", resource untouched
/// - otherwise: resource replaced by the merged candidate, status lists changes
pub fn update<R: Resource>(resource: &mut R, meta: &Meta<R>) -> Status {
    let candidate = match resource.merge(meta) {
        Ok(candidate) => candidate,
        Err(e) => return Status::failed(e.to_string()),
    };

    let changes = match diff(resource, &candidate) {
        Ok(changes) => changes,
        Err(e) => return Status::failed(format!("diff error: {}", e)),
    };

    if changes.is_empty() {
        tracing::debug!("No change for {}", resource.key());
        return Status::no_change();
    }

    let summary = summarize(&changes);
    tracing::debug!("Updated {}: {}", resource.key(), summary);
    *resource = candidate;
    Status::ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::NO_CHANGE;
    use crate::model::Model;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Address {
        city: String,
        street: String,
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct User {
        id: u64,
        name: String,
        email: String,
        address: Address,
    }

    impl Resource for User {
        fn key(&self) -> String {
            self.id.to_string()
        }
    }

    fn user() -> User {
        User {
            id: 1,
            name: "a".into(),
            email: "a@example.com".into(),
            address: Address {
                city: "Oslo".into(),
                street: "Main".into(),
            },
        }
    }

    fn meta(raw: &str) -> Meta<User> {
        Meta::from_bytes(raw.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn test_diff_reports_nested_paths() {
        let mut other = user();
        other.name = "b".into();
        other.address.city = "Bergen".into();
        let changes = diff(&user(), &other).unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].to_string(), "name: a -> b");
        assert_eq!(changes[1].to_string(), "address.city: Oslo -> Bergen");
    }

    #[test]
    fn test_diff_null_and_absent_are_equal() {
        let a = Model::new(1).with("x", Value::Null);
        let b = Model::new(1);
        assert!(diff(&a, &b).unwrap().is_empty());
        assert!(diff(&b, &a).unwrap().is_empty());
    }

    #[test]
    fn test_update_applies_changes() {
        let mut resource = user();
        let status = resource.update(&meta("name: b\naddress:\n  city: Bergen\n"));
        assert!(status.success);
        assert_eq!(status.operation, "name: a -> b, address.city: Oslo -> Bergen");
        assert_eq!(resource.name, "b");
        assert_eq!(resource.address.city, "Bergen");
        assert_eq!(resource.address.street, "Main");
        assert_eq!(resource.email, "a@example.com");
    }

    #[test]
    fn test_update_without_effect_is_no_change() {
        let mut resource = user();
        let status = resource.update(&meta("name: a\nemail: a@example.com\n"));
        assert_eq!(status, Status::failed(NO_CHANGE));
        assert_eq!(resource, user());
    }

    #[test]
    fn test_update_is_idempotent() {
        let mut resource = user();
        let patch = meta("email: new@example.com");
        assert!(resource.update(&patch).success);

        let second = resource.update(&patch);
        assert!(!second.success);
        assert_eq!(second.operation, NO_CHANGE);
        let third = resource.update(&patch);
        assert_eq!(third.operation, NO_CHANGE);
    }

    #[test]
    fn test_update_identity_only_is_no_change() {
        let mut resource = user();
        let status = resource.update(&meta("id: 5"));
        assert_eq!(status.operation, NO_CHANGE);
        assert_eq!(resource.id, 1);
    }

    #[test]
    fn test_update_merge_failure_leaves_resource() {
        let mut resource = user();
        let broken = Meta::new(User::default(), b"name: [unterminated".to_vec());
        let status = resource.update(&broken);
        assert!(!status.success);
        assert!(status.operation.starts_with("merge error"));
        assert_eq!(resource, user());
    }

    #[test]
    fn test_update_on_generic_model() {
        let mut model = Model::new(2).with("name", "x");
        let patch = Meta::<Model>::from_bytes(br#"{"name": "y", "size": 3}"#.to_vec()).unwrap();
        let status = model.update(&patch);
        assert!(status.success);
        assert_eq!(status.operation, "name: x -> y, size: - -> 3");
        assert_eq!(model.get("size"), Some(&json!(3)));
    }
}
