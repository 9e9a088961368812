//! Partial-update merge
//!
//! A partial update keeps its raw bytes next to the parsed resource: once
//! parsed, "field absent" and "field set to its zero value" look the same, so
//! the raw payload is what drives the merge.
//!
//! Merge semantics:
//! - fields present in the payload override the resource, explicit nulls
//!   included
//! - nested objects are merged field by field
//! - absent fields are left untouched
//! - the identity field ([`Resource::ID_FIELD`]) is never overwritten
//!
//! The merged map is deserialized back into the resource type. Fields the
//! type cannot represent are dropped silently by that step; types using
//! `#[serde(deny_unknown_fields)]` turn them into a merge error instead.

use super::Resource;
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::Path;

/// Partial-update envelope: parsed resource plus the authoritative raw payload
#[derive(Debug, Clone)]
pub struct Meta<R> {
    pub resource: R,
    pub raw: Vec<u8>,
}

impl<R> Meta<R> {
    pub fn new(resource: R, raw: Vec<u8>) -> Self {
        Self { resource, raw }
    }

    /// Fields explicitly present in the raw payload
    pub fn fields(&self) -> Result<Map<String, Value>> {
        parse_fields(&self.raw)
    }
}

impl<R: DeserializeOwned> Meta<R> {
    /// Parse a JSON or YAML payload
    pub fn from_bytes(raw: Vec<u8>) -> Result<Self> {
        let fields = parse_fields(&raw)?;
        let resource = serde_json::from_value(Value::Object(fields))
            .map_err(|e| Error::Parse(format!("payload does not describe a resource: {}", e)))?;
        Ok(Self { resource, raw })
    }

    /// Read a partial-update source file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!("Loading partial update from {:?}", path);
        let raw = std::fs::read(path)?;
        Self::from_bytes(raw)
    }
}

/// Parse raw bytes into an ordered field map
///
/// YAML is a superset of JSON so both formats go through the YAML parser.
/// An empty document is an empty map.
pub fn parse_fields(raw: &[u8]) -> Result<Map<String, Value>> {
    let value: Value = serde_yaml::from_slice(raw).map_err(|e| Error::Parse(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => Err(Error::Parse("expected a mapping of fields".to_string())),
    }
}

/// Candidate state of `resource` with the partial update applied
pub fn merge<R: Resource>(resource: &R, meta: &Meta<R>) -> Result<R> {
    let patch = meta.fields().map_err(|e| Error::Merge(e.to_string()))?;
    let mut merged = resource.field_map().map_err(|e| Error::Merge(e.to_string()))?;

    for (key, value) in patch {
        if key == R::ID_FIELD {
            continue;
        }
        overlay(&mut merged, key, value);
    }

    serde_json::from_value(Value::Object(merged)).map_err(|e| Error::Merge(e.to_string()))
}

fn overlay(target: &mut Map<String, Value>, key: String, value: Value) {
    match value {
        Value::Object(patch) if matches!(target.get(&key), Some(Value::Object(_))) => {
            if let Some(Value::Object(existing)) = target.get_mut(&key) {
                for (k, v) in patch {
                    overlay(existing, k, v);
                }
            }
        }
        value => {
            target.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Account {
        id: u64,
        name: String,
        limit: u32,
        labels: Map<String, Value>,
    }

    impl Resource for Account {
        fn key(&self) -> String {
            self.id.to_string()
        }
    }

    fn account() -> Account {
        let mut labels = Map::new();
        labels.insert("team".into(), json!("core"));
        labels.insert("tier".into(), json!("gold"));
        Account {
            id: 10,
            name: "primary".into(),
            limit: 5,
            labels,
        }
    }

    #[test]
    fn test_parse_fields_json_and_yaml() {
        let json = parse_fields(br#"{"b": 1, "a": "x"}"#).unwrap();
        let yaml = parse_fields(b"b: 1\na: x\n").unwrap();
        assert_eq!(json, yaml);
        let keys: Vec<&String> = yaml.keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert!(parse_fields(b"").unwrap().is_empty());
    }

    #[test]
    fn test_parse_fields_rejects_non_mapping() {
        assert!(matches!(parse_fields(b"- 1\n- 2\n"), Err(Error::Parse(_))));
        assert!(matches!(parse_fields(b"{unclosed"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_merge_overrides_present_fields_only() {
        let meta = Meta::<Account>::from_bytes(b"limit: 9".to_vec()).unwrap();
        let merged = account().merge(&meta).unwrap();
        assert_eq!(merged.limit, 9);
        assert_eq!(merged.name, "primary");
        assert_eq!(merged.labels.len(), 2);
    }

    #[test]
    fn test_merge_overrides_with_zero_value() {
        // parsed resource alone could not tell this apart from "absent"
        let meta = Meta::<Account>::from_bytes(br#"{"limit": 0}"#.to_vec()).unwrap();
        let merged = account().merge(&meta).unwrap();
        assert_eq!(merged.limit, 0);
    }

    #[test]
    fn test_merge_is_deep_for_objects() {
        let meta = Meta::<Account>::from_bytes(b"labels:\n  tier: silver\n".to_vec()).unwrap();
        let merged = account().merge(&meta).unwrap();
        assert_eq!(merged.labels["tier"], json!("silver"));
        assert_eq!(merged.labels["team"], json!("core"));
    }

    #[test]
    fn test_merge_never_touches_identity() {
        let meta = Meta::<Account>::from_bytes(b"id: 99\nname: other".to_vec()).unwrap();
        let merged = account().merge(&meta).unwrap();
        assert_eq!(merged.id, 10);
        assert_eq!(merged.name, "other");
    }

    #[test]
    fn test_merge_drops_unrepresentable_fields() {
        let meta = Meta::<Account>::from_bytes(b"unknown: 1\nname: n".to_vec()).unwrap();
        let merged = account().merge(&meta).unwrap();
        assert_eq!(merged.name, "n");
        assert!(!merged.field_map().unwrap().contains_key("unknown"));
    }

    #[test]
    fn test_merge_type_mismatch_is_merge_error() {
        let meta = Meta::new(account(), b"limit: lots".to_vec());
        assert!(matches!(account().merge(&meta), Err(Error::Merge(_))));
    }

    #[test]
    fn test_merge_unparseable_payload_is_merge_error() {
        let meta = Meta::new(account(), b"[1, 2".to_vec());
        assert!(matches!(account().merge(&meta), Err(Error::Merge(_))));
    }

    #[test]
    fn test_generic_model_keeps_new_fields_and_nulls() {
        let model = Model::new(3).with("name", "a").with("note", "keep");
        let meta = Meta::<Model>::from_bytes(b"owner: ops\nnote: null".to_vec()).unwrap();
        let merged = model.merge(&meta).unwrap();
        assert_eq!(merged.id, 3);
        assert_eq!(merged.get("owner"), Some(&json!("ops")));
        assert_eq!(merged.get("note"), Some(&Value::Null));
        assert_eq!(merged.get("name"), Some(&json!("a")));
    }

    #[test]
    fn test_load_reads_file() {
        let path = std::env::temp_dir().join(format!("hastily-meta-{}.yaml", std::process::id()));
        std::fs::write(&path, "name: from-file\n").unwrap();
        let meta = Meta::<Model>::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(meta.resource.get("name"), Some(&json!("from-file")));
        assert_eq!(meta.raw, b"name: from-file\n");
    }
}
