//! Resource model
//!
//! Every backend entity the orchestrator handles implements [`Resource`]. The
//! generic algorithms (filter matching, partial merge, structural diff) work
//! on the ordered field map a resource serializes to, so any `serde` struct
//! gets them for free.
//!
//! # Module Structure
//!
//! - [`filter`] - sparse, zero-aware filter matching
//! - [`merge`] - partial-update envelope ([`Meta`]) and override merge
//! - [`diff`] - structural field diff and the three-way update outcome
//!
//! # Example
//!
//! ```ignore
//! use hastily::model::{Meta, Model, Resource};
//!
//! let mut model: Model = serde_json::from_str(r#"{"id": 1, "name": "a"}"#)?;
//! let meta = Meta::<Model>::from_bytes(b"name: b".to_vec())?;
//! let status = model.update(&meta);
//! assert!(status.success);
//! ```

pub mod diff;
pub mod filter;
pub mod merge;

pub use diff::{diff, Change};
pub use filter::{filter, valid_for_filter};
pub use merge::{merge, parse_fields, Meta};

use crate::common::Status;
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An addressable backend entity
pub trait Resource: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Serialized name of the identity field, never overwritten by a merge
    const ID_FIELD: &'static str = "id";

    /// String form of the identity, used to key aggregated results
    fn key(&self) -> String;

    /// Ordered projection of the serialized fields
    fn field_map(&self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(Error::Parse(format!(
                "resource serialized to {} instead of an object",
                kind_of(&other)
            ))),
            Err(e) => Err(Error::Parse(e.to_string())),
        }
    }

    /// Whether this resource satisfies a sparse filter
    fn valid_for_filter(&self, filter: Option<&Self>) -> bool {
        filter::valid_for_filter(self, filter)
    }

    /// Candidate state with the partial update applied
    fn merge(&self, meta: &Meta<Self>) -> Result<Self> {
        merge::merge(self, meta)
    }

    /// Apply a partial update in place if it changes anything
    fn update(&mut self, meta: &Meta<Self>) -> Status {
        diff::update(self, meta)
    }
}

/// Backend model of unknown shape: an integer id plus every other field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    #[serde(default)]
    pub id: i64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Model {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            fields: Map::new(),
        }
    }

    /// Builder-style field setter
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

impl Resource for Model {
    fn key(&self) -> String {
        self.id.to_string()
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_model_round_trips_extra_fields() {
        let model: Model =
            serde_json::from_value(json!({"id": 4, "name": "n", "tags": ["x"]})).unwrap();
        assert_eq!(model.id, 4);
        assert_eq!(model.get("name"), Some(&json!("n")));
        assert_eq!(model.key(), "4");

        let fields = model.field_map().unwrap();
        let keys: Vec<&String> = fields.keys().collect();
        assert_eq!(keys, vec!["id", "name", "tags"]);
    }

    #[test]
    fn test_model_without_id_defaults_to_zero() {
        let model: Model = serde_json::from_value(json!({"name": "n"})).unwrap();
        assert_eq!(model.id, 0);
    }
}
