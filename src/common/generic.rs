//! Generic field projection
//!
//! Any serializable value can be flattened into ordered key/value columns,
//! which is what the table exporter and the aggregators' `to_generic` consume.

use serde::Serialize;
use serde_json::{Map, Value};

/// Ordered field names and their rendered values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Generic {
    pub keys: Vec<String>,
    pub values: Vec<String>,
}

impl Generic {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.keys.push(key.into());
        self.values.push(value.into());
    }

    /// Value for a column name, if present
    pub fn get(&self, key: &str) -> Option<&str> {
        self.keys
            .iter()
            .position(|k| k == key)
            .map(|idx| self.values[idx].as_str())
    }
}

/// Project an object into a [`Generic`] using its serialized field names
///
/// Values that do not serialize to a JSON object yield an empty projection.
pub fn object_to_generic<T: Serialize>(object: &T) -> Generic {
    let mut generic = Generic::new();
    if let Some(map) = object_to_map(object) {
        for (key, value) in map {
            generic.push(key, display_value(&value));
        }
    }
    generic
}

/// Serialize an object into its ordered field map
pub fn object_to_map<T: Serialize>(object: &T) -> Option<Map<String, Value>> {
    match serde_json::to_value(object) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("Failed to project object to map: {}", e);
            None
        }
    }
}

/// Check if a value is uninitialized (null, false, 0, "", [] or {})
pub fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map(|f| f == 0.0).unwrap_or(false),
        Value::String(s) => s.is_empty(),
        Value::Array(arr) => arr.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Render a JSON value as a table cell
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct Row {
        id: u32,
        name: String,
        tags: Vec<String>,
        active: bool,
    }

    #[test]
    fn test_object_to_generic_keeps_field_order() {
        let row = Row {
            id: 7,
            name: "alpha".into(),
            tags: vec![],
            active: true,
        };
        let generic = object_to_generic(&row);
        assert_eq!(generic.keys, vec!["id", "name", "tags", "active"]);
        assert_eq!(generic.values, vec!["7", "alpha", "[]", "true"]);
        assert_eq!(generic.get("name"), Some("alpha"));
    }

    #[test]
    fn test_is_zero() {
        assert!(is_zero(&json!(null)));
        assert!(is_zero(&json!(0)));
        assert!(is_zero(&json!(0.0)));
        assert!(is_zero(&json!("")));
        assert!(is_zero(&json!({})));
        assert!(!is_zero(&json!(-1)));
        assert!(!is_zero(&json!("x")));
        assert!(!is_zero(&json!([0])));
    }

    #[test]
    fn test_scalar_is_not_projected() {
        assert!(object_to_generic(&42).keys.is_empty());
    }
}
