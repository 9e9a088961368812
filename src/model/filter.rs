//! Filter matching
//!
//! A filter is a resource-shaped value where only non-zero fields constrain
//! the match. Matching happens client-side since backends are not assumed to
//! support filtering.

use super::Resource;
use crate::common::is_zero;
use serde_json::Value;

/// True iff every non-zero field of `filter` equals the same field of `resource`
///
/// A missing filter matches everything.
pub fn valid_for_filter<R: Resource>(resource: &R, filter: Option<&R>) -> bool {
    let Some(filter) = filter else {
        return true;
    };

    let (fields, constraints) = match (resource.field_map(), filter.field_map()) {
        (Ok(fields), Ok(constraints)) => (fields, constraints),
        (Err(e), _) | (_, Err(e)) => {
            tracing::debug!("Filter projection failed for {}: {}", resource.key(), e);
            return false;
        }
    };

    constraints
        .iter()
        .filter(|(_, value)| !is_zero(value))
        .all(|(key, value)| fields.get(key).is_some_and(|field| same_value(field, value)))
}

/// Equality with numbers compared by value, so `3` matches `3.0`
fn same_value(field: &Value, constraint: &Value) -> bool {
    match (field, constraint) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => match (a.as_u64(), b.as_u64()) {
                (Some(x), Some(y)) => x == y,
                _ => a.as_f64() == b.as_f64(),
            },
        },
        _ => field == constraint,
    }
}

/// Resources satisfying the filter, in input order
pub fn filter<R: Resource>(resources: &[R], filter: Option<&R>) -> Vec<R> {
    resources
        .iter()
        .filter(|r| valid_for_filter(*r, filter))
        .cloned()
        .collect()
}
