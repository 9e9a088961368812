//! Per-item outcome records and the result aggregator
//!
//! A [`ResultList`] is created fresh for every bulk call and filled from the
//! concurrent per-item units. Inserts take a single lock; reads are only
//! meaningful once the owning bulk call has returned. Clones are handles to
//! the same entries.

use super::generic::{object_to_generic, Generic};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Message recorded when a merge leaves an object unchanged
pub const NO_CHANGE: &str = "no change";

/// Common view over outcome records
pub trait Outcome {
    fn success(&self) -> bool;
    fn message(&self) -> &str;

    /// Failed outcome for a unit that could not complete
    fn failed_with(message: String) -> Self
    where
        Self: Sized;
}

/// Result of a local operation such as a partial-update merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Status {
    pub success: bool,
    pub operation: String,
}

impl Status {
    pub fn ok(operation: impl Into<String>) -> Self {
        Self {
            success: true,
            operation: operation.into(),
        }
    }

    pub fn failed(operation: impl Into<String>) -> Self {
        Self {
            success: false,
            operation: operation.into(),
        }
    }

    pub fn no_change() -> Self {
        Self::failed(NO_CHANGE)
    }
}

impl Outcome for Status {
    fn success(&self) -> bool {
        self.success
    }

    fn message(&self) -> &str {
        &self.operation
    }

    fn failed_with(message: String) -> Self {
        Self::failed(message)
    }
}

/// Concurrency-safe mapping from item key to outcome
#[derive(Debug)]
pub struct ResultList<T> {
    data: Arc<Mutex<HashMap<String, T>>>,
}

/// Aggregated merge outcomes
pub type StatusList = ResultList<Status>;

impl<T> Default for ResultList<T> {
    fn default() -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T> Clone for ResultList<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<T> ResultList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, T>> {
        // A panicking inserter cannot leave the map half-written
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an outcome, replacing any previous one for the same key
    pub fn insert(&self, key: impl Into<String>, outcome: T) {
        self.lock().insert(key.into(), outcome);
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn size(&self) -> usize {
        self.lock().len()
    }

    /// Take every entry out of the list
    pub fn into_map(self) -> HashMap<String, T> {
        std::mem::take(&mut *self.lock())
    }
}

impl<T: Clone> ResultList<T> {
    pub fn get(&self, key: &str) -> Option<T> {
        self.lock().get(key).cloned()
    }
}

impl<T: Outcome + Clone> ResultList<T> {
    /// Count of successful outcomes
    pub fn successes(&self) -> usize {
        self.lock().values().filter(|v| v.success()).count()
    }

    /// Failed entries as (key, outcome) pairs
    pub fn failures(&self) -> Vec<(String, T)> {
        self.lock()
            .iter()
            .filter(|(_, v)| !v.success())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl<T: Serialize> ResultList<T> {
    /// Project every outcome into display columns
    pub fn to_generic(&self) -> HashMap<String, Generic> {
        self.lock()
            .iter()
            .map(|(k, v)| (k.clone(), object_to_generic(v)))
            .collect()
    }
}
