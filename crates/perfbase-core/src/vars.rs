//! Run-scoped variable store for chaining values between test cases.
//!
//! Values extracted from one response populate `{{placeholder}}` tokens in
//! later request bodies. Keys are either bare placeholder names (global) or
//! `"<testCaseName>.<propertyName>"` (scoped to the producing test case).
//!
//! The store is an explicit context object owned by one test run, never a
//! process global. It is safe to share across concurrent workers: reads
//! (substitution) and writes (extraction) for different test cases may run
//! in parallel.

use dashmap::DashMap;

/// Concurrency-safe key/value store scoped to a single test run.
///
/// Extraction writes follow a write-once rule: a key already holding a
/// non-empty value is never overwritten. Substitution always reads the
/// latest stored value.
#[derive(Debug, Default)]
pub struct VariableStore {
    entries: DashMap<String, String>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the scoped key `"<test>.<property>"` used by extraction.
    pub fn scoped_key(test: &str, property: &str) -> String {
        format!("{test}.{property}")
    }

    /// Look up the current value for a key.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Store a value unconditionally, replacing any previous value.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Store a value only if the key is absent or holds an empty value.
    ///
    /// Returns true if the value was stored. This is the producer-side rule
    /// for extraction: a populated entry is never silently replaced.
    pub fn insert_if_absent(&self, key: impl Into<String>, value: impl Into<String>) -> bool {
        let key = key.into();
        let mut stored = false;
        let mut entry = self.entries.entry(key).or_default();
        if entry.value().is_empty() {
            *entry.value_mut() = value.into();
            stored = true;
        }
        stored
    }

    /// Whether the key currently holds a non-empty value.
    pub fn is_populated(&self, key: &str) -> bool {
        self.entries
            .get(key)
            .map(|entry| !entry.value().is_empty())
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
