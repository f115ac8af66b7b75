//! Encryption context
//!
//! The encryption context is authenticated key-value metadata bound into every
//! key-management call. Keys and values are trimmed, booleans become
//! `"true"`/`"false"`, and an empty string or the literal `"null"` marks the key
//! as absent. An absent entry is kept as a tombstone so that merging a call
//! context onto the global context removes that key instead of adding it.

use crate::error::{Error, Result};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Mapping of context keys to optional values. `None` is a tombstone.
///
/// Equality compares present pairs only, so two contexts are equal exactly when the
/// key-management service would see the same context.
#[derive(Debug, Clone, Default)]
pub struct EncryptionContext {
    entries: BTreeMap<String, Option<String>>,
}

impl PartialEq for EncryptionContext {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl Eq for EncryptionContext {}

impl EncryptionContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize raw values into a context.
    ///
    /// Arrays and objects are rejected with `InvalidArgument` so that a malformed
    /// context never reaches the key-management service.
    pub fn from_values<I, K>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let mut context = Self::new();
        for (key, value) in values {
            let key = normalize_key(key.as_ref())?;
            let value = normalize_value(&key, &value)?;
            context.entries.insert(key, value);
        }
        Ok(context)
    }

    /// Normalize string pairs into a context
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self::from_values(
            pairs
                .into_iter()
                .map(|(k, v)| (k, Value::String(v.as_ref().to_string()))),
        )
    }

    /// Set a key to a value; empty and `"null"` values become tombstones.
    pub fn insert(mut self, key: &str, value: &str) -> Result<Self> {
        let key = normalize_key(key)?;
        let value = normalize_str(value);
        self.entries.insert(key, value);
        Ok(self)
    }

    /// Mark a key for removal when this context is merged onto another
    pub fn remove(mut self, key: &str) -> Result<Self> {
        let key = normalize_key(key)?;
        self.entries.insert(key, None);
        Ok(self)
    }

    /// Value for a key, if present and not a tombstone
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(|v| v.as_deref())
    }

    /// Iterate over present (non-tombstone) pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.as_deref().map(|v| (k.as_str(), v)))
    }

    /// Number of present pairs
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Merge `self` onto `base`: values override, tombstones remove.
    ///
    /// The result carries no tombstones.
    pub fn merged_onto(&self, base: &EncryptionContext) -> EncryptionContext {
        let mut entries: BTreeMap<String, Option<String>> = base
            .iter()
            .map(|(k, v)| (k.to_string(), Some(v.to_string())))
            .collect();

        for (key, value) in &self.entries {
            match value {
                Some(v) => {
                    entries.insert(key.clone(), Some(v.clone()));
                }
                None => {
                    entries.remove(key);
                }
            }
        }

        EncryptionContext { entries }
    }

    /// Present pairs as an ordered map
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Present pairs in the shape the AWS SDKs expect
    pub fn to_hash_map(&self) -> HashMap<String, String> {
        self.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

fn normalize_key(key: &str) -> Result<String> {
    let key = key.trim();
    if key.is_empty() {
        return Err(Error::invalid_argument(
            "encryption context keys must not be empty",
        ));
    }
    Ok(key.to_string())
}

fn normalize_str(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value == "null" {
        return None;
    }
    if value.eq_ignore_ascii_case("true") {
        return Some("true".to_string());
    }
    if value.eq_ignore_ascii_case("false") {
        return Some("false".to_string());
    }
    Some(value.to_string())
}

fn normalize_value(key: &str, value: &Value) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::String(s) => Ok(normalize_str(s)),
        Value::Array(_) | Value::Object(_) => Err(Error::invalid_argument(format!(
            "encryption context value for \"{}\" must be a scalar",
            key
        ))),
    }
}
