//! Storage for DSN fields outside the fixed schema.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::parser::header::canonical_key;

/// Extension fields of a [`Dsn`](super::dsn::Dsn) or
/// [`RecipientRecord`](super::recipient::RecipientRecord).
///
/// Keys are stored in canonical header form (`x-postfix-queue-id` becomes
/// `X-Postfix-Queue-Id`), so lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Extensions(BTreeMap<String, String>);

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, replacing any existing value.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(canonical_key(key), value.into());
    }

    /// Value for `key`, or `""` when absent.
    pub fn get(&self, key: &str) -> &str {
        self.0
            .get(&canonical_key(key))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Remove `key`, returning its value if it was set.
    pub fn del(&mut self, key: &str) -> Option<String> {
        self.0.remove(&canonical_key(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(&canonical_key(key))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate `(canonical_name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_del() {
        let mut e = Extensions::new();
        assert_eq!(e.len(), 0);

        e.set("test-key", "value");
        assert_eq!(e.len(), 1);
        assert!(e.contains("Test-Key"));
        assert_eq!(e.get("TEST-KEY"), "value");
        assert_eq!(e.iter().next(), Some(("Test-Key", "value")));

        assert_eq!(e.del("Test-Key").as_deref(), Some("value"));
        assert_eq!(e.len(), 0);
        assert_eq!(e.get("test-key"), "");
    }

    #[test]
    fn test_get_on_empty_map() {
        let e = Extensions::default();
        assert_eq!(e.get("woot"), "");
        assert_eq!(e.get(""), "");
    }

    #[test]
    fn test_set_overwrites_case_variants() {
        let mut e = Extensions::new();
        e.set("X-Postfix-Queue-ID", "first");
        e.set("x-postfix-queue-id", "second");
        assert_eq!(e.len(), 1);
        assert_eq!(e.get("X-POSTFIX-QUEUE-ID"), "second");
    }

    #[test]
    fn test_serializes_as_plain_map() {
        let mut e = Extensions::new();
        e.set("x-foo", "bar");
        let json = serde_json::to_string(&e).unwrap();
        assert_eq!(json, r#"{"X-Foo":"bar"}"#);
    }
}
