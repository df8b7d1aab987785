//! Query filters used to target invalidation.

use serde::Serialize;
use serde_json::Value;

use crate::key::QueryKey;

/// Whether every field of `b` is present in `a` with a partially equal value.
///
/// Arrays compare index by index, so a shorter `b` matches any `a` it is a
/// prefix of.
pub fn partial_deep_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(a), Value::Object(b)) => b
            .iter()
            .all(|(k, bv)| a.get(k).is_some_and(|av| partial_deep_eq(av, bv))),
        (Value::Array(a), Value::Array(b)) => b
            .iter()
            .enumerate()
            .all(|(i, bv)| a.get(i).is_some_and(|av| partial_deep_eq(av, bv))),
        _ => a == b,
    }
}

/// A filter selecting cached queries by key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryFilter {
    pub query_key: QueryKey,
    /// Match only the exact key instead of every key it prefixes.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub exact: bool,
}

impl QueryFilter {
    /// A partial-matching filter for `query_key`.
    pub fn new(query_key: QueryKey) -> Self {
        Self {
            query_key,
            exact: false,
        }
    }

    pub fn with_exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }

    /// Whether a cached query with `key` is selected.
    pub fn matches(&self, key: &QueryKey) -> bool {
        if self.exact {
            return key == &self.query_key;
        }
        partial_deep_eq(&key.to_value(), &self.query_key.to_value())
    }
}
