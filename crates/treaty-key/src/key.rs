//! Cache key composition.
//!
//! Query keys have the shape `[[prefix]?, path, {input?, type?}?]` and
//! mutation keys `[[prefix]?, path]`, where `path` is the array of route
//! segments. Object inputs are held as `serde_json` maps, whose ordering is
//! canonical, so equal-by-value inputs yield equal keys.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use treaty_core::{Input, RoutePath};

use crate::cursor::{has_cursor_fields, strip_cursor};

/// The `type` recorded in a query key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    /// Untyped; matches queries and infinite queries alike.
    Any,
    Query,
    Infinite,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Query => "query",
            Self::Infinite => "infinite",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The trailing `{input?, type?}` record of a query key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyArgs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub query_type: Option<QueryType>,
}

impl KeyArgs {
    fn to_value(&self) -> Value {
        let mut map = Map::new();
        if let Some(input) = &self.input {
            map.insert("input".to_string(), input.clone());
        }
        if let Some(query_type) = self.query_type {
            map.insert("type".to_string(), Value::String(query_type.as_str().to_string()));
        }
        Value::Object(map)
    }
}

fn prefix_segment(prefix: &Option<String>) -> Option<Value> {
    prefix
        .as_ref()
        .map(|p| Value::Array(vec![Value::String(p.clone())]))
}

fn path_value(path: &[String]) -> Value {
    Value::Array(path.iter().cloned().map(Value::String).collect())
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Structural key identifying a cached query result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryKey {
    prefix: Option<String>,
    path: Vec<String>,
    args: Option<KeyArgs>,
}

impl QueryKey {
    /// Key prefix, if one was configured.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Route segments.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// The `{input?, type?}` record, absent for collapsed `any` keys.
    pub fn args(&self) -> Option<&KeyArgs> {
        self.args.as_ref()
    }

    /// The input recorded in the key.
    pub fn input(&self) -> Option<&Value> {
        self.args.as_ref().and_then(|a| a.input.as_ref())
    }

    /// The type recorded in the key.
    pub fn query_type(&self) -> Option<QueryType> {
        self.args.as_ref().and_then(|a| a.query_type)
    }

    /// The key as an ordered JSON array.
    pub fn to_value(&self) -> Value {
        let mut parts = Vec::with_capacity(3);
        parts.extend(prefix_segment(&self.prefix));
        if !(self.path.is_empty() && self.args.is_none()) {
            parts.push(path_value(&self.path));
        }
        if let Some(args) = &self.args {
            parts.push(args.to_value());
        }
        Value::Array(parts)
    }

    /// Stable string form, usable as a map key.
    pub fn hash_key(&self) -> String {
        self.to_value().to_string()
    }
}

impl Hash for QueryKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hash_key().hash(state);
    }
}

impl Serialize for QueryKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hash_key())
    }
}

/// Structural key identifying a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MutationKey {
    prefix: Option<String>,
    path: Vec<String>,
}

impl MutationKey {
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn to_value(&self) -> Value {
        let mut parts = Vec::with_capacity(2);
        parts.extend(prefix_segment(&self.prefix));
        parts.push(path_value(&self.path));
        Value::Array(parts)
    }

    pub fn hash_key(&self) -> String {
        self.to_value().to_string()
    }
}

impl Serialize for MutationKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl fmt::Display for MutationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hash_key())
    }
}

/// Builder for query and mutation keys sharing one optional prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyBuilder {
    prefix: Option<String>,
}

impl KeyBuilder {
    /// Create a key builder without a prefix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a prefix for every key built.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set or clear the prefix. Empty prefixes are ignored.
    pub fn with_optional_prefix(mut self, prefix: Option<String>) -> Self {
        self.prefix = prefix.filter(|p| !p.is_empty());
        self
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Build a query key.
    ///
    /// Untyped keys without a meaningful input collapse to the path alone, so
    /// they prefix-match every query below it. Infinite keys drop cursor and
    /// direction fields from the input.
    pub fn query_key(&self, path: &RoutePath, input: &Input, query_type: QueryType) -> QueryKey {
        let path = path.key_segments();
        let prefix = self.prefix.clone();

        let value = input.as_value();
        if query_type == QueryType::Any && value.map_or(true, is_falsy) {
            return QueryKey {
                prefix,
                path,
                args: None,
            };
        }

        let args = match value {
            Some(v) if query_type == QueryType::Infinite && has_cursor_fields(v) => KeyArgs {
                input: Some(strip_cursor(v)),
                query_type: Some(QueryType::Infinite),
            },
            _ => KeyArgs {
                input: value.cloned(),
                query_type: (query_type != QueryType::Any).then_some(query_type),
            },
        };

        QueryKey {
            prefix,
            path,
            args: Some(args),
        }
    }

    /// Build a mutation key; mutations are keyed by path only.
    pub fn mutation_key(&self, path: &RoutePath) -> MutationKey {
        MutationKey {
            prefix: self.prefix.clone(),
            path: path.key_segments(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn users() -> RoutePath {
        RoutePath::from_segments(["users"])
    }

    // === Query Key Shape Tests ===

    #[test]
    fn test_query_key_with_input() {
        let key = KeyBuilder::new().query_key(&users(), &json!({"a": 1}).into(), QueryType::Query);
        assert_eq!(
            key.to_value(),
            json!([["users"], {"input": {"a": 1}, "type": "query"}])
        );
    }

    #[test]
    fn test_query_key_without_input_keeps_type() {
        let key = KeyBuilder::new().query_key(&users(), &Input::Absent, QueryType::Query);
        assert_eq!(key.to_value(), json!([["users"], {"type": "query"}]));
    }

    #[test]
    fn test_skip_input_is_not_recorded() {
        let key = KeyBuilder::new().query_key(&users(), &Input::Skip, QueryType::Query);
        assert_eq!(key.input(), None);
        assert_eq!(key.query_type(), Some(QueryType::Query));
    }

    #[test]
    fn test_any_key_collapses_without_input() {
        let builder = KeyBuilder::new();
        let key = builder.query_key(&users(), &Input::Absent, QueryType::Any);
        assert_eq!(key.to_value(), json!([["users"]]));

        let root = builder.query_key(&RoutePath::new(), &Input::Absent, QueryType::Any);
        assert_eq!(root.to_value(), json!([]));

        let falsy = builder.query_key(&users(), &json!(0).into(), QueryType::Any);
        assert_eq!(falsy.to_value(), json!([["users"]]));
    }

    #[test]
    fn test_any_key_with_input_omits_type() {
        let key = KeyBuilder::new().query_key(&users(), &json!({"room": 1}).into(), QueryType::Any);
        assert_eq!(key.to_value(), json!([["users"], {"input": {"room": 1}}]));
    }

    #[test]
    fn test_prefix_is_leading_segment() {
        let builder = KeyBuilder::new().with_prefix("tenant");
        let key = builder.query_key(&users(), &Input::Absent, QueryType::Query);
        assert_eq!(key.to_value(), json!([["tenant"], ["users"], {"type": "query"}]));

        let root = builder.query_key(&RoutePath::new(), &Input::Absent, QueryType::Any);
        assert_eq!(root.to_value(), json!([["tenant"]]));
    }

    #[test]
    fn test_dotted_and_param_segments() {
        let path = RoutePath::from_segments(["api.v1", ":id"]);
        let key = KeyBuilder::new().query_key(&path, &Input::Absent, QueryType::Query);
        assert_eq!(key.path(), &["api", "v1", ":id"]);
    }

    // === Purity Tests ===

    #[test]
    fn test_key_ignores_insertion_order() {
        let builder = KeyBuilder::new();
        let a: Value = serde_json::from_str(r#"{"b": 2, "a": {"y": 1, "x": 0}}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"a": {"x": 0, "y": 1}, "b": 2}"#).unwrap();
        let ka = builder.query_key(&users(), &a.into(), QueryType::Query);
        let kb = builder.query_key(&users(), &b.into(), QueryType::Query);
        assert_eq!(ka, kb);
        assert_eq!(ka.hash_key(), kb.hash_key());
    }

    #[test]
    fn test_different_paths_differ() {
        let builder = KeyBuilder::new();
        let a = builder.query_key(&users(), &Input::Absent, QueryType::Query);
        let b = builder.query_key(&RoutePath::from_segments(["posts"]), &Input::Absent, QueryType::Query);
        assert_ne!(a, b);
    }

    // === Infinite Key Tests ===

    #[test]
    fn test_infinite_key_ignores_cursor_value() {
        let builder = KeyBuilder::new();
        let k1 = builder.query_key(&users(), &json!({"query": {"cursor": 1, "limit": 5}}).into(), QueryType::Infinite);
        let k2 = builder.query_key(&users(), &json!({"query": {"cursor": 9, "limit": 5}}).into(), QueryType::Infinite);
        let k3 = builder.query_key(&users(), &json!({"cursor": "x", "query": {"limit": 5}}).into(), QueryType::Infinite);
        assert_eq!(k1, k2);
        assert_eq!(k1.input(), Some(&json!({"query": {"limit": 5}})));
        assert_eq!(k3.input(), Some(&json!({"query": {"limit": 5}})));
        assert_eq!(k1.query_type(), Some(QueryType::Infinite));
    }

    #[test]
    fn test_plain_query_key_keeps_cursor() {
        let key = KeyBuilder::new().query_key(&users(), &json!({"cursor": 1}).into(), QueryType::Query);
        assert_eq!(key.input(), Some(&json!({"cursor": 1})));
    }

    // === Mutation Key Tests ===

    #[test]
    fn test_mutation_key_is_path_only() {
        let path = RoutePath::from_segments(["todos", ":id"]);
        assert_eq!(KeyBuilder::new().mutation_key(&path).to_value(), json!([["todos", ":id"]]));
        assert_eq!(
            KeyBuilder::new().with_prefix("p").mutation_key(&path).to_value(),
            json!([["p"], ["todos", ":id"]])
        );
    }

    #[test]
    fn test_serialize_matches_value() {
        let key = KeyBuilder::new().query_key(&users(), &Input::Absent, QueryType::Query);
        assert_eq!(serde_json::to_value(&key).unwrap(), key.to_value());
    }
}
