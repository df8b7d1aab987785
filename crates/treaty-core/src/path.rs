//! Route paths accumulated while walking an endpoint tree.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::verb::{OperationFamily, Verb};

/// One segment of a route path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Segment {
    /// An endpoint name.
    Literal(String),
    /// Awaiting a path parameter with this name.
    Param(String),
}

impl Segment {
    /// Parse the rendered form (`:name` marks a parameter).
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(':') {
            Some(name) => Self::Param(name.to_string()),
            None => Self::Literal(raw.to_string()),
        }
    }

    /// Whether this segment awaits a parameter.
    pub fn is_param(&self) -> bool {
        matches!(self, Self::Param(_))
    }

    /// The literal name, if this is a literal segment.
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(name) => Some(name),
            Self::Param(_) => None,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(name) => write!(f, "{}", name),
            Self::Param(name) => write!(f, ":{}", name),
        }
    }
}

/// Ordered sequence of segments identifying a node in the endpoint tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoutePath {
    segments: Vec<Segment>,
}

impl RoutePath {
    /// Create an empty (root) path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a path from rendered segments (`:name` marks a parameter).
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            segments: segments.into_iter().map(|s| Segment::parse(s.as_ref())).collect(),
        }
    }

    /// Append a literal segment.
    pub fn push_literal(&mut self, name: impl Into<String>) {
        self.segments.push(Segment::Literal(name.into()));
    }

    /// Append a parametric segment.
    pub fn push_param(&mut self, name: impl Into<String>) {
        self.segments.push(Segment::Param(name.into()));
    }

    /// Return a copy with a literal segment appended.
    pub fn join(&self, name: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.push_literal(name);
        next
    }

    /// The segments in order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Whether this is the root path.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The last segment, if it is a literal.
    pub fn last_literal(&self) -> Option<&str> {
        self.segments.last().and_then(Segment::as_literal)
    }

    /// The path without its last segment.
    pub fn parent(&self) -> Self {
        let mut segments = self.segments.clone();
        segments.pop();
        Self { segments }
    }

    /// Whether any segment awaits a path parameter.
    pub fn has_params(&self) -> bool {
        self.segments.iter().any(Segment::is_param)
    }

    /// Number of parametric segments.
    pub fn param_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_param()).count()
    }

    /// Split off a trailing verb pinned for `family`.
    ///
    /// Returns the route without the verb and the verb, or the path
    /// unchanged when the last segment is not a verb of that family.
    pub fn split_pinned_verb(&self, family: OperationFamily) -> (RoutePath, Option<Verb>) {
        match self.last_literal().and_then(Verb::parse) {
            Some(verb) if family.accepts(verb) => (self.parent(), Some(verb)),
            _ => (self.clone(), None),
        }
    }

    /// Segments as they appear in cache keys (dotted literals are split).
    pub fn key_segments(&self) -> Vec<String> {
        self.segments
            .iter()
            .flat_map(|segment| match segment {
                Segment::Literal(name) => name.split('.').map(str::to_string).collect::<Vec<_>>(),
                Segment::Param(_) => vec![segment.to_string()],
            })
            .collect()
    }

    /// Human-readable location used in error messages.
    pub fn location(&self) -> String {
        if self.is_empty() {
            "<root>".to_string()
        } else {
            self.to_string()
        }
    }
}

impl fmt::Display for RoutePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.segments.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", rendered.join("."))
    }
}

/// A single-key record satisfying one parametric segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathParam {
    name: String,
    value: Value,
}

impl PathParam {
    /// Create a new path parameter.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Interpret a call argument as a path parameter.
    ///
    /// Only a plain object with exactly one key qualifies.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(map) if map.len() == 1 => map
                .iter()
                .next()
                .map(|(name, value)| Self::new(name.clone(), value.clone())),
            _ => None,
        }
    }

    /// Parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The `{name: value}` record.
    pub fn to_object(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(self.name.clone(), self.value.clone());
        map
    }
}
