//! Call input and the skip sentinel.

use serde_json::{Map, Value};

use crate::path::PathParam;

/// Input supplied to a query, mutation or subscription utility.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Input {
    /// No input was given.
    #[default]
    Absent,
    /// Skip sentinel: do not execute this operation.
    Skip,
    /// A concrete input value.
    Value(Value),
}

/// The skip sentinel.
pub const SKIP: Input = Input::Skip;

impl Input {
    /// Whether this is the skip sentinel.
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip)
    }

    /// The concrete value, if any.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    /// The concrete value to send; absent and skipped inputs send nothing.
    pub fn to_request(&self) -> Option<Value> {
        self.as_value().cloned()
    }

    /// Merge path parameters into the input for cache-key purposes.
    ///
    /// Parameters come first; object inputs override them key by key and
    /// non-object inputs land under `input`.
    pub fn merge_params(&self, params: &[PathParam]) -> Option<Value> {
        if params.is_empty() {
            return self.as_value().cloned();
        }

        let mut merged = Map::new();
        for param in params {
            merged.insert(param.name().to_string(), param.value().clone());
        }

        match self {
            Self::Absent | Self::Skip => {}
            Self::Value(Value::Object(fields)) => {
                for (k, v) in fields {
                    merged.insert(k.clone(), v.clone());
                }
            }
            Self::Value(other) => {
                merged.insert("input".to_string(), other.clone());
            }
        }

        Some(Value::Object(merged))
    }
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Option<Value>> for Input {
    fn from(value: Option<Value>) -> Self {
        match value {
            Some(value) => Self::Value(value),
            None => Self::Absent,
        }
    }
}

impl From<()> for Input {
    fn from(_: ()) -> Self {
        Self::Absent
    }
}
