//! Pagination cursor handling for infinite queries.
//!
//! A cursor (and an optional `direction` flag) may sit at the top level of the
//! input or one level down under `query`.

use serde_json::{Map, Value};

pub const CURSOR_FIELD: &str = "cursor";
pub const DIRECTION_FIELD: &str = "direction";
pub const QUERY_FIELD: &str = "query";

/// Which way an infinite query is paging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageDirection {
    #[default]
    Forward,
    Backward,
}

impl PageDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
        }
    }
}

fn has_any(map: &Map<String, Value>, fields: &[&str]) -> bool {
    fields.iter().any(|f| map.contains_key(*f))
}

fn nested_query(map: &Map<String, Value>) -> Option<&Map<String, Value>> {
    map.get(QUERY_FIELD).and_then(Value::as_object)
}

/// Whether the input carries a cursor or direction field anywhere we look.
pub fn has_cursor_fields(input: &Value) -> bool {
    let Some(map) = input.as_object() else {
        return false;
    };
    let fields = [CURSOR_FIELD, DIRECTION_FIELD];
    has_any(map, &fields) || nested_query(map).is_some_and(|q| has_any(q, &fields))
}

/// Whether the input declares a direction flag, i.e. pages both ways.
pub fn has_direction_field(input: &Value) -> bool {
    let Some(map) = input.as_object() else {
        return false;
    };
    map.contains_key(DIRECTION_FIELD)
        || nested_query(map).is_some_and(|q| q.contains_key(DIRECTION_FIELD))
}

/// Remove cursor and direction from the top level and from `query`.
///
/// Non-object inputs are returned unchanged.
pub fn strip_cursor(input: &Value) -> Value {
    let Some(map) = input.as_object() else {
        return input.clone();
    };

    let mut next = map.clone();
    next.remove(CURSOR_FIELD);
    next.remove(DIRECTION_FIELD);
    if let Some(Value::Object(query)) = next.get_mut(QUERY_FIELD) {
        query.remove(CURSOR_FIELD);
        query.remove(DIRECTION_FIELD);
    }
    Value::Object(next)
}

/// The cursor already present in a caller-supplied input.
pub fn cursor_from_input(input: &Value) -> Option<Value> {
    let map = input.as_object()?;
    if let Some(cursor) = map.get(CURSOR_FIELD) {
        return Some(cursor.clone());
    }
    nested_query(map).and_then(|q| q.get(CURSOR_FIELD)).cloned()
}

/// Where [`add_cursor_to_input`] writes the page cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorPlacement {
    /// Under the `query` sub-object.
    #[default]
    Query,
    /// At the top level of the input.
    TopLevel,
}

impl CursorPlacement {
    /// Follow where the caller put their cursor or direction, defaulting to `query`.
    pub fn detect(input: &Value) -> Self {
        match input.as_object() {
            Some(map) if has_any(map, &[CURSOR_FIELD, DIRECTION_FIELD]) => Self::TopLevel,
            _ => Self::Query,
        }
    }
}

/// Build the request input for one page.
///
/// `base` is the caller's input with cursor fields already stripped. A null
/// cursor means "start of sequence" and is omitted. The direction is written
/// only when `bidirectional` is set.
pub fn add_cursor_to_input(
    base: Option<&Value>,
    cursor: &Value,
    direction: PageDirection,
    bidirectional: bool,
    placement: CursorPlacement,
) -> Value {
    let mut next = base.and_then(Value::as_object).cloned().unwrap_or_default();

    let mut fields = Map::new();
    if !cursor.is_null() {
        fields.insert(CURSOR_FIELD.to_string(), cursor.clone());
    }
    if bidirectional {
        fields.insert(
            DIRECTION_FIELD.to_string(),
            Value::String(direction.as_str().to_string()),
        );
    }

    match placement {
        CursorPlacement::TopLevel => next.extend(fields),
        CursorPlacement::Query => {
            let had_query = next.contains_key(QUERY_FIELD);
            let mut query = next
                .get(QUERY_FIELD)
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            query.extend(fields);
            if !query.is_empty() || had_query {
                next.insert(QUERY_FIELD.to_string(), Value::Object(query));
            }
        }
    }

    Value::Object(next)
}
