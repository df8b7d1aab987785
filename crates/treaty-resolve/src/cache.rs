//! Last-successful verb per route.

use std::collections::HashMap;

use parking_lot::RwLock;
use treaty_core::{OperationFamily, RoutePath, Verb};

/// Remembers which verb last worked for a route.
///
/// Owned by one client binding and shared by every call site using it. It
/// is a hint: entries are only written on success and never invalidated,
/// and callers still verify the verb on every call.
#[derive(Debug, Default)]
pub struct VerbCache {
    entries: RwLock<HashMap<(OperationFamily, String), Verb>>,
}

impl VerbCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached verb for `route`, if any.
    pub fn get(&self, family: OperationFamily, route: &RoutePath) -> Option<Verb> {
        self.entries
            .read()
            .get(&(family, route.to_string()))
            .copied()
    }

    /// Record a successful resolution.
    pub fn insert(&self, family: OperationFamily, route: &RoutePath, verb: Verb) {
        self.entries.write().insert((family, route.to_string()), verb);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
