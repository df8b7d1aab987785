//! Caller options carried onto descriptors.
//!
//! Data-only fields deserialize from camelCase JSON so the dynamic proxy can
//! decode them; callbacks are attached with the `with_*` setters.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::descriptor::{SubscriptionCallbacks, SuccessCallback};

/// Free-form metadata handed through to the caching layer.
pub type MetaMap = Map<String, Value>;

/// Computes the next (or previous) page param from the last page, all
/// pages and the last page param. `None` means there is no such page.
pub type PageParamFn = Arc<dyn Fn(&Value, &[Value], &Value) -> Option<Value> + Send + Sync>;

/// Request-level options under the `treaty` field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreatyRequestOptions {
    /// Propagate the caching layer's abort signal into the endpoint call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort_on_unmount: Option<bool>,
}

/// The caching layer's retry setting, passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Retry {
    Enabled(bool),
    Count(u32),
}

/// Debug echo of the route a descriptor was built for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreatyInfo {
    /// Dotted route path without the verb.
    pub path: String,
}

/// Options accepted by `query_options`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale_time: Option<u64>,
    /// Milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gc_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<Retry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaMap>,
    pub treaty: TreatyRequestOptions,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn with_stale_time(mut self, millis: u64) -> Self {
        self.stale_time = Some(millis);
        self
    }

    pub fn with_gc_time(mut self, millis: u64) -> Self {
        self.gc_time = Some(millis);
        self
    }

    pub fn with_retry(mut self, retry: Retry) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn with_meta(mut self, meta: MetaMap) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn with_abort_on_unmount(mut self, enabled: bool) -> Self {
        self.treaty.abort_on_unmount = Some(enabled);
        self
    }
}

/// Options accepted by `infinite_query_options`.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InfiniteQueryOptions {
    #[serde(flatten)]
    pub query: QueryOptions,
    /// Cursor for the first page; overrides any cursor in the input.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initial_cursor: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<u32>,
    #[serde(skip)]
    pub get_next_page_param: Option<PageParamFn>,
    #[serde(skip)]
    pub get_previous_page_param: Option<PageParamFn>,
}

impl InfiniteQueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_query(mut self, query: QueryOptions) -> Self {
        self.query = query;
        self
    }

    pub fn with_initial_cursor(mut self, cursor: impl Into<Value>) -> Self {
        self.initial_cursor = Some(cursor.into());
        self
    }

    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    pub fn with_next_page_param<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &[Value], &Value) -> Option<Value> + Send + Sync + 'static,
    {
        self.get_next_page_param = Some(Arc::new(f));
        self
    }

    pub fn with_previous_page_param<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &[Value], &Value) -> Option<Value> + Send + Sync + 'static,
    {
        self.get_previous_page_param = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for InfiniteQueryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfiniteQueryOptions")
            .field("query", &self.query)
            .field("initial_cursor", &self.initial_cursor)
            .field("max_pages", &self.max_pages)
            .field("get_next_page_param", &self.get_next_page_param.is_some())
            .field("get_previous_page_param", &self.get_previous_page_param.is_some())
            .finish()
    }
}

/// Options accepted by `mutation_options`.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MutationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<Retry>,
    /// Milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gc_time: Option<u64>,
    #[serde(skip)]
    pub on_success: Option<SuccessCallback>,
}

impl MutationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_meta(mut self, meta: MetaMap) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn with_retry(mut self, retry: Retry) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn with_gc_time(mut self, millis: u64) -> Self {
        self.gc_time = Some(millis);
        self
    }

    pub fn with_on_success(mut self, callback: SuccessCallback) -> Self {
        self.on_success = Some(callback);
        self
    }
}

impl fmt::Debug for MutationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationOptions")
            .field("meta", &self.meta)
            .field("retry", &self.retry)
            .field("gc_time", &self.gc_time)
            .field("on_success", &self.on_success.is_some())
            .finish()
    }
}

/// Options accepted by `subscription_options`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SubscriptionOptions {
    /// Overrides the "input is not the skip sentinel" default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip)]
    pub callbacks: SubscriptionCallbacks,
}

impl SubscriptionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn with_callbacks(mut self, callbacks: SubscriptionCallbacks) -> Self {
        self.callbacks = callbacks;
        self
    }
}
