//! The caching layer's store interface and an in-memory implementation.
//!
//! Descriptors only need the narrow [`QueryStore`] surface. [`MemoryStore`]
//! adds the execution entry points (fetch, paginate, mutate) used by tests
//! and by hosts that have no caching layer of their own.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};
use treaty_core::{AbortSignal, Result, TreatyError};
use treaty_key::{partial_deep_eq, MutationKey, PageDirection, QueryFilter, QueryKey};

use crate::descriptor::{
    InfiniteData, InfiniteQueryDescriptor, MutationDescriptor, QueryDescriptor, QueryFnContext,
    SuccessArgs, SuccessCallback,
};
use crate::options::MetaMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    #[default]
    Pending,
    Success,
    Error,
}

/// Cached state of one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryState {
    pub data: Option<Value>,
    pub error: Option<TreatyError>,
    pub status: QueryStatus,
    pub is_invalidated: bool,
    /// Number of data writes since the entry was built.
    pub data_update_count: u32,
}

impl QueryState {
    /// A successful state holding `data`.
    pub fn success(data: Value) -> Self {
        Self {
            data: Some(data),
            status: QueryStatus::Success,
            ..Self::default()
        }
    }
}

/// Defaults registered for a mutation key.
#[derive(Clone, Default)]
pub struct MutationDefaults {
    pub on_success: Option<SuccessCallback>,
    pub meta: Option<MetaMap>,
}

impl MutationDefaults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_on_success(mut self, callback: SuccessCallback) -> Self {
        self.on_success = Some(callback);
        self
    }

    pub fn with_meta(mut self, meta: MetaMap) -> Self {
        self.meta = Some(meta);
        self
    }

    fn merge(&mut self, other: &MutationDefaults) {
        if other.on_success.is_some() {
            self.on_success = other.on_success.clone();
        }
        if other.meta.is_some() {
            self.meta = other.meta.clone();
        }
    }
}

impl fmt::Debug for MutationDefaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationDefaults")
            .field("on_success", &self.on_success.is_some())
            .field("meta", &self.meta)
            .finish()
    }
}

/// What descriptors need from the caching layer.
pub trait QueryStore: Send + Sync {
    /// Current state for `key`, if an entry exists.
    fn get_query_state(&self, key: &QueryKey) -> Option<QueryState>;

    /// Replace the state for `key`, creating the entry if needed.
    fn set_query_state(&self, key: &QueryKey, state: QueryState);

    /// Ensure an entry exists for `key` and return its state.
    fn build(&self, key: &QueryKey) -> QueryState;

    /// Mark matching queries stale. Returns how many matched.
    fn invalidate_queries(&self, filter: &QueryFilter) -> usize;

    /// Abort in-flight fetches of matching queries. Returns how many were aborted.
    fn cancel_queries(&self, filter: &QueryFilter) -> usize;

    /// Merged defaults of every registration whose key prefixes `key`.
    fn get_mutation_defaults(&self, key: &MutationKey) -> MutationDefaults;

    fn get_query_data(&self, key: &QueryKey) -> Option<Value> {
        self.get_query_state(key).and_then(|state| state.data)
    }

    /// Write `data` as a successful result.
    fn set_query_data(&self, key: &QueryKey, data: Value) {
        let mut state = self.build(key);
        state.data = Some(data);
        state.status = QueryStatus::Success;
        state.error = None;
        state.is_invalidated = false;
        state.data_update_count += 1;
        self.set_query_state(key, state);
    }
}

struct CacheEntry {
    key: QueryKey,
    state: QueryState,
}

struct InFlight {
    key: QueryKey,
    signal: AbortSignal,
}

/// In-memory [`QueryStore`] keyed by each query key's hash.
#[derive(Default)]
pub struct MemoryStore {
    queries: RwLock<HashMap<String, CacheEntry>>,
    /// One slot per running fetch, so concurrent fetches of a key cancel independently.
    in_flight: Mutex<HashMap<u64, InFlight>>,
    next_flight: AtomicU64,
    mutation_defaults: RwLock<Vec<(MutationKey, MutationDefaults)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached queries.
    pub fn len(&self) -> usize {
        self.queries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.read().is_empty()
    }

    /// Keys of all cached queries.
    pub fn query_keys(&self) -> Vec<QueryKey> {
        self.queries.read().values().map(|entry| entry.key.clone()).collect()
    }

    /// Keys of cached queries matching `filter`.
    pub fn queries_matching(&self, filter: &QueryFilter) -> Vec<QueryKey> {
        self.queries
            .read()
            .values()
            .filter(|entry| filter.matches(&entry.key))
            .map(|entry| entry.key.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.queries.write().clear();
    }

    /// Register defaults for `key`, replacing an earlier registration for the same key.
    pub fn set_mutation_defaults(&self, key: MutationKey, defaults: MutationDefaults) {
        let mut registered = self.mutation_defaults.write();
        match registered.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = defaults,
            None => registered.push((key, defaults)),
        }
    }

    /// Run a query descriptor and cache its result.
    ///
    /// Skipped descriptors fail with [`TreatyError::Skipped`] without touching the cache.
    pub async fn fetch_query(&self, descriptor: &QueryDescriptor) -> Result<Value> {
        if descriptor.is_skipped() {
            return Err(TreatyError::Skipped {
                path: descriptor.treaty.path.clone(),
            });
        }
        let ctx = QueryFnContext::new().with_meta(descriptor.options.meta.clone());
        let key = &descriptor.query_key;
        let result = self.tracked(key, ctx, |ctx| descriptor.run(ctx)).await;
        self.record(key, &result);
        result
    }

    /// Cached data when fresh, otherwise fetch.
    pub async fn ensure_query_data(&self, descriptor: &QueryDescriptor) -> Result<Value> {
        match self.get_query_state(&descriptor.query_key) {
            Some(QueryState {
                data: Some(data),
                is_invalidated: false,
                ..
            }) => Ok(data),
            _ => self.fetch_query(descriptor).await,
        }
    }

    /// Fetch the first page of an infinite query, replacing any cached pages.
    pub async fn fetch_infinite_query(&self, descriptor: &InfiniteQueryDescriptor) -> Result<InfiniteData> {
        let param = descriptor.initial_page_param.clone();
        let page = self.fetch_page(descriptor, param.clone(), PageDirection::Forward).await?;
        let data = InfiniteData::new(page, param);
        self.set_query_data(&descriptor.query_key, data.to_value());
        Ok(data)
    }

    /// Append the next page. Returns the data unchanged when there is no next page.
    pub async fn fetch_next_page(&self, descriptor: &InfiniteQueryDescriptor) -> Result<InfiniteData> {
        let Some(mut data) = self.infinite_data(descriptor) else {
            return self.fetch_infinite_query(descriptor).await;
        };
        let Some(param) = descriptor.next_page_param(&data) else {
            return Ok(data);
        };

        let page = self.fetch_page(descriptor, param.clone(), PageDirection::Forward).await?;
        data.pages.push(page);
        data.page_params.push(param);
        if let Some(max) = descriptor.options.max_pages.map(|m| m as usize) {
            while data.pages.len() > max.max(1) {
                data.pages.remove(0);
                data.page_params.remove(0);
            }
        }

        self.set_query_data(&descriptor.query_key, data.to_value());
        Ok(data)
    }

    /// Prepend the previous page. Returns the data unchanged when there is no previous page.
    pub async fn fetch_previous_page(&self, descriptor: &InfiniteQueryDescriptor) -> Result<InfiniteData> {
        let Some(mut data) = self.infinite_data(descriptor) else {
            return self.fetch_infinite_query(descriptor).await;
        };
        let Some(param) = descriptor.previous_page_param(&data) else {
            return Ok(data);
        };

        let page = self.fetch_page(descriptor, param.clone(), PageDirection::Backward).await?;
        data.pages.insert(0, page);
        data.page_params.insert(0, param);
        if let Some(max) = descriptor.options.max_pages.map(|m| m as usize) {
            data.pages.truncate(max.max(1));
            data.page_params.truncate(max.max(1));
        }

        self.set_query_data(&descriptor.query_key, data.to_value());
        Ok(data)
    }

    /// Run a mutation, then its success handling.
    pub async fn execute_mutation(&self, descriptor: &MutationDescriptor, variables: Option<Value>) -> Result<Value> {
        let data = descriptor.mutate(variables.clone()).await?;
        debug!(key = %descriptor.mutation_key, "mutation succeeded");
        descriptor
            .on_success(SuccessArgs {
                data: data.clone(),
                variables,
            })
            .await;
        Ok(data)
    }

    fn infinite_data(&self, descriptor: &InfiniteQueryDescriptor) -> Option<InfiniteData> {
        self.get_query_data(&descriptor.query_key)
            .as_ref()
            .and_then(InfiniteData::from_value)
    }

    async fn fetch_page(
        &self,
        descriptor: &InfiniteQueryDescriptor,
        page_param: Value,
        direction: PageDirection,
    ) -> Result<Value> {
        if descriptor.is_skipped() {
            return Err(TreatyError::Skipped {
                path: descriptor.treaty.path.clone(),
            });
        }
        let ctx = QueryFnContext::new()
            .with_page_param(page_param)
            .with_direction(direction)
            .with_meta(descriptor.options.query.meta.clone());
        let key = &descriptor.query_key;
        let result = self.tracked(key, ctx, |ctx| descriptor.run(ctx)).await;
        if let Err(error) = &result {
            self.record_error(key, error);
        }
        result
    }

    /// Register an abort signal for `key` while `run` is in flight.
    async fn tracked<F, Fut>(&self, key: &QueryKey, ctx: QueryFnContext, run: F) -> Result<Value>
    where
        F: FnOnce(QueryFnContext) -> Fut,
        Fut: std::future::Future<Output = Result<Value>>,
    {
        let id = self.next_flight.fetch_add(1, Ordering::Relaxed);
        let signal = AbortSignal::new();
        self.in_flight.lock().insert(
            id,
            InFlight {
                key: key.clone(),
                signal: signal.clone(),
            },
        );
        self.build(key);
        trace!(key = %key, "fetching query");

        let result = run(ctx.with_signal(signal)).await;
        self.in_flight.lock().remove(&id);
        result
    }

    fn record(&self, key: &QueryKey, result: &Result<Value>) {
        match result {
            Ok(data) => self.set_query_data(key, data.clone()),
            Err(error) => self.record_error(key, error),
        }
    }

    fn record_error(&self, key: &QueryKey, error: &TreatyError) {
        let mut state = self.build(key);
        state.error = Some(error.clone());
        state.status = QueryStatus::Error;
        self.set_query_state(key, state);
    }
}

impl QueryStore for MemoryStore {
    fn get_query_state(&self, key: &QueryKey) -> Option<QueryState> {
        self.queries
            .read()
            .get(&key.hash_key())
            .map(|entry| entry.state.clone())
    }

    fn set_query_state(&self, key: &QueryKey, state: QueryState) {
        self.queries.write().insert(
            key.hash_key(),
            CacheEntry {
                key: key.clone(),
                state,
            },
        );
    }

    fn build(&self, key: &QueryKey) -> QueryState {
        self.queries
            .write()
            .entry(key.hash_key())
            .or_insert_with(|| CacheEntry {
                key: key.clone(),
                state: QueryState::default(),
            })
            .state
            .clone()
    }

    fn invalidate_queries(&self, filter: &QueryFilter) -> usize {
        let mut queries = self.queries.write();
        let mut count = 0;
        for entry in queries.values_mut().filter(|entry| filter.matches(&entry.key)) {
            entry.state.is_invalidated = true;
            count += 1;
        }
        debug!(count, "queries invalidated");
        count
    }

    fn cancel_queries(&self, filter: &QueryFilter) -> usize {
        let in_flight = self.in_flight.lock();
        let mut count = 0;
        for flight in in_flight.values().filter(|flight| filter.matches(&flight.key)) {
            flight.signal.abort();
            count += 1;
        }
        debug!(count, "queries cancelled");
        count
    }

    fn get_mutation_defaults(&self, key: &MutationKey) -> MutationDefaults {
        let target = key.to_value();
        let mut merged = MutationDefaults::default();
        for (registered, defaults) in self.mutation_defaults.read().iter() {
            if partial_deep_eq(&target, &registered.to_value()) {
                merged.merge(defaults);
            }
        }
        merged
    }
}

impl fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("queries", &self.len())
            .field("in_flight", &self.in_flight.lock().len())
            .finish()
    }
}
