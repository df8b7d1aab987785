//! Plain query descriptors.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use treaty_client::Payload;
use treaty_core::{AbortSignal, Input, OperationFamily, Result, TreatyError};
use treaty_key::{PageDirection, QueryKey};

use super::Target;
use crate::bridge::build_query_from_stream;
use crate::options::{MetaMap, QueryOptions, TreatyInfo};
use crate::store::QueryStore;

/// What the caching layer passes when it runs a query function.
#[derive(Debug, Clone, Default)]
pub struct QueryFnContext {
    /// Fires when the caching layer cancels the query.
    pub signal: AbortSignal,
    /// Page cursor for infinite queries; `null` for the first page.
    pub page_param: Value,
    pub direction: PageDirection,
    pub meta: Option<MetaMap>,
}

impl QueryFnContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_signal(mut self, signal: AbortSignal) -> Self {
        self.signal = signal;
        self
    }

    pub fn with_page_param(mut self, page_param: Value) -> Self {
        self.page_param = page_param;
        self
    }

    pub fn with_direction(mut self, direction: PageDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_meta(mut self, meta: Option<MetaMap>) -> Self {
        self.meta = meta;
        self
    }
}

/// A query function run by the caching layer.
pub type QueryFn = Arc<dyn Fn(QueryFnContext) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// `{query_key, query_fn, ...options}` for one query.
#[derive(Clone)]
pub struct QueryDescriptor {
    pub query_key: QueryKey,
    /// `None` when the input is the skip sentinel.
    pub query_fn: Option<QueryFn>,
    pub options: QueryOptions,
    pub treaty: TreatyInfo,
}

impl QueryDescriptor {
    pub(crate) fn build(
        target: Target,
        input: &Input,
        query_key: QueryKey,
        options: QueryOptions,
        default_abort: bool,
        store: Arc<dyn QueryStore>,
    ) -> Self {
        let treaty = TreatyInfo {
            path: target.route.to_string(),
        };

        let query_fn = (!input.is_skip()).then(|| {
            let abort = options.treaty.abort_on_unmount.unwrap_or(default_abort);
            let request_input = input.to_request();
            let key = query_key.clone();

            let query_fn: QueryFn = Arc::new(move |ctx: QueryFnContext| {
                let target = target.clone();
                let input = request_input.clone();
                let store = store.clone();
                let key = key.clone();
                async move {
                    let signal = abort.then_some(&ctx.signal);
                    match target.call(OperationFamily::Query, input, signal).await? {
                        Payload::Value(value) => Ok(value),
                        Payload::Stream(stream) => build_query_from_stream(stream, store.as_ref(), &key).await,
                    }
                }
                .boxed()
            });
            query_fn
        });

        Self {
            query_key,
            query_fn,
            options,
            treaty,
        }
    }

    /// Whether the skip sentinel disabled this query.
    pub fn is_skipped(&self) -> bool {
        self.query_fn.is_none()
    }

    /// Whether the caching layer should run this query.
    pub fn is_enabled(&self) -> bool {
        !self.is_skipped() && self.options.enabled != Some(false)
    }

    /// Run the query function.
    pub async fn run(&self, ctx: QueryFnContext) -> Result<Value> {
        match &self.query_fn {
            Some(query_fn) => query_fn(ctx).await,
            None => Err(TreatyError::Skipped {
                path: self.treaty.path.clone(),
            }),
        }
    }
}

impl fmt::Debug for QueryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryDescriptor")
            .field("query_key", &self.query_key)
            .field("skipped", &self.is_skipped())
            .field("options", &self.options)
            .field("treaty", &self.treaty)
            .finish()
    }
}
