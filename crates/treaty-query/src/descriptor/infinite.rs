//! Infinite (paginated) query descriptors.

use std::fmt;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::{Map, Value};
use treaty_client::Payload;
use treaty_core::{Input, OperationFamily, Result, TreatyError};
use treaty_key::{
    add_cursor_to_input, cursor_from_input, has_direction_field, strip_cursor, CursorPlacement,
    QueryKey,
};

use super::{QueryFn, QueryFnContext, Target};
use crate::bridge::build_query_from_stream;
use crate::options::{InfiniteQueryOptions, TreatyInfo};
use crate::store::QueryStore;

/// Pages fetched so far and the params that fetched them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InfiniteData {
    pub pages: Vec<Value>,
    pub page_params: Vec<Value>,
}

impl InfiniteData {
    pub fn new(page: Value, page_param: Value) -> Self {
        Self {
            pages: vec![page],
            page_params: vec![page_param],
        }
    }

    /// `{pages, pageParams}` as stored in the cache.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("pages".to_string(), Value::Array(self.pages.clone()));
        map.insert("pageParams".to_string(), Value::Array(self.page_params.clone()));
        Value::Object(map)
    }

    /// Read back a cached `{pages, pageParams}` record.
    pub fn from_value(value: &Value) -> Option<Self> {
        let pages = value.get("pages")?.as_array()?.clone();
        let page_params = value.get("pageParams")?.as_array()?.clone();
        Some(Self { pages, page_params })
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// `{query_key, query_fn, initial_page_param, ...options}` for one paginated query.
#[derive(Clone)]
pub struct InfiniteQueryDescriptor {
    pub query_key: QueryKey,
    /// `None` when the input is the skip sentinel.
    pub query_fn: Option<QueryFn>,
    pub initial_page_param: Value,
    pub options: InfiniteQueryOptions,
    pub treaty: TreatyInfo,
}

impl InfiniteQueryDescriptor {
    pub(crate) fn build(
        target: Target,
        input: &Input,
        query_key: QueryKey,
        options: InfiniteQueryOptions,
        default_abort: bool,
        store: Arc<dyn QueryStore>,
    ) -> Self {
        let treaty = TreatyInfo {
            path: target.route.to_string(),
        };

        let original = input.as_value();
        let initial_page_param = options
            .initial_cursor
            .clone()
            .or_else(|| original.and_then(cursor_from_input))
            .unwrap_or(Value::Null);

        let query_fn = (!input.is_skip()).then(|| {
            let abort = options.query.treaty.abort_on_unmount.unwrap_or(default_abort);
            let base = original.map(strip_cursor);
            let bidirectional = original.is_some_and(has_direction_field);
            let placement = original.map(CursorPlacement::detect).unwrap_or_default();
            let key = query_key.clone();

            let query_fn: QueryFn = Arc::new(move |ctx: QueryFnContext| {
                let target = target.clone();
                let store = store.clone();
                let key = key.clone();
                let request = add_cursor_to_input(
                    base.as_ref(),
                    &ctx.page_param,
                    ctx.direction,
                    bidirectional,
                    placement,
                );
                async move {
                    let signal = abort.then_some(&ctx.signal);
                    match target.call(OperationFamily::Query, Some(request), signal).await? {
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
            initial_page_param,
            options,
            treaty,
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.query_fn.is_none()
    }

    pub fn is_enabled(&self) -> bool {
        !self.is_skipped() && self.options.query.enabled != Some(false)
    }

    /// Fetch one page.
    pub async fn run(&self, ctx: QueryFnContext) -> Result<Value> {
        match &self.query_fn {
            Some(query_fn) => query_fn(ctx).await,
            None => Err(TreatyError::Skipped {
                path: self.treaty.path.clone(),
            }),
        }
    }

    /// Param for the page after the last one, if there is one.
    pub fn next_page_param(&self, data: &InfiniteData) -> Option<Value> {
        let compute = self.options.get_next_page_param.as_ref()?;
        let last_page = data.pages.last()?;
        let last_param = data.page_params.last().unwrap_or(&Value::Null);
        compute(last_page, &data.pages, last_param)
    }

    /// Param for the page before the first one, if there is one.
    pub fn previous_page_param(&self, data: &InfiniteData) -> Option<Value> {
        let compute = self.options.get_previous_page_param.as_ref()?;
        let first_page = data.pages.first()?;
        let first_param = data.page_params.first().unwrap_or(&Value::Null);
        compute(first_page, &data.pages, first_param)
    }
}

impl fmt::Debug for InfiniteQueryDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfiniteQueryDescriptor")
            .field("query_key", &self.query_key)
            .field("skipped", &self.is_skipped())
            .field("initial_page_param", &self.initial_page_param)
            .field("options", &self.options)
            .field("treaty", &self.treaty)
            .finish()
    }
}
