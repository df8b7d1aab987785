//! Streaming query results into the cache.

use futures::StreamExt;
use serde_json::Value;
use tracing::trace;
use treaty_client::ValueStream;
use treaty_core::{Result, TreatyError};
use treaty_key::QueryKey;

use crate::store::{QueryStatus, QueryStore};

/// Drain `stream` into the cache entry for `key` and return every item.
///
/// The entry is reset to an empty successful array before the first item
/// arrives, then rewritten with the full aggregate after each item so
/// readers observe the prefix received so far. A stream error stops the
/// drain; items already written stay cached.
pub async fn build_query_from_stream(
    mut stream: ValueStream,
    store: &dyn QueryStore,
    key: &QueryKey,
) -> Result<Value> {
    let mut state = store.build(key);
    state.data = Some(Value::Array(Vec::new()));
    state.status = QueryStatus::Success;
    state.error = None;
    store.set_query_state(key, state);

    let mut aggregate = Vec::new();
    while let Some(item) = stream.next().await {
        let chunk = item.map_err(TreatyError::Stream)?;
        aggregate.push(chunk);
        store.set_query_data(key, Value::Array(aggregate.clone()));
        trace!(key = %key, received = aggregate.len(), "stream chunk cached");
    }

    Ok(Value::Array(aggregate))
}
