//! Query, mutation and subscription descriptors for treaty endpoint trees.
//!
//! This crate provides:
//! - `OptionsProxy` / `PathNode` - Path accumulation and terminal utilities
//! - Descriptors - Query, infinite query, mutation and subscription
//! - `build_query_from_stream` - Incremental cache writes for streamed results
//! - `Subscription` - Connection state machine with watch notifications
//! - `QueryStore` / `MemoryStore` - The caching layer surface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use serde_json::json;
//! use treaty_query::{MemoryStore, MutationOptions, OptionsProxy, QueryOptions};
//!
//! let store = Arc::new(MemoryStore::new());
//! let proxy = OptionsProxy::new(client, store.clone());
//!
//! let users = proxy.at("users");
//! let list = users.query_options(json!({"page": 1}), QueryOptions::new());
//! let data = store.fetch_query(&list).await?;
//!
//! let update = users.param("id", 7).mutation_options(MutationOptions::new());
//! store.execute_mutation(&update, Some(json!({"name": "Ada"}))).await?;
//! ```

mod bridge;
mod descriptor;
mod options;
mod proxy;
mod store;
mod subscription;

pub use bridge::*;
pub use descriptor::*;
pub use options::*;
pub use proxy::*;
pub use store::*;
pub use subscription::*;
