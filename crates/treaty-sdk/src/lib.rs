//! Public SDK for consuming treaty endpoint trees through a query cache.
//!
//! This crate re-exports all adapter functionality:
//!
//! ```ignore
//! use treaty_sdk::prelude::*;
//!
//! let store = Arc::new(MemoryStore::new());
//! let proxy = OptionsProxy::with_config(client, store.clone(), TreatyConfig::load("treaty.toml")?);
//!
//! let todo = proxy.at("todos").param("id", 1);
//! let update = todo.mutation_options(MutationOptions::new());
//! store.execute_mutation(&update, Some(json!({"status": "done"}))).await?;
//! store.invalidate_queries(&proxy.at("todos").path_filter());
//!
//! let live = Subscription::start(proxy.at("feed").subscription_options(Input::Absent, SubscriptionOptions::new()))?;
//! let mut changes = live.watch();
//! ```

pub use treaty_client;
pub use treaty_core;
pub use treaty_key;
pub use treaty_query;
pub use treaty_resolve;

/// Prelude for convenient imports.
pub mod prelude {
    pub use treaty_client::*;
    pub use treaty_core::*;
    pub use treaty_key::*;
    pub use treaty_query::*;
    pub use treaty_resolve::*;
}
