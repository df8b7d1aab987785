//! Verb resolution and endpoint invocation.
//!
//! This crate provides:
//! - `VerbResolver` - Explicit or automatic verb selection with fallback
//! - `FallbackPolicy` - Per-family fallback-eligible failure classes
//! - `VerbCache` - Last-successful verb per route
//! - `call_endpoint` / `open_stream` - Single verb invocation against the tree
//!
//! # Example
//!
//! ```ignore
//! use treaty_core::{OperationFamily, PathParam, RoutePath};
//! use treaty_resolve::{VerbResolver, VerbSelection};
//!
//! let resolver = VerbResolver::new(client);
//! let (verb, payload) = resolver
//!     .call(
//!         OperationFamily::Mutation,
//!         &RoutePath::from_segments(["todos", ":id"]),
//!         VerbSelection::Automatic,
//!         &[PathParam::new("id", 1)],
//!         Some(json!({"status": "done"})),
//!         None,
//!     )
//!     .await?;
//! ```

mod cache;
mod caller;
mod fallback;
mod resolver;

pub use cache::*;
pub use caller::*;
pub use fallback::*;
pub use resolver::*;
