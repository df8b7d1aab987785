//! Cache keys for the treaty query adapter.
//!
//! This crate provides:
//! - `KeyBuilder` - Query and mutation keys sharing an optional prefix
//! - `QueryKey` / `MutationKey` - Canonical structural keys
//! - `QueryFilter` - Exact and partial (prefix) key matching
//! - Cursor helpers for infinite queries
//!
//! Everything here is pure and deterministic.
//!
//! # Example
//!
//! ```ignore
//! use treaty_core::{Input, RoutePath};
//! use treaty_key::{KeyBuilder, QueryType};
//!
//! let builder = KeyBuilder::new().with_prefix("tenant-a");
//! let key = builder.query_key(
//!     &RoutePath::from_segments(["users"]),
//!     &Input::Absent,
//!     QueryType::Query,
//! );
//! // [["tenant-a"], ["users"], {"type": "query"}]
//! ```

mod cursor;
mod filter;
mod key;

pub use cursor::*;
pub use filter::*;
pub use key::*;
