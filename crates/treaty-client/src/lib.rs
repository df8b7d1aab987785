//! Endpoint-tree client interface for the treaty query adapter.
//!
//! The adapter never performs I/O itself; it walks a tree of endpoint nodes
//! and invokes the verb callables they expose. This crate defines that tree:
//! - `EndpointNode` - A node reached by indexing names and applying params
//! - `VerbHandler` / `StreamHandler` - Request and streaming callables
//! - `Request` / `Response` / `Payload` - The `{data, error}` call contract
//! - `StreamConnection` - Open/message/error/close event stream
//! - `Endpoint` - In-memory declared endpoint schema
//!
//! # Example
//!
//! ```rust,ignore
//! use treaty_client::{handler_fn, Endpoint, Response};
//! use serde_json::json;
//!
//! let client = Endpoint::new()
//!     .route(
//!         "users",
//!         Endpoint::new()
//!             .get(handler_fn(|_req| async { Response::ok(json!([])) }))
//!             .param("id", Endpoint::new().put(handler_fn(|req| async move {
//!                 Response::ok(req.input.unwrap_or_default())
//!             }))),
//!     )
//!     .into_node();
//! ```

mod node;
mod request;
mod response;
mod stream;
mod tree;

pub use node::*;
pub use request::*;
pub use response::*;
pub use stream::*;
pub use tree::*;
