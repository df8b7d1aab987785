//! Shared vocabulary for the treaty query adapter.
//!
//! This crate provides the fundamental types:
//! - `RoutePath` / `PathParam` - Accumulated endpoint-tree paths
//! - `Verb` / `OperationFamily` - What gets invoked and how
//! - `Input` - Call input with the skip sentinel
//! - `AbortSignal` - Cancellation propagated into endpoint calls
//! - `TreatyError` / `EndpointError` - Error taxonomy
//! - `TreatyConfig` - Binding configuration

mod config;
mod error;
mod input;
mod path;
mod signal;
mod verb;

pub use config::*;
pub use error::*;
pub use input::*;
pub use path::*;
pub use signal::*;
pub use verb::*;
