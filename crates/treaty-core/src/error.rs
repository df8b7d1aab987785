//! Error types for endpoint calls and descriptor building.

use serde_json::Value;
use thiserror::Error;

/// Error carried in the `error` field of an endpoint response.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EndpointError {
    /// The endpoint answered with an error status.
    #[error("HTTP {status}: {value}")]
    Status { status: u16, value: Value },

    /// The request never produced a response.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl EndpointError {
    /// Create a status error.
    pub fn status(status: u16, value: impl Into<Value>) -> Self {
        Self::Status {
            status,
            value: value.into(),
        }
    }

    /// The HTTP-style status code, if there is one.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(_) => None,
        }
    }

    /// The error body, if there is one.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Status { value, .. } => Some(value),
            Self::Transport(_) => None,
        }
    }
}

/// Errors raised while building or running treaty descriptors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreatyError {
    /// A parametric segment was reached without a parameter to apply.
    #[error("missing param for segment \"{segment}\"")]
    MissingParam { segment: String },

    /// The client exposes no callable at this path.
    #[error("could not resolve client method for \"{path}\"")]
    NoCallable { path: String },

    /// Every verb candidate failed with a fallback-eligible error.
    #[error("no method could be resolved for {route} (tried {tried}): {last}")]
    Unresolved {
        route: String,
        tried: String,
        #[source]
        last: Box<TreatyError>,
    },

    /// The endpoint returned an error.
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    /// A verb name was called directly.
    #[error("attempted to call \".{name}(...)\". Use \"{suggestion}\" (or \".{name}.…\") instead")]
    ReservedName { name: String, suggestion: String },

    /// A non-utility path was called with arguments that are not a path parameter.
    #[error(
        "attempted to call a non-utility path ({path}). Did you mean to call .query_options(), \
         .mutation_options(), or to provide a path param via ({{ id: 123 }})?"
    )]
    NonUtilityCall { path: String },

    /// A verb was pinned both by path segment and by explicit argument.
    #[error(
        "cannot combine \".{segment}…\" with `mutation_options(\"{explicit}\", ...)`. \
         Drop the method segment and use `mutation_options(\"{explicit}\", ...)` instead"
    )]
    ConflictingVerb { segment: String, explicit: String },

    /// An explicit verb name is not a verb of the requested family.
    #[error("unknown verb \"{0}\"")]
    UnknownVerb(String),

    /// Options passed to a utility could not be decoded.
    #[error("invalid options for {utility}: {message}")]
    InvalidOptions { utility: String, message: String },

    /// A descriptor function was run without any path.
    #[error("empty procedure path")]
    EmptyPath,

    /// The caller's abort signal fired.
    #[error("request cancelled")]
    Cancelled,

    /// A descriptor disabled by the skip sentinel was executed.
    #[error("query at {path} is disabled by the skip sentinel")]
    Skipped { path: String },

    /// An incremental payload failed part way through.
    #[error("stream error: {0}")]
    Stream(EndpointError),
}

impl TreatyError {
    /// The endpoint error behind this failure, looking through `Unresolved`.
    pub fn endpoint_error(&self) -> Option<&EndpointError> {
        match self {
            Self::Endpoint(err) | Self::Stream(err) => Some(err),
            Self::Unresolved { last, .. } => last.endpoint_error(),
            _ => None,
        }
    }

    /// The HTTP-style status of the underlying endpoint error.
    pub fn status_code(&self) -> Option<u16> {
        self.endpoint_error().and_then(EndpointError::status_code)
    }
}

/// Result alias used across the treaty crates.
pub type Result<T, E = TreatyError> = std::result::Result<T, E>;
