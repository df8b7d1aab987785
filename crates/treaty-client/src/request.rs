//! Requests handed to verb callables.

use serde_json::Value;
use treaty_core::{AbortSignal, PathParam};

/// Per-invocation request options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Abort signal merged in when the caller propagates cancellation.
    pub signal: Option<AbortSignal>,
}

/// A single verb invocation.
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// The call input (body or query object), if any.
    pub input: Option<Value>,
    /// Path parameters applied on the way to the node, in order.
    pub params: Vec<PathParam>,
    /// Request options.
    pub options: RequestOptions,
}

impl Request {
    /// Create a request with the given input.
    pub fn new(input: Option<Value>) -> Self {
        Self {
            input,
            ..Self::default()
        }
    }

    /// Merge an abort signal into the request options.
    pub fn with_signal(mut self, signal: AbortSignal) -> Self {
        self.options.signal = Some(signal);
        self
    }

    /// Set the applied path parameters.
    pub fn with_params(mut self, params: Vec<PathParam>) -> Self {
        self.params = params;
        self
    }

    /// Look up an applied path parameter by name.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params
            .iter()
            .find(|p| p.name() == name)
            .map(PathParam::value)
    }

    /// Whether an abort signal was merged in and has fired.
    pub fn is_aborted(&self) -> bool {
        self.options
            .signal
            .as_ref()
            .is_some_and(AbortSignal::is_aborted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builder() {
        let signal = AbortSignal::new();
        let req = Request::new(Some(json!({"a": 1})))
            .with_params(vec![PathParam::new("id", 3)])
            .with_signal(signal.clone());

        assert_eq!(req.input, Some(json!({"a": 1})));
        assert_eq!(req.param("id"), Some(&json!(3)));
        assert_eq!(req.param("slug"), None);
        assert!(!req.is_aborted());
        signal.abort();
        assert!(req.is_aborted());
    }
}
