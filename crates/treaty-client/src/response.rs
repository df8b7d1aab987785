//! Endpoint call results.

use std::fmt;

use futures::stream::{self, BoxStream, StreamExt};
use serde_json::Value;
use treaty_core::EndpointError;

/// Incrementally produced payload items.
pub type ValueStream = BoxStream<'static, Result<Value, EndpointError>>;

/// The `data` of a successful call.
pub enum Payload {
    /// A single value.
    Value(Value),
    /// An incremental sequence of values.
    Stream(ValueStream),
}

impl Payload {
    /// Build a streamed payload from already known items.
    pub fn from_items(items: Vec<Value>) -> Self {
        Self::Stream(stream::iter(items.into_iter().map(Ok)).boxed())
    }

    /// Whether this payload is incremental.
    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }

    /// The single value, if this is not a stream.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Stream(_) => None,
        }
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Result of a verb invocation, mirroring the client's `{data, error}` shape.
#[derive(Debug)]
pub struct Response {
    /// The HTTP-style status code.
    pub status: u16,
    /// The response payload.
    pub data: Option<Payload>,
    /// The response error, if the call failed.
    pub error: Option<EndpointError>,
}

impl Response {
    /// A successful response carrying a value.
    pub fn ok(value: Value) -> Self {
        Self {
            status: 200,
            data: Some(Payload::Value(value)),
            error: None,
        }
    }

    /// A successful response carrying an incremental sequence.
    pub fn stream(stream: ValueStream) -> Self {
        Self {
            status: 200,
            data: Some(Payload::Stream(stream)),
            error: None,
        }
    }

    /// A failed response with a status and error body.
    pub fn status(status: u16, value: impl Into<Value>) -> Self {
        Self::error(EndpointError::status(status, value))
    }

    /// A failed response.
    pub fn error(error: EndpointError) -> Self {
        Self {
            status: error.status_code().unwrap_or(0),
            data: None,
            error: Some(error),
        }
    }

    /// Check if the response was successful (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status) && self.error.is_none()
    }

    /// Normalize to a result: a present `error` wins, otherwise `data`.
    ///
    /// A response with neither yields `null`.
    pub fn into_result(self) -> Result<Payload, EndpointError> {
        match (self.error, self.data) {
            (Some(error), _) => Err(error),
            (None, Some(data)) => Ok(data),
            (None, None) => Ok(Payload::Value(Value::Null)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // === Status Check Tests ===

    #[test]
    fn test_response_ok() {
        let resp = Response::ok(json!({"id": 1}));
        assert!(resp.is_success());
        assert_eq!(resp.status, 200);
    }

    #[test]
    fn test_response_status_error() {
        let resp = Response::status(405, json!("Method Not Allowed"));
        assert!(!resp.is_success());
        assert_eq!(resp.status, 405);
    }

    #[test]
    fn test_transport_error_has_no_status() {
        let resp = Response::error(EndpointError::Transport("refused".into()));
        assert_eq!(resp.status, 0);
        assert!(!resp.is_success());
    }

    // === into_result Tests ===

    #[test]
    fn test_into_result_prefers_error() {
        let resp = Response {
            status: 200,
            data: Some(Payload::Value(json!(1))),
            error: Some(EndpointError::status(422, json!("invalid"))),
        };
        let err = resp.into_result().unwrap_err();
        assert_eq!(err.status_code(), Some(422));
    }

    #[test]
    fn test_into_result_returns_data() {
        let payload = Response::ok(json!([1, 2])).into_result().unwrap();
        assert_eq!(payload.into_value(), Some(json!([1, 2])));
    }

    #[test]
    fn test_into_result_without_data_is_null() {
        let resp = Response {
            status: 204,
            data: None,
            error: None,
        };
        assert_eq!(resp.into_result().unwrap().into_value(), Some(Value::Null));
    }

    #[tokio::test]
    async fn test_payload_from_items_streams_in_order() {
        let payload = Payload::from_items(vec![json!(1), json!(2)]);
        assert!(payload.is_stream());
        let Payload::Stream(stream) = payload else {
            panic!("expected stream");
        };
        let items: Vec<_> = stream.map(|item| item.unwrap()).collect().await;
        assert_eq!(items, vec![json!(1), json!(2)]);
    }
}
