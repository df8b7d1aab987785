//! Endpoint nodes and the callables they expose.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use treaty_core::{PathParam, Verb};

use crate::request::Request;
use crate::response::Response;
use crate::stream::StreamConnection;

/// Shared handle to a node in the endpoint tree.
pub type NodeRef = Arc<dyn EndpointNode>;

/// A request/response verb callable.
#[async_trait]
pub trait VerbHandler: Send + Sync {
    /// Invoke the verb. Failures are reported in the response, not raised.
    async fn call(&self, request: Request) -> Response;
}

/// A verb callable that opens a streaming connection.
pub trait StreamHandler: Send + Sync {
    /// Open a connection for the given request.
    fn open(&self, request: Request) -> StreamConnection;
}

/// A node of the client's endpoint tree.
///
/// Nodes are reached from the root by indexing literal names and applying
/// path parameters, and expose zero or more verb callables.
pub trait EndpointNode: Send + Sync {
    /// The child endpoint named `name`.
    fn index(&self, name: &str) -> Option<NodeRef>;

    /// The node reached by applying a path parameter.
    fn apply(&self, param: &PathParam) -> Option<NodeRef>;

    /// The request callable registered for `verb`.
    fn handler(&self, verb: Verb) -> Option<Arc<dyn VerbHandler>>;

    /// The streaming callable registered for `verb`.
    fn stream_handler(&self, _verb: Verb) -> Option<Arc<dyn StreamHandler>> {
        None
    }
}

struct HandlerFn<F>(F);

#[async_trait]
impl<F, Fut> VerbHandler for HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Response> + Send,
{
    async fn call(&self, request: Request) -> Response {
        (self.0)(request).await
    }
}

/// Wrap an async closure as a [`VerbHandler`].
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn VerbHandler>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(HandlerFn(f))
}

struct StreamFn<F>(F);

impl<F> StreamHandler for StreamFn<F>
where
    F: Fn(Request) -> StreamConnection + Send + Sync,
{
    fn open(&self, request: Request) -> StreamConnection {
        (self.0)(request)
    }
}

/// Wrap a closure as a [`StreamHandler`].
pub fn stream_fn<F>(f: F) -> Arc<dyn StreamHandler>
where
    F: Fn(Request) -> StreamConnection + Send + Sync + 'static,
{
    Arc::new(StreamFn(f))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{connection_channel, ConnectionEvent};
    use futures::StreamExt;
    use serde_json::json;

    #[tokio::test]
    async fn test_handler_fn_forwards_request() {
        let handler = handler_fn(|req: Request| async move { Response::ok(req.input.unwrap_or_default()) });
        let resp = handler.call(Request::new(Some(json!({"a": 1})))).await;
        assert_eq!(resp.into_result().unwrap().into_value(), Some(json!({"a": 1})));
    }

    #[tokio::test]
    async fn test_stream_fn_opens_connection() {
        let handler = stream_fn(|req: Request| {
            let (sender, conn) = connection_channel();
            sender.open();
            sender.message(req.input.unwrap_or_default());
            sender.close();
            conn
        });

        let (events, _control) = handler.open(Request::new(Some(json!("hi")))).into_parts();
        let events: Vec<_> = events.collect().await;
        assert_eq!(events[1], ConnectionEvent::Message(json!("hi")));
        assert_eq!(events.len(), 3);
    }
}
