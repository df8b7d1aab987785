//! Walking the endpoint tree and invoking a single verb.

use serde_json::Value;
use tracing::trace;
use treaty_client::{NodeRef, Payload, Request, StreamConnection};
use treaty_core::{AbortSignal, PathParam, Result, RoutePath, Segment, TreatyError, Verb};

fn no_callable(route: &RoutePath, verb: Verb) -> TreatyError {
    TreatyError::NoCallable {
        path: route.join(verb.as_str()).to_string(),
    }
}

/// Walk from `root` to the node at `route`.
///
/// Parametric segments consume `params` in order. Returns `Ok(None)` when
/// the tree has no node there, and `MissingParam` when the params run out.
pub fn resolve_node(root: &NodeRef, route: &RoutePath, params: &[PathParam]) -> Result<Option<NodeRef>> {
    let mut current = root.clone();
    let mut remaining = params.iter();

    for segment in route.segments() {
        let next = match segment {
            Segment::Literal(name) => current.index(name),
            Segment::Param(_) => {
                let param = remaining.next().ok_or_else(|| TreatyError::MissingParam {
                    segment: segment.to_string(),
                })?;
                current.apply(param)
            }
        };
        match next {
            Some(node) => current = node,
            None => return Ok(None),
        }
    }

    Ok(Some(current))
}

/// Invoke `verb` at `route` and normalize the `{data, error}` result.
///
/// When a signal is given it is merged into the request options and the
/// call is raced against it.
pub async fn call_endpoint(
    root: &NodeRef,
    route: &RoutePath,
    verb: Verb,
    params: &[PathParam],
    input: Option<Value>,
    signal: Option<&AbortSignal>,
) -> Result<Payload> {
    if signal.is_some_and(AbortSignal::is_aborted) {
        return Err(TreatyError::Cancelled);
    }

    let handler = resolve_node(root, route, params)?
        .and_then(|node| node.handler(verb))
        .ok_or_else(|| no_callable(route, verb))?;

    trace!(route = %route, verb = %verb, "calling endpoint");

    let mut request = Request::new(input);
    let response = match signal {
        Some(signal) => {
            request = request.with_signal(signal.clone());
            tokio::select! {
                biased;
                _ = signal.aborted() => return Err(TreatyError::Cancelled),
                response = handler.call(request) => response,
            }
        }
        None => handler.call(request).await,
    };

    Ok(response.into_result()?)
}

/// Open the streaming `verb` at `route`.
pub fn open_stream(
    root: &NodeRef,
    route: &RoutePath,
    verb: Verb,
    params: &[PathParam],
    input: Option<Value>,
) -> Result<StreamConnection> {
    let handler = resolve_node(root, route, params)?
        .and_then(|node| node.stream_handler(verb))
        .ok_or_else(|| no_callable(route, verb))?;

    trace!(route = %route, verb = %verb, "opening stream");
    Ok(handler.open(Request::new(input)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use serde_json::json;
    use treaty_client::{connection_channel, handler_fn, stream_fn, Endpoint, Response};

    fn tree() -> NodeRef {
        Endpoint::new()
            .route(
                "todos",
                Endpoint::new()
                    .get(handler_fn(|_req: Request| async { Response::ok(json!(["a"])) }))
                    .param(
                        "id",
                        Endpoint::new()
                            .put(handler_fn(|req: Request| async move {
                                Response::ok(json!({"id": req.param("id").cloned(), "body": req.input}))
                            }))
                            .delete(handler_fn(|_req: Request| async {
                                Response::status(422, json!({"message": "locked"}))
                            })),
                    )
                    .route(
                        "slow",
                        Endpoint::new().get(handler_fn(|_req: Request| async {
                            tokio::time::sleep(Duration::from_secs(30)).await;
                            Response::ok(json!(null))
                        })),
                    )
                    .route(
                        "live",
                        Endpoint::new().subscribe(stream_fn(|_req: Request| connection_channel().1)),
                    ),
            )
            .into_node()
    }

    // === Walk Tests ===

    #[test]
    fn test_missing_param_is_reported() {
        let route = RoutePath::from_segments(["todos", ":id"]);
        let err = resolve_node(&tree(), &route, &[]).err().unwrap();
        assert_eq!(err, TreatyError::MissingParam { segment: ":id".into() });
    }

    #[test]
    fn test_unknown_node_is_none() {
        let route = RoutePath::from_segments(["nope"]);
        assert!(resolve_node(&tree(), &route, &[]).unwrap().is_none());
    }

    // === Call Tests ===

    #[tokio::test]
    async fn test_call_returns_data() {
        let route = RoutePath::from_segments(["todos", ":id"]);
        let payload = call_endpoint(
            &tree(),
            &route,
            Verb::Put,
            &[PathParam::new("id", 5)],
            Some(json!({"status": "done"})),
            None,
        )
        .await
        .unwrap();
        assert_eq!(
            payload.into_value(),
            Some(json!({"id": 5, "body": {"status": "done"}}))
        );
    }

    #[tokio::test]
    async fn test_error_field_is_raised() {
        let route = RoutePath::from_segments(["todos", ":id"]);
        let err = call_endpoint(&tree(), &route, Verb::Delete, &[PathParam::new("id", 1)], None, None)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(422));
    }

    #[tokio::test]
    async fn test_missing_verb_is_no_callable() {
        let route = RoutePath::from_segments(["todos"]);
        let err = call_endpoint(&tree(), &route, Verb::Post, &[], None, None)
            .await
            .unwrap_err();
        assert_eq!(err, TreatyError::NoCallable { path: "todos.post".into() });
    }

    // === Cancellation Tests ===

    #[tokio::test]
    async fn test_already_aborted_signal_skips_call() {
        let signal = AbortSignal::new();
        signal.abort();
        let route = RoutePath::from_segments(["todos"]);
        let err = call_endpoint(&tree(), &route, Verb::Get, &[], None, Some(&signal))
            .await
            .unwrap_err();
        assert_eq!(err, TreatyError::Cancelled);
    }

    #[tokio::test]
    async fn test_abort_interrupts_in_flight_call() {
        let signal = AbortSignal::new();
        let aborter = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            aborter.abort();
        });

        let route = RoutePath::from_segments(["todos", "slow"]);
        let err = call_endpoint(&tree(), &route, Verb::Get, &[], None, Some(&signal))
            .await
            .unwrap_err();
        assert_eq!(err, TreatyError::Cancelled);
    }

    // === Stream Tests ===

    #[test]
    fn test_open_stream() {
        let root = tree();
        assert!(open_stream(&root, &RoutePath::from_segments(["todos", "live"]), Verb::Subscribe, &[], None).is_ok());
        let err = open_stream(&root, &RoutePath::from_segments(["todos"]), Verb::Subscribe, &[], None).unwrap_err();
        assert!(matches!(err, TreatyError::NoCallable { .. }));
    }
}
