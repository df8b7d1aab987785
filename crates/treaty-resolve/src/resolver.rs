//! Verb resolution with per-route caching and failure fallback.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};
use treaty_client::{NodeRef, Payload, StreamConnection};
use treaty_core::{AbortSignal, OperationFamily, PathParam, Result, RoutePath, TreatyError, Verb};

use crate::cache::VerbCache;
use crate::caller::{call_endpoint, open_stream};
use crate::fallback::FallbackPolicy;

/// How the verb for a call is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbSelection {
    /// The caller pinned this verb; no fallback.
    Explicit(Verb),
    /// Try the family's candidates in order.
    Automatic,
}

impl VerbSelection {
    pub fn from_pinned(verb: Option<Verb>) -> Self {
        verb.map_or(Self::Automatic, Self::Explicit)
    }

    pub fn is_explicit(&self) -> bool {
        matches!(self, Self::Explicit(_))
    }
}

/// Resolves and invokes verbs against one endpoint tree.
///
/// Clones share the tree and the verb cache.
#[derive(Clone)]
pub struct VerbResolver {
    root: NodeRef,
    cache: Arc<VerbCache>,
    use_cache: bool,
}

impl VerbResolver {
    /// Create a resolver with a fresh verb cache.
    pub fn new(root: NodeRef) -> Self {
        Self {
            root,
            cache: Arc::new(VerbCache::new()),
            use_cache: true,
        }
    }

    /// Share an existing verb cache.
    pub fn with_cache(mut self, cache: Arc<VerbCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Enable or disable reading and writing the verb cache.
    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.use_cache = enabled;
        self
    }

    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    pub fn cache(&self) -> &Arc<VerbCache> {
        &self.cache
    }

    /// Candidate verbs in the order they will be tried.
    ///
    /// The cached verb, if any, comes first; the family order follows
    /// without repeating it.
    pub fn candidates(&self, family: OperationFamily, route: &RoutePath) -> Vec<Verb> {
        let order = family.candidates(route.has_params());
        let cached = self
            .use_cache
            .then(|| self.cache.get(family, route))
            .flatten();

        match cached {
            Some(first) => std::iter::once(first)
                .chain(order.iter().copied().filter(|v| *v != first))
                .collect(),
            None => order.to_vec(),
        }
    }

    /// Resolve a verb for `route` and call it.
    ///
    /// Candidates are tried strictly one after another. Returns the verb that
    /// answered along with its payload.
    pub async fn call(
        &self,
        family: OperationFamily,
        route: &RoutePath,
        selection: VerbSelection,
        params: &[PathParam],
        input: Option<Value>,
        signal: Option<&AbortSignal>,
    ) -> Result<(Verb, Payload)> {
        if let VerbSelection::Explicit(verb) = selection {
            let payload = call_endpoint(&self.root, route, verb, params, input, signal).await?;
            return Ok((verb, payload));
        }

        let policy = FallbackPolicy::for_family(family);
        let candidates = self.candidates(family, route);
        let mut last_error = None;

        for verb in candidates.iter().copied() {
            match call_endpoint(&self.root, route, verb, params, input.clone(), signal).await {
                Ok(payload) => {
                    if self.use_cache {
                        self.cache.insert(family, route, verb);
                    }
                    debug!(route = %route, verb = %verb, family = %family, "verb resolved");
                    return Ok((verb, payload));
                }
                Err(err) if policy.allows(&err) => {
                    debug!(route = %route, verb = %verb, error = %err, "verb rejected, trying next candidate");
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        let tried: Vec<&str> = candidates.iter().map(Verb::as_str).collect();
        let last = last_error.unwrap_or_else(|| TreatyError::NoCallable {
            path: route.location(),
        });
        warn!(route = %route, tried = %tried.join(", "), "no verb could be resolved");

        Err(TreatyError::Unresolved {
            route: route.location(),
            tried: tried.join(", "),
            last: Box::new(last),
        })
    }

    /// Resolve the streaming verb for `route` and open it.
    pub fn open(
        &self,
        route: &RoutePath,
        selection: VerbSelection,
        params: &[PathParam],
        input: Option<Value>,
    ) -> Result<(Verb, StreamConnection)> {
        let verb = match selection {
            VerbSelection::Explicit(verb) => verb,
            VerbSelection::Automatic => self
                .candidates(OperationFamily::Subscription, route)
                .first()
                .copied()
                .unwrap_or(Verb::Subscribe),
        };
        let connection = open_stream(&self.root, route, verb, params, input)?;
        if self.use_cache && !selection.is_explicit() {
            self.cache.insert(OperationFamily::Subscription, route, verb);
        }
        Ok((verb, connection))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;
    use treaty_client::{handler_fn, Endpoint, Request, Response, VerbHandler};

    type CallLog = Arc<Mutex<Vec<Verb>>>;

    fn recording(log: &CallLog, verb: Verb, status: Option<u16>) -> Arc<dyn VerbHandler> {
        let log = log.clone();
        handler_fn(move |req: Request| {
            let log = log.clone();
            async move {
                log.lock().push(verb);
                match status {
                    Some(code) => Response::status(code, json!("rejected")),
                    None => Response::ok(json!({"verb": verb.as_str(), "input": req.input})),
                }
            }
        })
    }

    fn item_route() -> RoutePath {
        RoutePath::from_segments(["todos", ":id"])
    }

    fn params() -> Vec<PathParam> {
        vec![PathParam::new("id", 1)]
    }

    /// `todos.:id` where patch, delete and put answer 405 and post succeeds.
    fn post_only(log: &CallLog) -> NodeRef {
        Endpoint::new()
            .route(
                "todos",
                Endpoint::new().param(
                    "id",
                    Endpoint::new()
                        .patch(recording(log, Verb::Patch, Some(405)))
                        .delete(recording(log, Verb::Delete, Some(405)))
                        .put(recording(log, Verb::Put, Some(405)))
                        .post(recording(log, Verb::Post, None)),
                ),
            )
            .into_node()
    }

    // === Candidate Order Tests ===

    #[test]
    fn test_candidates_put_cached_first() {
        let resolver = VerbResolver::new(Endpoint::new().into_node());
        let route = item_route();
        resolver.cache().insert(OperationFamily::Mutation, &route, Verb::Put);
        assert_eq!(
            resolver.candidates(OperationFamily::Mutation, &route),
            vec![Verb::Put, Verb::Patch, Verb::Delete, Verb::Post, Verb::Options, Verb::Connect]
        );
    }

    #[test]
    fn test_candidates_ignore_cache_when_disabled() {
        let resolver = VerbResolver::new(Endpoint::new().into_node()).with_cache_enabled(false);
        let route = RoutePath::from_segments(["items"]);
        resolver.cache().insert(OperationFamily::Query, &route, Verb::Head);
        assert_eq!(resolver.candidates(OperationFamily::Query, &route), vec![Verb::Get, Verb::Head]);
    }

    // === Fallback Tests ===

    #[tokio::test]
    async fn test_mutation_falls_back_in_order_and_caches() {
        let log = CallLog::default();
        let resolver = VerbResolver::new(post_only(&log));

        let (verb, payload) = resolver
            .call(
                OperationFamily::Mutation,
                &item_route(),
                VerbSelection::Automatic,
                &params(),
                Some(json!({"title": "x"})),
                None,
            )
            .await
            .unwrap();

        assert_eq!(verb, Verb::Post);
        assert_eq!(*log.lock(), vec![Verb::Patch, Verb::Delete, Verb::Put, Verb::Post]);
        assert_eq!(payload.into_value().unwrap()["verb"], json!("post"));
        assert_eq!(
            resolver.cache().get(OperationFamily::Mutation, &item_route()),
            Some(Verb::Post)
        );
    }

    #[tokio::test]
    async fn test_cached_verb_makes_one_call() {
        let log = CallLog::default();
        let resolver = VerbResolver::new(post_only(&log));
        let route = item_route();

        resolver
            .call(OperationFamily::Mutation, &route, VerbSelection::Automatic, &params(), None, None)
            .await
            .unwrap();
        log.lock().clear();

        resolver
            .call(OperationFamily::Mutation, &route, VerbSelection::Automatic, &params(), None, None)
            .await
            .unwrap();
        assert_eq!(*log.lock(), vec![Verb::Post]);
    }

    #[tokio::test]
    async fn test_missing_callables_are_skipped() {
        let log = CallLog::default();
        let root = Endpoint::new()
            .route("items", Endpoint::new().head(recording(&log, Verb::Head, None)))
            .into_node();
        let resolver = VerbResolver::new(root);

        let (verb, _) = resolver
            .call(
                OperationFamily::Query,
                &RoutePath::from_segments(["items"]),
                VerbSelection::Automatic,
                &[],
                None,
                None,
            )
            .await
            .unwrap();
        assert_eq!(verb, Verb::Head);
        assert_eq!(*log.lock(), vec![Verb::Head]);
    }

    #[tokio::test]
    async fn test_non_eligible_error_aborts() {
        let log = CallLog::default();
        let root = Endpoint::new()
            .route(
                "todos",
                Endpoint::new().param(
                    "id",
                    Endpoint::new()
                        .patch(recording(&log, Verb::Patch, Some(500)))
                        .post(recording(&log, Verb::Post, None)),
                ),
            )
            .into_node();
        let resolver = VerbResolver::new(root);

        let err = resolver
            .call(OperationFamily::Mutation, &item_route(), VerbSelection::Automatic, &params(), None, None)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(500));
        assert_eq!(*log.lock(), vec![Verb::Patch]);
        assert!(resolver.cache().is_empty());
    }

    #[tokio::test]
    async fn test_query_does_not_fall_back_on_404() {
        let log = CallLog::default();
        let root = Endpoint::new()
            .route(
                "items",
                Endpoint::new()
                    .get(recording(&log, Verb::Get, Some(404)))
                    .head(recording(&log, Verb::Head, None)),
            )
            .into_node();
        let resolver = VerbResolver::new(root);

        let err = resolver
            .call(
                OperationFamily::Query,
                &RoutePath::from_segments(["items"]),
                VerbSelection::Automatic,
                &[],
                None,
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(*log.lock(), vec![Verb::Get]);
    }

    #[tokio::test]
    async fn test_exhausted_candidates_are_wrapped() {
        let log = CallLog::default();
        let root = Endpoint::new()
            .route("items", Endpoint::new().get(recording(&log, Verb::Get, Some(405))))
            .into_node();
        let resolver = VerbResolver::new(root);

        let err = resolver
            .call(
                OperationFamily::Query,
                &RoutePath::from_segments(["items"]),
                VerbSelection::Automatic,
                &[],
                None,
                None,
            )
            .await
            .unwrap_err();

        match err {
            TreatyError::Unresolved { route, tried, last } => {
                assert_eq!(route, "items");
                assert_eq!(tried, "get, head");
                assert_eq!(*last, TreatyError::NoCallable { path: "items.head".into() });
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    // === Explicit Mode Tests ===

    #[tokio::test]
    async fn test_explicit_verb_has_no_fallback() {
        let log = CallLog::default();
        let resolver = VerbResolver::new(post_only(&log));

        let err = resolver
            .call(
                OperationFamily::Mutation,
                &item_route(),
                VerbSelection::Explicit(Verb::Put),
                &params(),
                None,
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(405));
        assert_eq!(*log.lock(), vec![Verb::Put]);
        assert!(resolver.cache().is_empty());
    }

    // === Cancellation Tests ===

    #[tokio::test]
    async fn test_cancellation_is_not_a_fallback() {
        let log = CallLog::default();
        let resolver = VerbResolver::new(post_only(&log));
        let signal = AbortSignal::new();
        signal.abort();

        let err = resolver
            .call(
                OperationFamily::Mutation,
                &item_route(),
                VerbSelection::Automatic,
                &params(),
                None,
                Some(&signal),
            )
            .await
            .unwrap_err();
        assert_eq!(err, TreatyError::Cancelled);
        assert!(log.lock().is_empty());
    }
}
