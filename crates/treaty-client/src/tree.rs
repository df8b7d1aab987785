//! In-memory endpoint schema.
//!
//! `Endpoint` declares, per node, its named children, an optional parametric
//! child and the verbs it answers. `into_node` turns the declaration into a
//! walkable [`EndpointNode`] that carries applied path parameters along and
//! hands them to handlers through [`Request::params`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use treaty_core::{PathParam, Verb};

use crate::node::{EndpointNode, NodeRef, StreamHandler, VerbHandler};
use crate::request::Request;
use crate::response::Response;
use crate::stream::StreamConnection;

/// Declarative endpoint node builder.
#[derive(Default)]
pub struct Endpoint {
    children: BTreeMap<String, Arc<Endpoint>>,
    param: Option<(String, Arc<Endpoint>)>,
    handlers: HashMap<Verb, Arc<dyn VerbHandler>>,
    streams: HashMap<Verb, Arc<dyn StreamHandler>>,
}

impl Endpoint {
    /// Create an endpoint with no children and no verbs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named child endpoint.
    pub fn route(mut self, name: impl Into<String>, child: Endpoint) -> Self {
        self.children.insert(name.into(), Arc::new(child));
        self
    }

    /// Add the child reached by applying a path parameter named `name`.
    pub fn param(mut self, name: impl Into<String>, child: Endpoint) -> Self {
        self.param = Some((name.into(), Arc::new(child)));
        self
    }

    /// Register a request callable for `verb`.
    pub fn on(mut self, verb: Verb, handler: Arc<dyn VerbHandler>) -> Self {
        self.handlers.insert(verb, handler);
        self
    }

    pub fn get(self, handler: Arc<dyn VerbHandler>) -> Self {
        self.on(Verb::Get, handler)
    }

    pub fn head(self, handler: Arc<dyn VerbHandler>) -> Self {
        self.on(Verb::Head, handler)
    }

    pub fn post(self, handler: Arc<dyn VerbHandler>) -> Self {
        self.on(Verb::Post, handler)
    }

    pub fn put(self, handler: Arc<dyn VerbHandler>) -> Self {
        self.on(Verb::Put, handler)
    }

    pub fn patch(self, handler: Arc<dyn VerbHandler>) -> Self {
        self.on(Verb::Patch, handler)
    }

    pub fn delete(self, handler: Arc<dyn VerbHandler>) -> Self {
        self.on(Verb::Delete, handler)
    }

    /// Register the streaming `subscribe` callable.
    pub fn subscribe(mut self, handler: Arc<dyn StreamHandler>) -> Self {
        self.streams.insert(Verb::Subscribe, handler);
        self
    }

    /// Verbs this endpoint answers, in declaration order of [`Verb::ALL`].
    pub fn verbs(&self) -> Vec<Verb> {
        Verb::ALL
            .into_iter()
            .filter(|v| self.handlers.contains_key(v) || self.streams.contains_key(v))
            .collect()
    }

    /// Turn the declaration into the root node of a walkable tree.
    pub fn into_node(self) -> NodeRef {
        Arc::new(EndpointCursor {
            endpoint: Arc::new(self),
            params: Vec::new(),
        })
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("children", &self.children.keys().collect::<Vec<_>>())
            .field("param", &self.param.as_ref().map(|(name, _)| name))
            .field("verbs", &self.verbs())
            .finish()
    }
}

/// A position in an [`Endpoint`] tree plus the params applied to reach it.
struct EndpointCursor {
    endpoint: Arc<Endpoint>,
    params: Vec<PathParam>,
}

impl EndpointCursor {
    fn descend(&self, endpoint: Arc<Endpoint>, params: Vec<PathParam>) -> NodeRef {
        Arc::new(Self { endpoint, params })
    }
}

impl EndpointNode for EndpointCursor {
    fn index(&self, name: &str) -> Option<NodeRef> {
        let child = self.endpoint.children.get(name)?;
        Some(self.descend(child.clone(), self.params.clone()))
    }

    fn apply(&self, param: &PathParam) -> Option<NodeRef> {
        let (name, child) = self.endpoint.param.as_ref()?;
        let mut params = self.params.clone();
        params.push(PathParam::new(name.clone(), param.value().clone()));
        Some(self.descend(child.clone(), params))
    }

    fn handler(&self, verb: Verb) -> Option<Arc<dyn VerbHandler>> {
        let inner = self.endpoint.handlers.get(&verb)?.clone();
        if self.params.is_empty() {
            return Some(inner);
        }
        let wrapped: Arc<dyn VerbHandler> = Arc::new(WithParams {
            inner,
            params: self.params.clone(),
        });
        Some(wrapped)
    }

    fn stream_handler(&self, verb: Verb) -> Option<Arc<dyn StreamHandler>> {
        let inner = self.endpoint.streams.get(&verb)?.clone();
        if self.params.is_empty() {
            return Some(inner);
        }
        let wrapped: Arc<dyn StreamHandler> = Arc::new(WithParams {
            inner,
            params: self.params.clone(),
        });
        Some(wrapped)
    }
}

/// Injects the applied path parameters into every request.
struct WithParams<H: ?Sized> {
    inner: Arc<H>,
    params: Vec<PathParam>,
}

#[async_trait]
impl VerbHandler for WithParams<dyn VerbHandler> {
    async fn call(&self, request: Request) -> Response {
        let request = request.with_params(self.params.clone());
        self.inner.call(request).await
    }
}

impl StreamHandler for WithParams<dyn StreamHandler> {
    fn open(&self, request: Request) -> StreamConnection {
        self.inner.open(request.with_params(self.params.clone()))
    }
}
