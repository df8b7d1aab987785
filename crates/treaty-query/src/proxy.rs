//! The path proxy.
//!
//! A [`PathNode`] accumulates literal segments and path parameters. Its
//! utility methods turn the accumulated path into keys, filters and
//! descriptors. [`PathNode::call`] is the untyped entry point: it applies a
//! parameter, dispatches a trailing utility segment, or rejects the call.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::trace;
use treaty_client::NodeRef;
use treaty_core::{Input, OperationFamily, PathParam, Result, RoutePath, TreatyConfig, TreatyError, Verb};
use treaty_key::{KeyBuilder, MutationKey, QueryFilter, QueryKey, QueryType};
use treaty_resolve::{VerbCache, VerbResolver, VerbSelection};

use crate::descriptor::{
    InfiniteQueryDescriptor, MutationDescriptor, QueryDescriptor, SubscriptionDescriptor, SuccessOverride, Target,
};
use crate::options::{InfiniteQueryOptions, MutationOptions, QueryOptions, SubscriptionOptions};
use crate::store::QueryStore;

/// Segment name that re-enters the current node instead of descending.
pub const INDEX_ALIAS: &str = "index";

#[derive(Clone)]
struct Shared {
    resolver: VerbResolver,
    store: Arc<dyn QueryStore>,
    keys: KeyBuilder,
    config: TreatyConfig,
    success_override: Option<SuccessOverride>,
}

/// Binds an endpoint tree to a store.
///
/// Clones share the verb cache. Every [`PathNode`] handed out by
/// [`OptionsProxy::root`] carries this binding's configuration.
#[derive(Clone)]
pub struct OptionsProxy {
    shared: Arc<Shared>,
}

impl OptionsProxy {
    /// Bind with the default configuration.
    pub fn new(client: NodeRef, store: Arc<dyn QueryStore>) -> Self {
        Self::with_config(client, store, TreatyConfig::default())
    }

    pub fn with_config(client: NodeRef, store: Arc<dyn QueryStore>, config: TreatyConfig) -> Self {
        let resolver = VerbResolver::new(client).with_cache_enabled(config.verb_cache);
        let keys = KeyBuilder::new().with_optional_prefix(config.key_prefix.clone());
        Self {
            shared: Arc::new(Shared {
                resolver,
                store,
                keys,
                config,
                success_override: None,
            }),
        }
    }

    /// Route every mutation success through `hook`.
    pub fn with_mutation_success_override(mut self, hook: SuccessOverride) -> Self {
        Arc::make_mut(&mut self.shared).success_override = Some(hook);
        self
    }

    /// Share a verb cache with other bindings over the same tree.
    pub fn with_verb_cache(mut self, cache: Arc<VerbCache>) -> Self {
        let shared = Arc::make_mut(&mut self.shared);
        shared.resolver = shared.resolver.clone().with_cache(cache);
        self
    }

    /// The empty path.
    pub fn root(&self) -> PathNode {
        PathNode {
            shared: self.shared.clone(),
            path: RoutePath::new(),
            params: Vec::new(),
        }
    }

    /// Shorthand for `root().at(name)`.
    pub fn at(&self, name: &str) -> PathNode {
        self.root().at(name)
    }

    pub fn config(&self) -> &TreatyConfig {
        &self.shared.config
    }

    pub fn store(&self) -> &Arc<dyn QueryStore> {
        &self.shared.store
    }

    pub fn verb_cache(&self) -> &Arc<VerbCache> {
        self.shared.resolver.cache()
    }
}

impl fmt::Debug for OptionsProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionsProxy")
            .field("config", &self.shared.config)
            .field("cached_verbs", &self.verb_cache().len())
            .finish()
    }
}

/// Terminal utilities reachable through [`PathNode::call`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Utility {
    PathKey,
    PathFilter,
    QueryOptions,
    QueryKey,
    QueryFilter,
    InfiniteQueryOptions,
    InfiniteQueryKey,
    InfiniteQueryFilter,
    MutationOptions,
    MutationKey,
    SubscriptionOptions,
}

impl Utility {
    pub const ALL: [Utility; 11] = [
        Utility::PathKey,
        Utility::PathFilter,
        Utility::QueryOptions,
        Utility::QueryKey,
        Utility::QueryFilter,
        Utility::InfiniteQueryOptions,
        Utility::InfiniteQueryKey,
        Utility::InfiniteQueryFilter,
        Utility::MutationOptions,
        Utility::MutationKey,
        Utility::SubscriptionOptions,
    ];

    /// camelCase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PathKey => "pathKey",
            Self::PathFilter => "pathFilter",
            Self::QueryOptions => "queryOptions",
            Self::QueryKey => "queryKey",
            Self::QueryFilter => "queryFilter",
            Self::InfiniteQueryOptions => "infiniteQueryOptions",
            Self::InfiniteQueryKey => "infiniteQueryKey",
            Self::InfiniteQueryFilter => "infiniteQueryFilter",
            Self::MutationOptions => "mutationOptions",
            Self::MutationKey => "mutationKey",
            Self::SubscriptionOptions => "subscriptionOptions",
        }
    }

    /// snake_case name.
    pub fn snake_name(&self) -> &'static str {
        match self {
            Self::PathKey => "path_key",
            Self::PathFilter => "path_filter",
            Self::QueryOptions => "query_options",
            Self::QueryKey => "query_key",
            Self::QueryFilter => "query_filter",
            Self::InfiniteQueryOptions => "infinite_query_options",
            Self::InfiniteQueryKey => "infinite_query_key",
            Self::InfiniteQueryFilter => "infinite_query_filter",
            Self::MutationOptions => "mutation_options",
            Self::MutationKey => "mutation_key",
            Self::SubscriptionOptions => "subscription_options",
        }
    }

    /// Accepts either spelling.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|u| u.as_str() == name || u.snake_name() == name)
    }
}

impl fmt::Display for Utility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One argument to [`PathNode::call`].
///
/// `null` stands for an absent argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// The skip sentinel.
    Skip,
    Value(Value),
}

impl Arg {
    fn into_input(self) -> Input {
        match self {
            Arg::Skip => Input::Skip,
            Arg::Value(Value::Null) => Input::Absent,
            Arg::Value(value) => Input::Value(value),
        }
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::Value(value)
    }
}

impl From<Input> for Arg {
    fn from(input: Input) -> Self {
        match input {
            Input::Skip => Arg::Skip,
            Input::Absent => Arg::Value(Value::Null),
            Input::Value(value) => Arg::Value(value),
        }
    }
}

/// What [`PathNode::call`] produced.
#[derive(Debug)]
pub enum ProxyOutput {
    /// A path parameter was applied.
    Node(PathNode),
    QueryKey(QueryKey),
    MutationKey(MutationKey),
    Filter(QueryFilter),
    Query(QueryDescriptor),
    InfiniteQuery(InfiniteQueryDescriptor),
    Mutation(MutationDescriptor),
    Subscription(SubscriptionDescriptor),
}

impl ProxyOutput {
    pub fn into_node(self) -> Option<PathNode> {
        match self {
            Self::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn into_query_key(self) -> Option<QueryKey> {
        match self {
            Self::QueryKey(key) => Some(key),
            _ => None,
        }
    }

    pub fn into_mutation_key(self) -> Option<MutationKey> {
        match self {
            Self::MutationKey(key) => Some(key),
            _ => None,
        }
    }

    pub fn into_filter(self) -> Option<QueryFilter> {
        match self {
            Self::Filter(filter) => Some(filter),
            _ => None,
        }
    }

    pub fn into_query(self) -> Option<QueryDescriptor> {
        match self {
            Self::Query(descriptor) => Some(descriptor),
            _ => None,
        }
    }

    pub fn into_infinite_query(self) -> Option<InfiniteQueryDescriptor> {
        match self {
            Self::InfiniteQuery(descriptor) => Some(descriptor),
            _ => None,
        }
    }

    pub fn into_mutation(self) -> Option<MutationDescriptor> {
        match self {
            Self::Mutation(descriptor) => Some(descriptor),
            _ => None,
        }
    }

    pub fn into_subscription(self) -> Option<SubscriptionDescriptor> {
        match self {
            Self::Subscription(descriptor) => Some(descriptor),
            _ => None,
        }
    }
}

/// A position in the endpoint tree: literal segments plus applied params.
#[derive(Clone)]
pub struct PathNode {
    shared: Arc<Shared>,
    path: RoutePath,
    params: Vec<PathParam>,
}

impl PathNode {
    /// Descend into `name`. [`INDEX_ALIAS`] stays on this node.
    pub fn at(&self, name: &str) -> PathNode {
        if name == INDEX_ALIAS {
            return self.clone();
        }
        PathNode {
            shared: self.shared.clone(),
            path: self.path.join(name),
            params: self.params.clone(),
        }
    }

    /// Apply a path parameter, appending a parametric segment.
    pub fn param(&self, name: &str, value: impl Into<Value>) -> PathNode {
        self.with_param(PathParam::new(name, value))
    }

    fn with_param(&self, param: PathParam) -> PathNode {
        let mut path = self.path.clone();
        path.push_param(param.name());
        let mut params = self.params.clone();
        params.push(param);
        PathNode {
            shared: self.shared.clone(),
            path,
            params,
        }
    }

    pub fn path(&self) -> &RoutePath {
        &self.path
    }

    pub fn params(&self) -> &[PathParam] {
        &self.params
    }

    // === Keys and filters ===

    /// Untyped key for everything at or below this path.
    pub fn path_key(&self) -> QueryKey {
        self.shared.keys.query_key(&self.path, &Input::Absent, QueryType::Any)
    }

    pub fn path_filter(&self) -> QueryFilter {
        QueryFilter::new(self.path_key())
    }

    pub fn query_key(&self, input: impl Into<Input>) -> QueryKey {
        self.typed_key(OperationFamily::Query, &input.into(), QueryType::Query)
    }

    pub fn query_filter(&self, input: impl Into<Input>) -> QueryFilter {
        QueryFilter::new(self.query_key(input))
    }

    pub fn infinite_query_key(&self, input: impl Into<Input>) -> QueryKey {
        self.typed_key(OperationFamily::Query, &input.into(), QueryType::Infinite)
    }

    pub fn infinite_query_filter(&self, input: impl Into<Input>) -> QueryFilter {
        QueryFilter::new(self.infinite_query_key(input))
    }

    pub fn mutation_key(&self) -> MutationKey {
        let (route, _) = self.path.split_pinned_verb(OperationFamily::Mutation);
        self.shared.keys.mutation_key(&route)
    }

    // === Descriptors ===

    pub fn query_options(&self, input: impl Into<Input>, options: QueryOptions) -> QueryDescriptor {
        let input = input.into();
        let query_key = self.typed_key(OperationFamily::Query, &input, QueryType::Query);
        QueryDescriptor::build(
            self.target(OperationFamily::Query),
            &input,
            query_key,
            options,
            self.shared.config.abort_on_unmount,
            self.shared.store.clone(),
        )
    }

    pub fn infinite_query_options(
        &self,
        input: impl Into<Input>,
        options: InfiniteQueryOptions,
    ) -> InfiniteQueryDescriptor {
        let input = input.into();
        let query_key = self.typed_key(OperationFamily::Query, &input, QueryType::Infinite);
        InfiniteQueryDescriptor::build(
            self.target(OperationFamily::Query),
            &input,
            query_key,
            options,
            self.shared.config.abort_on_unmount,
            self.shared.store.clone(),
        )
    }

    /// Mutation with automatic verb resolution, or the verb pinned as the
    /// last path segment.
    pub fn mutation_options(&self, options: MutationOptions) -> MutationDescriptor {
        MutationDescriptor::build(
            self.target(OperationFamily::Mutation),
            self.mutation_key(),
            options,
            self.shared.success_override.clone(),
            self.shared.store.clone(),
        )
    }

    /// Mutation pinned to `verb`.
    ///
    /// Fails when the path already pins a verb or `verb` is not a mutation verb.
    pub fn mutation_options_with(&self, verb: Verb, options: MutationOptions) -> Result<MutationDescriptor> {
        if let (_, Some(pinned)) = self.path.split_pinned_verb(OperationFamily::Mutation) {
            return Err(TreatyError::ConflictingVerb {
                segment: pinned.to_string(),
                explicit: verb.to_string(),
            });
        }
        if !OperationFamily::Mutation.accepts(verb) {
            return Err(TreatyError::UnknownVerb(verb.to_string()));
        }

        let target = Target {
            selection: VerbSelection::Explicit(verb),
            ..self.target(OperationFamily::Mutation)
        };
        Ok(MutationDescriptor::build(
            target,
            self.mutation_key(),
            options,
            self.shared.success_override.clone(),
            self.shared.store.clone(),
        ))
    }

    pub fn subscription_options(&self, input: impl Into<Input>, options: SubscriptionOptions) -> SubscriptionDescriptor {
        let input = input.into();
        let query_key = self.typed_key(OperationFamily::Subscription, &input, QueryType::Any);
        SubscriptionDescriptor::build(self.target(OperationFamily::Subscription), &input, query_key, options)
    }

    // === Dynamic dispatch ===

    /// Apply a call to this node.
    ///
    /// A trailing utility segment dispatches to that utility. A trailing
    /// verb name is rejected. A single one-key object applies a path
    /// parameter. Anything else is an error.
    pub fn call(&self, args: Vec<Arg>) -> Result<ProxyOutput> {
        if let Some(last) = self.path.last_literal() {
            if let Some(utility) = Utility::parse(last) {
                let node = PathNode {
                    shared: self.shared.clone(),
                    path: self.path.parent(),
                    params: self.params.clone(),
                };
                trace!(path = %node.path, utility = %utility, "dispatching utility");
                return node.dispatch(utility, args);
            }
            if let Some(verb) = Verb::parse(last) {
                return Err(TreatyError::ReservedName {
                    name: verb.to_string(),
                    suggestion: verb.suggested_utility().to_string(),
                });
            }
        }

        if let [Arg::Value(value)] = args.as_slice() {
            if let Some(param) = PathParam::from_value(value) {
                return Ok(ProxyOutput::Node(self.with_param(param)));
            }
        }

        if self.path.is_empty() {
            return Err(TreatyError::EmptyPath);
        }
        Err(TreatyError::NonUtilityCall {
            path: self.path.location(),
        })
    }

    fn dispatch(&self, utility: Utility, args: Vec<Arg>) -> Result<ProxyOutput> {
        let mut args = args.into_iter();
        let first = args.next();
        let second = args.next();
        let input = || first.clone().map(Arg::into_input).unwrap_or(Input::Absent);

        let output = match utility {
            Utility::PathKey => ProxyOutput::QueryKey(self.path_key()),
            Utility::PathFilter => {
                ProxyOutput::Filter(self.path_filter().with_exact(exact_flag(utility, first.as_ref())?))
            }
            Utility::QueryOptions => {
                let options = decode_options::<QueryOptions>(utility, second)?;
                ProxyOutput::Query(self.query_options(input(), options))
            }
            Utility::QueryKey => ProxyOutput::QueryKey(self.query_key(input())),
            Utility::QueryFilter => {
                let exact = exact_flag(utility, second.as_ref())?;
                ProxyOutput::Filter(self.query_filter(input()).with_exact(exact))
            }
            Utility::InfiniteQueryOptions => {
                let options = decode_options::<InfiniteQueryOptions>(utility, second)?;
                ProxyOutput::InfiniteQuery(self.infinite_query_options(input(), options))
            }
            Utility::InfiniteQueryKey => ProxyOutput::QueryKey(self.infinite_query_key(input())),
            Utility::InfiniteQueryFilter => {
                let exact = exact_flag(utility, second.as_ref())?;
                ProxyOutput::Filter(self.infinite_query_filter(input()).with_exact(exact))
            }
            Utility::MutationOptions => match first.clone() {
                Some(Arg::Value(Value::String(name))) => {
                    let verb = Verb::from_str(&name)?;
                    let options = decode_options::<MutationOptions>(utility, second)?;
                    ProxyOutput::Mutation(self.mutation_options_with(verb, options)?)
                }
                other => {
                    let options = decode_options::<MutationOptions>(utility, other)?;
                    ProxyOutput::Mutation(self.mutation_options(options))
                }
            },
            Utility::MutationKey => ProxyOutput::MutationKey(self.mutation_key()),
            Utility::SubscriptionOptions => {
                let options = decode_options::<SubscriptionOptions>(utility, second)?;
                ProxyOutput::Subscription(self.subscription_options(input(), options))
            }
        };
        Ok(output)
    }

    fn typed_key(&self, family: OperationFamily, input: &Input, query_type: QueryType) -> QueryKey {
        let (route, _) = self.path.split_pinned_verb(family);
        self.shared.keys.query_key(&route, &self.key_input(input), query_type)
    }

    /// Params merged under the input, preserving the skip sentinel when
    /// there are no params to merge.
    fn key_input(&self, input: &Input) -> Input {
        match input.merge_params(&self.params) {
            Some(value) => Input::Value(value),
            None if input.is_skip() => Input::Skip,
            None => Input::Absent,
        }
    }

    fn target(&self, family: OperationFamily) -> Target {
        let (route, pinned) = self.path.split_pinned_verb(family);
        Target {
            resolver: self.shared.resolver.clone(),
            route,
            selection: VerbSelection::from_pinned(pinned),
            params: self.params.clone(),
        }
    }
}

impl fmt::Debug for PathNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathNode")
            .field("path", &self.path.location())
            .field("params", &self.params)
            .finish()
    }
}

fn decode_options<T: DeserializeOwned + Default>(utility: Utility, arg: Option<Arg>) -> Result<T> {
    match arg {
        None | Some(Arg::Value(Value::Null)) => Ok(T::default()),
        Some(Arg::Skip) => Err(TreatyError::InvalidOptions {
            utility: utility.to_string(),
            message: "the skip sentinel is not an options object".to_string(),
        }),
        Some(Arg::Value(value)) => serde_json::from_value(value).map_err(|e| TreatyError::InvalidOptions {
            utility: utility.to_string(),
            message: e.to_string(),
        }),
    }
}

/// Reads `{exact: bool}` from a filter-options argument.
fn exact_flag(utility: Utility, arg: Option<&Arg>) -> Result<bool> {
    match arg {
        None | Some(Arg::Value(Value::Null)) => Ok(false),
        Some(Arg::Value(Value::Object(fields))) => match fields.get("exact") {
            None | Some(Value::Null) => Ok(false),
            Some(Value::Bool(exact)) => Ok(*exact),
            Some(other) => Err(TreatyError::InvalidOptions {
                utility: utility.to_string(),
                message: format!("`exact` must be a boolean, got {other}"),
            }),
        },
        Some(_) => Err(TreatyError::InvalidOptions {
            utility: utility.to_string(),
            message: "filter options must be an object".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;
    use treaty_client::{handler_fn, Endpoint, Response};

    fn proxy() -> OptionsProxy {
        let client = Endpoint::new()
            .route(
                "users",
                Endpoint::new()
                    .get(handler_fn(|_req| async { Response::ok(json!([])) }))
                    .param(
                        "id",
                        Endpoint::new().patch(handler_fn(|req| async move {
                            Response::ok(req.input.unwrap_or_default())
                        })),
                    ),
            )
            .into_node();
        OptionsProxy::new(client, Arc::new(MemoryStore::new()))
    }

    // === Utility Name Tests ===

    #[test]
    fn test_utility_parse_accepts_both_spellings() {
        assert_eq!(Utility::parse("queryOptions"), Some(Utility::QueryOptions));
        assert_eq!(Utility::parse("query_options"), Some(Utility::QueryOptions));
        assert_eq!(Utility::parse("infinite_query_filter"), Some(Utility::InfiniteQueryFilter));
        assert_eq!(Utility::parse("users"), None);
    }

    // === Path Accumulation Tests ===

    #[test]
    fn test_index_alias_reenters_node() {
        let node = proxy().at("users").at(INDEX_ALIAS);
        assert_eq!(node.path().to_string(), "users");
    }

    #[test]
    fn test_single_key_object_applies_param() {
        let node = proxy()
            .at("users")
            .call(vec![json!({"id": 7}).into()])
            .unwrap()
            .into_node()
            .unwrap();

        assert_eq!(node.path().to_string(), "users.:id");
        assert_eq!(node.params(), &[PathParam::new("id", 7)]);
    }

    // === Key Tests ===

    #[test]
    fn test_query_key_merges_params() {
        let key = proxy().at("users").param("id", 7).query_key(json!({"expand": true}));
        assert_eq!(
            key.to_value(),
            json!([["users", ":id"], {"input": {"id": 7, "expand": true}, "type": "query"}])
        );
    }

    #[test]
    fn test_pinned_verb_is_not_part_of_key() {
        let users = proxy().at("users");
        assert_eq!(users.at("get").query_key(Input::Absent), users.query_key(Input::Absent));
        assert_eq!(
            users.param("id", 1).at("patch").mutation_key(),
            users.param("id", 1).mutation_key()
        );
    }

    #[test]
    fn test_path_key_ignores_params() {
        let key = proxy().at("users").param("id", 1).path_key();
        assert_eq!(key.to_value(), json!([["users", ":id"]]));
    }

    #[test]
    fn test_prefix_leads_every_key() {
        let client = Endpoint::new().into_node();
        let proxy = OptionsProxy::with_config(
            client,
            Arc::new(MemoryStore::new()),
            TreatyConfig::new().with_key_prefix("tenant"),
        );
        let users = proxy.at("users");
        assert_eq!(users.path_key().prefix(), Some("tenant"));
        assert_eq!(users.mutation_key().prefix(), Some("tenant"));
    }

    // === Dynamic Dispatch Tests ===

    #[test]
    fn test_call_dispatches_utilities() {
        let users = proxy().at("users");

        let key = users
            .at("queryKey")
            .call(vec![json!({"page": 1}).into()])
            .unwrap()
            .into_query_key()
            .unwrap();
        assert_eq!(key, users.query_key(json!({"page": 1})));

        let filter = users
            .at("path_filter")
            .call(vec![json!({"exact": true}).into()])
            .unwrap()
            .into_filter()
            .unwrap();
        assert!(filter.exact);
        assert_eq!(filter.query_key, users.path_key());

        let descriptor = users
            .at("queryOptions")
            .call(vec![Arg::Skip])
            .unwrap()
            .into_query()
            .unwrap();
        assert!(descriptor.is_skipped());
    }

    #[test]
    fn test_call_decodes_options() {
        let descriptor = proxy()
            .at("users")
            .at("queryOptions")
            .call(vec![Arg::Value(Value::Null), json!({"staleTime": 30}).into()])
            .unwrap()
            .into_query()
            .unwrap();
        assert_eq!(descriptor.options.stale_time, Some(30));
        assert_eq!(descriptor.treaty.path, "users");
    }

    #[test]
    fn test_invalid_options_rejected() {
        let err = proxy()
            .at("users")
            .at("queryOptions")
            .call(vec![Arg::Value(Value::Null), json!({"staleTime": "soon"}).into()])
            .unwrap_err();
        assert!(matches!(err, TreatyError::InvalidOptions { ref utility, .. } if utility == "queryOptions"));
    }

    #[test]
    fn test_reserved_verb_call_is_rejected() {
        let err = proxy().at("users").at("get").call(vec![]).unwrap_err();
        assert_eq!(
            err,
            TreatyError::ReservedName {
                name: "get".into(),
                suggestion: Verb::Get.suggested_utility().into(),
            }
        );

        let err = proxy().at("users").at("delete").call(vec![]).unwrap_err();
        assert!(matches!(err, TreatyError::ReservedName { ref suggestion, .. } if suggestion.contains("mutation_options")));
    }

    #[test]
    fn test_non_utility_call_is_rejected() {
        let users = proxy().at("users");
        let err = users.call(vec![json!({"a": 1, "b": 2}).into()]).unwrap_err();
        assert_eq!(err, TreatyError::NonUtilityCall { path: "users".into() });

        let err = users.call(vec![json!({"id": 1}).into(), json!({"id": 2}).into()]).unwrap_err();
        assert!(matches!(err, TreatyError::NonUtilityCall { .. }));

        assert_eq!(proxy().root().call(vec![]).unwrap_err(), TreatyError::EmptyPath);
    }

    #[test]
    fn test_explicit_mutation_verb() {
        let node = proxy().at("users").param("id", 1);

        let descriptor = node
            .at("mutationOptions")
            .call(vec![json!("patch").into()])
            .unwrap()
            .into_mutation()
            .unwrap();
        assert_eq!(descriptor.mutation_key, node.mutation_key());

        let err = node.at("mutationOptions").call(vec![json!("fetch").into()]).unwrap_err();
        assert_eq!(err, TreatyError::UnknownVerb("fetch".into()));

        let err = node.mutation_options_with(Verb::Get, MutationOptions::new()).unwrap_err();
        assert_eq!(err, TreatyError::UnknownVerb("get".into()));
    }

    #[test]
    fn test_pinned_and_explicit_verb_conflict() {
        let err = proxy()
            .at("users")
            .param("id", 1)
            .at("put")
            .mutation_options_with(Verb::Patch, MutationOptions::new())
            .unwrap_err();
        assert_eq!(
            err,
            TreatyError::ConflictingVerb {
                segment: "put".into(),
                explicit: "patch".into(),
            }
        );
    }
}
