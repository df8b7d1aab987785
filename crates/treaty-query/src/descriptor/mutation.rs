//! Mutation descriptors and the success hook chain.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::{FutureExt, TryStreamExt};
use serde_json::Value;
use treaty_client::Payload;
use treaty_core::{OperationFamily, Result, TreatyError};
use treaty_key::MutationKey;

use super::Target;
use crate::options::{MetaMap, MutationOptions, TreatyInfo};
use crate::store::{MutationDefaults, QueryStore};

/// What a mutation's success callback receives.
#[derive(Debug, Clone, PartialEq)]
pub struct SuccessArgs {
    pub data: Value,
    pub variables: Option<Value>,
}

/// Caller or default success callback.
pub type SuccessCallback = Arc<dyn Fn(SuccessArgs) -> BoxFuture<'static, ()> + Send + Sync>;

/// Wrap an async closure as a [`SuccessCallback`].
pub fn success_fn<F, Fut>(f: F) -> SuccessCallback
where
    F: Fn(SuccessArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |args| f(args).boxed())
}

/// Runs the caller's success callback, or the store default when the
/// caller gave none. Consumed on call.
pub struct OriginalFn(Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>);

impl OriginalFn {
    fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> BoxFuture<'static, ()> + Send + 'static,
    {
        Self(Box::new(f))
    }

    pub fn call(self) -> BoxFuture<'static, ()> {
        (self.0)()
    }
}

impl fmt::Debug for OriginalFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OriginalFn")
    }
}

/// Handed to the binding-wide success override.
pub struct SuccessOverrideContext {
    pub original_fn: OriginalFn,
    pub store: Arc<dyn QueryStore>,
    pub meta: MetaMap,
}

impl fmt::Debug for SuccessOverrideContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuccessOverrideContext")
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

/// Binding-wide hook that decides whether and when the original success
/// callback runs.
pub type SuccessOverride = Arc<dyn Fn(SuccessOverrideContext) -> BoxFuture<'static, ()> + Send + Sync>;

/// Wrap an async closure as a [`SuccessOverride`].
pub fn success_override_fn<F, Fut>(f: F) -> SuccessOverride
where
    F: Fn(SuccessOverrideContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |ctx| f(ctx).boxed())
}

/// A mutation function run by the caching layer.
pub type MutationFn = Arc<dyn Fn(Option<Value>) -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// `{mutation_key, mutation_fn, on_success, ...options}` for one mutation.
#[derive(Clone)]
pub struct MutationDescriptor {
    pub mutation_key: MutationKey,
    pub mutation_fn: MutationFn,
    pub options: MutationOptions,
    pub treaty: TreatyInfo,
    defaults: MutationDefaults,
    success_override: Option<SuccessOverride>,
    store: Arc<dyn QueryStore>,
}

impl MutationDescriptor {
    pub(crate) fn build(
        target: Target,
        mutation_key: MutationKey,
        options: MutationOptions,
        success_override: Option<SuccessOverride>,
        store: Arc<dyn QueryStore>,
    ) -> Self {
        let treaty = TreatyInfo {
            path: target.route.to_string(),
        };
        let defaults = store.get_mutation_defaults(&mutation_key);

        let mutation_fn: MutationFn = Arc::new(move |variables: Option<Value>| {
            let target = target.clone();
            async move {
                match target.call(OperationFamily::Mutation, variables, None).await? {
                    Payload::Value(value) => Ok(value),
                    Payload::Stream(stream) => {
                        let items: Vec<Value> = stream.map_err(TreatyError::Stream).try_collect().await?;
                        Ok(Value::Array(items))
                    }
                }
            }
            .boxed()
        });

        Self {
            mutation_key,
            mutation_fn,
            options,
            treaty,
            defaults,
            success_override,
            store,
        }
    }

    /// Run the mutation function.
    pub async fn mutate(&self, variables: Option<Value>) -> Result<Value> {
        (self.mutation_fn)(variables).await
    }

    /// Metadata passed to the success override: the caller's, else the
    /// store default's, else empty.
    pub fn meta(&self) -> MetaMap {
        self.options
            .meta
            .clone()
            .or_else(|| self.defaults.meta.clone())
            .unwrap_or_default()
    }

    /// Success handling for one completed mutation.
    ///
    /// Without an override the original callback runs directly.
    pub fn on_success(&self, args: SuccessArgs) -> BoxFuture<'static, ()> {
        let callback = self
            .options
            .on_success
            .clone()
            .or_else(|| self.defaults.on_success.clone());

        let original_fn = OriginalFn::new(move || {
            async move {
                if let Some(callback) = callback {
                    callback(args).await;
                }
            }
            .boxed()
        });

        let ctx = SuccessOverrideContext {
            original_fn,
            store: self.store.clone(),
            meta: self.meta(),
        };

        match &self.success_override {
            Some(hook) => hook(ctx),
            None => ctx.original_fn.call(),
        }
    }
}

impl fmt::Debug for MutationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationDescriptor")
            .field("mutation_key", &self.mutation_key)
            .field("options", &self.options)
            .field("treaty", &self.treaty)
            .field("has_override", &self.success_override.is_some())
            .finish()
    }
}
