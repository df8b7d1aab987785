//! Descriptors handed to the caching layer.
//!
//! Each descriptor is self-contained: it owns its key, the options it was
//! built with and a function that resolves and calls the endpoint when the
//! caching layer runs it.

mod infinite;
mod mutation;
mod query;
mod subscription;

pub use infinite::*;
pub use mutation::*;
pub use query::*;
pub use subscription::*;

use serde_json::Value;
use treaty_client::{Payload, StreamConnection};
use treaty_core::{AbortSignal, OperationFamily, PathParam, Result, RoutePath};
use treaty_resolve::{VerbResolver, VerbSelection};

/// The endpoint a descriptor calls: route, verb selection and params.
#[derive(Clone)]
pub(crate) struct Target {
    pub resolver: VerbResolver,
    pub route: RoutePath,
    pub selection: VerbSelection,
    pub params: Vec<PathParam>,
}

impl Target {
    pub async fn call(
        &self,
        family: OperationFamily,
        input: Option<Value>,
        signal: Option<&AbortSignal>,
    ) -> Result<Payload> {
        let (_, payload) = self
            .resolver
            .call(family, &self.route, self.selection, &self.params, input, signal)
            .await?;
        Ok(payload)
    }

    pub fn open(&self, input: Option<Value>) -> Result<StreamConnection> {
        let (_, connection) = self
            .resolver
            .open(&self.route, self.selection, &self.params, input)?;
        Ok(connection)
    }
}
