//! Subscription descriptors.
//!
//! `subscribe` opens the streaming endpoint and forwards its lifecycle to a
//! set of callbacks until the returned [`Unsubscribe`] is invoked.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use treaty_client::{ConnectionControl, ConnectionEvent};
use treaty_core::{EndpointError, Input, Result};
use treaty_key::QueryKey;

use super::Target;
use crate::options::{SubscriptionOptions, TreatyInfo};

/// Connection lifecycle as reported to `on_connection_state_change`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Idle,
    Connecting,
    Pending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionStateChange {
    pub state: ConnectionState,
    /// Set when the transition was caused by a connection error.
    pub error: Option<EndpointError>,
}

type StartedFn = Arc<dyn Fn() + Send + Sync>;
type DataFn = Arc<dyn Fn(Value) + Send + Sync>;
type ErrorFn = Arc<dyn Fn(EndpointError) + Send + Sync>;
type StateChangeFn = Arc<dyn Fn(ConnectionStateChange) + Send + Sync>;

/// Lifecycle callbacks for one subscription. All optional.
#[derive(Clone, Default)]
pub struct SubscriptionCallbacks {
    pub on_started: Option<StartedFn>,
    pub on_data: Option<DataFn>,
    pub on_error: Option<ErrorFn>,
    pub on_connection_state_change: Option<StateChangeFn>,
}

impl SubscriptionCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_on_started(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_started = Some(Arc::new(f));
        self
    }

    pub fn with_on_data(mut self, f: impl Fn(Value) + Send + Sync + 'static) -> Self {
        self.on_data = Some(Arc::new(f));
        self
    }

    pub fn with_on_error(mut self, f: impl Fn(EndpointError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    pub fn with_on_connection_state_change(
        mut self,
        f: impl Fn(ConnectionStateChange) + Send + Sync + 'static,
    ) -> Self {
        self.on_connection_state_change = Some(Arc::new(f));
        self
    }

    pub(crate) fn started(&self) {
        if let Some(f) = &self.on_started {
            f();
        }
    }

    pub(crate) fn data(&self, value: Value) {
        if let Some(f) = &self.on_data {
            f(value);
        }
    }

    pub(crate) fn error(&self, error: EndpointError) {
        if let Some(f) = &self.on_error {
            f(error);
        }
    }

    pub(crate) fn state(&self, state: ConnectionState, error: Option<EndpointError>) {
        if let Some(f) = &self.on_connection_state_change {
            f(ConnectionStateChange { state, error });
        }
    }
}

impl fmt::Debug for SubscriptionCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionCallbacks")
            .field("on_started", &self.on_started.is_some())
            .field("on_data", &self.on_data.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_connection_state_change", &self.on_connection_state_change.is_some())
            .finish()
    }
}

/// Stops a subscription. Idempotent.
///
/// Dropping the handle does not close the connection; call
/// [`Unsubscribe::unsubscribe`].
pub struct Unsubscribe {
    active: Arc<AtomicBool>,
    control: Option<Arc<dyn ConnectionControl>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Unsubscribe {
    fn noop() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(false)),
            control: None,
            task: Mutex::new(None),
        }
    }

    /// Stop forwarding events and close the connection.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(control) = &self.control {
            control.close();
        }
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }

    /// Whether events are still being forwarded.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("active", &self.is_active())
            .finish()
    }
}

/// `{query_key, enabled, subscribe, ...options}` for one subscription.
#[derive(Clone)]
pub struct SubscriptionDescriptor {
    pub query_key: QueryKey,
    pub enabled: bool,
    pub options: SubscriptionOptions,
    pub treaty: TreatyInfo,
    target: Target,
    input: Option<Value>,
    skipped: bool,
}

impl SubscriptionDescriptor {
    pub(crate) fn build(target: Target, input: &Input, query_key: QueryKey, options: SubscriptionOptions) -> Self {
        let enabled = options.enabled.unwrap_or(!input.is_skip());
        Self {
            query_key,
            enabled,
            treaty: TreatyInfo {
                path: target.route.to_string(),
            },
            options,
            target,
            input: input.to_request(),
            skipped: input.is_skip(),
        }
    }

    /// Whether the input was the skip sentinel. A skipped descriptor never
    /// connects, whatever its enabled flag says.
    pub fn is_skipped(&self) -> bool {
        self.skipped
    }

    /// Open the stream and forward its events to `callbacks`.
    ///
    /// A disabled descriptor opens nothing and returns an inert handle. Must
    /// be called within a tokio runtime.
    pub fn subscribe(&self, callbacks: SubscriptionCallbacks) -> Result<Unsubscribe> {
        if !self.enabled {
            return Ok(Unsubscribe::noop());
        }
        self.connect(callbacks)
    }

    /// Open the stream regardless of the build-time enabled flag.
    ///
    /// Only a skipped input yields an inert handle. The driver stops at the
    /// first `Close`; nothing is forwarded for that connection afterwards.
    pub(crate) fn connect(&self, callbacks: SubscriptionCallbacks) -> Result<Unsubscribe> {
        if self.skipped {
            return Ok(Unsubscribe::noop());
        }

        let connection = self.target.open(self.input.clone())?;
        let (mut events, control) = connection.into_parts();
        let active = Arc::new(AtomicBool::new(true));
        callbacks.state(ConnectionState::Connecting, None);

        let flag = active.clone();
        let route = self.treaty.path.clone();
        let task = tokio::spawn(async move {
            while let Some(event) = events.next().await {
                if !flag.load(Ordering::SeqCst) {
                    break;
                }
                match event {
                    ConnectionEvent::Open => {
                        debug!(route = %route, "subscription opened");
                        callbacks.started();
                        callbacks.state(ConnectionState::Pending, None);
                    }
                    ConnectionEvent::Message(value) => callbacks.data(value),
                    ConnectionEvent::Error(error) => {
                        warn!(route = %route, error = %error, "subscription error");
                        callbacks.error(error.clone());
                        callbacks.state(ConnectionState::Connecting, Some(error));
                    }
                    ConnectionEvent::Close => {
                        flag.store(false, Ordering::SeqCst);
                        debug!(route = %route, "subscription closed");
                        callbacks.state(ConnectionState::Idle, None);
                        break;
                    }
                }
            }
            debug!(route = %route, "subscription stream ended");
        });

        Ok(Unsubscribe {
            active,
            control: Some(control),
            task: Mutex::new(Some(task)),
        })
    }
}

impl fmt::Debug for SubscriptionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionDescriptor")
            .field("query_key", &self.query_key)
            .field("enabled", &self.enabled)
            .field("skipped", &self.skipped)
            .field("options", &self.options)
            .field("treaty", &self.treaty)
            .finish()
    }
}
