//! Subscription result state.
//!
//! [`Subscription`] drives a [`SubscriptionDescriptor`] and folds its
//! lifecycle callbacks into a single observable [`SubscriptionState`].
//! Observers read the latest state or wait for changes through a
//! `tokio::sync::watch` receiver.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;
use treaty_core::{EndpointError, Result};

use crate::descriptor::{
    ConnectionState, SubscriptionCallbacks, SubscriptionDescriptor, Unsubscribe,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Idle,
    Connecting,
    Pending,
    /// The stream could not be opened.
    Error,
}

/// Observable state of a subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionState {
    pub status: SubscriptionStatus,
    /// Most recent message.
    pub data: Option<Value>,
    pub error: Option<EndpointError>,
}

impl SubscriptionState {
    fn initial(enabled: bool) -> Self {
        Self {
            status: if enabled {
                SubscriptionStatus::Connecting
            } else {
                SubscriptionStatus::Idle
            },
            data: None,
            error: None,
        }
    }
}

type StateSender = Arc<watch::Sender<SubscriptionState>>;

/// A live subscription and its state.
///
/// Dropping it closes the connection.
pub struct Subscription {
    descriptor: SubscriptionDescriptor,
    enabled: AtomicBool,
    state: StateSender,
    /// Bumped on every reset; callbacks from older connections are ignored.
    generation: Arc<AtomicU64>,
    current: Mutex<Option<Unsubscribe>>,
}

impl Subscription {
    /// Create without connecting.
    pub fn new(descriptor: SubscriptionDescriptor) -> Self {
        let enabled = descriptor.enabled;
        let connects = enabled && !descriptor.is_skipped();
        let (sender, _) = watch::channel(SubscriptionState::initial(connects));
        Self {
            descriptor,
            enabled: AtomicBool::new(enabled),
            state: Arc::new(sender),
            generation: Arc::new(AtomicU64::new(0)),
            current: Mutex::new(None),
        }
    }

    /// Create and connect when enabled. Must be called within a tokio runtime.
    pub fn start(descriptor: SubscriptionDescriptor) -> Result<Self> {
        let subscription = Self::new(descriptor);
        subscription.reset()?;
        Ok(subscription)
    }

    /// Close the current connection, return to the initial state and
    /// reconnect when enabled.
    ///
    /// The previous connection is fully closed before the next one opens.
    pub fn reset(&self) -> Result<()> {
        let mut current = self.current.lock();
        if let Some(previous) = current.take() {
            previous.unsubscribe();
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let connects = self.is_enabled() && !self.descriptor.is_skipped();
        self.state.send_replace(SubscriptionState::initial(connects));
        if !connects {
            return Ok(());
        }

        debug!(route = %self.descriptor.treaty.path, generation, "subscription reset");
        match self.descriptor.connect(self.callbacks(generation)) {
            Ok(handle) => {
                *current = Some(handle);
                Ok(())
            }
            Err(err) => {
                let error = err
                    .endpoint_error()
                    .cloned()
                    .unwrap_or_else(|| EndpointError::Transport(err.to_string()));
                self.state.send_replace(SubscriptionState {
                    status: SubscriptionStatus::Error,
                    data: None,
                    error: Some(error),
                });
                Err(err)
            }
        }
    }

    /// Enable or disable; connects or closes accordingly on change.
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        if self.enabled.swap(enabled, Ordering::SeqCst) == enabled {
            return Ok(());
        }
        self.reset()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Close the connection and go idle.
    pub fn close(&self) {
        let mut current = self.current.lock();
        if let Some(previous) = current.take() {
            previous.unsubscribe();
        }
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.state.send_replace(SubscriptionState::initial(false));
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SubscriptionState {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> SubscriptionStatus {
        self.state.borrow().status
    }

    pub fn data(&self) -> Option<Value> {
        self.state.borrow().data.clone()
    }

    pub fn error(&self) -> Option<EndpointError> {
        self.state.borrow().error.clone()
    }

    /// Receiver notified on every state change.
    pub fn watch(&self) -> watch::Receiver<SubscriptionState> {
        self.state.subscribe()
    }

    pub fn descriptor(&self) -> &SubscriptionDescriptor {
        &self.descriptor
    }

    /// Callbacks that update state, then forward to the caller's callbacks.
    fn callbacks(&self, generation: u64) -> SubscriptionCallbacks {
        let outer = self.descriptor.options.callbacks.clone();
        let updater = Updater {
            state: self.state.clone(),
            generation,
            current: self.generation.clone(),
        };

        let started = (outer.clone(), updater.clone());
        let data = (outer.clone(), updater.clone());
        let error = outer.clone();
        let change = (outer, updater);

        SubscriptionCallbacks::new()
            .with_on_started(move || {
                let (outer, updater) = &started;
                outer.started();
                updater.apply(|state| {
                    state.status = SubscriptionStatus::Pending;
                    state.error = None;
                });
            })
            .with_on_data(move |value| {
                let (outer, updater) = &data;
                outer.data(value.clone());
                updater.apply(|state| {
                    state.status = SubscriptionStatus::Pending;
                    state.data = Some(value);
                    state.error = None;
                });
            })
            // The following `Connecting` change carries the error into state.
            .with_on_error(move |err| error.error(err))
            .with_on_connection_state_change(move |event| {
                let (outer, updater) = &change;
                outer.state(event.state, event.error.clone());
                match event.state {
                    ConnectionState::Connecting => updater.apply(|state| {
                        state.status = SubscriptionStatus::Connecting;
                        state.error = event.error;
                    }),
                    ConnectionState::Pending => {}
                    ConnectionState::Idle => updater.apply(|state| {
                        state.status = SubscriptionStatus::Idle;
                        state.data = None;
                        state.error = None;
                    }),
                }
            })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(handle) = self.current.get_mut().take() {
            handle.unsubscribe();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("route", &self.descriptor.treaty.path)
            .field("enabled", &self.is_enabled())
            .field("state", &self.state())
            .finish()
    }
}

#[derive(Clone)]
struct Updater {
    state: StateSender,
    generation: u64,
    current: Arc<AtomicU64>,
}

impl Updater {
    fn apply(&self, update: impl FnOnce(&mut SubscriptionState)) {
        if self.current.load(Ordering::SeqCst) != self.generation {
            return;
        }
        self.state.send_if_modified(|state| {
            let before = state.clone();
            update(state);
            *state != before
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryStore, OptionsProxy, SubscriptionOptions};
    use serde_json::json;
    use treaty_client::{connection_channel, handler_fn, stream_fn, Endpoint, Response};
    use treaty_core::Input;

    fn descriptor(options: SubscriptionOptions) -> SubscriptionDescriptor {
        let client = Endpoint::new()
            .route(
                "feed",
                Endpoint::new().subscribe(stream_fn(|_req| connection_channel().1)),
            )
            .into_node();
        OptionsProxy::new(client, Arc::new(MemoryStore::new()))
            .at("feed")
            .subscription_options(Input::Absent, options)
    }

    // === Transition Tests ===

    #[test]
    fn test_transport_error_applies_as_single_connecting_change() {
        let subscription = Subscription::new(descriptor(SubscriptionOptions::new()));
        let callbacks = subscription.callbacks(0);
        callbacks.started();
        let mut rx = subscription.watch();
        rx.mark_unchanged();

        let dropped = EndpointError::Transport("dropped".into());
        callbacks.error(dropped.clone());
        assert!(!rx.has_changed().unwrap());
        assert_eq!(subscription.status(), SubscriptionStatus::Pending);

        callbacks.state(ConnectionState::Connecting, Some(dropped.clone()));
        assert!(rx.has_changed().unwrap());
        let state = subscription.state();
        assert_eq!(state.status, SubscriptionStatus::Connecting);
        assert_eq!(state.error, Some(dropped));
    }

    #[test]
    fn test_stale_generation_is_ignored() {
        let subscription = Subscription::new(descriptor(SubscriptionOptions::new()));
        let stale = subscription.callbacks(0);
        subscription.close();

        stale.data(json!("late"));
        assert_eq!(subscription.state(), SubscriptionState::initial(false));
    }

    #[tokio::test]
    async fn test_open_failure_sets_error_status() {
        let client = Endpoint::new()
            .route(
                "feed",
                Endpoint::new().get(handler_fn(|_req| async { Response::ok(json!([])) })),
            )
            .into_node();
        let descriptor = OptionsProxy::new(client, Arc::new(MemoryStore::new()))
            .at("feed")
            .subscription_options(Input::Absent, SubscriptionOptions::new());

        let subscription = Subscription::new(descriptor);
        assert!(subscription.reset().is_err());
        let state = subscription.state();
        assert_eq!(state.status, SubscriptionStatus::Error);
        assert!(state.error.is_some());
    }

    #[test]
    fn test_disabled_descriptor_starts_idle() {
        let subscription = Subscription::new(descriptor(SubscriptionOptions::new().with_enabled(false)));
        assert!(!subscription.is_enabled());
        assert_eq!(subscription.status(), SubscriptionStatus::Idle);
    }
}
