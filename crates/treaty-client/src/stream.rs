//! Streaming connections opened by subscription verbs.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::channel::mpsc;
use futures::stream::{BoxStream, StreamExt};
use serde_json::Value;
use treaty_core::EndpointError;

/// Lifecycle and data events of one streaming connection.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// The connection is open.
    Open,
    /// A message arrived.
    Message(Value),
    /// The transport reported an error.
    Error(EndpointError),
    /// The connection closed.
    Close,
}

/// Close control for a streaming connection.
pub trait ConnectionControl: Send + Sync {
    /// Close the connection. Must be idempotent.
    fn close(&self);
}

/// An open streaming connection: its events plus a way to close it.
pub struct StreamConnection {
    events: BoxStream<'static, ConnectionEvent>,
    control: Arc<dyn ConnectionControl>,
}

impl StreamConnection {
    /// Create a connection from an event stream and its close control.
    pub fn new(events: BoxStream<'static, ConnectionEvent>, control: Arc<dyn ConnectionControl>) -> Self {
        Self { events, control }
    }

    /// Split into the event stream and the close control.
    pub fn into_parts(self) -> (BoxStream<'static, ConnectionEvent>, Arc<dyn ConnectionControl>) {
        (self.events, self.control)
    }
}

impl fmt::Debug for StreamConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamConnection").finish_non_exhaustive()
    }
}

/// Create an in-process connection driven through a [`ConnectionSender`].
pub fn connection_channel() -> (ConnectionSender, StreamConnection) {
    let (tx, rx) = mpsc::unbounded();
    let control = Arc::new(ChannelControl {
        closed: AtomicBool::new(false),
        tx: tx.clone(),
    });
    let sender = ConnectionSender {
        tx,
        control: control.clone(),
    };
    (sender, StreamConnection::new(rx.boxed(), control))
}

struct ChannelControl {
    closed: AtomicBool,
    tx: mpsc::UnboundedSender<ConnectionEvent>,
}

impl ConnectionControl for ChannelControl {
    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.tx.close_channel();
        }
    }
}

/// Server side of an in-process connection.
#[derive(Clone)]
pub struct ConnectionSender {
    tx: mpsc::UnboundedSender<ConnectionEvent>,
    control: Arc<ChannelControl>,
}

impl ConnectionSender {
    /// Emit an event. Returns false once the connection was closed.
    pub fn send(&self, event: ConnectionEvent) -> bool {
        !self.is_closed() && self.tx.unbounded_send(event).is_ok()
    }

    /// Emit `Open`.
    pub fn open(&self) -> bool {
        self.send(ConnectionEvent::Open)
    }

    /// Emit a message.
    pub fn message(&self, value: Value) -> bool {
        self.send(ConnectionEvent::Message(value))
    }

    /// Emit a transport error.
    pub fn error(&self, error: EndpointError) -> bool {
        self.send(ConnectionEvent::Error(error))
    }

    /// Emit `Close` and stop accepting events.
    pub fn close(&self) -> bool {
        let sent = self.send(ConnectionEvent::Close);
        self.control.close();
        sent
    }

    /// Whether either side closed the connection.
    pub fn is_closed(&self) -> bool {
        self.control.closed.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for ConnectionSender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSender")
            .field("closed", &self.is_closed())
            .finish()
    }
}
