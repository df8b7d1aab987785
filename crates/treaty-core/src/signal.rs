//! Cancellation signal handed to endpoint calls.

use tokio_util::sync::CancellationToken;

/// Abort signal owned by the caching layer for one in-flight operation.
///
/// Clones share the same underlying state.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    token: CancellationToken,
}

impl AbortSignal {
    /// Create a signal that has not fired.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal. Idempotent.
    pub fn abort(&self) {
        self.token.cancel();
    }

    /// Whether the signal has fired.
    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolve once the signal fires.
    pub async fn aborted(&self) {
        self.token.cancelled().await
    }

    /// A signal that also fires when this one does.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }
}
