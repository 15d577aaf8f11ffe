//! Cooperative cancellation primitives.
//!
//! A [`CancelHandle`] is a cheap, cloneable wrapper over a
//! [`CancellationToken`]. The orchestrator checks it at every suspension
//! point: before each transport request, between stream items, and around
//! each function invocation. Dropping a handle does not cancel anything;
//! cancellation only happens through [`CancelHandle::cancel`].

use tokio_util::sync::CancellationToken;

use crate::types::ChatStream;

/// Handle for cancelling an in-flight operation.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
}

impl CancelHandle {
    /// Create a fresh, uncancelled handle.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Request cancellation. Idempotent; wakes all pending waiters.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a fresh cancel handle.
pub fn new_cancel_handle() -> CancelHandle {
    CancelHandle::new()
}

/// Wrap a stream so the returned handle can stop it between items.
///
/// A pending `next()` wakes immediately on cancellation, even if the inner
/// stream never yields again. The wrapped stream simply ends; no error item
/// is injected.
pub fn make_cancellable_stream(stream: ChatStream) -> (ChatStream, CancelHandle) {
    let cancel = CancelHandle::new();
    let cancel_clone = cancel.clone();

    let wrapped = async_stream::stream! {
        let mut inner = stream;
        loop {
            tokio::select! {
                biased;
                _ = cancel_clone.cancelled() => break,
                item = futures::StreamExt::next(&mut inner) => {
                    match item {
                        Some(item) => yield item,
                        None => break,
                    }
                }
            }
        }
    };

    (Box::pin(wrapped), cancel)
}
