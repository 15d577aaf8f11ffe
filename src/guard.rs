//! Recursion guard for auto-invocation.
//!
//! Tool functions may themselves start nested orchestration runs, and a model
//! that keeps requesting tools could otherwise recurse without bound. The
//! guard is a cloneable handle over a shared in-flight counter: an outer run
//! passes its guard to any nested orchestrator so the whole recursion scope
//! draws from one budget. It is never process-global; unrelated top-level
//! runs each get a fresh guard.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Cloneable handle over a shared in-flight auto-invocation counter.
///
/// Clones share the counter. Acquire a slot with [`try_acquire`]; the
/// returned permit releases it on drop, so the count comes back down on
/// every exit path including panics and cancellation.
///
/// [`try_acquire`]: InvocationGuard::try_acquire
#[derive(Debug, Clone, Default)]
pub struct InvocationGuard {
    in_flight: Arc<AtomicUsize>,
}

impl InvocationGuard {
    /// Create a fresh guard with zero in-flight invocations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current number of in-flight auto-invocations in this scope.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Try to claim a slot under `cap`.
    ///
    /// Returns `None` when the scope already has `cap` invocations in
    /// flight. Exhaustion is not an error; the orchestrator degrades to
    /// returning tool calls unexecuted.
    pub fn try_acquire(&self, cap: usize) -> Option<InvocationPermit> {
        let mut current = self.in_flight.load(Ordering::SeqCst);
        loop {
            if current >= cap {
                return None;
            }
            match self.in_flight.compare_exchange(
                current,
                current + 1,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => {
                    return Some(InvocationPermit {
                        in_flight: Arc::clone(&self.in_flight),
                    });
                }
                Err(observed) => current = observed,
            }
        }
    }
}

/// RAII permit for one in-flight auto-invocation.
#[derive(Debug)]
pub struct InvocationPermit {
    in_flight: Arc<AtomicUsize>,
}

impl Drop for InvocationPermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
