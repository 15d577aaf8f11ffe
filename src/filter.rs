//! Function-invocation filter chain.
//!
//! Filters wrap every auto-invoked function the way middleware wraps a
//! request handler: a filter may inspect or rewrite the arguments, call
//! [`FilterContinuation::proceed`] to run the rest of the chain, post-process
//! the result, or skip `proceed` entirely and supply its own `result` and
//! `terminate` decision. The chain is an explicit ordered list walked by
//! index; nothing about filter state is ambient.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::LoopError;
use crate::guard::InvocationGuard;
use crate::resolver::ArgumentMap;

/// Per-invocation context passed through the filter chain.
///
/// Fresh for every tool call. Filters and the terminal function invocation
/// are the only writers.
pub struct InvocationContext {
    /// Fully qualified function name.
    pub function_name: String,
    /// Plugin segment of the name, if present.
    pub plugin_name: Option<String>,
    /// Parsed arguments; filters may replace them before execution.
    pub arguments: ArgumentMap,
    /// Zero-based round index of the request this call arrived in.
    pub request_round: usize,
    /// Position of this call within the round.
    pub call_index: usize,
    /// Total calls requested in the round.
    pub call_count: usize,
    /// Set by a filter to stop the round after this call's result is
    /// appended.
    pub terminate: bool,
    /// The invocation result. Set by the terminal invocation, or by a filter
    /// that skipped it.
    pub result: Option<Value>,
    guard: InvocationGuard,
}

impl InvocationContext {
    /// Create a context for one tool call.
    pub fn new(
        function_name: impl Into<String>,
        plugin_name: Option<String>,
        arguments: ArgumentMap,
        request_round: usize,
        call_index: usize,
        call_count: usize,
        guard: InvocationGuard,
    ) -> Self {
        Self {
            function_name: function_name.into(),
            plugin_name,
            arguments,
            request_round,
            call_index,
            call_count,
            terminate: false,
            result: None,
            guard,
        }
    }

    /// The recursion guard of the run this call belongs to.
    ///
    /// A filter (or the invoked function) that starts a nested orchestration
    /// passes a clone of this guard so the nested run draws from the same
    /// auto-invocation budget.
    pub fn guard(&self) -> &InvocationGuard {
        &self.guard
    }
}

/// A function-invocation filter.
#[async_trait]
pub trait InvocationFilter: Send + Sync {
    /// Handle one invocation.
    ///
    /// Call `next.proceed(ctx)` to run the remaining filters and the
    /// function itself. Not calling it makes this filter's `ctx.result` and
    /// `ctx.terminate` authoritative.
    async fn on_invoke(
        &self,
        ctx: &mut InvocationContext,
        next: FilterContinuation<'_>,
    ) -> Result<(), LoopError>;
}

/// The remainder of a filter chain: the filter list, a position in it, and
/// the terminal invocation that runs when the list is exhausted.
pub struct FilterContinuation<'a> {
    filters: &'a [Arc<dyn InvocationFilter>],
    index: usize,
    terminal: &'a dyn InvocationFilter,
}

impl FilterContinuation<'_> {
    /// Run the rest of the chain.
    pub async fn proceed(self, ctx: &mut InvocationContext) -> Result<(), LoopError> {
        match self.filters.get(self.index) {
            Some(filter) => {
                let next = FilterContinuation {
                    filters: self.filters,
                    index: self.index + 1,
                    terminal: self.terminal,
                };
                filter.on_invoke(ctx, next).await
            }
            None => {
                // Exhausted continuation so the terminal cannot re-enter
                // the chain.
                let end = FilterContinuation {
                    filters: &[],
                    index: 0,
                    terminal: &NOOP_TERMINAL,
                };
                self.terminal.on_invoke(ctx, end).await
            }
        }
    }
}

static NOOP_TERMINAL: NoopTerminal = NoopTerminal;

struct NoopTerminal;

#[async_trait]
impl InvocationFilter for NoopTerminal {
    async fn on_invoke(
        &self,
        _ctx: &mut InvocationContext,
        _next: FilterContinuation<'_>,
    ) -> Result<(), LoopError> {
        Ok(())
    }
}

/// An ordered list of invocation filters.
#[derive(Clone, Default)]
pub struct FilterChain {
    filters: Vec<Arc<dyn InvocationFilter>>,
}

impl FilterChain {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter; filters run in insertion order.
    pub fn push(&mut self, filter: Arc<dyn InvocationFilter>) {
        self.filters.push(filter);
    }

    /// Append a filter, builder style.
    pub fn with(mut self, filter: Arc<dyn InvocationFilter>) -> Self {
        self.push(filter);
        self
    }

    /// Number of filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Whether the chain has no filters.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Run `ctx` through every filter and finally `terminal`.
    ///
    /// With an empty chain the terminal runs directly.
    pub async fn invoke(
        &self,
        ctx: &mut InvocationContext,
        terminal: &dyn InvocationFilter,
    ) -> Result<(), LoopError> {
        FilterContinuation {
            filters: &self.filters,
            index: 0,
            terminal,
        }
        .proceed(ctx)
        .await
    }
}
