//! The tool-call orchestration loop.
//!
//! An [`Orchestrator`] drives a multi-turn conversation: it sends the
//! history to the transport, executes any tool calls the model requests
//! through the filter chain, appends the results, and repeats. A response
//! without tool calls is the only normal termination signal; finish reasons
//! are surfaced but never consulted, because providers report them
//! inconsistently.
//!
//! # Example
//!
//! ```no_run
//! use toolloop::orchestrator::Orchestrator;
//! use toolloop::resolver::FunctionRegistry;
//! use toolloop::types::{ChatMessage, ExecutionSettings, Tool};
//! # async fn example(transport: impl toolloop::transport::ChatTransport) -> Result<(), toolloop::error::LoopError> {
//! let tools = vec![Tool::function(
//!     "weather-lookup",
//!     "Look up the weather for a city",
//!     serde_json::json!({"type": "object", "properties": {"city": {"type": "string"}}}),
//! )];
//! let mut registry = FunctionRegistry::new();
//! registry.register_fn("weather-lookup", |_args| async move {
//!     Ok(serde_json::json!("sunny, 22C"))
//! });
//!
//! let orchestrator = Orchestrator::new(transport, tools);
//! let mut history = vec![ChatMessage::user("What's the weather in Paris?").build()];
//! let (reply, rounds) =
//!     orchestrator.run(&mut history, &ExecutionSettings::default(), &registry).await?;
//! println!("{} ({} rounds)", reply.content_text(), rounds.len());
//! # Ok(())
//! # }
//! ```

mod invoke;
mod run;
mod stream;
mod types;

pub use invoke::{
    EMPTY_RESULT_MESSAGE, FUNCTION_NOT_DEFINED_MESSAGE, FUNCTION_NOT_FOUND_MESSAGE,
    INVALID_ARGUMENTS_MESSAGE,
};
pub use types::{RoundCallback, RoundResult, StreamOrchestration};

use std::sync::Arc;

use crate::filter::{FilterChain, InvocationFilter};
use crate::guard::InvocationGuard;
use crate::transport::ChatTransport;
use crate::types::{ExecutionSettings, Tool};

/// Drives tool-calling conversations over a [`ChatTransport`].
pub struct Orchestrator<T> {
    transport: T,
    tools: Vec<Tool>,
    filters: FilterChain,
    guard: InvocationGuard,
    on_round_finish: Option<RoundCallback>,
}

impl<T: ChatTransport> Orchestrator<T> {
    /// Create an orchestrator with a fresh recursion guard.
    pub fn new(transport: T, tools: Vec<Tool>) -> Self {
        Self {
            transport,
            tools,
            filters: FilterChain::new(),
            guard: InvocationGuard::new(),
            on_round_finish: None,
        }
    }

    /// Replace the filter chain.
    pub fn with_filters(mut self, filters: FilterChain) -> Self {
        self.filters = filters;
        self
    }

    /// Append one filter to the chain.
    pub fn with_filter(mut self, filter: Arc<dyn InvocationFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    /// Share a recursion guard with an outer run.
    ///
    /// A function that starts a nested orchestration passes the guard from
    /// its [`InvocationContext`](crate::filter::InvocationContext) here so
    /// the nested run draws from the same auto-invocation budget.
    pub fn with_guard(mut self, guard: InvocationGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Install a callback invoked after every completed round.
    pub fn on_round_finish(mut self, callback: RoundCallback) -> Self {
        self.on_round_finish = Some(callback);
        self
    }

    /// The recursion guard this orchestrator uses.
    pub fn guard(&self) -> &InvocationGuard {
        &self.guard
    }

    /// The tools advertised to the model.
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// The tool list to send for one round, or `None` when tools are
    /// withheld.
    ///
    /// Tools are dropped once the round index reaches `max_use_attempts`.
    /// Past `max_auto_invoke_attempts` they stay on the wire if an earlier
    /// round already advertised them, since the service expects a tool list
    /// it has seen to remain present; if auto-invocation was off from the
    /// first round they are never introduced at all.
    fn round_tools(
        &self,
        settings: &ExecutionSettings,
        round_index: usize,
        auto_invoke: bool,
        tools_introduced: bool,
    ) -> Option<&[Tool]> {
        if self.tools.is_empty() || round_index >= settings.max_use_attempts {
            return None;
        }
        if !auto_invoke && !tools_introduced {
            return None;
        }
        Some(self.tools.as_slice())
    }
}
