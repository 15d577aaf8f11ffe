//! # toolloop
//!
//! A client-side tool-call orchestration loop for chat-completion services.
//!
//! The crate drives the multi-turn dance of tool calling: send the
//! conversation, let the model request function calls, execute them through
//! a filter chain, append the results, and repeat until the model answers
//! without requesting tools. Vendor wire formats, auth, and retries live
//! behind the [`ChatTransport`](transport::ChatTransport) trait; function
//! lookup lives behind [`FunctionResolver`](resolver::FunctionResolver).
//!
//! ## Features
//!
//! - 🔁 Buffered and streaming loops over the same transport trait
//! - 🧩 Ordered invocation filters with argument/result override and early
//!   termination
//! - 🛡️ Explicit recursion guard shared across nested runs
//! - 🚫 Cooperative cancellation observable at every suspension point
//! - 📨 Recoverable tool failures reported back to the model, never thrown
//!
//! ## Quick start
//!
//! ```no_run
//! use toolloop::prelude::*;
//!
//! # async fn example(transport: impl ChatTransport) -> Result<(), LoopError> {
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
//! let mut history = vec![ChatMessage::user("Weather in Paris?").build()];
//! let (reply, _rounds) = orchestrator
//!     .run(&mut history, &ExecutionSettings::default(), &registry)
//!     .await?;
//! println!("{}", reply.content_text());
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod accumulator;
pub mod error;
pub mod filter;
pub mod guard;
pub mod orchestrator;
pub mod resolver;
pub mod transport;
pub mod types;
pub mod utils;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::accumulator::ToolCallAccumulator;
    pub use crate::error::LoopError;
    pub use crate::filter::{FilterChain, FilterContinuation, InvocationContext, InvocationFilter};
    pub use crate::guard::{InvocationGuard, InvocationPermit};
    pub use crate::orchestrator::{Orchestrator, RoundResult, StreamOrchestration};
    pub use crate::resolver::{
        ArgumentMap, CallableFunction, FnFunction, FunctionRegistry, FunctionResolver,
        ResolvedFunction,
    };
    pub use crate::transport::ChatTransport;
    pub use crate::types::{
        ChatMessage, ChatResponse, ChatStream, ChatStreamEvent, ChatStreamHandle,
        ExecutionSettings, FinishReason, FunctionCall, MessageRole, Tool, ToolCall, ToolChoice,
        Usage,
    };
    pub use crate::utils::cancel::{CancelHandle, new_cancel_handle};
}
