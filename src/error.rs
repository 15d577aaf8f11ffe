//! Error Handling Module
//!
//! Defines the fatal error taxonomy of the orchestration loop. Tool-level
//! failures (bad arguments, unknown functions, exceptions inside an invoked
//! function) are deliberately *not* represented here: they are recoverable and
//! are surfaced to the model as tool-result messages so the conversation can
//! continue. Only failures that abort a run reach this type.

use thiserror::Error;

/// Fatal errors returned by the orchestration loop.
#[derive(Debug, Error)]
pub enum LoopError {
    /// The transport failed to deliver a request or response.
    ///
    /// Transport failures are propagated unchanged to the caller; retry, if
    /// any, is the transport's responsibility.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// A streaming response failed mid-flight.
    #[error("Stream error: {0}")]
    StreamError(String),

    /// Failed to parse data that must be well-formed to proceed.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// An invoked function failed.
    ///
    /// Inside the loop this is captured and converted into a tool-result
    /// message; it only escapes through resolver/filter implementations that
    /// surface it directly.
    #[error("Function execution error: {0}")]
    ExecutionError(String),

    /// Invalid caller-supplied configuration.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The run was cancelled through its cancel handle.
    #[error("Operation was cancelled")]
    Cancelled,

    /// Internal invariant violation.
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl LoopError {
    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::TransportError(message.into())
    }

    /// Create a stream error.
    pub fn stream(message: impl Into<String>) -> Self {
        Self::StreamError(message.into())
    }

    /// Create an execution error.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::ExecutionError(message.into())
    }

    /// Whether this error originated in the transport layer.
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::TransportError(_) | Self::StreamError(_))
    }

    /// Whether this error is the result of cooperative cancellation.
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
