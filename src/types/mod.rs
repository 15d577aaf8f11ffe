//! Core type definitions shared across the crate.

mod message;
mod response;
mod settings;
mod streaming;
mod tools;

pub use message::{ChatMessage, ChatMessageBuilder, MessageRole};
pub use response::{ChatResponse, FinishReason, Usage};
pub use settings::{DEFAULT_GLOBAL_AUTO_INVOKE_CAP, ExecutionSettings, ToolChoice};
pub use streaming::{ChatStream, ChatStreamEvent, ChatStreamHandle};
pub use tools::{FunctionCall, NAME_SEPARATOR, Tool, ToolCall, ToolFunction};
