//! Streaming event types.

use std::pin::Pin;

use futures::Stream;
use serde::{Deserialize, Serialize};

use crate::error::LoopError;
use crate::utils::cancel::CancelHandle;

use super::response::{ChatResponse, Usage};

/// Events emitted by a streaming response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatStreamEvent {
    /// Incremental text content.
    ContentDelta {
        /// The text fragment.
        delta: String,
        /// Choice index, if the provider reports one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
    /// Incremental tool-call fragment.
    ///
    /// Which fields are present varies by fragment: typically the first
    /// fragment for an index carries `id` and `function_name`, later ones
    /// carry `arguments_delta`. A fragment is a tool-call fragment because
    /// any of these fields is present, never because of a type tag.
    ToolCallDelta {
        /// Slot identifying which in-progress call this fragment extends.
        index: usize,
        /// Provider-assigned call id.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        /// Function name fragment.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        function_name: Option<String>,
        /// Argument JSON fragment.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        arguments_delta: Option<String>,
    },
    /// Usage report, possibly mid-stream.
    UsageUpdate {
        /// The usage so far.
        usage: Usage,
    },
    /// Stream finished; carries the assembled response.
    StreamEnd {
        /// The final response.
        response: ChatResponse,
    },
    /// Provider-reported error event.
    Error {
        /// Error description.
        error: String,
    },
}

/// A stream of chat events.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<ChatStreamEvent, LoopError>> + Send>>;

/// A stream paired with the handle that cancels it.
pub struct ChatStreamHandle {
    /// The event stream.
    pub stream: ChatStream,
    /// Cancels the stream; pending `next()` calls wake immediately.
    pub cancel: CancelHandle,
}
