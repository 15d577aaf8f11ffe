//! Transport abstraction.
//!
//! The orchestrator never speaks a vendor wire format. It hands a transport
//! the current history, the tool list for this round (or `None` when tools
//! have been dropped), and the execution settings, and gets back either a
//! complete [`ChatResponse`] or a stream of [`ChatStreamEvent`]s. Auth,
//! retries, and schema mapping all live behind this trait.

use async_trait::async_trait;

use crate::error::LoopError;
use crate::types::{ChatMessage, ChatResponse, ChatStream, ChatStreamHandle, ExecutionSettings, Tool};
use crate::utils::cancel::make_cancellable_stream;

/// One round-trip to a chat-completion service.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send the conversation and wait for the complete response.
    async fn send(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[Tool]>,
        settings: &ExecutionSettings,
    ) -> Result<ChatResponse, LoopError>;

    /// Send the conversation and stream the response.
    ///
    /// The stream should end with a [`ChatStreamEvent::StreamEnd`] carrying
    /// the assembled response when the provider supports it; the orchestrator
    /// assembles one from the deltas otherwise.
    ///
    /// [`ChatStreamEvent::StreamEnd`]: crate::types::ChatStreamEvent::StreamEnd
    async fn send_streaming(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[Tool]>,
        settings: &ExecutionSettings,
    ) -> Result<ChatStream, LoopError>;

    /// Stream the response together with a handle that can stop it.
    async fn send_streaming_with_cancel(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[Tool]>,
        settings: &ExecutionSettings,
    ) -> Result<ChatStreamHandle, LoopError> {
        let stream = self.send_streaming(messages, tools, settings).await?;
        let (stream, cancel) = make_cancellable_stream(stream);
        Ok(ChatStreamHandle { stream, cancel })
    }
}

#[async_trait]
impl<T: ChatTransport + ?Sized> ChatTransport for std::sync::Arc<T> {
    async fn send(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[Tool]>,
        settings: &ExecutionSettings,
    ) -> Result<ChatResponse, LoopError> {
        (**self).send(messages, tools, settings).await
    }

    async fn send_streaming(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[Tool]>,
        settings: &ExecutionSettings,
    ) -> Result<ChatStream, LoopError> {
        (**self).send_streaming(messages, tools, settings).await
    }

    async fn send_streaming_with_cancel(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[Tool]>,
        settings: &ExecutionSettings,
    ) -> Result<ChatStreamHandle, LoopError> {
        (**self).send_streaming_with_cancel(messages, tools, settings).await
    }
}
