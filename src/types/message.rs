//! Chat message types and builder.

use serde::{Deserialize, Serialize};

use super::tools::ToolCall;

/// Role of a message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instruction.
    System,
    /// End-user input.
    User,
    /// Model output, possibly carrying tool calls.
    Assistant,
    /// Result of a tool invocation, correlated by `tool_call_id`.
    Tool,
}

/// A single message in a conversation.
///
/// History is a caller-owned `Vec<ChatMessage>`; the orchestrator only ever
/// appends to it, so partial progress stays visible when a run fails.
///
/// # Example
///
/// ```
/// use toolloop::types::ChatMessage;
///
/// let msg = ChatMessage::user("What's the weather in Paris?").build();
/// let system = ChatMessage::system("You are a helpful assistant").build();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role.
    pub role: MessageRole,
    /// Text content. May be empty for assistant messages that only carry
    /// tool calls.
    pub content: String,
    /// Tool calls requested by an assistant message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Id of the tool call this message answers (tool role only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    /// Start building a user message.
    pub fn user(content: impl Into<String>) -> ChatMessageBuilder {
        ChatMessageBuilder::new(MessageRole::User, content)
    }

    /// Start building a system message.
    pub fn system(content: impl Into<String>) -> ChatMessageBuilder {
        ChatMessageBuilder::new(MessageRole::System, content)
    }

    /// Start building an assistant message.
    pub fn assistant(content: impl Into<String>) -> ChatMessageBuilder {
        ChatMessageBuilder::new(MessageRole::Assistant, content)
    }

    /// Start building a tool-result message answering `tool_call_id`.
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        content: impl Into<String>,
    ) -> ChatMessageBuilder {
        let mut builder = ChatMessageBuilder::new(MessageRole::Tool, content);
        builder.tool_call_id = Some(tool_call_id.into());
        builder
    }

    /// Whether this message carries tool calls.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }

    /// The text content of this message.
    pub fn content_text(&self) -> &str {
        &self.content
    }
}

/// Builder for [`ChatMessage`].
#[derive(Debug, Clone)]
pub struct ChatMessageBuilder {
    role: MessageRole,
    content: String,
    tool_calls: Vec<ToolCall>,
    tool_call_id: Option<String>,
}

impl ChatMessageBuilder {
    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Attach tool calls (assistant messages).
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = tool_calls;
        self
    }

    /// Finish building the message.
    pub fn build(self) -> ChatMessage {
        ChatMessage {
            role: self.role,
            content: self.content,
            tool_calls: self.tool_calls,
            tool_call_id: self.tool_call_id,
        }
    }
}
