//! Assembly of streamed tool-call fragments.
//!
//! Providers stream tool calls as fragments keyed by a slot index: the first
//! fragment for an index usually carries the call id and function name, later
//! fragments carry argument text. The accumulator buffers fragments per index
//! and concatenates in arrival order, so the assembled calls are identical no
//! matter how the provider chunked the stream.

use std::collections::BTreeMap;

use crate::types::{ChatStreamEvent, ToolCall};

/// Accumulates streamed tool-call fragments and text deltas into a complete
/// response.
///
/// # Example
///
/// ```
/// use toolloop::accumulator::ToolCallAccumulator;
///
/// let mut acc = ToolCallAccumulator::new();
/// acc.push_delta(0, Some("call_1"), Some("weather-lookup"), None);
/// acc.push_delta(0, None, None, Some("{\"city\":"));
/// acc.push_delta(0, None, None, Some("\"Paris\"}"));
/// let calls = acc.finalize();
/// assert_eq!(calls[0].function.arguments, "{\"city\":\"Paris\"}");
/// ```
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    entries: BTreeMap<usize, ToolCallBuffer>,
    text: String,
}

#[derive(Debug, Default)]
struct ToolCallBuffer {
    id: String,
    name: String,
    arguments: String,
}

impl ToolCallAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one tool-call fragment for `index`.
    ///
    /// A fragment with no id, no name, and no argument text carries no
    /// information and is ignored; it does not open a buffer for `index`.
    /// Returns whether the fragment contributed anything.
    pub fn push_delta(
        &mut self,
        index: usize,
        id: Option<&str>,
        function_name: Option<&str>,
        arguments_delta: Option<&str>,
    ) -> bool {
        let has_fragment = id.is_some_and(|s| !s.is_empty())
            || function_name.is_some_and(|s| !s.is_empty())
            || arguments_delta.is_some_and(|s| !s.is_empty());
        if !has_fragment {
            return false;
        }

        let buffer = self.entries.entry(index).or_default();
        if let Some(id) = id {
            buffer.id.push_str(id);
        }
        if let Some(name) = function_name {
            buffer.name.push_str(name);
        }
        if let Some(arguments) = arguments_delta {
            buffer.arguments.push_str(arguments);
        }
        true
    }

    /// Feed one text delta.
    pub fn push_content(&mut self, delta: &str) {
        self.text.push_str(delta);
    }

    /// Feed any stream event, routing deltas to the right buffer.
    ///
    /// Non-delta events are ignored.
    pub fn push_event(&mut self, event: &ChatStreamEvent) {
        match event {
            ChatStreamEvent::ContentDelta { delta, .. } => self.push_content(delta),
            ChatStreamEvent::ToolCallDelta {
                index,
                id,
                function_name,
                arguments_delta,
            } => {
                self.push_delta(
                    *index,
                    id.as_deref(),
                    function_name.as_deref(),
                    arguments_delta.as_deref(),
                );
            }
            _ => {}
        }
    }

    /// Accumulated text content so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether any tool-call fragments have been seen.
    pub fn has_tool_calls(&self) -> bool {
        !self.entries.is_empty()
    }

    /// Assemble the completed tool calls, ordered by index.
    ///
    /// Does not consume the buffers; calling twice yields the same result.
    pub fn finalize(&self) -> Vec<ToolCall> {
        self.entries
            .values()
            .map(|buffer| ToolCall::new(&buffer.id, &buffer.name, &buffer.arguments))
            .collect()
    }
}
