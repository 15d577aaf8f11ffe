//! Per-round tool-call processing, shared by the buffered and streaming
//! loops.
//!
//! Tool-level failures never abort the run. Each failure mode maps to a
//! fixed message string appended as that call's tool result, so the model
//! can see what went wrong and correct itself on the next round.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::error::LoopError;
use crate::filter::{FilterChain, FilterContinuation, InvocationContext, InvocationFilter};
use crate::guard::InvocationGuard;
use crate::resolver::{CallableFunction, FunctionResolver};
use crate::types::{ChatMessage, ExecutionSettings, Tool, ToolCall};
use crate::utils::cancel::CancelHandle;

/// Tool result for a call whose argument payload was not valid JSON.
pub const INVALID_ARGUMENTS_MESSAGE: &str = "Error: Function call arguments were invalid JSON.";

/// Tool result for a call naming a function outside the sent tool list.
pub const FUNCTION_NOT_DEFINED_MESSAGE: &str =
    "Error: Function call request for a function that wasn't defined.";

/// Tool result for a call the resolver could not map to a function.
pub const FUNCTION_NOT_FOUND_MESSAGE: &str = "Error: Requested function could not be found.";

/// Tool result for a `Value::Null` (or absent) function result.
pub const EMPTY_RESULT_MESSAGE: &str = "Completed successfully with no return value";

/// How a round's tool processing concluded.
pub(super) enum ToolPhase {
    /// All calls processed; the loop continues with another round.
    Continue,
    /// A filter requested termination; the run ends with this message.
    Terminated(ChatMessage),
    /// The recursion scope is out of auto-invocation budget; the run ends
    /// with the raw assistant tool-call message, nothing executed further.
    Exhausted,
}

/// Borrowed state a round needs to process its tool calls.
pub(super) struct RoundContext<'a> {
    pub settings: &'a ExecutionSettings,
    pub resolver: &'a dyn FunctionResolver,
    pub filters: &'a FilterChain,
    pub guard: &'a InvocationGuard,
    pub cancel: &'a CancelHandle,
    pub round_index: usize,
}

/// Chain terminal that runs the resolved function and stores its result.
struct FunctionTerminal {
    callable: Arc<dyn CallableFunction>,
}

#[async_trait]
impl InvocationFilter for FunctionTerminal {
    async fn on_invoke(
        &self,
        ctx: &mut InvocationContext,
        _next: FilterContinuation<'_>,
    ) -> Result<(), LoopError> {
        let value = self.callable.invoke(&ctx.arguments).await?;
        ctx.result = Some(value);
        Ok(())
    }
}

/// Process the round's tool calls in arrival order.
///
/// Appends one tool-result message per processed call to both `history` and
/// `round_messages` immediately, so partial progress stays visible even when
/// a later call fails or the run is cancelled.
pub(super) async fn process_tool_calls(
    round: &RoundContext<'_>,
    history: &mut Vec<ChatMessage>,
    round_messages: &mut Vec<ChatMessage>,
    tool_calls: &[ToolCall],
    sent_tools: Option<&[Tool]>,
) -> Result<ToolPhase, LoopError> {
    let call_count = tool_calls.len();
    for (call_index, call) in tool_calls.iter().enumerate() {
        if round.cancel.is_cancelled() {
            return Err(LoopError::Cancelled);
        }

        // Arguments must parse to a JSON object before anything runs.
        let arguments = match serde_json::from_str::<Value>(&call.function.arguments) {
            Ok(Value::Object(map)) => map,
            Ok(_) | Err(_) => {
                tracing::warn!(
                    function = %call.function.name,
                    call_id = %call.id,
                    "tool call arguments were not a valid JSON object"
                );
                append_tool_result(history, round_messages, call, INVALID_ARGUMENTS_MESSAGE);
                continue;
            }
        };

        // The model may only call what this round's request advertised,
        // unless the caller opted out of that check.
        if !round.settings.allow_any_requested_function
            && !is_defined(sent_tools, &call.function.name)
        {
            tracing::warn!(
                function = %call.function.name,
                call_id = %call.id,
                "tool call requested a function that was not advertised"
            );
            append_tool_result(history, round_messages, call, FUNCTION_NOT_DEFINED_MESSAGE);
            continue;
        }

        let Some(resolved) = round.resolver.resolve(&call.function.name, &arguments) else {
            tracing::warn!(
                function = %call.function.name,
                call_id = %call.id,
                "tool call requested a function the resolver does not know"
            );
            append_tool_result(history, round_messages, call, FUNCTION_NOT_FOUND_MESSAGE);
            continue;
        };

        let Some(permit) = round.guard.try_acquire(round.settings.global_auto_invoke_cap) else {
            tracing::warn!(
                function = %call.function.name,
                in_flight = round.guard.in_flight(),
                cap = round.settings.global_auto_invoke_cap,
                "auto-invocation budget exhausted; returning tool calls unexecuted"
            );
            return Ok(ToolPhase::Exhausted);
        };

        let mut ctx = InvocationContext::new(
            call.function.name.clone(),
            call.plugin_name().map(str::to_string),
            resolved.arguments,
            round.round_index,
            call_index,
            call_count,
            round.guard.clone(),
        );
        let terminal = FunctionTerminal {
            callable: resolved.callable,
        };

        let outcome = tokio::select! {
            biased;
            _ = round.cancel.cancelled() => {
                // Permit drops here, releasing the slot.
                return Err(LoopError::Cancelled);
            }
            outcome = round.filters.invoke(&mut ctx, &terminal) => outcome,
        };
        drop(permit);

        let content = match outcome {
            Ok(()) => render_result(ctx.result.take()),
            Err(error) => {
                tracing::warn!(
                    function = %call.function.name,
                    call_id = %call.id,
                    %error,
                    "tool invocation attempt failed"
                );
                format!("Error: Exception while invoking function. {error}")
            }
        };

        let message = ChatMessage::tool_result(call.id.clone(), content).build();
        history.push(message.clone());
        round_messages.push(message.clone());

        if ctx.terminate {
            tracing::debug!(
                function = %call.function.name,
                "filter requested early termination"
            );
            return Ok(ToolPhase::Terminated(message));
        }
    }
    Ok(ToolPhase::Continue)
}

fn is_defined(sent_tools: Option<&[Tool]>, name: &str) -> bool {
    sent_tools.is_some_and(|tools| {
        tools
            .iter()
            .any(|tool| tool.function.name.eq_ignore_ascii_case(name))
    })
}

fn append_tool_result(
    history: &mut Vec<ChatMessage>,
    round_messages: &mut Vec<ChatMessage>,
    call: &ToolCall,
    content: &str,
) {
    let message = ChatMessage::tool_result(call.id.clone(), content).build();
    history.push(message.clone());
    round_messages.push(message);
}

/// Map a function result to tool-result message content.
///
/// Strings pass through unchanged; null and absent results map to the
/// success placeholder; everything else is serialized as JSON.
fn render_result(value: Option<Value>) -> String {
    match value {
        None | Some(Value::Null) => EMPTY_RESULT_MESSAGE.to_string(),
        Some(Value::String(text)) => text,
        Some(other) => other.to_string(),
    }
}
