//! The streaming orchestration loop.
//!
//! Each round streams; text and tool-call deltas are forwarded to the caller
//! as they arrive, while the accumulator assembles the round's response for
//! the loop itself. The run executes on a spawned task, so the caller
//! consumes the event stream at its own pace and receives the per-round
//! results through a oneshot channel once the run ends.

use futures::StreamExt;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::accumulator::ToolCallAccumulator;
use crate::error::LoopError;
use crate::resolver::FunctionResolver;
use crate::transport::ChatTransport;
use crate::types::{
    ChatMessage, ChatResponse, ChatStreamEvent, ChatStreamHandle, ExecutionSettings, Usage,
};
use crate::utils::cancel::{CancelHandle, new_cancel_handle};

use super::Orchestrator;
use super::invoke::{RoundContext, ToolPhase, process_tool_calls};
use super::types::{RoundResult, StreamOrchestration};

type EventSender = mpsc::Sender<Result<ChatStreamEvent, LoopError>>;

impl<T: ChatTransport + 'static> Orchestrator<T> {
    /// Run the loop on a spawned task, streaming events as they arrive.
    ///
    /// The returned stream forwards every round's deltas and ends with a
    /// [`ChatStreamEvent::StreamEnd`] carrying the final response, or with a
    /// single error item. Cancelling through the returned handle stops the
    /// run at its next suspension point; events already forwarded stay
    /// delivered.
    pub fn run_streaming<R>(
        self,
        mut history: Vec<ChatMessage>,
        settings: ExecutionSettings,
        resolver: R,
    ) -> StreamOrchestration
    where
        R: FunctionResolver + 'static,
    {
        let (event_tx, event_rx) = mpsc::channel::<Result<ChatStreamEvent, LoopError>>(64);
        let (rounds_tx, rounds_rx) = oneshot::channel();
        let cancel = new_cancel_handle();
        let task_cancel = cancel.clone();

        tokio::spawn(async move {
            let mut rounds = Vec::new();
            let outcome = self
                .drive_streaming(
                    &mut history,
                    &settings,
                    &resolver,
                    &task_cancel,
                    &event_tx,
                    &mut rounds,
                )
                .await;
            match outcome {
                Ok(response) => {
                    let _ = event_tx
                        .send(Ok(ChatStreamEvent::StreamEnd { response }))
                        .await;
                }
                Err(error) => {
                    let _ = event_tx.send(Err(error)).await;
                }
            }
            let _ = rounds_tx.send(rounds);
        });

        let stream = async_stream::stream! {
            let mut event_rx = event_rx;
            while let Some(item) = event_rx.recv().await {
                yield item;
            }
        };

        StreamOrchestration {
            stream: Box::pin(stream),
            rounds: rounds_rx,
            cancel,
        }
    }

    async fn drive_streaming(
        &self,
        history: &mut Vec<ChatMessage>,
        settings: &ExecutionSettings,
        resolver: &dyn FunctionResolver,
        cancel: &CancelHandle,
        events: &EventSender,
        rounds: &mut Vec<RoundResult>,
    ) -> Result<ChatResponse, LoopError> {
        let run_id = Uuid::new_v4();
        let mut tools_introduced = false;
        let mut round_index = 0usize;

        loop {
            let auto_invoke = round_index < settings.max_auto_invoke_attempts;
            let tools_for_round =
                self.round_tools(settings, round_index, auto_invoke, tools_introduced);
            tools_introduced |= tools_for_round.is_some();

            tracing::debug!(
                %run_id,
                round_index,
                auto_invoke,
                tools = tools_for_round.map_or(0, |tools| tools.len()),
                "opening round stream"
            );

            let handle = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(LoopError::Cancelled),
                handle = self.transport.send_streaming_with_cancel(
                    history,
                    tools_for_round,
                    settings,
                ) => handle?,
            };

            let response = consume_round_stream(handle, cancel, events).await?;

            let assistant = response.to_assistant_message();
            history.push(assistant.clone());
            let mut round_messages = vec![assistant.clone()];
            let tool_calls = response.tool_calls.clone();

            if tool_calls.is_empty() || !auto_invoke || tools_for_round.is_none() {
                let round = RoundResult {
                    messages: round_messages,
                    finish_reason: response.finish_reason.clone(),
                    usage: response.usage.clone(),
                    tool_calls,
                };
                self.finish_round(rounds, round);
                tracing::debug!(%run_id, round_index, "streaming run finished");
                return Ok(response);
            }

            let round_ctx = RoundContext {
                settings,
                resolver,
                filters: &self.filters,
                guard: &self.guard,
                cancel,
                round_index,
            };
            let phase = process_tool_calls(
                &round_ctx,
                history,
                &mut round_messages,
                &tool_calls,
                tools_for_round,
            )
            .await?;

            let round = RoundResult {
                messages: round_messages,
                finish_reason: response.finish_reason.clone(),
                usage: response.usage.clone(),
                tool_calls,
            };
            self.finish_round(rounds, round);

            match phase {
                ToolPhase::Continue => {}
                ToolPhase::Terminated(message) => {
                    tracing::debug!(%run_id, round_index, "streaming run terminated by filter");
                    return Ok(ChatResponse::new(message.content));
                }
                ToolPhase::Exhausted => {
                    tracing::debug!(%run_id, round_index, "streaming run stopped by exhausted guard");
                    return Ok(response);
                }
            }
            round_index += 1;
        }
    }
}

/// Drain one round's stream, forwarding deltas and assembling the response.
///
/// The provider's own `StreamEnd` is absorbed rather than forwarded; the
/// orchestrator emits a single `StreamEnd` for the whole run. Fields the
/// provider left off the final response are filled from the accumulated
/// deltas.
async fn consume_round_stream(
    handle: ChatStreamHandle,
    cancel: &CancelHandle,
    events: &EventSender,
) -> Result<ChatResponse, LoopError> {
    let ChatStreamHandle {
        mut stream,
        cancel: round_cancel,
    } = handle;

    let mut accumulator = ToolCallAccumulator::new();
    let mut usage: Option<Usage> = None;
    let mut final_response: Option<ChatResponse> = None;

    loop {
        let item = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                round_cancel.cancel();
                return Err(LoopError::Cancelled);
            }
            item = stream.next() => item,
        };
        let Some(item) = item else { break };
        let event = item?;

        accumulator.push_event(&event);
        match event {
            ChatStreamEvent::StreamEnd { response } => {
                final_response = Some(response);
            }
            ChatStreamEvent::UsageUpdate { usage: reported } => {
                usage = Some(reported.clone());
                let _ = events
                    .send(Ok(ChatStreamEvent::UsageUpdate { usage: reported }))
                    .await;
            }
            other => {
                let _ = events.send(Ok(other)).await;
            }
        }
    }

    let mut response = final_response.unwrap_or_default();
    if response.content.is_none() && !accumulator.text().is_empty() {
        response.content = Some(accumulator.text().to_string());
    }
    if response.tool_calls.is_empty() {
        response.tool_calls = accumulator.finalize();
    }
    if response.usage.is_none() {
        response.usage = usage;
    }
    Ok(response)
}
