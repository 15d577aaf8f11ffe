//! The buffered (non-streaming) orchestration loop.

use uuid::Uuid;

use crate::error::LoopError;
use crate::resolver::FunctionResolver;
use crate::transport::ChatTransport;
use crate::types::{ChatMessage, ExecutionSettings};
use crate::utils::cancel::CancelHandle;

use super::Orchestrator;
use super::invoke::{RoundContext, ToolPhase, process_tool_calls};
use super::types::RoundResult;

impl<T: ChatTransport> Orchestrator<T> {
    /// Run the loop to completion.
    ///
    /// Appends every assistant and tool-result message to `history` as it is
    /// produced, so partial progress stays visible if the run fails. Returns
    /// the final message together with the per-round results.
    pub async fn run(
        &self,
        history: &mut Vec<ChatMessage>,
        settings: &ExecutionSettings,
        resolver: &dyn FunctionResolver,
    ) -> Result<(ChatMessage, Vec<RoundResult>), LoopError> {
        let cancel = CancelHandle::new();
        self.run_with_cancel(history, settings, resolver, &cancel).await
    }

    /// Run the loop, observing `cancel` at every suspension point.
    ///
    /// Cancellation surfaces as [`LoopError::Cancelled`]; whatever the run
    /// appended before the cancellation point remains in `history`.
    pub async fn run_with_cancel(
        &self,
        history: &mut Vec<ChatMessage>,
        settings: &ExecutionSettings,
        resolver: &dyn FunctionResolver,
        cancel: &CancelHandle,
    ) -> Result<(ChatMessage, Vec<RoundResult>), LoopError> {
        let run_id = Uuid::new_v4();
        let mut rounds: Vec<RoundResult> = Vec::new();
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
                "sending round request"
            );

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(LoopError::Cancelled),
                response = self.transport.send(history, tools_for_round, settings) => response?,
            };

            let assistant = response.to_assistant_message();
            history.push(assistant.clone());
            let mut round_messages = vec![assistant.clone()];
            let tool_calls = response.tool_calls.clone();

            // No tool calls is the only normal termination signal. Requested
            // calls also go back to the caller unexecuted when this round
            // could not auto-invoke them.
            if tool_calls.is_empty() || !auto_invoke || tools_for_round.is_none() {
                let round = RoundResult {
                    messages: round_messages,
                    finish_reason: response.finish_reason.clone(),
                    usage: response.usage.clone(),
                    tool_calls,
                };
                self.finish_round(&mut rounds, round);
                tracing::debug!(%run_id, round_index, "run finished");
                return Ok((assistant, rounds));
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
            self.finish_round(&mut rounds, round);

            match phase {
                ToolPhase::Continue => {}
                ToolPhase::Terminated(message) => {
                    tracing::debug!(%run_id, round_index, "run terminated by filter");
                    return Ok((message, rounds));
                }
                ToolPhase::Exhausted => {
                    tracing::debug!(%run_id, round_index, "run stopped by exhausted guard");
                    return Ok((assistant, rounds));
                }
            }
            round_index += 1;
        }
    }

    pub(super) fn finish_round(&self, rounds: &mut Vec<RoundResult>, round: RoundResult) {
        if let Some(callback) = &self.on_round_finish {
            callback(&round);
        }
        rounds.push(round);
    }
}
