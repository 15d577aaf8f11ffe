//! Orchestration result types.

use std::sync::Arc;

use crate::types::{ChatMessage, ChatStream, FinishReason, ToolCall, Usage};
use crate::utils::cancel::CancelHandle;

/// The messages and bookkeeping produced by one round.
#[derive(Debug, Clone)]
pub struct RoundResult {
    /// Messages this round appended to history: the assistant message,
    /// followed by one tool-result message per processed call.
    pub messages: Vec<ChatMessage>,
    /// Finish reason reported for the round, surfaced but never consulted
    /// for the invoke/stop decision.
    pub finish_reason: Option<FinishReason>,
    /// Usage reported for the round.
    pub usage: Option<Usage>,
    /// Tool calls the model requested this round.
    pub tool_calls: Vec<ToolCall>,
}

impl RoundResult {
    /// Sum usage across rounds; `None` if no round reported any.
    pub fn merge_usage(rounds: &[RoundResult]) -> Option<Usage> {
        let mut merged: Option<Usage> = None;
        for round in rounds {
            if let Some(usage) = &round.usage {
                merged.get_or_insert_with(Usage::default).add(usage);
            }
        }
        merged
    }
}

/// Callback invoked after each round completes.
pub type RoundCallback = Arc<dyn Fn(&RoundResult) + Send + Sync>;

/// Handle to a running streaming orchestration.
pub struct StreamOrchestration {
    /// Live event stream: forwarded deltas from every round, ending with a
    /// `StreamEnd` event carrying the final response (or an error item).
    pub stream: ChatStream,
    /// Resolves with the per-round results once the run finishes.
    pub rounds: tokio::sync::oneshot::Receiver<Vec<RoundResult>>,
    /// Cancels the run at its next suspension point.
    pub cancel: CancelHandle,
}
