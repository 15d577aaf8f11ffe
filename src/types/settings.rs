//! Execution settings consumed by the orchestration loop.

use serde::{Deserialize, Serialize};

/// Default cap on auto-invocations shared across a recursion scope.
pub const DEFAULT_GLOBAL_AUTO_INVOKE_CAP: usize = 128;

/// How the request should constrain the model's tool usage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    /// The model decides whether to call tools.
    #[default]
    Auto,
    /// The model must not call tools.
    None,
    /// The model must call the named function.
    Required(String),
}

/// Caller-supplied settings for one orchestration run.
///
/// Plain values, read-only for the duration of the run. The recursion scope
/// itself lives in an [`InvocationGuard`](crate::guard::InvocationGuard)
/// handle, never in ambient state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSettings {
    /// Rounds after which tools are dropped from requests entirely.
    pub max_use_attempts: usize,
    /// Rounds allowed to auto-execute tool calls. Once exceeded, tools stay
    /// visible on the wire but requested calls are returned to the caller
    /// unexecuted.
    pub max_auto_invoke_attempts: usize,
    /// Skip the sent-tool-list membership check before resolving a call.
    pub allow_any_requested_function: bool,
    /// Cap on auto-invocations within one recursion scope, counting nested
    /// runs that share a guard.
    pub global_auto_invoke_cap: usize,
    /// Tool-choice policy forwarded to the transport.
    pub tool_choice: ToolChoice,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            max_use_attempts: usize::MAX,
            max_auto_invoke_attempts: 8,
            allow_any_requested_function: false,
            global_auto_invoke_cap: DEFAULT_GLOBAL_AUTO_INVOKE_CAP,
            tool_choice: ToolChoice::Auto,
        }
    }
}

impl ExecutionSettings {
    /// Create settings with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the round cap after which tools are dropped.
    pub fn with_max_use_attempts(mut self, attempts: usize) -> Self {
        self.max_use_attempts = attempts;
        self
    }

    /// Set the round cap for auto-invocation.
    pub fn with_max_auto_invoke_attempts(mut self, attempts: usize) -> Self {
        self.max_auto_invoke_attempts = attempts;
        self
    }

    /// Allow invoking functions that were not in the sent tool list.
    pub fn with_allow_any_requested_function(mut self, allow: bool) -> Self {
        self.allow_any_requested_function = allow;
        self
    }

    /// Set the recursion-scope auto-invocation cap.
    pub fn with_global_auto_invoke_cap(mut self, cap: usize) -> Self {
        self.global_auto_invoke_cap = cap;
        self
    }

    /// Set the tool-choice policy.
    pub fn with_tool_choice(mut self, tool_choice: ToolChoice) -> Self {
        self.tool_choice = tool_choice;
        self
    }
}
