//! Shared test support: a scripted transport and common fixtures.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use toolloop::error::LoopError;
use toolloop::resolver::{ArgumentMap, FunctionRegistry};
use toolloop::transport::ChatTransport;
use toolloop::types::{
    ChatMessage, ChatResponse, ChatStream, ChatStreamEvent, ExecutionSettings, Tool, ToolCall,
};

/// What the transport should do for one round.
pub enum ScriptedRound {
    /// Return this response.
    Respond(ChatResponse),
    /// Fail with a transport error carrying this message.
    Fail(String),
    /// Stream these events.
    Stream(Vec<Result<ChatStreamEvent, LoopError>>),
    /// Stream that never yields, for cancellation tests.
    StreamPending,
}

/// The request a round actually sent, for assertions.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Option<Vec<Tool>>,
}

/// A transport that plays back a script, one entry per round.
pub struct MockTransport {
    script: Mutex<VecDeque<ScriptedRound>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockTransport {
    pub fn new(script: Vec<ScriptedRound>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Requests recorded so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Handle for inspecting requests after the transport was moved.
    pub fn request_log(&self) -> Arc<Mutex<Vec<RecordedRequest>>> {
        Arc::clone(&self.requests)
    }

    fn record(&self, messages: &[ChatMessage], tools: Option<&[Tool]>) -> ScriptedRound {
        self.requests.lock().unwrap().push(RecordedRequest {
            messages: messages.to_vec(),
            tools: tools.map(<[Tool]>::to_vec),
        });
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .expect("transport called more rounds than scripted")
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn send(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[Tool]>,
        _settings: &ExecutionSettings,
    ) -> Result<ChatResponse, LoopError> {
        match self.record(messages, tools) {
            ScriptedRound::Respond(response) => Ok(response),
            ScriptedRound::Fail(message) => Err(LoopError::transport(message)),
            ScriptedRound::Stream(_) | ScriptedRound::StreamPending => {
                panic!("scripted a stream for a buffered round")
            }
        }
    }

    async fn send_streaming(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[Tool]>,
        _settings: &ExecutionSettings,
    ) -> Result<ChatStream, LoopError> {
        match self.record(messages, tools) {
            ScriptedRound::Stream(events) => {
                let stream: ChatStream = Box::pin(futures_util::stream::iter(events));
                Ok(stream)
            }
            ScriptedRound::StreamPending => {
                let stream: ChatStream = Box::pin(futures_util::stream::pending());
                Ok(stream)
            }
            ScriptedRound::Fail(message) => Err(LoopError::transport(message)),
            ScriptedRound::Respond(_) => {
                panic!("scripted a buffered response for a streaming round")
            }
        }
    }
}

/// A response that only carries text.
pub fn text_response(content: &str) -> ChatResponse {
    ChatResponse::new(content)
}

/// A response requesting the given calls.
pub fn tool_call_response(calls: Vec<ToolCall>) -> ChatResponse {
    ChatResponse::default().with_tool_calls(calls)
}

/// The weather tool every test advertises.
pub fn weather_tool() -> Tool {
    Tool::function(
        "weather-lookup",
        "Look up the weather for a city",
        json!({
            "type": "object",
            "properties": {"city": {"type": "string"}},
            "required": ["city"]
        }),
    )
}

/// A registry with a deterministic `weather-lookup` function.
pub fn weather_registry() -> FunctionRegistry {
    let mut registry = FunctionRegistry::new();
    registry.register_fn("weather-lookup", |args: ArgumentMap| async move {
        let city = args
            .get("city")
            .and_then(Value::as_str)
            .unwrap_or("nowhere")
            .to_string();
        Ok(Value::String(format!("sunny in {city}")))
    });
    registry
}

/// A registry whose function counts how many times it ran.
pub fn counting_registry(name: &str) -> (FunctionRegistry, Arc<Mutex<usize>>) {
    let count = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&count);
    let mut registry = FunctionRegistry::new();
    registry.register_fn(name, move |_args: ArgumentMap| {
        let counter = Arc::clone(&counter);
        async move {
            *counter.lock().unwrap() += 1;
            Ok(json!("done"))
        }
    });
    (registry, count)
}

/// A tool call for `weather-lookup` with well-formed arguments.
pub fn weather_call(id: &str, city: &str) -> ToolCall {
    ToolCall::new(id, "weather-lookup", format!("{{\"city\":\"{city}\"}}"))
}
