//! Tests for invocation filters and the recursion guard through the public
//! loop API.

mod support;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use support::{
    MockTransport, ScriptedRound, counting_registry, text_response, tool_call_response,
    weather_call, weather_registry, weather_tool,
};
use toolloop::error::LoopError;
use toolloop::filter::{FilterChain, FilterContinuation, InvocationContext, InvocationFilter};
use toolloop::guard::InvocationGuard;
use toolloop::orchestrator::Orchestrator;
use toolloop::types::{ChatMessage, ExecutionSettings, MessageRole};

/// Rewrites the `city` argument before the function runs.
struct RedirectCity;

#[async_trait]
impl InvocationFilter for RedirectCity {
    async fn on_invoke(
        &self,
        ctx: &mut InvocationContext,
        next: FilterContinuation<'_>,
    ) -> Result<(), LoopError> {
        ctx.arguments.insert("city".to_string(), json!("Lyon"));
        next.proceed(ctx).await
    }
}

/// Answers every invocation itself without running the function.
struct CannedAnswer;

#[async_trait]
impl InvocationFilter for CannedAnswer {
    async fn on_invoke(
        &self,
        ctx: &mut InvocationContext,
        _next: FilterContinuation<'_>,
    ) -> Result<(), LoopError> {
        ctx.result = Some(json!("from cache"));
        Ok(())
    }
}

/// Lets the function run, then ends the run after its result is appended.
struct TerminateAfterFirst;

#[async_trait]
impl InvocationFilter for TerminateAfterFirst {
    async fn on_invoke(
        &self,
        ctx: &mut InvocationContext,
        next: FilterContinuation<'_>,
    ) -> Result<(), LoopError> {
        next.proceed(ctx).await?;
        ctx.terminate = true;
        Ok(())
    }
}

/// Records what the guard looked like while the function was in flight.
struct GuardObserver {
    observed: Arc<Mutex<Vec<usize>>>,
}

#[async_trait]
impl InvocationFilter for GuardObserver {
    async fn on_invoke(
        &self,
        ctx: &mut InvocationContext,
        next: FilterContinuation<'_>,
    ) -> Result<(), LoopError> {
        self.observed.lock().unwrap().push(ctx.guard().in_flight());
        next.proceed(ctx).await
    }
}

fn user_history(content: &str) -> Vec<ChatMessage> {
    vec![ChatMessage::user(content).build()]
}

#[tokio::test]
async fn filter_can_rewrite_arguments_before_execution() {
    let transport = MockTransport::new(vec![
        ScriptedRound::Respond(tool_call_response(vec![weather_call("call_1", "Paris")])),
        ScriptedRound::Respond(text_response("ok")),
    ]);
    let orchestrator = Orchestrator::new(transport, vec![weather_tool()])
        .with_filter(Arc::new(RedirectCity));
    let mut history = user_history("Weather in Paris?");

    orchestrator
        .run(&mut history, &ExecutionSettings::default(), &weather_registry())
        .await
        .unwrap();

    assert_eq!(history[2].content_text(), "sunny in Lyon");
}

#[tokio::test]
async fn filter_that_skips_proceed_supplies_the_result() {
    let transport = MockTransport::new(vec![
        ScriptedRound::Respond(tool_call_response(vec![weather_call("call_1", "Paris")])),
        ScriptedRound::Respond(text_response("ok")),
    ]);
    let (registry, count) = counting_registry("weather-lookup");
    let orchestrator = Orchestrator::new(transport, vec![weather_tool()])
        .with_filter(Arc::new(CannedAnswer));
    let mut history = user_history("Weather?");

    orchestrator
        .run(&mut history, &ExecutionSettings::default(), &registry)
        .await
        .unwrap();

    assert_eq!(history[2].content_text(), "from cache");
    assert_eq!(*count.lock().unwrap(), 0);
}

#[tokio::test]
async fn termination_stops_the_round_mid_call_list() {
    let transport = MockTransport::new(vec![ScriptedRound::Respond(tool_call_response(vec![
        weather_call("call_1", "Paris"),
        weather_call("call_2", "Tokyo"),
    ]))]);
    let (registry, count) = counting_registry("weather-lookup");
    let orchestrator = Orchestrator::new(transport, vec![weather_tool()])
        .with_filter(Arc::new(TerminateAfterFirst));
    let mut history = user_history("Compare the weather");

    let (reply, rounds) = orchestrator
        .run(&mut history, &ExecutionSettings::default(), &registry)
        .await
        .unwrap();

    // Only the first call ran; the run ended with its tool result.
    assert_eq!(*count.lock().unwrap(), 1);
    assert_eq!(reply.role, MessageRole::Tool);
    assert_eq!(reply.tool_call_id.as_deref(), Some("call_1"));
    assert_eq!(rounds.len(), 1);
    // user, assistant, one tool result.
    assert_eq!(history.len(), 3);
}

#[tokio::test]
async fn filters_compose_in_insertion_order() {
    let transport = MockTransport::new(vec![
        ScriptedRound::Respond(tool_call_response(vec![weather_call("call_1", "Paris")])),
        ScriptedRound::Respond(text_response("ok")),
    ]);
    // CannedAnswer sits first, so RedirectCity never runs the function either.
    let chain = FilterChain::new()
        .with(Arc::new(CannedAnswer))
        .with(Arc::new(RedirectCity));
    let (registry, count) = counting_registry("weather-lookup");
    let orchestrator = Orchestrator::new(transport, vec![weather_tool()]).with_filters(chain);
    let mut history = user_history("Weather?");

    orchestrator
        .run(&mut history, &ExecutionSettings::default(), &registry)
        .await
        .unwrap();

    assert_eq!(history[2].content_text(), "from cache");
    assert_eq!(*count.lock().unwrap(), 0);
}

#[tokio::test]
async fn guard_slot_is_held_during_invocation() {
    let transport = MockTransport::new(vec![
        ScriptedRound::Respond(tool_call_response(vec![weather_call("call_1", "Paris")])),
        ScriptedRound::Respond(text_response("ok")),
    ]);
    let observed = Arc::new(Mutex::new(Vec::new()));
    let orchestrator = Orchestrator::new(transport, vec![weather_tool()])
        .with_filter(Arc::new(GuardObserver {
            observed: Arc::clone(&observed),
        }));
    let mut history = user_history("Weather?");

    orchestrator
        .run(&mut history, &ExecutionSettings::default(), &weather_registry())
        .await
        .unwrap();

    assert_eq!(*observed.lock().unwrap(), vec![1]);
    assert_eq!(orchestrator.guard().in_flight(), 0);
}

#[tokio::test]
async fn exhausted_guard_returns_the_raw_tool_call_message() {
    let transport = MockTransport::new(vec![ScriptedRound::Respond(tool_call_response(vec![
        weather_call("call_1", "Paris"),
    ]))]);
    let (registry, count) = counting_registry("weather-lookup");
    let orchestrator = Orchestrator::new(transport, vec![weather_tool()]);
    let mut history = user_history("Weather?");
    let settings = ExecutionSettings::new().with_global_auto_invoke_cap(0);

    let (reply, rounds) = orchestrator
        .run(&mut history, &settings, &registry)
        .await
        .unwrap();

    assert_eq!(*count.lock().unwrap(), 0);
    assert!(reply.has_tool_calls());
    assert_eq!(rounds.len(), 1);
    // The assistant message is in history but no tool result follows it.
    assert_eq!(history.len(), 2);
}

#[tokio::test]
async fn shared_guard_budget_spans_nested_scopes() {
    // An outer permit held while a run executes models a nested orchestration
    // sharing the guard: with a cap of one the run cannot acquire a slot.
    let guard = InvocationGuard::new();
    let outer_permit = guard.try_acquire(1).expect("outer slot");

    let transport = MockTransport::new(vec![ScriptedRound::Respond(tool_call_response(vec![
        weather_call("call_1", "Paris"),
    ]))]);
    let (registry, count) = counting_registry("weather-lookup");
    let orchestrator =
        Orchestrator::new(transport, vec![weather_tool()]).with_guard(guard.clone());
    let mut history = user_history("Weather?");
    let settings = ExecutionSettings::new().with_global_auto_invoke_cap(1);

    let (reply, _) = orchestrator
        .run(&mut history, &settings, &registry)
        .await
        .unwrap();

    assert_eq!(*count.lock().unwrap(), 0);
    assert!(reply.has_tool_calls());

    // Releasing the outer slot restores the budget for a fresh run.
    drop(outer_permit);
    assert_eq!(guard.in_flight(), 0);
}

#[tokio::test]
async fn nested_run_through_a_filter_inherits_the_budget() {
    struct NestedRun {
        inner_transport: Arc<MockTransport>,
        inner_reply_had_calls: Arc<Mutex<Option<bool>>>,
    }

    #[async_trait]
    impl InvocationFilter for NestedRun {
        async fn on_invoke(
            &self,
            ctx: &mut InvocationContext,
            next: FilterContinuation<'_>,
        ) -> Result<(), LoopError> {
            // Start a nested orchestration that shares this run's guard. The
            // outer call holds the only slot, so the nested round must come
            // back unexecuted.
            let nested = Orchestrator::new(
                Arc::clone(&self.inner_transport),
                vec![support::weather_tool()],
            )
            .with_guard(ctx.guard().clone());
            let settings = ExecutionSettings::new().with_global_auto_invoke_cap(1);
            let (reply, _) = nested
                .run(
                    &mut vec![ChatMessage::user("nested").build()],
                    &settings,
                    &support::weather_registry(),
                )
                .await?;
            *self.inner_reply_had_calls.lock().unwrap() = Some(reply.has_tool_calls());
            next.proceed(ctx).await
        }
    }

    let inner_transport = Arc::new(MockTransport::new(vec![ScriptedRound::Respond(
        tool_call_response(vec![weather_call("nested_1", "Tokyo")]),
    )]));
    let inner_reply_had_calls = Arc::new(Mutex::new(None));

    let transport = MockTransport::new(vec![
        ScriptedRound::Respond(tool_call_response(vec![weather_call("call_1", "Paris")])),
        ScriptedRound::Respond(text_response("done")),
    ]);
    let orchestrator = Orchestrator::new(transport, vec![weather_tool()]).with_filter(Arc::new(
        NestedRun {
            inner_transport,
            inner_reply_had_calls: Arc::clone(&inner_reply_had_calls),
        },
    ));
    let mut history = user_history("Weather?");
    let settings = ExecutionSettings::new().with_global_auto_invoke_cap(1);

    let (reply, _) = orchestrator
        .run(&mut history, &settings, &weather_registry())
        .await
        .unwrap();

    // The nested run saw an exhausted budget; the outer run still finished.
    assert_eq!(*inner_reply_had_calls.lock().unwrap(), Some(true));
    assert_eq!(reply.content_text(), "done");
}
