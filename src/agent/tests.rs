use super::*;
use crate::mcp::{CallToolResult, McpTool};
use crate::tools::ToolOutput;
use anyhow::Result;
use serde_json::{json, Map, Value};
use std::cell::RefCell;
use std::collections::VecDeque;

/// Replays canned replies in order and keeps every prompt it was sent.
/// Once the script runs out it keeps answering `COMPLETE_RUN`.
struct ScriptedModel {
    replies: RefCell<VecDeque<String>>,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedModel {
    fn new(replies: &[&str]) -> Self {
        Self {
            replies: RefCell::new(replies.iter().map(|r| r.to_string()).collect()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    /// The `Query: ...` part of every prompt sent so far.
    fn queries(&self) -> Vec<String> {
        self.prompts
            .borrow()
            .iter()
            .map(|p| p.split_once("\n\nQuery: ").map(|(_, q)| q.to_string()).unwrap_or_default())
            .collect()
    }
}

#[async_trait::async_trait(?Send)]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.borrow_mut().push(prompt.to_string());
        Ok(self
            .replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| "COMPLETE_RUN".to_string()))
    }
}

/// Always answers the same line.
struct RepeatingModel(&'static str);

#[async_trait::async_trait(?Send)]
impl LanguageModel for RepeatingModel {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Ok(self.0.to_string())
    }
}

struct SlowModel(Duration);

#[async_trait::async_trait(?Send)]
impl LanguageModel for SlowModel {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        tokio::time::sleep(self.0).await;
        Ok("COMPLETE_RUN".to_string())
    }
}

struct FailingModel;

#[async_trait::async_trait(?Send)]
impl LanguageModel for FailingModel {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        anyhow::bail!("quota exceeded")
    }
}

/// Math and paint tools that sum their integer arguments.
#[derive(Default)]
struct FakeSession {
    calls: Vec<(String, Map<String, Value>)>,
}

fn tool(name: &str, props: Value) -> McpTool {
    serde_json::from_value(json!({
        "name": name,
        "description": format!("{name} tool"),
        "inputSchema": { "type": "object", "properties": props }
    }))
    .unwrap()
}

#[async_trait::async_trait]
impl ToolSession for FakeSession {
    async fn list_tools(&mut self) -> Result<Vec<McpTool>> {
        Ok(vec![
            tool("add", json!({ "a": { "type": "integer" }, "b": { "type": "integer" } })),
            tool(
                "draw_rectangle",
                json!({
                    "x1": { "type": "integer" }, "y1": { "type": "integer" },
                    "x2": { "type": "integer" }, "y2": { "type": "integer" }
                }),
            ),
            tool("open_paint", json!({})),
        ])
    }

    async fn call_tool(
        &mut self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> Result<CallToolResult> {
        self.calls.push((name.to_string(), arguments.clone()));
        let sum: i64 = arguments.values().filter_map(Value::as_i64).sum();
        Ok(CallToolResult::text(sum.to_string()))
    }
}

/// Collects renderer events as plain strings.
#[derive(Default)]
struct RecordingRenderer {
    events: Vec<String>,
}

impl Renderer for RecordingRenderer {
    fn iteration_start(&mut self, iteration: usize, max_iterations: usize) {
        self.events.push(format!("iteration {iteration}/{max_iterations}"));
    }

    fn model_response(&mut self, text: &str) {
        self.events.push(format!("llm {text}"));
    }

    fn tool_start(&mut self, name: &str, args: &[String]) {
        self.events.push(format!("call {name}({})", args.join(", ")));
    }

    fn tool_result(&mut self, name: &str, result: &str) {
        self.events.push(format!("result {name} {result}"));
    }

    fn final_answer(&mut self, value: &str) {
        self.events.push(format!("answer {value}"));
    }

    fn unrecognized(&mut self, line: &str) {
        self.events.push(format!("ignored {line}"));
    }

    fn render_error(&mut self, err: &str) {
        self.events.push(format!("error {err}"));
    }

    fn render_done(&mut self, outcome: &RunOutcome) {
        self.events.push(format!("done after {}", outcome.iterations));
    }
}

fn options() -> AgentOptions {
    AgentOptions {
        task: "Add 5 and 3.".to_string(),
        settle_delay: Duration::ZERO,
        ..AgentOptions::default()
    }
}

#[tokio::test]
async fn test_tool_call_then_complete() {
    let model = ScriptedModel::new(&["FUNCTION_CALL: add|5|3", "COMPLETE_RUN"]);
    let mut session = FakeSession::default();
    let mut renderer = RecordingRenderer::default();
    let opts = AgentOptions {
        settle_delay: Duration::ZERO,
        ..AgentOptions::default()
    };

    let outcome = run(&model, &mut session, &mut renderer, &opts)
        .await
        .unwrap();

    let queries = model.queries();
    assert_eq!(queries[0], "Return the sum of first 20 Fibonacci numbers.");

    assert!(matches!(outcome.stop_reason, StopReason::Completed));
    assert_eq!(outcome.iterations, 2);
    assert_eq!(
        outcome.history,
        vec![
            "In the 1 iteration you called add with {'a': 5, 'b': 3} parameters, \
and the function returned [8]."
                .to_string()
        ]
    );
    assert_eq!(outcome.last_result, Some(ToolOutput::Items(vec!["8".into()])));
    assert_eq!(session.calls.len(), 1);
    assert_eq!(Value::Object(session.calls[0].1.clone()), json!({ "a": 5, "b": 3 }));

    assert_eq!(
        renderer.events,
        vec![
            "iteration 1/10",
            "llm FUNCTION_CALL: add|5|3",
            "call add(5, 3)",
            "result add [8]",
            "iteration 2/10",
            "llm COMPLETE_RUN",
            "done after 2",
        ]
    );
}

#[tokio::test]
async fn test_complete_run_first_leaves_history_empty() {
    let model = ScriptedModel::new(&["COMPLETE_RUN"]);
    let mut session = FakeSession::default();
    let mut renderer = RecordingRenderer::default();

    let outcome = run(&model, &mut session, &mut renderer, &options())
        .await
        .unwrap();

    assert!(matches!(outcome.stop_reason, StopReason::Completed));
    assert_eq!(outcome.iterations, 1);
    assert!(outcome.history.is_empty());
    assert!(outcome.last_result.is_none());
    assert!(session.calls.is_empty());
}

#[tokio::test]
async fn test_iteration_cap_ends_run_without_error() {
    let model = RepeatingModel("FUNCTION_CALL: add|1|1");
    let mut session = FakeSession::default();
    let mut renderer = RecordingRenderer::default();

    let outcome = run(&model, &mut session, &mut renderer, &options())
        .await
        .unwrap();

    assert!(matches!(outcome.stop_reason, StopReason::IterationCap));
    assert!(outcome.stop_reason.error().is_none());
    assert_eq!(outcome.iterations, 10);
    assert_eq!(outcome.history.len(), 10);
    assert_eq!(session.calls.len(), 10);
    assert!(outcome.history[9].starts_with("In the 10 iteration you called add"));
}

#[tokio::test]
async fn test_custom_iteration_cap() {
    let model = RepeatingModel("thinking...");
    let mut session = FakeSession::default();
    let mut renderer = RecordingRenderer::default();
    let opts = AgentOptions {
        max_iterations: 3,
        ..options()
    };

    let outcome = run(&model, &mut session, &mut renderer, &opts).await.unwrap();

    assert!(matches!(outcome.stop_reason, StopReason::IterationCap));
    assert_eq!(outcome.iterations, 3);
}

#[tokio::test]
async fn test_final_answer_does_not_stop_the_loop() {
    let model = ScriptedModel::new(&[
        "FUNCTION_CALL: add|5|3",
        "FINAL_ANSWER: 8",
        "USE_PAINT: open_paint",
        "COMPLETE_RUN",
    ]);
    let mut session = FakeSession::default();
    let mut renderer = RecordingRenderer::default();

    let outcome = run(&model, &mut session, &mut renderer, &options())
        .await
        .unwrap();

    assert!(matches!(outcome.stop_reason, StopReason::Completed));
    assert_eq!(outcome.iterations, 4);
    assert_eq!(outcome.final_answer.as_deref(), Some("8"));
    assert_eq!(outcome.history.len(), 3);
    assert!(outcome.history[1].starts_with(
        "In the 2 iteration you completed calculations with FINAL_ANSWER: 8."
    ));
    assert!(outcome.history[1].contains("763|595|1788|1123"));
    assert!(outcome.history[1].contains("add_text_in_paint"));
    assert!(outcome.history[2]
        .starts_with("In the 3 iteration you called open_paint with {} parameters"));
    assert!(renderer.events.contains(&"answer 8".to_string()));

    // The instruction reaches the prompt that follows the answer.
    let queries = model.queries();
    assert!(queries[2].contains("you completed calculations with FINAL_ANSWER: 8"));
}

#[tokio::test]
async fn test_final_answer_without_prior_result_reaches_next_query() {
    let model = ScriptedModel::new(&["FINAL_ANSWER: 42", "COMPLETE_RUN"]);
    let mut session = FakeSession::default();
    let mut renderer = RecordingRenderer::default();

    let outcome = run(&model, &mut session, &mut renderer, &options())
        .await
        .unwrap();

    assert_eq!(outcome.last_result, Some(ToolOutput::Text("42".into())));
    let queries = model.queries();
    assert_eq!(queries[0], "Add 5 and 3.");
    assert!(queries[1].starts_with("Add 5 and 3.\n\nIn the 1 iteration you completed"));
    assert!(queries[1].ends_with("  What should I do next?"));
}

#[tokio::test]
async fn test_unknown_tool_aborts_and_records_error() {
    let model = ScriptedModel::new(&["FUNCTION_CALL: multiply|x|y"]);
    let mut session = FakeSession::default();
    let mut renderer = RecordingRenderer::default();

    let outcome = run(&model, &mut session, &mut renderer, &options())
        .await
        .unwrap();

    assert!(matches!(
        outcome.stop_reason.error(),
        Some(AgentError::UnknownTool(name)) if name == "multiply"
    ));
    assert_eq!(outcome.iterations, 1);
    assert_eq!(
        outcome.history,
        vec!["Error in iteration 1: Unknown tool: multiply".to_string()]
    );
    assert!(session.calls.is_empty());
    assert!(renderer.events.contains(&"error Unknown tool: multiply".to_string()));
    assert_eq!(renderer.events.last().map(String::as_str), Some("done after 1"));
}

#[tokio::test]
async fn test_insufficient_arguments_aborts_without_invoking() {
    let model = ScriptedModel::new(&["USE_PAINT: draw_rectangle|763|595"]);
    let mut session = FakeSession::default();
    let mut renderer = RecordingRenderer::default();

    let outcome = run(&model, &mut session, &mut renderer, &options())
        .await
        .unwrap();

    assert!(matches!(
        outcome.stop_reason.error(),
        Some(AgentError::InsufficientArguments { expected: 4, provided: 2, .. })
    ));
    assert!(session.calls.is_empty());
    assert_eq!(outcome.history.len(), 1);
}

#[tokio::test]
async fn test_coercion_failure_aborts() {
    let model = ScriptedModel::new(&["FUNCTION_CALL: add|five|3"]);
    let mut session = FakeSession::default();
    let mut renderer = RecordingRenderer::default();

    let outcome = run(&model, &mut session, &mut renderer, &options())
        .await
        .unwrap();

    assert!(matches!(
        outcome.stop_reason.error(),
        Some(AgentError::CoercionFailure { param, .. }) if param == "a"
    ));
    assert!(session.calls.is_empty());
}

#[tokio::test]
async fn test_generation_timeout_aborts() {
    let model = SlowModel(Duration::from_secs(5));
    let mut session = FakeSession::default();
    let mut renderer = RecordingRenderer::default();
    let opts = AgentOptions {
        generation_timeout: Duration::from_millis(20),
        ..options()
    };

    let outcome = run(&model, &mut session, &mut renderer, &opts).await.unwrap();

    assert!(matches!(
        outcome.stop_reason.error(),
        Some(AgentError::GenerationTimeout { .. })
    ));
    assert_eq!(outcome.iterations, 1);
    assert!(outcome.history.is_empty());
}

#[tokio::test]
async fn test_generation_failure_aborts() {
    let mut session = FakeSession::default();
    let mut renderer = RecordingRenderer::default();

    let outcome = run(&FailingModel, &mut session, &mut renderer, &options())
        .await
        .unwrap();

    match outcome.stop_reason.error() {
        Some(AgentError::GenerationFailure(message)) => {
            assert!(message.contains("quota exceeded"))
        }
        other => panic!("unexpected stop: {other:?}"),
    }
    assert!(outcome.history.is_empty());
}

#[tokio::test]
async fn test_unrecognized_reply_is_ignored() {
    let model = ScriptedModel::new(&[
        "Let me think about this.",
        "final_answer: 8",
        "FUNCTION_CALL: add|5|3",
        "COMPLETE_RUN",
    ]);
    let mut session = FakeSession::default();
    let mut renderer = RecordingRenderer::default();

    let outcome = run(&model, &mut session, &mut renderer, &options())
        .await
        .unwrap();

    assert!(matches!(outcome.stop_reason, StopReason::Completed));
    assert_eq!(outcome.iterations, 4);
    assert_eq!(outcome.history.len(), 1);
    assert!(outcome.history[0].starts_with("In the 3 iteration you called add"));
    assert!(renderer
        .events
        .contains(&"ignored Let me think about this.".to_string()));

    // Nothing recorded yet, so the first three passes all send the bare task.
    let queries = model.queries();
    assert_eq!(queries[0], "Add 5 and 3.");
    assert_eq!(queries[1], "Add 5 and 3.");
    assert_eq!(queries[2], "Add 5 and 3.");
}

#[tokio::test]
async fn test_call_wrapped_in_prose_is_dispatched() {
    let model = ScriptedModel::new(&["Sure.\nFUNCTION_CALL: add|2|2\nThanks", "COMPLETE_RUN"]);
    let mut session = FakeSession::default();
    let mut renderer = RecordingRenderer::default();

    let outcome = run(&model, &mut session, &mut renderer, &options())
        .await
        .unwrap();

    assert_eq!(session.calls.len(), 1);
    assert_eq!(outcome.last_result, Some(ToolOutput::Items(vec!["4".into()])));
}

#[tokio::test]
async fn test_query_accumulates_history() {
    let model = ScriptedModel::new(&[
        "FUNCTION_CALL: add|5|3",
        "FUNCTION_CALL: add|8|1",
        "COMPLETE_RUN",
    ]);
    let mut session = FakeSession::default();
    let mut renderer = RecordingRenderer::default();

    run(&model, &mut session, &mut renderer, &options())
        .await
        .unwrap();

    let first = "In the 1 iteration you called add with {'a': 5, 'b': 3} parameters, \
and the function returned [8].";
    let second = "In the 2 iteration you called add with {'a': 8, 'b': 1} parameters, \
and the function returned [9].";
    let queries = model.queries();
    assert_eq!(queries.len(), 3);
    assert_eq!(queries[0], "Add 5 and 3.");
    let q1 = format!("Add 5 and 3.\n\n{first}  What should I do next?");
    assert_eq!(queries[1], q1);
    assert_eq!(
        queries[2],
        format!("{q1}\n\n{first} {second}  What should I do next?")
    );
}

#[tokio::test]
async fn test_system_prompt_lists_tools() {
    let model = ScriptedModel::new(&["COMPLETE_RUN"]);
    let mut session = FakeSession::default();
    let mut renderer = RecordingRenderer::default();

    run(&model, &mut session, &mut renderer, &options())
        .await
        .unwrap();

    let prompts = model.prompts.borrow();
    assert!(prompts[0].contains("1. add(a: integer, b: integer) - add tool"));
    assert!(prompts[0].contains("3. open_paint(no parameters) - open_paint tool"));
    assert!(prompts[0].ends_with("\n\nQuery: Add 5 and 3."));
}

#[test]
fn test_state_is_fresh_per_run() {
    let mut state = IterationState::new("task");
    assert_eq!(state.next_query(), "task");
    state.begin_iteration();
    state.record_error(&AgentError::UnknownTool("x".into()));
    let outcome = state.finish(StopReason::IterationCap);
    assert_eq!(outcome.history.len(), 1);

    let mut fresh = IterationState::new("task");
    assert_eq!(fresh.iteration, 0);
    assert!(fresh.history.is_empty());
    assert_eq!(fresh.next_query(), "task");
}

#[tokio::test]
async fn test_empty_tool_name_is_an_unknown_tool() {
    let model = ScriptedModel::new(&["FUNCTION_CALL: |5|3", "COMPLETE_RUN"]);
    let mut session = FakeSession::default();
    let mut renderer = RecordingRenderer::default();

    let outcome = run(&model, &mut session, &mut renderer, &options())
        .await
        .unwrap();

    assert!(matches!(
        outcome.stop_reason.error(),
        Some(AgentError::UnknownTool(name)) if name.is_empty()
    ));
    assert_eq!(outcome.iterations, 1);
    assert_eq!(
        outcome.history,
        vec!["Error in iteration 1: Unknown tool: ".to_string()]
    );
    assert!(session.calls.is_empty());
}

#[tokio::test]
async fn test_empty_final_answer_still_queues_paint_steps() {
    let model = ScriptedModel::new(&["FUNCTION_CALL: add|5|3", "FINAL_ANSWER:", "COMPLETE_RUN"]);
    let mut session = FakeSession::default();
    let mut renderer = RecordingRenderer::default();

    let outcome = run(&model, &mut session, &mut renderer, &options())
        .await
        .unwrap();

    assert!(matches!(outcome.stop_reason, StopReason::Completed));
    assert_eq!(outcome.final_answer.as_deref(), Some(""));
    assert_eq!(outcome.history.len(), 2);
    assert!(outcome.history[1]
        .starts_with("In the 2 iteration you completed calculations with FINAL_ANSWER:."));
    assert_eq!(outcome.last_result, Some(ToolOutput::Items(vec!["8".into()])));
}

#[tokio::test]
async fn test_unrecognized_reply_after_result_repeats_history() {
    let model = ScriptedModel::new(&["FUNCTION_CALL: add|5|3", "hmm", "COMPLETE_RUN"]);
    let mut session = FakeSession::default();
    let mut renderer = RecordingRenderer::default();

    let outcome = run(&model, &mut session, &mut renderer, &options())
        .await
        .unwrap();

    assert_eq!(outcome.history.len(), 1);
    let entry = "In the 1 iteration you called add with {'a': 5, 'b': 3} parameters, \
and the function returned [8].";
    let queries = model.queries();
    assert_eq!(queries.len(), 3);
    let q1 = format!("Add 5 and 3.\n\n{entry}  What should I do next?");
    assert_eq!(queries[1], q1);
    // The ignored reply adds nothing, but the same history is appended again.
    assert_eq!(queries[2], format!("{q1}\n\n{entry}  What should I do next?"));
}
