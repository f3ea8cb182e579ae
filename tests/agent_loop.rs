//! Orchestration loop integration tests
//!
//! Drives full runs against scripted model services and real tools in a
//! temporary working directory.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use scribe::agent::{AbortReason, BatchJob, BatchRunner, Orchestrator, RunOutcome};
use scribe::core::config::ModelConfig;
use scribe::core::{Config, ParamKind, Result, Role, ScribeError, ToolCall, ToolSpec};
use scribe::llm::roles::{RoleMap, ARGO_ROLES};
use scribe::llm::{CompletionRequest, ModelAdapter, ModelService, RetryPolicy};
use scribe::tools::{ExecutionResult, Sandbox, ToolHandler, ToolRegistry};
use serde_json::json;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Replies with a fixed script, then with a final answer
struct ScriptedModel {
    replies: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    fn new(replies: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ModelService for ScriptedModel {
    async fn complete(&self, _request: &CompletionRequest<'_>) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.replies.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| final_answer("script finished")))
    }

    fn role_map(&self) -> &'static RoleMap {
        &ARGO_ROLES
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Fails every request the way a timed-out connection does
struct UnreachableModel {
    calls: AtomicUsize,
}

#[async_trait]
impl ModelService for UnreachableModel {
    async fn complete(&self, _request: &CompletionRequest<'_>) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ScribeError::transient("operation timed out"))
    }

    fn role_map(&self) -> &'static RoleMap {
        &ARGO_ROLES
    }

    fn name(&self) -> &str {
        "unreachable"
    }
}

fn call(tool: &str, arguments: serde_json::Value) -> String {
    format!(
        "Next step.\n```json\n{}\n```",
        json!({"tool": tool, "arguments": arguments})
    )
}

fn final_answer(answer: &str) -> String {
    call("final_answer", json!({"answer": answer}))
}

fn adapter(service: Arc<dyn ModelService>, attempts: u32) -> ModelAdapter {
    ModelAdapter::new(service, &ModelConfig::default()).with_retry(RetryPolicy::immediate(attempts))
}

fn builtin_orchestrator(
    service: Arc<dyn ModelService>,
    dir: &TempDir,
    build_command: &str,
    max_steps: usize,
) -> Orchestrator {
    let mut config = Config::default();
    config.sandbox.build_command = build_command.to_string();
    let tools = Arc::new(ToolRegistry::with_builtin_tools(&config).unwrap());
    Orchestrator::new(tools, adapter(service, 1), Sandbox::new(dir.path())).with_max_steps(max_steps)
}

#[tokio::test]
async fn test_translate_build_fix_cycle_completes() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("a.f"),
        "      PROGRAM A\n      PRINT *, 'hi'\n      END\n",
    )
    .unwrap();

    let broken = "#include <iostream>\nint main() { std::cout << \"hi\\n\"; return 0 }\n";
    let fixed = "#include <iostream>\nint main() { std::cout << \"hi\\n\"; return 0; }\n";

    let model = ScriptedModel::new(vec![
        call("read_source_file", json!({"file_path": "a.f"})),
        call("write_source_file", json!({"file_path": "a.cpp", "content": broken})),
        call("run_build", json!({})),
        call("write_source_file", json!({"file_path": "a.cpp", "content": fixed})),
        call("run_build", json!({})),
        final_answer("a.cpp builds"),
    ]);

    // Stands in for a compiler: fails until the statement is terminated.
    let build = "grep -q 'return 0;' a.cpp || { echo 'a.cpp:2: error: expected ;' >&2; exit 1; }";
    let orchestrator = builtin_orchestrator(model.clone(), &dir, build, 20);
    let report = orchestrator.run("Translate a.f to C++", &CancellationToken::new()).await;

    assert_eq!(report.outcome, RunOutcome::Completed("a.cpp builds".into()));
    assert_eq!(report.steps, 6);
    assert_eq!(report.conversation.observations_from("run_build"), 2);
    assert_eq!(report.conversation.len(), 2 + 5 * 2 + 1);

    let builds: Vec<&str> = report
        .conversation
        .turns()
        .iter()
        .filter(|t| t.tool_name.as_deref() == Some("run_build"))
        .map(|t| t.content.as_str())
        .collect();
    assert!(builds[0].contains("BUILD FAILED"));
    assert!(builds[0].contains("expected ;"));
    assert!(builds[1].contains("BUILD SUCCESSFUL"));

    let source = report.conversation.turns()[3].content.clone();
    assert!(source.contains("PROGRAM A"));
    assert_eq!(std::fs::read_to_string(dir.path().join("a.cpp")).unwrap(), fixed);
}

#[tokio::test]
async fn test_model_unavailable_aborts_without_tools() {
    let dir = tempfile::tempdir().unwrap();
    let model = Arc::new(UnreachableModel {
        calls: AtomicUsize::new(0),
    });
    let tools = Arc::new(ToolRegistry::with_builtin_tools(&Config::default()).unwrap());
    let orchestrator = Orchestrator::new(tools, adapter(model.clone(), 3), Sandbox::new(dir.path()));

    let report = orchestrator.run("Translate a.f", &CancellationToken::new()).await;

    assert!(matches!(
        report.outcome,
        RunOutcome::Aborted(AbortReason::ModelUnavailable(_))
    ));
    assert_eq!(model.calls.load(Ordering::SeqCst), 3);
    assert_eq!(report.steps, 1);
    assert_eq!(report.conversation.len(), 2);
    assert!(report.last_observation.is_none());
}

#[tokio::test]
async fn test_unknown_tool_is_observation_not_abort() {
    let dir = tempfile::tempdir().unwrap();
    let model = ScriptedModel::new(vec![
        call("compile_fortran", json!({"file": "a.f"})),
        final_answer("gave up on that tool"),
    ]);
    let report = builtin_orchestrator(model, &dir, "make", 5)
        .run("Build it", &CancellationToken::new())
        .await;

    assert!(report.outcome.is_completed());
    let observation = &report.conversation.turns()[3];
    assert_eq!(observation.role, Role::Observation);
    assert!(observation.content.contains("UnknownToolError"));
    assert!(observation.content.contains("run_build"));
}

#[tokio::test]
async fn test_missing_argument_is_observation() {
    let dir = tempfile::tempdir().unwrap();
    let model = ScriptedModel::new(vec![call("read_source_file", json!({}))]);
    let report = builtin_orchestrator(model, &dir, "make", 5)
        .run("Read something", &CancellationToken::new())
        .await;

    assert!(report.outcome.is_completed());
    assert!(report.conversation.turns()[3]
        .content
        .contains("MissingArgument: tool 'read_source_file' requires argument 'file_path'"));
}

#[tokio::test]
async fn test_budget_exhausted_at_max_steps() {
    let dir = tempfile::tempdir().unwrap();
    let replies = (0..10).map(|_| call("list_directory", json!({}))).collect();
    let report = builtin_orchestrator(ScriptedModel::new(replies), &dir, "make", 3)
        .run("Loop forever", &CancellationToken::new())
        .await;

    assert_eq!(report.outcome, RunOutcome::BudgetExhausted);
    assert_eq!(report.steps, 3);
    assert_eq!(report.conversation.len(), 2 + 3 * 2);
    assert!(report.last_observation.unwrap().contains("Contents of '.'"));
}

#[tokio::test]
async fn test_conversation_length_is_deterministic() {
    for n in 0..4 {
        let dir = tempfile::tempdir().unwrap();
        let mut replies: Vec<String> = (0..n).map(|_| call("list_directory", json!({}))).collect();
        replies.push(final_answer("done"));

        let report = builtin_orchestrator(ScriptedModel::new(replies), &dir, "make", 10)
            .run("List", &CancellationToken::new())
            .await;

        assert!(report.outcome.is_completed());
        assert_eq!(report.steps, n + 1);
        assert_eq!(report.conversation.len(), 2 + 2 * n + 1);
    }
}

/// Cancels the run from inside its third invocation, then finishes normally
struct CancelOnThirdCall {
    cancel: CancellationToken,
    calls: AtomicUsize,
    finished: AtomicUsize,
}

#[async_trait]
impl ToolHandler for CancelOnThirdCall {
    async fn call(&self, _call: &ToolCall, sandbox: &Sandbox) -> Result<ExecutionResult> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n == 3 {
            self.cancel.cancel();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(ExecutionResult::ok_message(format!("step {} done", n), sandbox.output_cap()))
    }
}

#[tokio::test]
async fn test_cancellation_between_steps() {
    let dir = tempfile::tempdir().unwrap();
    let cancel = CancellationToken::new();
    let handler = Arc::new(CancelOnThirdCall {
        cancel: cancel.clone(),
        calls: AtomicUsize::new(0),
        finished: AtomicUsize::new(0),
    });

    let mut builder = ToolRegistry::builder();
    builder
        .register(
            ToolSpec::new("work", "Do one unit of work").optional("note", ParamKind::String, "Note"),
            handler.clone(),
        )
        .unwrap();
    let tools = Arc::new(builder.build());

    let replies = (0..10).map(|_| call("work", json!({}))).collect();
    let model = ScriptedModel::new(replies);
    let orchestrator =
        Orchestrator::new(tools, adapter(model.clone(), 1), Sandbox::new(dir.path())).with_max_steps(10);

    let report = orchestrator.run("Work", &cancel).await;

    assert_eq!(report.outcome, RunOutcome::Aborted(AbortReason::Cancelled));
    assert_eq!(report.steps, 3);
    assert_eq!(handler.finished.load(Ordering::SeqCst), 3);
    assert_eq!(model.calls.load(Ordering::SeqCst), 3);
    assert_eq!(report.conversation.len(), 2 + 3 * 2);
    assert_eq!(report.last_observation.as_deref(), Some("step 3 done"));
}

#[tokio::test]
async fn test_launch_failure_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    let model = ScriptedModel::new(vec![call("run_build", json!({}))]);
    let report = builtin_orchestrator(model, &dir, "definitely-not-a-build-tool-xyz", 5)
        .run("Build", &CancellationToken::new())
        .await;

    assert!(matches!(
        report.outcome,
        RunOutcome::Aborted(AbortReason::Execution(_))
    ));
    assert_eq!(report.steps, 1);
    // The reply that issued the call stays for diagnosis; no observation follows it.
    let turns = report.conversation.turns();
    assert_eq!(turns.len(), 3);
    assert_eq!(turns[2].role, Role::Assistant);
    assert!(turns[2].content.contains("run_build"));
    assert!(report.last_observation.is_none());
}

#[tokio::test]
async fn test_batch_runs_jobs_in_own_directories() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();

    let model = ScriptedModel::new(Vec::new());
    let template = builtin_orchestrator(model, &a, "make", 5);
    let runner = BatchRunner::new(template);

    let reports = runner
        .run_all(
            vec![
                BatchJob::new("first", "Finish", a.path()),
                BatchJob::new("second", "Finish", b.path()),
            ],
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].0, "first");
    assert_eq!(reports[1].0, "second");
    assert!(reports.iter().all(|(_, r)| r.outcome.is_completed()));
    assert!(reports[1].1.conversation.turns()[0]
        .content
        .contains(&b.path().display().to_string()));
}

#[tokio::test]
async fn test_batch_rejects_shared_directory() {
    let dir = tempfile::tempdir().unwrap();
    let model = ScriptedModel::new(Vec::new());
    let runner = BatchRunner::new(builtin_orchestrator(model.clone(), &dir, "make", 5));

    let result = runner
        .run_all(
            vec![
                BatchJob::new("one", "Finish", dir.path()),
                BatchJob::new("two", "Finish", dir.path()),
            ],
            &CancellationToken::new(),
        )
        .await;

    assert!(result.is_err());
    assert_eq!(model.calls.load(Ordering::SeqCst), 0);
}
