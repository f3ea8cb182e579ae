//! Model service integration tests
//!
//! Each provider talks to a wiremock server; the adapter's retry and
//! rejection handling is checked against real HTTP failures.

use std::sync::Arc;
use std::time::Duration;

use scribe::agent::{AbortReason, Orchestrator, RunOutcome};
use scribe::core::config::ProviderType;
use scribe::core::{Action, Config, ScribeError, Turn};
use scribe::llm::ModelAdapter;
use scribe::tools::{Sandbox, ToolRegistry};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

const ARGO_PATH: &str = "/argoapi/api/v1/resource/chat/";

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn config(provider: ProviderType, endpoint: String) -> Config {
    let mut config = Config::default();
    config.model.provider = provider;
    config.model.endpoint = endpoint;
    config.model.user = Some("tester".to_string());
    config.model.api_key = None;
    config.model.timeout_secs = 5;
    config.model.max_attempts = 3;
    config.model.backoff_base_ms = 0;
    config.model.backoff_max_ms = 0;
    config
}

fn argo_config(server: &MockServer) -> Config {
    let mut config = config(ProviderType::Argo, format!("{}{}", server.uri(), ARGO_PATH));
    config.model.model = "gpt5mini".to_string();
    config
}

fn final_reply(answer: &str) -> String {
    json!({"tool": "final_answer", "arguments": {"answer": answer}}).to_string()
}

fn turns() -> Vec<Turn> {
    vec![
        Turn::system("You translate code."),
        Turn::user("Translate a.f"),
        Turn::assistant("{\"tool\": \"run_build\", \"arguments\": {}}"),
        Turn::observation("run_build", "BUILD FAILED"),
    ]
}

async fn request_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| r.body_json::<Value>().unwrap())
        .collect()
}

#[tokio::test]
async fn test_argo_request_shape_and_reply() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ARGO_PATH))
        .and(body_partial_json(json!({"user": "tester", "model": "gpt5mini"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": final_reply("All done.")})))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = ModelAdapter::from_config(&argo_config(&server)).unwrap();
    let action = adapter.next_action(&turns()).await.unwrap();
    assert_eq!(action, Action::FinalAnswer("All done.".to_string()));

    let body = &request_bodies(&server).await[0];
    assert_eq!(body["max_completion_tokens"], 4000);
    let roles: Vec<&str> = body["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["role"].as_str().unwrap())
        .collect();
    assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
    assert!(body["messages"][3]["content"]
        .as_str()
        .unwrap()
        .starts_with("Observation from `run_build`:"));
}

#[tokio::test]
async fn test_unauthorized_is_rejected_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ARGO_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .expect(1)
        .mount(&server)
        .await;

    let adapter = ModelAdapter::from_config(&argo_config(&server)).unwrap();
    let err = adapter.next_action(&turns()).await.unwrap_err();
    assert!(matches!(err, ScribeError::ModelRejected { status: 401, .. }));
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ARGO_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(ARGO_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "```json\n{\"tool\": \"run_build\", \"arguments\": {}}\n```"
        })))
        .mount(&server)
        .await;

    let adapter = ModelAdapter::from_config(&argo_config(&server)).unwrap();
    let action = adapter.next_action(&turns()).await.unwrap();
    match action {
        Action::Invoke { call, .. } => assert_eq!(call.tool, "run_build"),
        other => panic!("expected a tool call, got {:?}", other),
    }
    assert_eq!(request_bodies(&server).await.len(), 3);
}

#[tokio::test]
async fn test_malformed_body_exhausts_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ARGO_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .expect(3)
        .mount(&server)
        .await;

    let adapter = ModelAdapter::from_config(&argo_config(&server)).unwrap();
    let err = adapter.next_action(&turns()).await.unwrap_err();
    assert!(matches!(err, ScribeError::ModelUnavailable { attempts: 3, .. }));
}

#[tokio::test]
async fn test_model_timeout_aborts_run_without_tools() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ARGO_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"response": "too late"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut config = argo_config(&server);
    config.model.timeout_secs = 1;
    config.model.max_attempts = 2;

    let dir = tempfile::tempdir().unwrap();
    let tools = Arc::new(ToolRegistry::with_builtin_tools(&config).unwrap());
    let orchestrator = Orchestrator::new(
        tools,
        ModelAdapter::from_config(&config).unwrap(),
        Sandbox::new(dir.path()),
    );

    let report = orchestrator.run("Translate a.f", &CancellationToken::new()).await;

    assert!(matches!(
        report.outcome,
        RunOutcome::Aborted(AbortReason::ModelUnavailable(_))
    ));
    assert_eq!(report.conversation.len(), 2);
    assert!(report.last_observation.is_none());
    assert_eq!(request_bodies(&server).await.len(), 2);
}

#[tokio::test]
async fn test_openai_compatible_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": final_reply("Finished.")}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config(ProviderType::OpenAi, format!("{}/v1", server.uri()));
    config.model.model = "gpt-4o-mini".to_string();
    config.model.api_key = Some("sk-test".to_string());

    let adapter = ModelAdapter::from_config(&config).unwrap();
    let action = adapter.next_action(&turns()).await.unwrap();
    assert_eq!(action, Action::FinalAnswer("Finished.".to_string()));

    let body = &request_bodies(&server).await[0];
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["messages"][3]["role"], "user");
}

#[tokio::test]
async fn test_ollama_request_keeps_tool_role() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({"stream": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"role": "assistant", "content": final_reply("Done.")},
            "done": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config(ProviderType::Ollama, server.uri());
    config.model.model = "qwen3:8b".to_string();

    let adapter = ModelAdapter::from_config(&config).unwrap();
    let action = adapter.next_action(&turns()).await.unwrap();
    assert_eq!(action, Action::FinalAnswer("Done.".to_string()));

    let body = &request_bodies(&server).await[0];
    assert_eq!(body["messages"][3]["role"], "tool");
    assert_eq!(body["messages"][3]["content"], "BUILD FAILED");
    assert_eq!(body["options"]["num_predict"], 4000);
}
