// HTTP route handlers for the promptrun API

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json},
};
use promptrun_common::languages::{PromptMode, DEFAULT_LANGUAGE};
use promptrun_common::types::{GenerateRequest, GenerateResponse, LanguagesResponse};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extractor::{self, ExtractionHints};
use crate::llm::ResponseFormat;
use crate::{metrics, prompt, AppState};

const INDEX_HTML: &str = include_str!("../static/index.html");

/// POST /generate-and-run - Generate code with the LLM and run it on Judge0
pub async fn generate_and_run(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let result = run_pipeline(&state, request_id, payload).await;

    match &result {
        Ok(_) => metrics::record_request("success"),
        Err(e) => {
            metrics::record_request(e.outcome());
            if e.status().is_server_error() {
                error!(request_id = %request_id, error = %e, details = ?std::error::Error::source(e).map(|s| s.to_string()), "Request failed");
            } else {
                warn!(request_id = %request_id, error = %e, "Request rejected");
            }
        }
    }

    result.map(Json)
}

async fn run_pipeline(
    state: &AppState,
    request_id: Uuid,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<GenerateResponse, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        debug!(request_id = %request_id, rejection = %rejection, "Unreadable request body");
        ApiError::InvalidBody
    })?;

    let task = request
        .prompt
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .ok_or(ApiError::MissingPrompt)?;

    let profile = state
        .languages
        .resolve(request.language.as_deref().unwrap_or(DEFAULT_LANGUAGE))?;

    info!(
        request_id = %request_id,
        language = %profile.key,
        mode = %profile.mode,
        prompt_size = task.len(),
        "Request validated"
    );

    let prompt_text = prompt::build(task, profile);
    let format = match profile.mode {
        PromptMode::Structured => ResponseFormat::JsonObject,
        PromptMode::Plain => ResponseFormat::Text,
    };

    let started = Instant::now();
    let reply = state.llm.complete(&prompt_text, &state.model, format).await;
    metrics::observe_upstream("llm", started.elapsed());
    let reply = reply?;

    info!(
        request_id = %request_id,
        reply_size = reply.len(),
        llm_ms = started.elapsed().as_millis(),
        "LLM completed"
    );

    let extracted = extractor::extract(&reply, &ExtractionHints::from(profile))?;

    info!(
        request_id = %request_id,
        strategy = extracted.strategy,
        code_size = extracted.code.len(),
        "Code extracted"
    );
    debug!(request_id = %request_id, code = %extracted.code, "Generated code");

    let started = Instant::now();
    let outcome = state
        .sandbox
        .execute(&extracted.code, profile.execution_language_id)
        .await;
    metrics::observe_upstream("judge0", started.elapsed());

    let execution_result = outcome.map_err(|e| {
        warn!(
            request_id = %request_id,
            code_size = extracted.code.len(),
            "Generated code could not be executed"
        );
        ApiError::from(e)
    })?;

    info!(
        request_id = %request_id,
        status = execution_result
            .pointer("/status/description")
            .and_then(|s| s.as_str())
            .unwrap_or("unknown"),
        judge0_ms = started.elapsed().as_millis(),
        "Execution completed"
    );

    Ok(GenerateResponse {
        generated_code: extracted.code,
        execution_result,
    })
}

/// GET / - Static front page
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /languages - Supported language keys
pub async fn list_languages(State(state): State<Arc<AppState>>) -> Json<LanguagesResponse> {
    Json(LanguagesResponse {
        languages: state.languages.keys(),
    })
}

/// GET /status - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics - Prometheus scrape endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render() {
        Ok(text) => (StatusCode::OK, text).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Judge0Config, LlmConfig, ModelConfig};
    use crate::llm::{CompletionClient, LlmError, OpenAiCompatibleClient};
    use crate::routes;
    use crate::sandbox::{ExecutionClient, Judge0Client, SandboxError};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use axum::Router;
    use promptrun_common::languages::LanguageTable;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tower::ServiceExt;

    /// Replays a canned reply, or fails as if the endpoint were down
    struct FakeLlm {
        reply: Option<String>,
        calls: AtomicUsize,
        last: Mutex<Option<(String, ResponseFormat)>>,
    }

    impl FakeLlm {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Some(reply.to_string()),
                calls: AtomicUsize::new(0),
                last: Mutex::new(None),
            })
        }

        fn down() -> Arc<Self> {
            Arc::new(Self {
                reply: None,
                calls: AtomicUsize::new(0),
                last: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl CompletionClient for FakeLlm {
        async fn complete(
            &self,
            prompt: &str,
            _model: &ModelConfig,
            format: ResponseFormat,
        ) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some((prompt.to_string(), format));
            self.reply
                .clone()
                .ok_or_else(|| LlmError::Unavailable("connection refused".to_string()))
        }
    }

    struct FakeSandbox {
        outcome: Result<Value, SandboxError>,
        calls: AtomicUsize,
        last: Mutex<Option<(String, u32)>>,
    }

    impl FakeSandbox {
        fn with(outcome: Result<Value, SandboxError>) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                calls: AtomicUsize::new(0),
                last: Mutex::new(None),
            })
        }

        fn returning(outcome: Value) -> Arc<Self> {
            Self::with(Ok(outcome))
        }

        fn down() -> Arc<Self> {
            Self::with(Err(SandboxError::Unavailable("connection refused".to_string())))
        }

        fn rejecting(status: u16, body: &str) -> Arc<Self> {
            Self::with(Err(SandboxError::Rejected {
                status,
                body: body.to_string(),
            }))
        }
    }

    #[async_trait]
    impl ExecutionClient for FakeSandbox {
        async fn execute(&self, source: &str, language_id: u32) -> Result<Value, SandboxError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last.lock().unwrap() = Some((source.to_string(), language_id));
            match &self.outcome {
                Ok(result) => Ok(result.clone()),
                Err(SandboxError::Unavailable(msg)) => Err(SandboxError::Unavailable(msg.clone())),
                Err(SandboxError::Rejected { status, body }) => Err(SandboxError::Rejected {
                    status: *status,
                    body: body.clone(),
                }),
                Err(SandboxError::Malformed(msg)) => Err(SandboxError::Malformed(msg.clone())),
            }
        }
    }

    fn accepted(stdout: &str) -> Value {
        json!({
            "stdout": stdout,
            "stderr": null,
            "compile_output": null,
            "time": "0.01",
            "memory": 3200,
            "status": {"id": 3, "description": "Accepted"}
        })
    }

    fn app(llm: Arc<dyn CompletionClient>, sandbox: Arc<dyn ExecutionClient>) -> Router {
        app_with(LanguageTable::builtin(), llm, sandbox)
    }

    fn app_with(
        languages: LanguageTable,
        llm: Arc<dyn CompletionClient>,
        sandbox: Arc<dyn ExecutionClient>,
    ) -> Router {
        let state = Arc::new(AppState {
            languages,
            llm,
            sandbox,
            model: ModelConfig::default(),
        });
        routes::routes().with_state(state)
    }

    async fn post(app: Router, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_generate_and_run_success() {
        let llm = FakeLlm::replying(
            r#"{"language":"python","code":"for i in range(1, 4):\n    print(i)","explanation":"prints 1 to 3"}"#,
        );
        let sandbox = FakeSandbox::returning(accepted("1\n2\n3\n"));
        let app = app(llm.clone(), sandbox.clone());

        let (status, body) = post(
            app,
            "/generate-and-run",
            r#"{"prompt": "print the numbers 1 to 3", "language": "python"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["generated_code"], "for i in range(1, 4):\n    print(i)");
        assert_eq!(body["execution_result"], accepted("1\n2\n3\n"));

        let (prompt_sent, format) = llm.last.lock().unwrap().clone().unwrap();
        assert!(prompt_sent.contains("print the numbers 1 to 3"));
        assert_eq!(format, ResponseFormat::JsonObject);

        let (source, language_id) = sandbox.last.lock().unwrap().clone().unwrap();
        assert_eq!(source, "for i in range(1, 4):\n    print(i)");
        assert_eq!(language_id, 71);
    }

    #[tokio::test]
    async fn test_language_defaults_to_python_and_alias_route() {
        let llm = FakeLlm::replying("```python\nprint(1)\n```");
        let sandbox = FakeSandbox::returning(accepted("1\n"));
        let app = app(llm, sandbox.clone());

        let (status, body) = post(app, "/generate", r#"{"prompt": "print one"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["generated_code"], "print(1)");
        assert_eq!(sandbox.last.lock().unwrap().as_ref().unwrap().1, 71);
    }

    #[tokio::test]
    async fn test_language_is_case_insensitive() {
        let llm = FakeLlm::replying(
            r##"{"language":"C++","code":"#include <iostream>\nint main() { std::cout << 1; }","explanation":"x"}"##,
        );
        let sandbox = FakeSandbox::returning(accepted("1"));
        let app = app(llm, sandbox.clone());

        let (status, _) = post(app, "/generate-and-run", r#"{"prompt": "print one", "language": "C++"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(sandbox.last.lock().unwrap().as_ref().unwrap().1, 53);
    }

    #[tokio::test]
    async fn test_unsupported_language_skips_upstreams() {
        let llm = FakeLlm::replying("print(1)");
        let sandbox = FakeSandbox::returning(accepted("1\n"));
        let app = app(llm.clone(), sandbox.clone());

        let (status, body) = post(app, "/generate-and-run", r#"{"prompt": "print one", "language": "ruby"}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Unsupported language: ruby"}));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
        assert_eq!(sandbox.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_prompt_skips_upstreams() {
        for body in [r#"{"language": "python"}"#, r#"{"prompt": ""}"#, r#"{"prompt": "   "}"#] {
            let llm = FakeLlm::replying("print(1)");
            let sandbox = FakeSandbox::returning(accepted("1\n"));
            let app = app(llm.clone(), sandbox.clone());

            let (status, response) = post(app, "/generate-and-run", body).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(response, json!({"error": "Prompt is missing"}));
            assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
            assert_eq!(sandbox.calls.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn test_invalid_json_body() {
        let llm = FakeLlm::replying("print(1)");
        let sandbox = FakeSandbox::returning(accepted("1\n"));
        let app = app(llm.clone(), sandbox);

        let (status, body) = post(app, "/generate-and-run", "{not json").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Invalid JSON body"}));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_llm_failure_is_server_error() {
        let sandbox = FakeSandbox::returning(accepted("1\n"));
        let app = app(FakeLlm::down(), sandbox.clone());

        let (status, body) = post(app, "/generate-and-run", r#"{"prompt": "print one"}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to generate code via API");
        assert_eq!(body["details"], "LLM service unavailable: connection refused");
        assert_eq!(sandbox.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_structured_code_is_server_error() {
        let llm = FakeLlm::replying(r#"{"language":"python","code":"","explanation":"none"}"#);
        let sandbox = FakeSandbox::returning(accepted(""));
        let app = app(llm, sandbox.clone());

        let (status, body) = post(app, "/generate-and-run", r#"{"prompt": "print one"}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "AI did not return any code.");
        assert!(body["details"].is_string());
        assert_eq!(sandbox.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_sandbox_unreachable_after_llm_completed() {
        let llm = FakeLlm::replying("print(1)");
        let app = app(llm.clone(), FakeSandbox::down());

        let (status, body) = post(app, "/generate-and-run", r#"{"prompt": "print one"}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("execution service"));
        assert!(body["details"].as_str().unwrap().contains("unavailable"));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sandbox_rejection_is_server_error_with_details() {
        let llm = FakeLlm::replying(r#"{"language":"python","code":"print(1)","explanation":"x"}"#);
        let sandbox = FakeSandbox::rejecting(422, r#"{"language_id":["can't be blank"]}"#);
        let app = app(llm, sandbox.clone());

        let (status, body) = post(app, "/generate-and-run", r#"{"prompt": "print one"}"#).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to run code on the Judge0 execution service");
        let details = body["details"].as_str().unwrap();
        assert!(details.contains("HTTP 422"), "{details}");
        assert!(details.contains("can't be blank"), "{details}");
        assert_eq!(sandbox.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_plain_mode_language_from_shipped_file() {
        let languages = LanguageTable::load_from_file("../../config/languages.json").unwrap();
        let llm = FakeLlm::replying("```javascript\nconsole.log(1);\n```");
        let sandbox = FakeSandbox::returning(accepted("1\n"));
        let app = app_with(languages, llm.clone(), sandbox.clone());

        let (status, body) = post(
            app,
            "/generate-and-run",
            r#"{"prompt": "prints one", "language": "JavaScript"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["generated_code"], "console.log(1);");

        let (prompt, format) = llm.last.lock().unwrap().clone().unwrap();
        assert_eq!(format, ResponseFormat::Text);
        assert!(prompt.contains("prints one"));
        assert!(prompt.ends_with("Provide only the raw code, with no explanations and no markdown formatting."));
        assert!(!prompt.contains("JSON"));

        let (source, language_id) = sandbox.last.lock().unwrap().clone().unwrap();
        assert_eq!(source, "console.log(1);");
        assert_eq!(language_id, 63);
    }

    #[tokio::test]
    async fn test_list_languages_and_status() {
        let app = app(FakeLlm::replying(""), FakeSandbox::returning(json!({})));

        let response = app
            .clone()
            .oneshot(Request::get("/languages").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({"languages": ["c++", "java", "javascript", "python"]}));

        let response = app
            .oneshot(Request::get("/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_index_page() {
        let app = app(FakeLlm::replying(""), FakeSandbox::returning(json!({})));
        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("/generate-and-run"));
    }

    #[tokio::test]
    async fn test_end_to_end_with_http_upstreams() {
        let mut llm_server = mockito::Server::new_async().await;
        let llm_mock = llm_server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "choices": [{"message": {"role": "assistant", "content":
                        "{\"language\":\"python\",\"code\":\"for i in range(1, 4):\\n    print(i)\",\"explanation\":\"count\"}"
                    }}]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let mut judge0 = mockito::Server::new_async().await;
        let judge0_mock = judge0
            .mock("POST", "/submissions")
            .match_query(mockito::Matcher::Any)
            .match_body(mockito::Matcher::PartialJson(json!({"language_id": 71})))
            .with_status(201)
            .with_header("content-type", "application/json")
            .with_body(accepted("1\n2\n3\n").to_string())
            .create_async()
            .await;

        let llm = OpenAiCompatibleClient::new(&LlmConfig {
            api_key: "sk-test".to_string(),
            base_url: format!("{}/v1", llm_server.url()),
            model: ModelConfig::default(),
        });
        let sandbox = Judge0Client::new(&Judge0Config {
            base_url: judge0.url(),
            auth_token: None,
        });
        let app = app(Arc::new(llm), Arc::new(sandbox));

        let (status, body) = post(
            app,
            "/generate-and-run",
            r#"{"prompt": "print the numbers 1 to 3", "language": "python"}"#,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["generated_code"], "for i in range(1, 4):\n    print(i)");
        assert_eq!(body["execution_result"]["stdout"], "1\n2\n3\n");
        llm_mock.assert_async().await;
        judge0_mock.assert_async().await;
    }
}
