//! Request/response types and route handlers.

use super::AppState;
use crate::agent::RawMessage;
use crate::error::WikiAgentError;
use crate::util::padded_len;
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
        Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

// === Request/Response Types ===

#[derive(Debug, Deserialize)]
pub struct ProcessDataRequest {
    /// Free-form question or instruction for the agent.
    pub user_input: String,
    /// Name of a previously uploaded file the question refers to.
    #[serde(default)]
    pub filename: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProcessDataResponse {
    pub message: String,
    #[serde(rename = "agent's response")]
    pub agent_response: String,
    pub tool_response: Option<String>,
    pub raw_messages: Vec<RawMessage>,
    pub input_length: usize,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub filename: String,
    pub size: usize,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Errors surfaced to HTTP clients.
#[derive(Debug)]
pub enum ApiError {
    /// Body failed to parse into the expected shape.
    Json(JsonRejection),
    Multipart(MultipartRejection),
    /// Multipart body failed while streaming, e.g. over the size limit.
    Upload(MultipartError),
    /// Body parsed but a field is unacceptable.
    Validation(String),
    Agent(WikiAgentError),
    Timeout(u64),
}

impl From<WikiAgentError> for ApiError {
    fn from(e: WikiAgentError) -> Self {
        match e {
            WikiAgentError::InvalidInput(msg) => ApiError::Validation(msg),
            other => ApiError::Agent(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Json(rejection) => (rejection.status(), rejection.body_text()),
            ApiError::Multipart(rejection) => (rejection.status(), rejection.body_text()),
            ApiError::Upload(e) => (e.status(), format!("Malformed upload: {}", e.body_text())),
            ApiError::Validation(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::Agent(e) if e.is_upstream() => (StatusCode::BAD_GATEWAY, e.to_string()),
            ApiError::Agent(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::Timeout(secs) => (
                StatusCode::GATEWAY_TIMEOUT,
                format!("Agent did not answer within {} seconds", secs),
            ),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

// === Handlers ===

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn process_data(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ProcessDataRequest>, JsonRejection>,
) -> Result<Json<ProcessDataResponse>, ApiError> {
    let Json(req) = payload.map_err(ApiError::Json)?;
    let span = info_span!("process_data", request_id = %Uuid::new_v4());

    async move {
        if let Some(filename) = req.filename.as_deref().filter(|f| !f.is_empty()) {
            info!("File: {}", filename);
        }
        if req.user_input.trim().is_empty() {
            return Err(ApiError::Validation(
                "user_input must not be empty".to_string(),
            ));
        }
        info!("User Input: {}", req.user_input);

        let run = state.agent.run(&req.user_input);
        let response = tokio::time::timeout(state.request_timeout, run)
            .await
            .map_err(|_| {
                warn!("Agent run timed out");
                ApiError::Timeout(state.request_timeout.as_secs())
            })?
            .map_err(|e| {
                error!("Agent run failed: {}", e);
                ApiError::from(e)
            })?;

        info!(
            steps = response.steps,
            tool_calls = response.tool_calls.len(),
            "Agent answered"
        );

        Ok(Json(ProcessDataResponse {
            message: "Data received successfully!".to_string(),
            agent_response: response.answer,
            tool_response: response.tool_response,
            raw_messages: response.raw_messages,
            input_length: padded_len(&req.user_input),
        }))
    }
    .instrument(span)
    .await
}

pub async fn upload_file(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart.map_err(ApiError::Multipart)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(ApiError::Upload)?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content = field.bytes().await.map_err(|e| {
            warn!("Upload failed: {}", e);
            ApiError::Upload(e)
        })?;

        info!("Received file: {}, Size: {} bytes", filename, content.len());
        return Ok(Json(UploadResponse {
            filename,
            size: content.len(),
        }));
    }

    Err(ApiError::Validation("Missing 'file' field".to_string()))
}

#[cfg(test)]
mod tests {
    use super::super::{router, AppState};
    use crate::agent::WikiAgent;
    use crate::llm::{ChatModel, Message, ToolCallRequest};
    use crate::testing::{EchoTool, LoopingModel, ScriptedModel, SlowModel};
    use crate::tools::ToolSet;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use axum::Router;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    struct TestApp {
        model: Arc<dyn ChatModel>,
        recursion_limit: usize,
        request_timeout: Duration,
        max_upload_bytes: usize,
    }

    impl TestApp {
        fn new(model: Arc<dyn ChatModel>) -> Self {
            Self {
                model,
                recursion_limit: 25,
                request_timeout: Duration::from_secs(5),
                max_upload_bytes: 1024 * 1024,
            }
        }

        fn build(self) -> Router {
            let tools = ToolSet::new().with_tool(Arc::new(EchoTool::new("wikipedia")));
            let agent = WikiAgent::new(self.model, tools, self.recursion_limit).unwrap();
            let state = Arc::new(AppState {
                agent,
                request_timeout: self.request_timeout,
            });
            router(state, self.max_upload_bytes)
        }
    }

    fn app(replies: Vec<Message>) -> Router {
        TestApp::new(Arc::new(ScriptedModel::new(replies))).build()
    }

    fn json_post(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(vec![])
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_process_data_returns_agent_answer() {
        let app = app(vec![
            Message::Assistant {
                content: String::new(),
                tool_calls: vec![ToolCallRequest {
                    id: "c1".to_string(),
                    name: "wikipedia".to_string(),
                    arguments: r#"{"query":"Ada Lovelace"}"#.to_string(),
                }],
            },
            Message::assistant("Ada Lovelace wrote the first program."),
        ]);

        let response = app
            .oneshot(json_post(
                "/process-data/",
                serde_json::json!({"user_input": "Who was Ada Lovelace?", "filename": "notes.pdf"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Data received successfully!");
        assert_eq!(
            body["agent's response"],
            "Ada Lovelace wrote the first program."
        );
        assert_eq!(body["tool_response"], "wikipedia result for Ada Lovelace");
        assert_eq!(body["input_length"], 121);

        let raw = body["raw_messages"].as_array().unwrap();
        assert_eq!(raw.len(), 4);
        assert_eq!(raw[0]["type"], "user");
        assert_eq!(raw[0]["text"], "Who was Ada Lovelace?");
        assert_eq!(raw[2]["type"], "tool");
        assert_eq!(raw[3]["type"], "agent");
        assert!(raw[0]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_process_data_without_trailing_slash() {
        let response = app(vec![Message::assistant("hi")])
            .oneshot(json_post(
                "/process-data",
                serde_json::json!({"user_input": "hello"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["tool_response"].is_null());
    }

    #[tokio::test]
    async fn test_process_data_missing_field() {
        let response = app(vec![])
            .oneshot(json_post(
                "/process-data/",
                serde_json::json!({"filename": "a.txt"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("user_input"));
    }

    #[tokio::test]
    async fn test_process_data_blank_input() {
        let response = app(vec![])
            .oneshot(json_post(
                "/process-data/",
                serde_json::json!({"user_input": "   "}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_process_data_upstream_failure() {
        // empty script: the model call fails like an unreachable provider
        let response = app(vec![])
            .oneshot(json_post(
                "/process-data/",
                serde_json::json!({"user_input": "hello"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("script exhausted"));
    }

    #[tokio::test]
    async fn test_process_data_timeout() {
        let mut test_app = TestApp::new(Arc::new(SlowModel::new(Duration::from_secs(5))));
        test_app.request_timeout = Duration::from_millis(50);

        let response = test_app
            .build()
            .oneshot(json_post(
                "/process-data/",
                serde_json::json!({"user_input": "hello"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("did not answer"));
    }

    #[tokio::test]
    async fn test_process_data_recursion_limit() {
        let mut test_app = TestApp::new(Arc::new(LoopingModel::new("wikipedia")));
        test_app.recursion_limit = 3;

        let response = test_app
            .build()
            .oneshot(json_post(
                "/process-data/",
                serde_json::json!({"user_input": "hello"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("Recursion limit of 3"));
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/process-data/")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap();

        let response = app(vec![]).oneshot(request).await.unwrap();
        let headers = response.headers();
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://localhost:3000"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "POST");
    }

    fn multipart_request(field_name: &str, filename: &str, content: &str) -> Request<Body> {
        let boundary = "wikiagent-boundary";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"{n}\"; filename=\"{f}\"\r\nContent-Type: text/plain\r\n\r\n{c}\r\n--{b}--\r\n",
            b = boundary,
            n = field_name,
            f = filename,
            c = content
        );
        Request::builder()
            .method(Method::POST)
            .uri("/upload-file/")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_file_reports_size() {
        let response = app(vec![])
            .oneshot(multipart_request("file", "notes.txt", "hello world"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["filename"], "notes.txt");
        assert_eq!(body["size"], 11);
    }

    #[tokio::test]
    async fn test_upload_file_requires_file_field() {
        let response = app(vec![])
            .oneshot(multipart_request("attachment", "notes.txt", "hello"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_upload_file_over_limit() {
        let mut test_app = TestApp::new(Arc::new(ScriptedModel::new(vec![])));
        test_app.max_upload_bytes = 1024;

        let response = test_app
            .build()
            .oneshot(multipart_request("file", "big.txt", &"x".repeat(4096)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("too large"));
    }

    #[tokio::test]
    async fn test_upload_file_rejects_non_multipart() {
        let response = app(vec![])
            .oneshot(json_post("/upload-file/", serde_json::json!({})))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }
}
