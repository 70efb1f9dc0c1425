//! HTTP client behaviour against an in-process axum server.

use axum::{Json, Router};
use axum::body::{Body, to_bytes};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use clonevoice::backend::{ChatBackend, ChatRequest, CloneBackend, HttpBackend};
use clonevoice::clone::profile::CloneRecord;
use clonevoice::clone::{Emotion, FaceFeatures};
use clonevoice::config::BackendConfig;
use clonevoice::defaults;
use clonevoice::error::CloneVoiceError;
use clonevoice::speech::mock::{MockCapture, MockOutput, MockPermission};
use clonevoice::turn::{ControllerConfig, TurnController};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// One request as the server saw it.
#[derive(Debug, Clone)]
struct Recorded {
    method: String,
    path: String,
    headers: HeaderMap,
    body: String,
}

impl Recorded {
    fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

type RequestLog = Arc<Mutex<Vec<Recorded>>>;

async fn record(State(log): State<RequestLog>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, usize::MAX).await.unwrap();
    log.lock().unwrap().push(Recorded {
        method: parts.method.to_string(),
        path: parts
            .uri
            .path_and_query()
            .map(|p| p.to_string())
            .unwrap_or_default(),
        headers: parts.headers.clone(),
        body: String::from_utf8_lossy(&bytes).into_owned(),
    });
    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

struct TestServer {
    addr: SocketAddr,
    requests: RequestLog,
}

impl TestServer {
    async fn start(routes: Router) -> Self {
        let requests: RequestLog = Arc::new(Mutex::new(Vec::new()));
        let app = routes.layer(middleware::from_fn_with_state(
            Arc::clone(&requests),
            record,
        ));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, requests }
    }

    fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn backend(&self, token: Option<&str>) -> HttpBackend {
        HttpBackend::new(&BackendConfig {
            url: self.url(),
            token: token.map(str::to_string),
            ..BackendConfig::default()
        })
        .unwrap()
    }

    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

fn voice_routes() -> Router {
    Router::new()
        .route(
            "/api/ai/chat",
            post(|| async { Json(json!({"response": "Chào bạn!"})) }),
        )
        .route(
            "/api/history",
            get(|| async {
                Json(json!({"messages": [
                    {"user_message": "Xin chào", "ai_response": "Chào bạn!", "timestamp": "2024-05-01T10:00:00"},
                    {"user_message": "Bạn khỏe không?", "ai_response": "Khỏe lắm!", "timestamp": "2024-05-01T10:00:05"}
                ]}))
            }),
        )
        .route(
            "/health",
            get(|| async { Json(json!({"status": "ok", "message": "AIClone backend running"})) }),
        )
}

#[tokio::test]
async fn voice_chat_posts_message_and_reads_response() {
    let server = TestServer::start(voice_routes()).await;
    let backend = server.backend(None);

    let reply = backend.voice_chat("Xin chào").await.unwrap();

    assert_eq!(reply, "Chào bạn!");
    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/api/ai/chat");
    assert_eq!(requests[0].json()["message"], "Xin chào");
    assert!(!requests[0].headers.contains_key("authorization"));
    assert_eq!(requests[0].header("content-type"), Some("application/json"));
}

#[tokio::test]
async fn voice_chat_falls_back_to_ai_response_field() {
    let server = TestServer::start(Router::new().route(
        "/api/ai/chat",
        post(|| async { Json(json!({"response": "  ", "ai_response": "Tôi ở đây."})) }),
    ))
    .await;

    let reply = server.backend(None).voice_chat("Có ai không?").await.unwrap();
    assert_eq!(reply, "Tôi ở đây.");
}

#[tokio::test]
async fn voice_chat_without_text_is_empty_reply() {
    let server = TestServer::start(Router::new().route(
        "/api/ai/chat",
        post(|| async { Json(json!({"timestamp": "now"})) }),
    ))
    .await;

    let err = server.backend(None).voice_chat("alo").await.unwrap_err();
    assert!(matches!(err, CloneVoiceError::EmptyReply));
}

#[tokio::test]
async fn bearer_token_is_sent() {
    let server = TestServer::start(voice_routes()).await;

    server
        .backend(Some("secret-token"))
        .voice_chat("Xin chào")
        .await
        .unwrap();

    let requests = server.requests();
    assert_eq!(
        requests[0].header("authorization"),
        Some("Bearer secret-token")
    );
}

#[tokio::test]
async fn error_status_is_typed() {
    let server = TestServer::start(Router::new().route(
        "/api/ai/chat",
        post(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"detail": "boom"})),
            )
        }),
    ))
    .await;

    let err = server.backend(None).voice_chat("Xin chào").await.unwrap_err();
    match err {
        CloneVoiceError::BackendStatus { status, path } => {
            assert_eq!(status, 500);
            assert_eq!(path, "/api/ai/chat");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn malformed_body_is_typed() {
    let server = TestServer::start(
        Router::new().route("/health", get(|| async { "<html>oops</html>" })),
    )
    .await;

    let err = server.backend(None).health().await.unwrap_err();
    assert!(matches!(err, CloneVoiceError::MalformedResponse { .. }));
    assert!(err.is_backend());
}

#[tokio::test]
async fn unreachable_backend_is_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = HttpBackend::new(&BackendConfig {
        url: format!("http://{addr}"),
        ..BackendConfig::default()
    })
    .unwrap();
    let err = backend.voice_chat("Xin chào").await.unwrap_err();
    assert!(matches!(err, CloneVoiceError::BackendUnavailable { .. }));
}

#[tokio::test]
async fn history_with_limit() {
    let server = TestServer::start(voice_routes()).await;

    let history = server.backend(None).history(Some(2)).await.unwrap();

    assert_eq!(history.messages.len(), 2);
    assert_eq!(history.messages[1].ai_response, "Khỏe lắm!");
    assert_eq!(server.requests()[0].path, "/api/history?limit=2");
}

#[tokio::test]
async fn health_reports_ok() {
    let server = TestServer::start(voice_routes()).await;
    let health = server.backend(None).health().await.unwrap();
    assert!(health.is_ok());
}

#[tokio::test]
async fn turn_against_http_backend() {
    let server = TestServer::start(voice_routes()).await;
    let backend = server.backend(None);
    let capture = MockCapture::new();
    let output = MockOutput::new();
    let mut controller = TurnController::new(
        ControllerConfig::default(),
        Box::new(capture.clone()),
        Box::new(output.clone()),
    );

    controller
        .activate(&MockPermission::granted())
        .await
        .unwrap();
    controller.on_speech_start();
    output.finish_current();
    controller.on_speech_end();
    controller.restart_capture();
    assert!(controller.respond("Xin chào", &backend).await);

    let texts: Vec<&str> = controller
        .conversation()
        .all()
        .iter()
        .map(|m| m.content())
        .collect();
    assert_eq!(texts, vec![defaults::GREETING, "Xin chào", "Chào bạn!"]);
    assert_eq!(output.log().texts().last(), Some(&"Chào bạn!"));
}

fn clone_routes() -> Router {
    Router::new()
        .route(
            "/api/chat",
            post(|| async {
                Json(json!({
                    "user_message": "prompt",
                    "ai_response": "Vui quá! 😊",
                    "timestamp": "2024-05-01T10:00:00"
                }))
            }),
        )
        .route(
            "/api/clones/{id}/memory",
            post(|| async { Json(json!({"message": "Memory added", "memories_count": 1})) }),
        )
        .route(
            "/api/clones/name/{name}",
            get(|| async {
                Json(json!({"id": 7, "name": "Minh Anh", "personality": [], "memories": null}))
            }),
        )
}

fn minh() -> CloneRecord {
    serde_json::from_value(serde_json::json!({
        "id": "c-1",
        "name": "Minh",
        "personality": [
            {"category": "personality", "response": "vui vẻ, hay đùa"}
        ],
        "speaking_style": "thân mật",
        "memories": null
    }))
    .unwrap()
}

#[tokio::test]
async fn clone_backend_prompts_and_saves_memory() {
    let server = TestServer::start(clone_routes()).await;
    let backend = CloneBackend::new(server.backend(None), minh());

    let reply = backend
        .reply(&ChatRequest::new("Hôm nay thế nào?"))
        .await
        .unwrap();

    assert_eq!(reply, "Vui quá! 😊");
    let (emotion, mood) = backend.mood();
    assert_eq!(emotion, Emotion::Happy);
    assert_eq!(mood.value(), defaults::INITIAL_MOOD + 5);

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].path, "/api/chat");
    let prompt = requests[0].json()["text"].as_str().unwrap().to_string();
    assert!(prompt.contains("Minh"));
    assert!(prompt.contains("Hôm nay thế nào?"));

    assert_eq!(requests[1].path, "/api/clones/c-1/memory");
    let memory = requests[1].json();
    assert_eq!(memory["user_message"], "Hôm nay thế nào?");
    assert_eq!(memory["clone_response"], "Vui quá! 😊");
}

#[tokio::test]
async fn clone_reply_survives_memory_failure() {
    let server = TestServer::start(
        Router::new()
            .route(
                "/api/chat",
                post(|| async {
                    Json(json!({"user_message": "p", "ai_response": "Ừ, mình nghe đây."}))
                }),
            )
            .fallback(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "{}") }),
    )
    .await;
    let backend = CloneBackend::new(server.backend(None), minh());

    let reply = backend.reply(&ChatRequest::new("Alo")).await.unwrap();
    assert_eq!(reply, "Ừ, mình nghe đây.");
}

#[tokio::test]
async fn clone_name_is_sent_as_one_encoded_segment() {
    let server = TestServer::start(clone_routes()).await;

    let record = server
        .backend(None)
        .clone_by_name("Minh Anh")
        .await
        .unwrap();

    assert_eq!(record.id, "7");
    assert_eq!(record.name, "Minh Anh");
    assert_eq!(server.requests()[0].path, "/api/clones/name/Minh%20Anh");
}

#[test]
fn default_face_features_serialize_camel_case() {
    let json = serde_json::to_value(FaceFeatures::default()).unwrap();
    assert_eq!(json["skinTone"], "#f5c6a5");
    assert_eq!(json["hairStyle"], "short");
}
