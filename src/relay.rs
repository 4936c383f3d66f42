use std::future::Future;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures::StreamExt;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{TokenSigner, SESSION_COOKIE, SESSION_TTL_SECONDS};
use crate::domains::chat::DEFAULT_TEMPERATURE;
use crate::domains::ids::ANON_USER_ID;
use crate::error::{Result, TideChatError};
use crate::interfaces::providers::{CompletionProvider, CompletionRequest, WireMessage};
use crate::seed;

#[derive(Clone)]
pub struct RelayState {
    pub completion: Option<Arc<dyn CompletionProvider>>,
    pub signer: Arc<TokenSigner>,
    pub demo_user_ids: Arc<Vec<String>>,
}

impl RelayState {
    pub fn new(completion: Option<Arc<dyn CompletionProvider>>, signer: TokenSigner) -> Self {
        Self {
            completion,
            signer: Arc::new(signer),
            demo_user_ids: Arc::new(seed::demo_user_ids()),
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Deserialize)]
struct ReplyRequest {
    messages: Vec<WireMessage>,
    #[serde(default = "default_temperature")]
    temperature: f64,
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

#[derive(Deserialize)]
struct TitleRequest {
    messages: Vec<WireMessage>,
}

pub fn build_router(state: RelayState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/login", get(login))
        .route("/api/claude", post(stream_reply))
        .route("/api/claude/title", post(generate_title))
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Demo login: picks a random seeded user, signs a session token for them
/// and sets it as a cookie. The response body is plain "ok".
async fn login(State(state): State<RelayState>) -> impl IntoResponse {
    let user_id = {
        let mut rng = rand::thread_rng();
        state
            .demo_user_ids
            .choose(&mut rng)
            .cloned()
            .unwrap_or_else(|| ANON_USER_ID.to_string())
    };
    match state.signer.issue(&user_id) {
        Ok(token) => {
            let cookie = format!(
                "{SESSION_COOKIE}={token}; Path=/; Max-Age={SESSION_TTL_SECONDS}; SameSite=Lax"
            );
            Response::builder()
                .status(StatusCode::OK)
                .header(header::SET_COOKIE, cookie)
                .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
                .body(Body::from("ok"))
                .unwrap()
        }
        Err(err) => {
            warn!("session token signing failed: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process request")
        }
    }
}

/// Streams the assistant reply for the posted conversation as raw text
/// chunks. Works on anonymous requests too; nothing here checks identity.
async fn stream_reply(
    State(state): State<RelayState>,
    Json(payload): Json<ReplyRequest>,
) -> impl IntoResponse {
    if let Err(rejection) = validate_reply_request(&payload) {
        return rejection.into_response();
    }
    let Some(provider) = state.completion.clone() else {
        return missing_provider_response();
    };

    let request = CompletionRequest::reply(payload.messages, None, payload.temperature);
    let mut stream = match provider.open_stream(request).await {
        Ok(stream) => stream,
        Err(err) => {
            warn!("completion stream failed to open: {err}");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to process request");
        }
    };

    let body = Body::from_stream(async_stream::stream! {
        while let Some(item) = stream.next().await {
            match item {
                Ok(chunk) => {
                    if !chunk.is_empty() {
                        yield Ok::<Bytes, TideChatError>(Bytes::from(chunk));
                    }
                }
                Err(err) => {
                    warn!("completion stream aborted: {err}");
                    yield Err(err);
                    break;
                }
            }
        }
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(body)
        .unwrap()
}

/// Produces a short chat title for the posted conversation. Non-streaming;
/// the body is the trimmed title text.
async fn generate_title(
    State(state): State<RelayState>,
    Json(payload): Json<TitleRequest>,
) -> impl IntoResponse {
    if payload.messages.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "messages must not be empty".to_string(),
            }),
        )
            .into_response();
    }
    let Some(provider) = state.completion.clone() else {
        return missing_provider_response();
    };

    match provider.complete(CompletionRequest::title(payload.messages)).await {
        Ok(title) => (StatusCode::OK, title.trim().to_string()).into_response(),
        Err(err) => {
            warn!("title generation failed: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to generate title")
        }
    }
}

fn validate_reply_request(
    payload: &ReplyRequest,
) -> std::result::Result<(), (StatusCode, Json<ErrorResponse>)> {
    let message = if payload.messages.is_empty() {
        Some("messages must not be empty")
    } else if payload.messages.last().map(|m| m.role.as_str()) != Some("user") {
        Some("messages must end with a user turn")
    } else if !(0.0..=1.0).contains(&payload.temperature) {
        Some("temperature must be within [0, 1]")
    } else {
        None
    };
    match message {
        Some(message) => Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: message.to_string(),
            }),
        )),
        None => Ok(()),
    }
}

fn missing_provider_response() -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "ANTHROPIC_API_KEY is not configured",
    )
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

pub async fn run(host: &str, port: u16, state: RelayState) -> Result<()> {
    run_with_shutdown(host, port, state, futures::future::pending::<()>()).await
}

pub async fn run_with_shutdown<F>(
    host: &str,
    port: u16,
    state: RelayState,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| TideChatError::Runtime(e.to_string()))?;
    info!("relay listening on {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| TideChatError::Runtime(e.to_string()))?;
    Ok(())
}
