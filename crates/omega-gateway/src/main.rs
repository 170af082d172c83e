//! Axum-based AI task gateway: `/login` issues bearer tokens, `/ai-task`
//! routes authenticated requests through the task dispatcher. Config-driven
//! via `GatewayConfig`; all collaborators are built in `main` and injected
//! through router state.

use axum::{
    extract::{Json, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use omega_core::{
    AnswerStore, GatewayConfig, GatewayError, OpenAiBackend, TaskDispatcher, TaskRequest,
    TokenSigner,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone)]
struct AppState {
    signer: Arc<TokenSigner>,
    dispatcher: Arc<TaskDispatcher>,
}

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct TokenResponse {
    access_token: String,
    token_type: &'static str,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = GatewayConfig::from_env();
    let state = match build_state(&config) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("gateway startup failed: {e}");
            std::process::exit(1);
        }
    };

    let app = router(state);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            tracing::error!("bind failed on {addr}: {e}");
            std::process::exit(1);
        }
    };
    tracing::info!("omega gateway listening on {addr}");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
    }
}

fn build_state(config: &GatewayConfig) -> Result<AppState, GatewayError> {
    let signer = TokenSigner::new(&config.jwt_algorithm, &config.jwt_secret)?;
    let store = AnswerStore::new(PathBuf::from(&config.database_path))?;
    let backend = Arc::new(OpenAiBackend::new(
        &config.api_base,
        &config.api_key,
        &config.text_model,
        &config.image_model,
    ));
    let dispatcher = TaskDispatcher::new(backend, store, config.tool_hint_enabled);
    Ok(AppState {
        signer: Arc::new(signer),
        dispatcher: Arc::new(dispatcher),
    })
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/login", post(login))
        .route("/ai-task", post(ai_task))
        .with_state(state)
        .layer(cors)
}

async fn health() -> &'static str {
    "OK"
}

/// Demo login: any non-empty username/password pair gets a token. There is no
/// user store.
async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> Response {
    if req.username.is_empty() || req.password.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "invalid credentials");
    }
    match state.signer.issue(&req.username) {
        Ok(token) => Json(TokenResponse {
            access_token: token,
            token_type: "bearer",
        })
        .into_response(),
        Err(e) => {
            tracing::error!("token issuance failed: {e}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "token issuance failed")
        }
    }
}

async fn ai_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<TaskRequest>,
) -> Response {
    let subject = match authorize(&state, &headers) {
        Ok(s) => s,
        Err(e) => return map_error(e),
    };
    tracing::debug!(subject = %subject, task = %req.task, "dispatching ai task");

    match state.dispatcher.dispatch(req).await {
        Ok(outcome) => Json(json!({
            "ok": true,
            "task": outcome.task,
            "data": outcome.data,
        }))
        .into_response(),
        Err(e) => map_error(e),
    }
}

fn authorize(state: &AppState, headers: &HeaderMap) -> Result<String, GatewayError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| GatewayError::Auth("missing bearer token".to_string()))?;
    state.signer.verify(token)
}

fn map_error(err: GatewayError) -> Response {
    let status = match &err {
        GatewayError::Auth(_) => StatusCode::UNAUTHORIZED,
        GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
        GatewayError::Upstream(_) | GatewayError::Storage(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("ai task failed: {err}");
    }
    error_response(status, &err.to_string())
}

fn error_response(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({ "ok": false, "detail": detail }))).into_response()
}
