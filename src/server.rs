use crate::{
    config::Config,
    errors::{AppError, AppResult},
    guard::PathGuard,
    samples,
};
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use anyhow::Context;
use base64::Engine;
use serde_json::{json, Value};
use std::{io::Read, sync::Arc, time::Instant};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub guard: Arc<PathGuard>,
}

impl AppState {
    pub fn new(cfg: Config, guard: PathGuard) -> Self {
        Self { cfg: Arc::new(cfg), guard: Arc::new(guard) }
    }
}

pub async fn serve(cfg: Config, guard: PathGuard) -> anyhow::Result<()> {
    let addr = format!("{}:{}", cfg.server.bind_addr, cfg.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    serve_on(listener, AppState::new(cfg, guard)).await
}

pub async fn serve_on(listener: tokio::net::TcpListener, state: AppState) -> anyhow::Result<()> {
    axum::serve(listener, build_router(state)).await?;
    Ok(())
}

pub fn build_router(shared: AppState) -> Router {
    // Enforced inside the Json extractor so oversized bodies still reach
    // the handler as a rejection and get audited.
    let limit_bytes = shared.cfg.limits.max_request_kb.saturating_mul(1024);
    Router::new()
        .route("/healthz", get(health))
        .route("/read", post(read).layer(DefaultBodyLimit::max(limit_bytes)))
        .route("/setup-sample", post(setup_sample))
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status":"ok"})))
}

async fn read(State(state): State<AppState>, payload: Result<Json<Value>, JsonRejection>) -> Response {
    let started = Instant::now();
    let request_id = uuid::Uuid::new_v4().to_string();

    let outcome = match filename_from(payload) {
        Ok(filename) => {
            let guard = state.guard.clone();
            let max_bytes = (state.cfg.limits.max_file_kb as u64).saturating_mul(1024);
            tokio::task::spawn_blocking(move || read_file(&guard, &filename, max_bytes))
                .await
                .unwrap_or_else(|e| Err(AppError::Internal(e.to_string())))
        }
        Err(e) => Err(e),
    };

    match outcome {
        Ok(file) => {
            let mut body = json!({
                "name": file.name,
                "content": file.content,
                "encoding": file.encoding,
            });
            if state.cfg.response.expose_path {
                body["path"] = json!(file.path);
            }
            audit_end(&request_id, "allow", "OK", started, file.bytes);
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            let decision = match &e {
                AppError::Guard(_) | AppError::BadRequest(_) | AppError::RequestTooLarge => "deny",
                _ => "error",
            };
            audit_end(&request_id, decision, e.code(), started, 0);
            e.into_response()
        }
    }
}

fn filename_from(payload: Result<Json<Value>, JsonRejection>) -> AppResult<String> {
    let Json(body) = payload.map_err(|rej| {
        if rej.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::RequestTooLarge
        } else {
            AppError::BadRequest("body must be a JSON object".into())
        }
    })?;
    body.get("filename")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .ok_or_else(|| AppError::BadRequest("filename required".into()))
}

struct FileOut {
    name: String,
    path: String,
    content: String,
    encoding: &'static str,
    bytes: u64,
}

fn read_file(guard: &PathGuard, filename: &str, max_bytes: u64) -> AppResult<FileOut> {
    let resolved = guard.check(filename)?;
    let file = resolved.open()?;
    let mut data = Vec::new();
    file.take(max_bytes.saturating_add(1))
        .read_to_end(&mut data)
        .map_err(|_| AppError::Internal("read failed".into()))?;
    if data.len() as u64 > max_bytes {
        return Err(AppError::FileTooLarge);
    }
    let bytes = data.len() as u64;
    let (content, encoding) = match String::from_utf8(data) {
        Ok(text) => (text, "utf8"),
        Err(e) => (base64::engine::general_purpose::STANDARD.encode(e.into_bytes()), "base64"),
    };
    Ok(FileOut {
        name: resolved.relative_to(guard.root()),
        path: resolved.as_path().display().to_string(),
        content,
        encoding,
        bytes,
    })
}

async fn setup_sample(State(state): State<AppState>) -> Response {
    let guard = state.guard.clone();
    let written = tokio::task::spawn_blocking(move || samples::write_samples(guard.root()))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))
        .and_then(|r| r.map_err(|_| AppError::Internal("sample setup failed".into())));
    match written {
        Ok(count) => {
            tracing::info!(count, "samples written");
            let mut body = json!({"ok": true});
            if state.cfg.response.expose_path {
                body["base"] = json!(state.guard.root().as_path().display().to_string());
            }
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => e.into_response(),
    }
}

fn audit_end(request_id: &str, decision: &str, code: &str, started: Instant, bytes_out: u64) {
    tracing::info!(
        request_id = request_id,
        route = "/read",
        decision = decision,
        code = code,
        duration_ms = started.elapsed().as_millis() as u64,
        bytes_out = bytes_out,
        "audit"
    );
}
