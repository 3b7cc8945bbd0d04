use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use super::models::HealthResponse;
use super::response::{DocumentAttachment, INVALID_FILE_OR_LANGUAGE, ServerError};
use super::state::AppState;
use super::translate::translate_upload;
use super::upload::read_upload;
use crate::ocr::Tesseract;
use crate::providers;
use crate::settings::Settings;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/upload", post(upload))
        .with_state(Arc::new(state))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn(log_requests))
}

/// Validates the OCR engine, prepares storage and serves until the listener
/// fails.
pub async fn run_server(settings: Settings) -> Result<()> {
    let tesseract = Tesseract::from_settings(&settings);
    let version = tesseract
        .verify()
        .await
        .with_context(|| "OCR engine check failed; set [ocr] tesseract_path in settings")?;
    info!("OCR engine: {}", version);

    let provider = providers::build_provider(&settings)?;
    info!("translation provider: {}", provider.name());
    let state = AppState::new(&settings, Arc::new(tesseract), provider)?;

    if let Some(max_age) = settings.retention {
        info!(
            "removing stored files older than {}s every {}s",
            max_age.as_secs(),
            settings.sweep_interval.as_secs()
        );
        state
            .storage()
            .clone()
            .spawn_retention_task(settings.sweep_interval, max_age);
    }

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&settings.server_addr)
        .await
        .with_context(|| format!("failed to bind server address {}", settings.server_addr))?;
    info!("listening on http://{}", settings.server_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(state.index_html.as_ref().clone())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

async fn upload(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<DocumentAttachment, ServerError> {
    let multipart = multipart.map_err(|rejection| {
        debug!("rejecting upload: {}", rejection.body_text());
        ServerError::bad_request(INVALID_FILE_OR_LANGUAGE)
    })?;
    let upload = read_upload(multipart).await?;
    translate_upload(&state, upload).await
}

async fn log_requests(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(req).await;
    info!(
        "{} {} -> {} ({:.1?})",
        method,
        path,
        response.status().as_u16(),
        started.elapsed()
    );
    response
}
