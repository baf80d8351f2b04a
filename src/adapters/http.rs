use crate::core::export::Exporter;
use crate::utils::error::ExportError;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

pub const TAR_CONTENT_TYPE: &str = "application/x-tar";

#[derive(Clone)]
pub struct AppState {
    exporter: Arc<Exporter>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub repo: Option<String>,
}

pub fn router(exporter: Arc<Exporter>) -> Router {
    Router::new()
        .route("/", get(export_archive))
        .route("/healthz", get(health))
        .with_state(AppState { exporter })
}

pub async fn serve<F>(
    listener: TcpListener,
    exporter: Arc<Exporter>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(exporter))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn export_archive(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ExportError> {
    let repo = state.exporter.resolve_repo(query.repo.as_deref())?;
    let archive = state.exporter.export(&repo).await?;

    let disposition = format!("attachment; filename=\"{}\"", archive.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, TAR_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        archive.bytes,
    )
        .into_response())
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    match state.exporter.runtime().ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "status": "unavailable" })),
            )
        }
    }
}

impl IntoResponse for ExportError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_client_error() {
            tracing::warn!("Rejected request: {}", self);
        }

        (status, self.user_friendly_message()).into_response()
    }
}
