use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::media::transcoder::{ffmpeg_version, VersionReport};

/// Body sent for every failed `/download`, whatever went wrong
pub const DOWNLOAD_ERROR_BODY: &str = "Error downloading audio";

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DownloadResponse {
    pub title: String,
    #[serde(rename = "thumbnailUrl")]
    pub thumbnail_url: String,
    pub text: String,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[tracing::instrument(skip(state))]
pub async fn download_handler(
    State(state): State<AppState>,
    Query(query): Query<DownloadQuery>,
) -> Response {
    let url = query.url.unwrap_or_default();

    match state.pipeline.transcribe_from_url(&url).await {
        Ok(result) => {
            tracing::info!(
                title = %result.title,
                chars = result.text.len(),
                transcoded = result.metadata.transcoded,
                processing_secs = result.metadata.processing_duration,
                "Transcription delivered"
            );
            (
                StatusCode::OK,
                Json(DownloadResponse {
                    title: result.title,
                    thumbnail_url: result.thumbnail_url,
                    text: result.text,
                }),
            )
                .into_response()
        }
        Err(e) => {
            let error = format!("{:#}", e);
            tracing::error!(error = %error, "Download request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, DOWNLOAD_ERROR_BODY).into_response()
        }
    }
}

pub async fn ffmpeg_version_handler(State(state): State<AppState>) -> Response {
    match ffmpeg_version(&state.ffmpeg_path).await {
        VersionReport::Stdout(out) => (StatusCode::OK, format!("ffmpeg stdout: {}", out)).into_response(),
        VersionReport::Stderr(err) => {
            tracing::warn!(stderr = %err, "ffmpeg wrote to stderr");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("ffmpeg stderr: {}", err)).into_response()
        }
        VersionReport::Error(err) => {
            tracing::error!(error = %err, "ffmpeg could not run");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("ffmpeg error: {}", err)).into_response()
        }
    }
}

pub async fn health_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
        }),
    )
}
