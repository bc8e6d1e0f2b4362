//! HTTP surface: the transcription endpoint, the ffmpeg diagnostic and the front end bundle.

use anyhow::Context;
use axum::middleware;
use axum::routing::get;
use axum::Router;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::Config;
use crate::transcribe::TranscriptionPipeline;
use crate::Result;

pub mod handlers;
pub mod request_id;

pub use handlers::{DownloadResponse, DOWNLOAD_ERROR_BODY};
pub use request_id::{request_id_middleware, REQUEST_ID_HEADER};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<TranscriptionPipeline>,
    pub ffmpeg_path: Arc<str>,
}

impl AppState {
    pub fn new(pipeline: TranscriptionPipeline, ffmpeg_path: impl Into<Arc<str>>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            ffmpeg_path: ffmpeg_path.into(),
        }
    }
}

/// Build the router.
///
/// Unknown paths fall through to `static_dir`, and anything not on disk there is answered
/// with its `index.html` so the client-side router can take over.
pub fn create_router(state: AppState, static_dir: Option<&Path>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let mut router = Router::new()
        .route("/download", get(handlers::download_handler))
        .route("/ffmpeg-version", get(handlers::ffmpeg_version_handler))
        .route("/health", get(handlers::health_handler));

    if let Some(dir) = static_dir {
        let index = dir.join("index.html");
        if !index.is_file() {
            tracing::warn!(path = %index.display(), "Front end bundle not found, unknown paths will 404");
        }
        router = router.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
    }

    router
        .layer(middleware::from_fn(request_id_middleware))
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until ctrl-c
pub async fn serve(config: &Config, pipeline: TranscriptionPipeline) -> Result<()> {
    let state = AppState::new(pipeline, config.media.ffmpeg_path.as_str());
    let router = create_router(state, Some(config.server.static_dir.as_path()));

    let host = config.server.host.as_str();
    let port = config.server.port;
    let listener = TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", host, port))?;
    let addr = listener.local_addr().context("Listener has no local address")?;

    tracing::info!(
        %addr,
        static_dir = %config.server.static_dir.display(),
        "Server listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
