//! HTTP surface for the renderer (axum)

use crate::async_api::render_async;
use crate::{Automation, Error, RenderRequest, Result};
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::signal;

pub const PDFRENDER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const GENERATE_PDF_PATH: &str = "/api/generate-pdf";
pub const HEALTH_PATH: &str = "/health";

pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const PDF_CONTENT_DISPOSITION: &str = "attachment; filename=document.pdf";

/// HTTP server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub bind: SocketAddr,
    /// Largest accepted request body
    pub max_body_bytes: usize,
    /// Upper bound for a whole render, launch to close
    pub request_timeout_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            max_body_bytes: 10 * 1024 * 1024,
            request_timeout_ms: 60000,
        }
    }
}

pub struct AppState<A> {
    automation: Arc<A>,
    request_timeout: Duration,
}

impl<A> Clone for AppState<A> {
    fn clone(&self) -> Self {
        Self {
            automation: self.automation.clone(),
            request_timeout: self.request_timeout,
        }
    }
}

/// Build the router with the render and health routes.
pub fn router<A: Automation>(automation: Arc<A>, config: &ServerConfig) -> Router {
    let state = AppState {
        automation,
        request_timeout: Duration::from_millis(config.request_timeout_ms),
    };

    Router::new()
        .route(GENERATE_PDF_PATH, post(generate_pdf_handler::<A>))
        .route(HEALTH_PATH, get(status_handler))
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .with_state(state)
}

/// Serve on an already-bound listener until `shutdown` resolves.
pub async fn serve<A, F>(
    listener: TcpListener,
    automation: Arc<A>,
    config: &ServerConfig,
    shutdown: F,
) -> std::io::Result<()>
where
    A: Automation,
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("Listening on {}", addr);
    }
    axum::serve(listener, router(automation, config))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Render the posted HTML and answer with the PDF as an attachment.
///
/// The body is parsed by hand rather than with the `Json` extractor so that
/// malformed or oversized input takes the same 500 path as automation failures.
pub async fn generate_pdf_handler<A: Automation>(
    State(state): State<AppState<A>>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Result<Response> {
    let started = Instant::now();
    let body = body.map_err(|rejection| Error::InvalidRequest(rejection.body_text()))?;
    let request = RenderRequest::from_json(&body)?;
    info!(
        "Rendering PDF ({} bytes of HTML, margin {})",
        request.content.len(),
        request.margin.css()
    );

    let pdf = render_async(state.automation.clone(), request, state.request_timeout).await?;
    info!("Rendered PDF: {} bytes in {:?}", pdf.len(), started.elapsed());

    Ok(pdf_response(pdf))
}

pub fn pdf_response(pdf: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, PDF_CONTENT_TYPE),
            (header::CONTENT_DISPOSITION, PDF_CONTENT_DISPOSITION),
        ],
        pdf,
    )
        .into_response()
}

#[derive(Debug, Deserialize, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub version: String,
}

/// A handler for a simple liveness check
pub async fn status_handler() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok".to_string(),
        version: PDFRENDER_VERSION.to_string(),
    })
}

impl IntoResponse for Error {
    /// Log the error and convert it into a generic 500 response
    fn into_response(self) -> Response {
        error!("PDF generation failed: {}", self);
        let body = json!({
            "error": self.to_string(),
        });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        () = terminate => {
            info!("Received SIGTERM signal");
        }
    };
}
