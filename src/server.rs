use crate::config::HttpServerConfig;
use crate::engine::RagEngine;
use crate::error::{RagError, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shown to clients for any failure inside the engine
pub const GENERIC_FAILURE: &str = "Failed to process request.";

pub const MESSAGE_REQUIRED: &str = "Message is required.";

/// Inbound chat request
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub message: Option<String>,
}

/// HTTP front end for the engine
pub struct HttpServer {
    engine: Arc<RagEngine>,
    config: HttpServerConfig,
}

impl HttpServer {
    pub fn new(engine: Arc<RagEngine>, config: HttpServerConfig) -> Self {
        Self { engine, config }
    }

    /// Bind and serve until the process exits
    pub async fn run(&self) -> Result<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
            RagError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to bind to {}: {}", addr, e),
            ))
        })?;

        log::info!("Serving RAG endpoint on http://{}/api/rag", addr);

        axum::serve(listener, router(Arc::clone(&self.engine), &self.config.allowed_origins))
            .await
            .map_err(|e| {
                RagError::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("HTTP server error: {}", e),
                ))
            })?;

        Ok(())
    }
}

/// Build the axum router
pub fn router(engine: Arc<RagEngine>, allowed_origins: &[String]) -> Router {
    // Empty list means any origin
    let cors = if allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route("/api/rag", post(handle_ask))
        .route("/health", get(handle_health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(engine)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Handle POST /api/rag
async fn handle_ask(
    State(engine): State<Arc<RagEngine>>,
    payload: std::result::Result<Json<AskRequest>, JsonRejection>,
) -> Response {
    let message = payload
        .ok()
        .and_then(|Json(request)| request.message)
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty());

    let message = match message {
        Some(m) => m,
        None => return error_response(StatusCode::BAD_REQUEST, MESSAGE_REQUIRED),
    };

    match engine.answer(&message).await {
        Ok(answer) => (StatusCode::OK, Json(answer)).into_response(),
        Err(e) => {
            // Detail stays in the operator log
            log::error!("RAG request failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, GENERIC_FAILURE)
        }
    }
}

async fn handle_health() -> Response {
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ok",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
        .into_response()
}
