//! HTTP server module
//!
//! Exposes the batch converter over HTTP: `POST /convert` takes a multipart
//! upload and answers with a WebP file or a zip archive, the remaining routes
//! describe the service.

use crate::batch::{BatchOrchestrator, prepare_work_dir};
use crate::{Config, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod body;
pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// Create the router with all route definitions
///
/// # Routes
///
/// - `POST /convert` - Convert uploaded images (multipart/form-data)
/// - `GET /health` - Health check
/// - `GET /capabilities` - Encoder and batch limits
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled)
///
/// Any other path is served from `server.static_dir` when configured.
pub fn create_router(orchestrator: Arc<BatchOrchestrator>, config: Arc<Config>) -> Router {
    let state = AppState::new(orchestrator, config.clone());

    let router = Router::new()
        .route("/convert", post(routes::convert))
        .route("/health", get(routes::health_check))
        .route("/capabilities", get(routes::get_capabilities))
        .route("/openapi.json", get(routes::openapi_spec))
        .layer(DefaultBodyLimit::max(config.server.max_upload_bytes));

    // Merge Swagger UI routes if enabled in config (before applying state)
    let router = if config.server.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state);

    let router = match &config.server.static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    let router = router.layer(TraceLayer::new_for_http());

    // Apply CORS middleware if enabled in config (outermost)
    if config.server.cors_enabled {
        let cors = build_cors_layer(&config.server.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    let cors = if allow_any || origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        CorsLayer::new().allow_origin(AllowOrigin::list(allowed))
    };

    cors.allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([
            axum::http::header::CONTENT_DISPOSITION,
            axum::http::HeaderName::from_static(error_response::ERROR_CODE_HEADER),
        ])
}

/// Start the HTTP server on the configured bind address
///
/// Prepares the work directory (sweeping workspaces left by a previous run),
/// then serves until SIGTERM/SIGINT (Ctrl+C elsewhere). In-flight responses
/// finish before the function returns.
///
/// # Example
///
/// ```no_run
/// use webp_convert::{BatchOrchestrator, Config, encoder};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let encoder = encoder::from_config(&config.encoder);
/// let orchestrator = Arc::new(BatchOrchestrator::from_config(encoder, &config));
///
/// // Blocks until shutdown
/// webp_convert::api::start_api_server(orchestrator, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(
    orchestrator: Arc<BatchOrchestrator>,
    config: Arc<Config>,
) -> Result<()> {
    let bind_address = config.server.bind_address;

    prepare_work_dir(&config.batch.work_dir).await?;

    let app = create_router(orchestrator, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(crate::wait_for_signal())
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
