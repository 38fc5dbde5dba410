//! DocQA API - HTTP server
//!
//! Answers questions about a directory of documents over HTTP:
//! - `GET /query?q=...` runs a retrieval-augmented query
//! - `GET /health` and `GET /ready` are liveness and readiness probes
//! - `GET /swagger-ui` serves the OpenAPI description
//!
//! Author: hephaex@gmail.com

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

use axum::{http::HeaderValue, Router};
use docqa_core::{LoggingConfig, ServerConfig, DEFAULT_LOG_FILTER};
use state::AppState;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::root,
        handlers::health::health_check,
        handlers::health::readiness_check,
        handlers::query::query_handler,
    ),
    components(schemas(
        error::ErrorDetail,
        handlers::health::MessageResponse,
        handlers::health::HealthResponse,
        handlers::health::ReadinessResponse,
        handlers::query::QueryResponse,
    )),
    tags(
        (name = "query", description = "Question answering over the indexed documents"),
        (name = "health", description = "Greeting and probes")
    )
)]
pub struct ApiDoc;

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server);

    let router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(routes::api_routes())
        .layer(TraceLayer::new_for_http());

    let router = match cors {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router.with_state(state)
}

/// CORS policy: everything allowed unless origins are configured
fn cors_layer(config: &ServerConfig) -> Option<CorsLayer> {
    if !config.cors_enabled {
        return None;
    }

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if config.cors_origins.is_empty() {
        return Some(layer.allow_origin(Any));
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    Some(layer.allow_origin(AllowOrigin::list(origins)))
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. An unparsable level falls back
/// to `DEFAULT_LOG_FILTER`.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    if config.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
