use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info_span;

use crate::config::AppConfig;
use crate::error::{Result, VisionError};
use crate::pipeline::RecipePipeline;

pub mod error;
pub mod handlers;
pub mod page;

use error::ApiError;

// Room for multipart boundaries and the settings fields
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<RecipePipeline>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig, pipeline: RecipePipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            config: Arc::new(config),
        }
    }
}

/// Create and configure the API router
pub fn create_api(state: AppState) -> Router {
    let server = &state.config.server;
    let body_limit = (server.max_upload_size_mb as usize) * 1024 * 1024 + MULTIPART_OVERHEAD;

    let trace_layer = TraceLayer::new_for_http().make_span_with(|request: &Request| {
        let uri = request.uri().to_string();
        info_span!("http_request", method = ?request.method(), uri)
    });

    let inference = post(handlers::create_recipe)
        .layer(ConcurrencyLimitLayer::new(server.max_concurrent_requests));

    let mut router = Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health_check))
        .route("/api/recipes", inference)
        .route("/api/recipes/:id", get(handlers::get_recipe))
        .route("/api/recipes/:id/export", get(handlers::export_recipe))
        .route("/api/options", get(handlers::options))
        .route("/api/system", get(handlers::system_info));

    if server.enable_xsrf_protection {
        router = router.layer(middleware::from_fn(xsrf_guard));
    }

    router = router
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(middleware::from_fn_with_state(state.clone(), oversized_upload));

    if server.enable_cors {
        tracing::info!("CORS enabled");
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers(Any)
                .max_age(std::time::Duration::from_secs(3600)),
        );
    }

    router.layer(trace_layer).with_state(state)
}

/// Rejects state-changing requests whose `Origin` names a different host.
/// Requests without an `Origin` header (curl, the CLI) pass.
async fn xsrf_guard(request: Request, next: Next) -> Response {
    if request.method() == Method::POST && !same_origin(request.headers()) {
        return ApiError::Forbidden("Cross-origin request rejected by XSRF protection".to_string()).into_response();
    }
    next.run(request).await
}

/// Replaces the plain-text 413 from the body limit with the JSON size error.
async fn oversized_upload(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    if response.status() != StatusCode::PAYLOAD_TOO_LARGE {
        return response;
    }

    let max_mb = state
        .config
        .server
        .max_upload_size_mb
        .min(state.config.limits.max_file_size_mb);
    ApiError::PayloadTooLarge(VisionError::ImageTooLarge { max_mb }.to_string()).into_response()
}

fn same_origin(headers: &HeaderMap) -> bool {
    let Some(origin) = headers.get(header::ORIGIN).and_then(|o| o.to_str().ok()) else {
        return true;
    };
    let Some(host) = headers.get(header::HOST).and_then(|h| h.to_str().ok()) else {
        return false;
    };

    let Ok(origin) = url::Url::parse(origin) else {
        return false;
    };
    // Host carries no scheme; borrow the origin's so default ports line up
    let Ok(host) = url::Url::parse(&format!("{}://{}", origin.scheme(), host)) else {
        return false;
    };

    match (origin.host_str(), host.host_str()) {
        (Some(a), Some(b)) => {
            a.eq_ignore_ascii_case(b) && origin.port_or_known_default() == host.port_or_known_default()
        }
        _ => false,
    }
}

/// Binds the configured address and serves until the process is stopped.
pub async fn serve(state: AppState) -> Result<()> {
    let addr = state.config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        VisionError::Config(format!(
            "Failed to bind {}: {}. Is another server running? Try a different port with --server.port",
            addr, e
        ))
    })?;

    tracing::info!("API server listening on http://{}", addr);
    axum::serve(listener, create_api(state)).await?;
    Ok(())
}
