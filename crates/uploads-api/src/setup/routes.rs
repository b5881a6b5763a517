//! Route configuration and setup

use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::Method,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use uploads_core::Config;

/// Multipart framing on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let http_concurrency_limit = config.http_concurrency_limit();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    let body_limit = config.max_upload_size_bytes() + MULTIPART_OVERHEAD_BYTES;

    let app = Router::new()
        .route("/health", get(handlers::health::health_check))
        // Streaming reads
        .route("/uploads/file/{*key}", get(handlers::file_stream::stream_file))
        .route("/avatars/{filename}", get(handlers::file_stream::stream_avatar))
        .route(
            "/uploads/avatars/{filename}",
            get(handlers::file_stream::stream_avatar),
        )
        .route(
            "/attachments/{*path}",
            get(handlers::file_stream::stream_attachment),
        )
        // Uploads and deletes
        .route("/uploads/avatar", post(handlers::upload::upload_avatar))
        .route(
            "/uploads/attachments",
            post(handlers::upload::upload_root_attachment),
        )
        .route(
            "/uploads/attachments/{*path}",
            get(handlers::file_stream::stream_attachment)
                .post(handlers::upload::upload_attachment)
                .delete(handlers::delete::delete_folder),
        )
        .route(
            "/uploads",
            axum::routing::delete(handlers::delete::delete_file),
        )
        .with_state(state)
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    tracing::info!(
        http_concurrency_limit,
        body_limit_bytes = body_limit,
        "Routes configured"
    );

    Ok(app)
}
