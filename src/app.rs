use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};

use crate::api;
use crate::gemini::GeminiClient;

async fn health_check() -> &'static str {
    "OK"
}

/// Builds the service router. The Prometheus layer and /metrics route are
/// wired on top of this in the binary, which keeps the router usable from
/// integration tests.
pub fn app(gemini: Arc<GeminiClient>, http: reqwest::Client) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/verify-video", post(api::verify::verify_video))
        .layer(Extension(gemini))
        .layer(Extension(http))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<axum::body::Body>| {
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched| matched.as_str());

                    // Span name "METHOD /path" (e.g. "POST /verify-video")
                    let span_name = if let Some(path) = matched_path {
                        format!("{} {}", request.method(), path)
                    } else {
                        format!("{} {}", request.method(), request.uri().path())
                    };

                    tracing::info_span!(
                        "request",
                        "otel.name" = span_name,
                        method = ?request.method(),
                        uri = ?request.uri(),
                        status = tracing::field::Empty,
                        latency = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        span.record("status", tracing::field::display(response.status()));
                        span.record("latency", tracing::field::debug(latency));
                        tracing::info!("request completed");
                    },
                ),
        )
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
                .allow_headers([axum::http::header::CONTENT_TYPE]),
        )
}
