use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use society_ai_service::app::app;
use society_ai_service::gemini::GeminiClient;

#[tokio::main]
async fn main() {
    // Load .env if present (dotenvy)
    dotenvy::dotenv().ok();

    society_ai_service::telemetry::init_telemetry("society-ai-service");

    let (prometheus_layer, metric_handle) = axum_prometheus::PrometheusMetricLayer::pair();

    // One shared outbound client for the video download and all Gemini calls
    let http = reqwest::Client::new();
    let gemini = Arc::new(GeminiClient::new(http.clone()));

    let app = app(gemini, http)
        .layer(prometheus_layer)
        .route("/metrics", get(|| async move { metric_handle.render() }));

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(5000);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
