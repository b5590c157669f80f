//! Operational HTTP endpoints.
//!
//! - `/`        : landing page
//! - `/healthz` : liveness
//! - `/metrics` : Prometheus text format, one collection pass per scrape

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::app_state::AppState;
use crate::obs::SentryMetrics;

const INDEX_HTML: &str = r#"<html>
<head><title>Sentry Exporter</title></head>
<body>
<h1>Sentry Exporter</h1>
<p><a href="/metrics">Metrics</a></p>
</body>
</html>
"#;

pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    let samples = state.collector().collect().await;

    let mut body = String::new();
    SentryMetrics::from_samples(&samples).render(&mut body);
    state.metrics().render(&mut body);

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
        .into_response()
}
