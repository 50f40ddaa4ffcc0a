use std::time::Instant;

use axum::{middleware::Next, response::Response};

/// Logs one line per request with its status and latency.
pub async fn trace_requests(req: axum::http::Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(req).await;

    let status = response.status();
    let elapsed_us = started.elapsed().as_micros() as u64;
    if status.is_server_error() {
        tracing::error!(%method, %path, status = status.as_u16(), elapsed_us, "request failed");
    } else {
        tracing::info!(%method, %path, status = status.as_u16(), elapsed_us, "request");
    }

    response
}
