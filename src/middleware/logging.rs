// src/middleware/logging.rs - Structured request logging
use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use std::time::Instant;
use uuid::Uuid;

/// Tags every request with an id and logs method, path, status, and latency.
/// Server-side failures log at error, client mistakes at warn.
pub async fn request_logging_middleware(
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let start = Instant::now();
    let request_id = Uuid::new_v4().to_string();
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "incoming request"
    );

    let response = next.run(req).await;

    let status = response.status();
    let latency_ms = start.elapsed().as_millis();

    match status.as_u16() {
        500..=599 => tracing::error!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = %status.as_u16(),
            latency_ms = %latency_ms,
            "request failed"
        ),
        400..=499 => tracing::warn!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = %status.as_u16(),
            latency_ms = %latency_ms,
            "request rejected"
        ),
        _ => tracing::info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status = %status.as_u16(),
            latency_ms = %latency_ms,
            "request completed"
        ),
    }

    Ok(response)
}
