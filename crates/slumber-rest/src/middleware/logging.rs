//! Request logging middleware.

use crate::middleware::CurrentUser;
use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::info;

/// Request logging middleware.
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let username = response
        .extensions()
        .get::<CurrentUser>()
        .map_or("-", |user| user.0.username.as_str());

    info!(
        target: "http",
        method = %method,
        uri = %uri,
        status = %response.status().as_u16(),
        user = %username,
        duration_ms = %duration.as_millis(),
        "HTTP request completed"
    );

    response
}
