//! Access log for the API.
//! One line per request; health probes are not logged.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{debug, info, warn};

const HEALTH_PATH: &str = "/api/health";

pub async fn request_logging(request: Request, next: Next) -> Response {
    if request.uri().path() == HEALTH_PATH {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match status.as_u16() {
        500.. => warn!(%method, %path, status = status.as_u16(), elapsed_ms, "server error"),
        // Auth rejections are routine; keep them out of the info stream
        401 | 403 => debug!(%method, %path, status = status.as_u16(), elapsed_ms, "rejected"),
        _ => info!(%method, %path, status = status.as_u16(), elapsed_ms, "handled"),
    }

    response
}
