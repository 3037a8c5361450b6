//! Request identification and access logging.
//!
//! # Responsibilities
//! - Assign a UUID request ID (`x-request-id`) unless the client sent one
//! - Echo the request ID on the response
//! - Open a span per request carrying the ID
//! - Emit one "request processed" log line and request metrics
//!
//! # Design Decisions
//! - Request ID added as early as possible (outermost layer) for tracing
//! - The access log runs inside the span so its line carries the request ID

use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderName, Request},
    middleware::Next,
    response::Response,
};
use tower_http::{
    classify::{ServerErrorsAsFailures, SharedClassifier},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::Span;

use crate::observability::metrics;

/// Header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Layer that assigns a UUID v4 request ID.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid)
}

/// Layer that copies the request ID onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID)
}

/// Read the request ID, if one has been assigned.
pub fn request_id<B>(request: &Request<B>) -> &str {
    request
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

fn make_span(request: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        request_id = %request_id(request),
        method = %request.method(),
        path = %request.uri().path(),
    )
}

/// Trace layer opening one span per request.
pub fn trace_layer(
) -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, fn(&Request<Body>) -> Span> {
    TraceLayer::new_for_http().make_span_with(make_span as fn(&Request<Body>) -> Span)
}

/// Middleware logging method, path, status and duration of each request.
pub async fn access_log(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let status = response.status();
    tracing::info!(
        method = %method,
        path = %path,
        status = status.as_u16(),
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "request processed"
    );
    metrics::record_request(method.as_str(), status.as_u16(), start);

    response
}
