use axum::{
    body::{Body, HttpBody},
    extract::{Request, State},
    http::{header, HeaderMap, Version},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;

use super::body::CountingBody;
use super::summary::Summary;
use super::url_label::{ContextValues, RouteContext, UrlLabelMappingFn};
use super::Exporter;

/// `handler` label of requests that matched no route
pub const UNMATCHED_HANDLER: &str = "unmatched";

/// `url` label when the configured context key is missing
pub const UNKNOWN_URL: &str = "unknown";

/// Middleware to collect HTTP request metrics
pub async fn metrics_middleware(
    State(exporter): State<Arc<Exporter>>,
    mut req: Request,
    next: Next,
) -> Response {
    // The exposition endpoint does not measure itself
    if req.uri().path() == exporter.metrics_path() {
        return next.run(req).await;
    }

    let start = Instant::now();
    let request_size = compute_approximate_request_size(&req);
    let method = req.method().to_string();
    let host = request_host(&req).to_string();
    let route = RouteContext::from_request(&mut req).await;
    let request_values = req.extensions().get::<ContextValues>().cloned();

    // Process request
    let response = next.run(req).await;

    let elapsed = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    // Values returned by the handler win over those set by outer layers
    let values = response
        .extensions()
        .get::<ContextValues>()
        .or(request_values.as_ref());
    let url = resolve_url_label(
        exporter.url_label_fn(),
        exporter.url_label_from_context(),
        &route,
        values,
    );
    let handler = route.matched_path.as_deref().unwrap_or(UNMATCHED_HANDLER);

    let metrics = exporter.metrics();
    if let Some(duration) = &metrics.request_duration_seconds {
        duration
            .with_label_values(&[&status, &method, &url])
            .observe(elapsed);
    }
    if let Some(requests) = &metrics.requests_total {
        requests
            .with_label_values(&[&status, &method, handler, &host, &url])
            .inc();
    }
    if let Some(request_sizes) = &metrics.request_size_bytes {
        request_sizes.observe(request_size as f64);
    }

    match &metrics.response_size_bytes {
        Some(response_sizes) => record_response_size(response, response_sizes),
        None => response,
    }
}

/// Observe the response size now when the body length is known, otherwise
/// count the bytes as the body is sent
fn record_response_size(response: Response, sizes: &Summary) -> Response {
    if let Some(size) = response.body().size_hint().exact() {
        sizes.observe(size as f64);
        return response;
    }
    let sizes = sizes.clone();
    response.map(|body| Body::new(CountingBody::new(body, sizes)))
}

/// URL label of a request: the context override when a key is configured,
/// the mapping function otherwise
pub fn resolve_url_label(
    mapping: &UrlLabelMappingFn,
    from_context: Option<&str>,
    route: &RouteContext,
    values: Option<&ContextValues>,
) -> String {
    match from_context {
        Some(key) => values
            .and_then(|v| v.get(key))
            .unwrap_or(UNKNOWN_URL)
            .to_string(),
        None => mapping(route),
    }
}

/// Approximate size of a request as seen on the wire: path, method,
/// protocol, headers, host and declared body length.
pub fn compute_approximate_request_size<B>(req: &axum::http::Request<B>) -> usize {
    let mut size = req.uri().path().len();

    size += req.method().as_str().len();
    size += protocol(req.version()).len();

    let headers = req.headers();
    for name in headers.keys() {
        // Host is counted once, below
        if *name == header::HOST {
            continue;
        }
        size += name.as_str().len();
        for value in headers.get_all(name) {
            size += value.len();
        }
    }
    size += request_host(req).len();

    // Unknown length counts as zero
    size += content_length(headers).unwrap_or(0);
    size
}

fn request_host<B>(req: &axum::http::Request<B>) -> &str {
    req.headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| req.uri().authority().map(|a| a.as_str()))
        .unwrap_or("")
}

fn content_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

fn protocol(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "",
    }
}
