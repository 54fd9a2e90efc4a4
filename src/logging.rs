use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::{Instrument, Level, error, info, info_span, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Reuses the caller's `x-request-id` when it is a usable header value.
fn request_id(req: &Request) -> String {
    req.headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty() && v.len() <= 64)
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// One span per request, closed by a single completion event whose level
/// follows the status class. The request id is echoed on the response.
pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let request_id = request_id(&req);
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        route = %route,
    );

    let mut response = next.run(req).instrument(span.clone()).await;

    let status = response.status().as_u16();
    let latency_ms = start.elapsed().as_millis() as u64;
    span.in_scope(|| match status {
        500..=599 => error!(status, latency_ms, "Request failed"),
        400..=499 => warn!(status, latency_ms, "Request rejected"),
        _ => info!(status, latency_ms, "Request served"),
    });

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

fn console_layer() -> BoxedLayer {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{}=info,tower_http=warn,sqlx=warn",
            env!("CARGO_CRATE_NAME")
        ))
    });

    fmt::layer()
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .compact()
        .with_filter(filter)
        .boxed()
}

/// Plain-text error log plus a JSON info log, both rotated daily.
fn file_layers(log_dir: &str) -> Vec<BoxedLayer> {
    let errors = RollingFileAppender::new(Rotation::DAILY, log_dir, "schoolbase.log");
    let structured = RollingFileAppender::new(Rotation::DAILY, log_dir, "schoolbase.json");

    vec![
        fmt::layer()
            .with_writer(errors)
            .with_target(false)
            .with_ansi(false)
            .with_file(true)
            .with_line_number(true)
            .with_filter(EnvFilter::new(Level::ERROR.as_str()))
            .boxed(),
        fmt::layer()
            .json()
            .with_writer(structured)
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(EnvFilter::new(Level::INFO.as_str()))
            .boxed(),
    ]
}

/// Installs the global subscriber. File output goes under `log_dir`; when the
/// directory cannot be created only the console layer is installed.
pub fn init_tracing(log_dir: &str) {
    let mut layers = vec![console_layer()];
    let dir_error = std::fs::create_dir_all(log_dir).err();
    if dir_error.is_none() {
        layers.extend(file_layers(log_dir));
    }

    tracing_subscriber::registry().with(layers).init();

    match dir_error {
        Some(e) => warn!(log_dir, error = %e, "Log directory unavailable; logging to console only"),
        None => info!(log_dir, "Tracing initialized with file logging"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_request_id_reuses_header() {
        let req = Request::builder()
            .header("x-request-id", "abc-123")
            .body(Body::empty())
            .unwrap();
        assert_eq!(request_id(&req), "abc-123");
    }

    #[test]
    fn test_request_id_generated_when_missing() {
        let req = Request::builder().body(Body::empty()).unwrap();
        let id = request_id(&req);
        assert!(uuid::Uuid::parse_str(&id).is_ok());
    }
}
