use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

pub(crate) const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// What a content handler answered with; read back by [`trace_requests`].
#[derive(Debug, Clone)]
pub(crate) struct ContentServed {
    pub kind: &'static str,
    pub key: String,
    pub items: usize,
}

impl ContentServed {
    pub fn new(kind: &'static str, key: impl Into<String>, items: usize) -> Self {
        Self {
            kind,
            key: key.into(),
            items,
        }
    }

    pub fn attach(self, mut response: Response) -> Response {
        response.extensions_mut().insert(self);
        response
    }
}

/// Runs the request inside an `http.request` span so cache and origin logs
/// carry the request id, echoes the id back in `x-request-id` and logs the
/// outcome.
pub async fn trace_requests(request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let htmx = request.headers().contains_key("hx-request");
    let span = info_span!(
        "http.request",
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
        htmx,
    );
    let start = Instant::now();

    let mut response = next.run(request).instrument(span.clone()).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    let _entered = span.enter();
    let elapsed_ms = start.elapsed().as_millis();
    let status = response.status();

    let served = response.extensions_mut().remove::<ContentServed>();
    if let Some(served) = served.filter(|_| status.is_success()) {
        info!(
            target = "quaderno::http::response",
            status = status.as_u16(),
            elapsed_ms,
            kind = served.kind,
            key = %served.key,
            items = served.items,
            "content served",
        );
        return response;
    }

    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let (source, chain) = response
        .extensions_mut()
        .remove::<ErrorReport>()
        .map(|report| (report.source, report.messages))
        .unwrap_or(("unknown", Vec::new()));
    let detail = chain.first().map_or("no diagnostic available", String::as_str);

    if status.is_server_error() {
        error!(
            target = "quaderno::http::response",
            status = status.as_u16(),
            elapsed_ms,
            source,
            detail,
            chain = ?chain,
            "request failed",
        );
    } else {
        warn!(
            target = "quaderno::http::response",
            status = status.as_u16(),
            elapsed_ms,
            source,
            detail,
            "client request error",
        );
    }

    response
}
