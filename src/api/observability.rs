//! Request logging and the Prometheus endpoint.

use crate::api::AppState;
use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, Span, field, info, info_span, warn};
use uuid::Uuid;

/// Correlation id forwarded by the fronting proxy. Generated when absent.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 128;

/// Attached to feed responses so the request log shows which session served
/// the page and whether upstream was skipped.
#[derive(Debug, Clone, Copy)]
pub struct FeedServed {
    pub session_id: i32,
    pub from_cache: bool,
}

pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.prometheus_handle.as_ref().map_or_else(
        || "Metrics not enabled or failed to initialize".to_string(),
        metrics_exporter_prometheus::PrometheusHandle::render,
    )
}

fn request_id(req: &Request) -> String {
    req.headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= MAX_REQUEST_ID_LEN)
        .map_or_else(|| Uuid::new_v4().to_string(), str::to_string)
}

/// One span per request. `user_id` is filled in by the [`UserContext`]
/// extractor, the feed fields by [`FeedServed`].
///
/// [`UserContext`]: crate::domain::UserContext
pub async fn request_logging(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let request_id = request_id(&req);
    let method = req.method().to_string();

    // Unmatched paths share one label to keep label cardinality bounded.
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| "unmatched".to_string(), |p| p.as_str().to_string());

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        route = %route,
        user_id = field::Empty,
        session_id = field::Empty,
        from_cache = field::Empty,
    );

    async move {
        let response = next.run(req).await;
        let elapsed = start.elapsed();
        let status = response.status();

        if let Some(served) = response.extensions().get::<FeedServed>() {
            let span = Span::current();
            span.record("session_id", served.session_id);
            span.record("from_cache", served.from_cache);
        }

        let labels = [
            ("method", method),
            ("route", route),
            ("status", status.as_u16().to_string()),
        ];
        metrics::counter!("http_requests_total", &labels).increment(1);
        metrics::histogram!("http_request_duration_seconds", &labels)
            .record(elapsed.as_secs_f64());

        let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        if status.is_server_error() {
            warn!(
                event = "http_request_finished",
                duration_ms,
                status_code = status.as_u16(),
                "Request failed"
            );
        } else {
            info!(
                event = "http_request_finished",
                duration_ms,
                status_code = status.as_u16(),
                "Request finished"
            );
        }

        response
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with(id: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/api/feed");
        if let Some(id) = id {
            builder = builder.header(REQUEST_ID_HEADER, id);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn forwarded_request_id_is_kept() {
        assert_eq!(request_id(&request_with(Some(" edge-42 "))), "edge-42");
    }

    #[test]
    fn missing_or_oversized_request_id_is_generated() {
        let generated = request_id(&request_with(None));
        assert!(Uuid::parse_str(&generated).is_ok());

        let oversized = "x".repeat(MAX_REQUEST_ID_LEN + 1);
        let replaced = request_id(&request_with(Some(&oversized)));
        assert!(Uuid::parse_str(&replaced).is_ok());
    }
}
