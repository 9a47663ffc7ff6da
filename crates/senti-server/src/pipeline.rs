//! Request pipeline stages
//!
//! Every stage is an axum `from_fn` middleware with the same
//! `(request, next) -> response` shape. From the outside in:
//!
//! 1. [`log_requests`]: correlation id, lifecycle events, `x-request-id`
//! 2. [`track_metrics`]: request/latency/error bookkeeping in a drop guard
//! 3. optional CORS, which answers preflights itself
//! 4. panic containment (`CatchPanicLayer`, installed by the router)
//! 5. [`translate_errors`]: renders [`ErrorReport`]s left by handlers

use crate::state::AppState;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use senti_core::{ErrorKind, ServiceError};
use serde_json::json;
use std::net::SocketAddr;
use std::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Response header carrying the correlation id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Correlation id of the current request, available as a request extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Failure attached to a handler response for [`translate_errors`]
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

/// Handler-side wrapper turning a [`ServiceError`] into a response
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        let status =
            StatusCode::from_u16(kind.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut response = status.into_response();
        response.extensions_mut().insert(ErrorReport {
            kind,
            message: format!("{:#}", self.0),
        });
        response
    }
}

/// Lifecycle logging and correlation ids
pub async fn log_requests(mut request: Request, next: Next) -> Response {
    let request_id = RequestId::generate();
    let span = info_span!("request", request_id = %request_id.as_str());

    async move {
        let start = Instant::now();
        let client_ip = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let user_agent = request
            .headers()
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        info!(
            method = %request.method(),
            path = %request.uri().path(),
            query = request.uri().query().unwrap_or(""),
            client_ip = %client_ip,
            user_agent = %user_agent,
            timestamp = %Utc::now().to_rfc3339(),
            request_id = %request_id.as_str(),
            "request_started"
        );

        request.extensions_mut().insert(request_id.clone());
        let mut response = next.run(request).await;

        info!(
            status_code = response.status().as_u16(),
            duration_ms = round_ms(start.elapsed().as_secs_f64() * 1000.0),
            timestamp = %Utc::now().to_rfc3339(),
            request_id = %request_id.as_str(),
            "request_completed"
        );

        if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        response
    }
    .instrument(span)
    .await
}

/// Request counting, latency and server-error accounting
pub async fn track_metrics(State(state): State<AppState>, request: Request, next: Next) -> Response {
    // Recorded on drop, including when this future is dropped mid-request
    let timer = state.metrics.start_timer();
    let response = next.run(request).await;
    timer.observe_status(response.status().as_u16());
    response
}

/// Render domain errors as `{detail, type, path}`; anything else becomes a
/// bare 500
pub async fn translate_errors(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let response = next.run(request).await;

    let Some(report) = response.extensions().get::<ErrorReport>().cloned() else {
        return response;
    };

    if report.kind.is_domain() {
        warn!(
            error_type = report.kind.type_name(),
            detail = %report.message,
            path = %path,
            "Request failed"
        );
        let body = json!({
            "detail": report.message,
            "type": report.kind.type_name(),
            "path": path,
        });
        (response.status(), Json(body)).into_response()
    } else {
        error!(error = %report.message, path = %path, "Unhandled error");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

fn round_ms(ms: f64) -> f64 {
    (ms * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn fail_with(err: ServiceError) -> std::result::Result<&'static str, ApiError> {
        Err(err.into())
    }

    fn router() -> Router {
        Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route("/model", get(|| fail_with(ServiceError::model("Model failed"))))
            .route("/invalid", get(|| fail_with(ServiceError::validation("Invalid input"))))
            .route("/internal", get(|| fail_with(ServiceError::other("secret stack trace"))))
            .route(
                "/request-id",
                get(|axum::Extension(id): axum::Extension<RequestId>| async move { id.0 }),
            )
            .layer(from_fn(translate_errors))
            .layer(from_fn(log_requests))
    }

    async fn call(uri: &str) -> Response {
        router()
            .oneshot(axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_round_ms() {
        assert_eq!(round_ms(12.3456), 12.35);
        assert_eq!(round_ms(0.0), 0.0);
    }

    #[tokio::test]
    async fn test_domain_error_is_translated() {
        let response = call("/model").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert_eq!(body["detail"], "Model failed");
        assert_eq!(body["type"], "ModelError");
        assert_eq!(body["path"], "/model");

        let body = json_body(call("/invalid").await).await;
        assert_eq!(body["type"], "ValidationError");
        assert_eq!(body["detail"], "Invalid input");
    }

    #[tokio::test]
    async fn test_internal_error_is_bare_500() {
        let response = call("/internal").await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(!String::from_utf8_lossy(&bytes).contains("secret"));
    }

    #[tokio::test]
    async fn test_request_id_header_matches_extension() {
        let response = call("/request-id").await;
        let header = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(String::from_utf8(bytes.to_vec()).unwrap(), header);
        assert!(Uuid::parse_str(&header).is_ok());
    }

    #[tokio::test]
    async fn test_error_responses_carry_request_id() {
        for uri in ["/ok", "/model", "/internal", "/missing"] {
            let response = call(uri).await;
            assert!(
                response.headers().contains_key(REQUEST_ID_HEADER),
                "no request id on {}",
                uri
            );
        }
    }
}
