//! Route handlers

use crate::extract::ValidatedJson;
use crate::pipeline::{ApiError, RequestId};
use crate::state::AppState;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use senti_core::{ModelFailureExt, Prediction, SentimentRequest, SentimentResponse, ServiceError};
use senti_metrics::{render_prometheus, CONTENT_TYPE};
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Liveness payload, no dependencies
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "ML Model Service is running",
        "status": "healthy",
    }))
}

/// Readiness: builds the model if needed and reports whether it is usable.
///
/// Failures are absorbed into a 503; this handler never errors.
pub async fn health(State(state): State<AppState>) -> Response {
    match state.manager.acquire().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "checks": {
                    "model_loaded": true,
                    "service": "healthy",
                },
            })),
        )
            .into_response(),
        Err(e) => {
            warn!(
                error = %e,
                model_state = %state.manager.state(),
                "Health check failed"
            );
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unavailable",
                    "reason": "Model not loaded",
                    "checks": {
                        "model_loaded": false,
                        "service": "degraded",
                    },
                })),
            )
                .into_response()
        }
    }
}

/// Prometheus text exposition of the request metrics
pub async fn metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    let summary = state.metrics.summary();
    let body = render_prometheus(&summary, state.manager.is_ready()).map_err(ServiceError::other)?;

    Ok(([(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response())
}

/// Classify the submitted text
pub async fn analyze(
    State(state): State<AppState>,
    request_id: Option<Extension<RequestId>>,
    ValidatedJson(request): ValidatedJson<SentimentRequest>,
) -> Result<Json<SentimentResponse>, ApiError> {
    let prediction = predict(&state, &request.text).await.or_model_failure()?;

    debug!(
        label = %prediction.label,
        score = prediction.score,
        "Prediction complete"
    );

    let request_id = request_id.map(|Extension(id)| id.0);
    Ok(Json(prediction.into_response(request.text, request_id)))
}

async fn predict(state: &AppState, text: &str) -> senti_core::Result<Prediction> {
    let model = state.manager.acquire().await?;
    model.classify(text).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::create_router;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::extract::Request;
    use http_body_util::BodyExt;
    use senti_core::{Result, Settings};
    use senti_metrics::MetricsCollector;
    use senti_model::{ModelManager, ResourceLoader, SentimentModel};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt;
    use uuid::Uuid;

    #[derive(Clone, Copy)]
    enum Behavior {
        Positive,
        Fail,
        Panic,
    }

    struct FakeModel {
        behavior: Behavior,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl SentimentModel for FakeModel {
        fn name(&self) -> &str {
            "fake"
        }

        async fn predict(&self, _text: &str) -> Result<Vec<Prediction>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Positive => Ok(vec![
                    Prediction::new("POSITIVE", 0.9998),
                    Prediction::new("NEGATIVE", 0.0002),
                ]),
                Behavior::Fail => Err(ServiceError::other("CUDA out of memory")),
                Behavior::Panic => panic!("inference exploded"),
            }
        }
    }

    struct FakeLoader {
        behavior: Behavior,
        calls: Arc<AtomicUsize>,
        broken: bool,
    }

    #[async_trait]
    impl ResourceLoader<dyn SentimentModel> for FakeLoader {
        async fn load(&self) -> Result<Arc<dyn SentimentModel>> {
            if self.broken {
                return Err(ServiceError::other("weights not found"));
            }
            Ok(Arc::new(FakeModel {
                behavior: self.behavior,
                calls: self.calls.clone(),
            }))
        }
    }

    struct Harness {
        state: AppState,
        calls: Arc<AtomicUsize>,
    }

    impl Harness {
        fn new(behavior: Behavior) -> Self {
            Self::build(behavior, false)
        }

        fn broken() -> Self {
            Self::build(Behavior::Positive, true)
        }

        fn build(behavior: Behavior, broken: bool) -> Self {
            let calls = Arc::new(AtomicUsize::new(0));
            let loader = FakeLoader {
                behavior,
                calls: calls.clone(),
                broken,
            };
            let state = AppState::from_parts(
                Settings::default(),
                Arc::new(ModelManager::with_loader("fake", loader)),
                Arc::new(MetricsCollector::new()),
            );
            Self { state, calls }
        }

        async fn send(&self, request: Request) -> Response {
            create_router(self.state.clone()).oneshot(request).await.unwrap()
        }

        async fn get(&self, uri: &str) -> Response {
            self.send(axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
        }

        async fn analyze(&self, text: &str) -> Response {
            let body = serde_json::to_string(&json!({ "text": text })).unwrap();
            self.send(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/analyze")
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
        }
    }

    async fn json_body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn text_body(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_root() {
        let harness = Harness::new(Behavior::Positive);
        let response = harness.get("/").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["message"], "ML Model Service is running");
        assert_eq!(body["status"], "healthy");
        assert!(!harness.state.manager.is_ready());
    }

    #[tokio::test]
    async fn test_analyze_success() {
        let harness = Harness::new(Behavior::Positive);
        let response = harness.analyze("I love this product!").await;
        assert_eq!(response.status(), StatusCode::OK);

        let header = response
            .headers()
            .get("x-request-id")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let body = json_body(response).await;

        assert_eq!(body["label"], "POSITIVE");
        assert!((body["score"].as_f64().unwrap() - 0.9998).abs() < 1e-4);
        assert_eq!(body["text"], "I love this product!");
        assert_eq!(body["request_id"], header.as_str());
    }

    #[tokio::test]
    async fn test_analyze_api_v1_path() {
        let harness = Harness::new(Behavior::Positive);
        let response = harness
            .send(
                axum::http::Request::builder()
                    .method("POST")
                    .uri("/api/v1/analyze")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"text":"fine"}"#))
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_empty_text_never_reaches_model() {
        let harness = Harness::new(Behavior::Positive);
        let response = harness.analyze("").await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert_eq!(body["detail"][0]["loc"], json!(["body", "text"]));
        assert_eq!(harness.calls.load(Ordering::SeqCst), 0);
        assert!(!harness.state.manager.is_ready());
    }

    #[tokio::test]
    async fn test_text_length_boundaries() {
        let harness = Harness::new(Behavior::Positive);

        let response = harness.analyze(&"a".repeat(1000)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = harness.analyze(&"a".repeat(1001)).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        // lengths are counted in characters
        let response = harness.analyze(&"é".repeat(1000)).await;
        assert_eq!(response.status(), StatusCode::OK);

        assert_eq!(harness.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_inference_failure_is_model_error() {
        let harness = Harness::new(Behavior::Fail);
        let response = harness.analyze("anything").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        let detail = body["detail"].as_str().unwrap();
        assert!(detail.contains("Model prediction failed"));
        assert!(detail.contains("CUDA out of memory"));
        assert_eq!(body["type"], "ModelError");
        assert_eq!(body["path"], "/analyze");

        // a handled domain error is not a server error
        assert_eq!(harness.state.metrics.summary().errors_total, 0);
    }

    #[tokio::test]
    async fn test_build_failure_is_model_error() {
        let harness = Harness::broken();
        let response = harness.analyze("anything").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        let detail = body["detail"].as_str().unwrap();
        assert!(detail.starts_with("Model prediction failed: "));
        assert!(detail.contains("weights not found"));
    }

    #[tokio::test]
    async fn test_panic_is_500_and_counted() {
        let harness = Harness::new(Behavior::Panic);
        let response = harness.analyze("boom").await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().contains_key("x-request-id"));

        let summary = harness.state.metrics.summary();
        assert_eq!(summary.requests_total, 1);
        assert_eq!(summary.errors_total, 1);
    }

    #[tokio::test]
    async fn test_health_ready() {
        let harness = Harness::new(Behavior::Positive);
        let response = harness.get("/health").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["checks"]["model_loaded"], true);
        assert_eq!(body["checks"]["service"], "healthy");
    }

    #[tokio::test]
    async fn test_health_unavailable() {
        let harness = Harness::broken();
        let response = harness.get("/health").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = json_body(response).await;
        assert_eq!(body["status"], "unavailable");
        assert_eq!(body["reason"], "Model not loaded");
        assert_eq!(body["checks"]["model_loaded"], false);
        assert_eq!(body["checks"]["service"], "degraded");
    }

    #[tokio::test]
    async fn test_metrics_zero_traffic() {
        let harness = Harness::new(Behavior::Positive);
        let response = harness.get("/metrics").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));

        let text = text_body(response).await;
        for name in [
            "app_requests_total",
            "app_errors_total",
            "app_request_duration_ms",
            "app_model_loaded",
        ] {
            assert!(text.contains(name), "missing series {}", name);
        }
        assert!(text.contains("app_model_loaded 0"));
    }

    #[tokio::test]
    async fn test_metrics_reflect_traffic() {
        let harness = Harness::new(Behavior::Positive);
        harness.analyze("good").await;
        harness.get("/").await;

        let text = text_body(harness.get("/metrics").await).await;
        assert!(text.contains("app_requests_total 2"));
        assert!(text.contains("app_model_loaded 1"));
    }

    #[tokio::test]
    async fn test_request_ids_are_unique_uuids() {
        let harness = Harness::new(Behavior::Fail);
        let mut seen = HashSet::new();

        let responses = futures::future::join_all([
            harness.get("/"),
            harness.get("/health"),
            harness.get("/metrics"),
            harness.get("/does-not-exist"),
        ])
        .await;

        for response in responses.into_iter().chain([
            harness.analyze("").await,
            harness.analyze("fails").await,
        ]) {
            let id = response.headers()["x-request-id"].to_str().unwrap().to_string();
            assert!(Uuid::parse_str(&id).is_ok(), "invalid id {}", id);
            assert!(seen.insert(id));
        }
        assert_eq!(seen.len(), 6);
    }
}
