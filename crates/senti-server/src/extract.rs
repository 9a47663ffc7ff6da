//! JSON body extraction with bounds checking
//!
//! Rejections are 422 responses shaped as
//! `{"detail": [{"loc": [...], "msg": "...", "type": "..."}]}` and are
//! produced before the handler body runs.

use crate::state::AppState;
use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRef, FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use senti_core::{SentimentRequest, TextLimits};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

/// A request body that checks itself against the configured text limits
pub trait Bounded {
    /// Field reported in the `loc` of a bounds violation
    const FIELD: &'static str;

    fn check_bounds(&self, limits: &TextLimits) -> senti_core::Result<()>;
}

impl Bounded for SentimentRequest {
    const FIELD: &'static str = "text";

    fn check_bounds(&self, limits: &TextLimits) -> senti_core::Result<()> {
        self.validate(limits)
    }
}

/// One entry of the rejection's `detail` list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub loc: Vec<String>,
    pub msg: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl FieldError {
    fn new(loc: &[&str], msg: impl Into<String>, kind: &str) -> Self {
        Self {
            loc: loc.iter().map(|s| s.to_string()).collect(),
            msg: msg.into(),
            kind: kind.to_string(),
        }
    }
}

/// Rejection of [`ValidatedJson`]
#[derive(Debug)]
pub enum ValidationRejection {
    /// Body could not be read (too large, aborted)
    Body(axum::extract::rejection::BytesRejection),

    /// Body read but invalid
    Invalid(Vec<FieldError>),
}

impl IntoResponse for ValidationRejection {
    fn into_response(self) -> Response {
        match self {
            ValidationRejection::Body(rejection) => rejection.into_response(),
            ValidationRejection::Invalid(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "detail": errors })),
            )
                .into_response(),
        }
    }
}

/// Deserialized and bounds-checked JSON body
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Bounded,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ValidationRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(ValidationRejection::Body)?;

        let value: T = serde_json::from_slice(&bytes).map_err(|e| {
            debug!(error = %e, "Rejected request body");
            ValidationRejection::Invalid(vec![decode_error::<T>(&e)])
        })?;

        let app = AppState::from_ref(state);
        value.check_bounds(app.limits()).map_err(|e| {
            debug!(error = %e, field = T::FIELD, "Rejected out-of-bounds field");
            ValidationRejection::Invalid(vec![FieldError::new(
                &["body", T::FIELD],
                e.to_string(),
                "value_error",
            )])
        })?;

        Ok(ValidatedJson(value))
    }
}

fn decode_error<T: Bounded>(err: &serde_json::Error) -> FieldError {
    use serde_json::error::Category;

    match err.classify() {
        Category::Data if err.to_string().starts_with("missing field") => {
            FieldError::new(&["body", T::FIELD], "field required", "value_error.missing")
        }
        Category::Data => FieldError::new(&["body", T::FIELD], err.to_string(), "type_error"),
        Category::Syntax | Category::Eof | Category::Io => {
            FieldError::new(&["body"], err.to_string(), "value_error.jsondecode")
        }
    }
}
