//! Error taxonomy for senti
//!
//! Every failure that can reach a request handler is expressed as a
//! [`ServiceError`]. The request pipeline inspects [`ServiceError::kind`] to
//! decide how a failure is rendered, so adding a variant means deciding its
//! kind as well.

/// Result type alias for senti operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Prefix used when an unexpected failure is escalated into a model error
pub const MODEL_FAILURE_PREFIX: &str = "Model prediction failed";

/// Errors surfaced by the service
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Malformed or out-of-bounds input
    #[error("{0}")]
    Validation(String),

    /// Model build or inference failure
    #[error("{0}")]
    Model(String),

    /// Anything else
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Discriminant of [`ServiceError`], used by the pipeline's translator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Model,
    Other,
}

impl ErrorKind {
    /// Name reported in the `type` field of error responses
    pub fn type_name(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Model => "ModelError",
            ErrorKind::Other => "InternalError",
        }
    }

    /// Domain errors are rendered as client errors with a structured body
    pub fn is_domain(&self) -> bool {
        matches!(self, ErrorKind::Validation | ErrorKind::Model)
    }

    /// HTTP status used when rendering this kind
    pub fn status_code(&self) -> u16 {
        if self.is_domain() {
            400
        } else {
            500
        }
    }
}

impl ServiceError {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a model error
    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    /// Create an error of kind [`ErrorKind::Other`]
    pub fn other(msg: impl std::fmt::Display) -> Self {
        Self::Other(anyhow::anyhow!("{}", msg))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Validation(_) => ErrorKind::Validation,
            ServiceError::Model(_) => ErrorKind::Model,
            ServiceError::Other(_) => ErrorKind::Other,
        }
    }

    pub fn is_domain(&self) -> bool {
        self.kind().is_domain()
    }

    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Escalate a non-domain error into a model error.
    ///
    /// Domain errors are returned unchanged.
    pub fn into_model_failure(self) -> Self {
        match self {
            ServiceError::Other(e) => {
                ServiceError::Model(format!("{}: {:#}", MODEL_FAILURE_PREFIX, e))
            }
            domain => domain,
        }
    }
}

/// Extension trait for escalating failures on the inference path
pub trait ModelFailureExt<T> {
    /// Wrap any non-domain failure as a model error
    fn or_model_failure(self) -> Result<T>;
}

impl<T, E> ModelFailureExt<T> for std::result::Result<T, E>
where
    E: Into<ServiceError>,
{
    fn or_model_failure(self) -> Result<T> {
        self.map_err(|e| e.into().into_model_failure())
    }
}
