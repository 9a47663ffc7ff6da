//! # senti-server
//!
//! HTTP surface of senti, a lazily-loaded sentiment inference service.
//!
//! This crate provides:
//! - The request pipeline: correlation ids and lifecycle logging, request
//!   metrics, panic containment and error translation
//! - Route handlers for liveness, health, metrics and analysis
//! - Server startup with graceful shutdown, and logging initialization
//!
//! ## Example
//!
//! ```rust,no_run
//! use senti_core::Settings;
//! use senti_server::serve;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::load()?;
//!     serve(settings).await?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

pub mod extract;
pub mod handler;
pub mod pipeline;
pub mod server;
pub mod state;
pub mod telemetry;

// Re-export main types
pub use extract::ValidatedJson;
pub use pipeline::{ApiError, ErrorReport, RequestId, REQUEST_ID_HEADER};
pub use server::{create_router, serve, shutdown_signal};
pub use state::AppState;
pub use telemetry::init_logging;

/// Result type for server operations
pub type Result<T> = std::result::Result<T, ServerError>;

/// Errors that can occur while starting or running the server
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Model error: {0}")]
    Model(#[from] senti_core::ServiceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<senti_core::ConfigError> for ServerError {
    fn from(err: senti_core::ConfigError) -> Self {
        ServerError::Configuration(err.to_string())
    }
}
