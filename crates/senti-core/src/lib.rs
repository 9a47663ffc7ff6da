//! # senti-core
//!
//! Core types and utilities for senti, a lazily-loaded sentiment inference service.
//!
//! This crate provides the pieces shared by every other senti component:
//!
//! - The [`ServiceError`] taxonomy inspected by the request pipeline
//! - Layered [`Settings`] loaded from defaults, a YAML file and the environment
//! - Request/response schema with length validation

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types at the crate root
pub use config::{
    ConfigError, LoggingSettings, ModelBackend, ModelSettings, ServerSettings, Settings, TextLimits,
};
pub use error::{ErrorKind, ModelFailureExt, Result, ServiceError, MODEL_FAILURE_PREFIX};
pub use types::{Prediction, SentimentRequest, SentimentResponse};
