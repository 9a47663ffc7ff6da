//! # senti-model
//!
//! The lazily-built sentiment model behind senti.
//!
//! This crate provides:
//! - [`ResourceManager`]: exactly-once construction of a shared resource on
//!   first use, with failed builds retried by the next caller
//! - The [`SentimentModel`] inference capability
//! - Backends: an offline word-list scorer and a remote text-classification
//!   endpoint with a cached model card
//!
//! ## Example
//!
//! ```rust,no_run
//! use senti_core::ModelSettings;
//! use senti_model::model_manager;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = model_manager(&ModelSettings::default())?;
//!
//!     // The first call builds the model
//!     let model = manager.acquire().await?;
//!     let prediction = model.classify("I love this product!").await?;
//!     println!("{} ({:.4})", prediction.label, prediction.score);
//!
//!     Ok(())
//! }
//! ```

pub mod lexicon;
pub mod loader;
pub mod manager;
pub mod model;
pub mod remote;

// Re-export main types
pub use lexicon::{LexiconLoader, LexiconModel};
pub use loader::{model_loader, model_manager, ModelManager};
pub use manager::{ResourceLoader, ResourceManager, ResourceState};
pub use model::SentimentModel;
pub use remote::{RemoteLoader, RemoteModel};
