//! The inference capability behind the analyze endpoint

use async_trait::async_trait;
use senti_core::{Prediction, Result, ServiceError};

/// A text classifier producing label/confidence pairs.
///
/// Implementations are built once and then shared read-only between all
/// request handlers.
#[async_trait]
pub trait SentimentModel: Send + Sync {
    /// Identifier of the loaded model
    fn name(&self) -> &str;

    /// Classify `text`, most likely label first
    async fn predict(&self, text: &str) -> Result<Vec<Prediction>>;

    /// Classify `text` and keep only the first prediction
    async fn classify(&self, text: &str) -> Result<Prediction> {
        self.predict(text)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::other(format!("{} returned no predictions", self.name())))
    }
}
