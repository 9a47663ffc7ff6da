//! Remote text-classification backend
//!
//! Building the model fetches the model card (`config.json`) from the hub
//! into the local cache, then binds a client to a Hugging Face style
//! text-classification endpoint. Cached cards are reused without touching
//! the network.

use crate::manager::ResourceLoader;
use crate::model::SentimentModel;
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::Client;
use senti_core::{ModelSettings, Prediction, Result, ServiceError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Model card file cached per model
pub const MODEL_CARD_FILE: &str = "config.json";

/// Subset of the hub model card used for label mapping
#[derive(Debug, Clone, Default, Deserialize)]
struct ModelCard {
    #[serde(default)]
    id2label: HashMap<String, String>,
}

/// Inference request body
#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
}

/// Endpoints answer either `[[{label, score}, ..]]` or `[{label, score}, ..]`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Batched(Vec<Vec<Prediction>>),
    Single(Vec<Prediction>),
}

impl InferenceResponse {
    fn into_predictions(self) -> Vec<Prediction> {
        match self {
            InferenceResponse::Batched(batches) => batches.into_iter().next().unwrap_or_default(),
            InferenceResponse::Single(predictions) => predictions,
        }
    }
}

/// Classifier backed by a remote inference endpoint
#[derive(Debug, Clone)]
pub struct RemoteModel {
    name: String,
    inference_url: String,
    client: Client,
    id2label: HashMap<String, String>,
}

impl RemoteModel {
    /// Resolve generic `LABEL_<n>` names through the model card
    fn resolve_label(&self, label: String) -> String {
        label
            .strip_prefix("LABEL_")
            .and_then(|id| self.id2label.get(id))
            .cloned()
            .unwrap_or(label)
    }
}

#[async_trait]
impl SentimentModel for RemoteModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn predict(&self, text: &str) -> Result<Vec<Prediction>> {
        debug!(model = %self.name, url = %self.inference_url, "Sending inference request");

        let response = self
            .client
            .post(&self.inference_url)
            .json(&InferenceRequest { inputs: text })
            .send()
            .await
            .with_context(|| format!("Inference request to {} failed", self.inference_url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Other(anyhow!(
                "Inference endpoint returned {}: {}",
                status,
                body.trim()
            )));
        }

        let parsed: InferenceResponse = response
            .json()
            .await
            .context("Invalid inference response")?;

        let mut predictions: Vec<Prediction> = parsed
            .into_predictions()
            .into_iter()
            .map(|p| Prediction::new(self.resolve_label(p.label), p.score))
            .collect();
        predictions.sort_by(|a, b| b.score.total_cmp(&a.score));

        Ok(predictions)
    }
}

/// Builds a [`RemoteModel`], caching the model card on first build
#[derive(Debug, Clone)]
pub struct RemoteLoader {
    name: String,
    card_url: String,
    card_path: PathBuf,
    inference_url: Option<String>,
    client: Client,
}

impl RemoteLoader {
    pub fn new(settings: &ModelSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            name: settings.name.clone(),
            card_url: format!(
                "{}/{}/resolve/main/{}",
                settings.hub_url.trim_end_matches('/'),
                settings.name,
                MODEL_CARD_FILE
            ),
            card_path: settings.model_dir().join(MODEL_CARD_FILE),
            inference_url: settings.inference_url.clone(),
            client,
        })
    }

    /// Read the cached model card, downloading it first when missing
    async fn model_card(&self) -> anyhow::Result<ModelCard> {
        match tokio::fs::read(&self.card_path).await {
            Ok(raw) => {
                debug!(path = %self.card_path.display(), "Using cached model card");
                serde_json::from_slice(&raw)
                    .with_context(|| format!("Invalid model card {}", self.card_path.display()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => self.download_card().await,
            Err(e) => Err(anyhow::Error::new(e)
                .context(format!("Failed to read {}", self.card_path.display()))),
        }
    }

    /// Fetch the card and cache it only once it parses.
    ///
    /// The card is written beside its final path and renamed into place, so
    /// the cache never holds a partial or unparseable card.
    async fn download_card(&self) -> anyhow::Result<ModelCard> {
        info!(model = %self.name, url = %self.card_url, "Downloading model card");

        let response = self
            .client
            .get(&self.card_url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", self.card_url))?
            .error_for_status()
            .with_context(|| format!("Hub rejected {}", self.card_url))?;
        let raw = response.bytes().await?;

        let card: ModelCard = serde_json::from_slice(&raw)
            .with_context(|| format!("Invalid model card from {}", self.card_url))?;

        if let Some(parent) = self.card_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let partial = self.card_path.with_extension("json.partial");
        tokio::fs::write(&partial, &raw)
            .await
            .with_context(|| format!("Failed to write {}", partial.display()))?;
        if let Err(e) = tokio::fs::rename(&partial, &self.card_path).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(anyhow::Error::new(e)
                .context(format!("Failed to move card into {}", self.card_path.display())));
        }

        info!(path = %self.card_path.display(), bytes = raw.len(), "Cached model card");
        Ok(card)
    }
}

#[async_trait]
impl ResourceLoader<dyn SentimentModel> for RemoteLoader {
    async fn load(&self) -> Result<Arc<dyn SentimentModel>> {
        let inference_url = self
            .inference_url
            .clone()
            .ok_or_else(|| ServiceError::other("Remote backend requires model.inference_url"))?;

        let card = self.model_card().await?;
        info!(model = %self.name, labels = card.id2label.len(), "Remote model ready");

        Ok(Arc::new(RemoteModel {
            name: self.name.clone(),
            inference_url,
            client: self.client.clone(),
            id2label: card.id2label,
        }))
    }
}
