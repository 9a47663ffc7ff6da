//! Backend selection from settings

use crate::lexicon::LexiconLoader;
use crate::manager::{ResourceLoader, ResourceManager};
use crate::model::SentimentModel;
use crate::remote::RemoteLoader;
use senti_core::{ModelBackend, ModelSettings, Result};
use std::sync::Arc;

/// The service's single shared model resource
pub type ModelManager = ResourceManager<dyn SentimentModel>;

/// Loader for the backend named in `settings`
pub fn model_loader(settings: &ModelSettings) -> Result<Arc<dyn ResourceLoader<dyn SentimentModel>>> {
    let loader: Arc<dyn ResourceLoader<dyn SentimentModel>> = match settings.backend {
        ModelBackend::Lexicon => Arc::new(LexiconLoader::new(settings)),
        ModelBackend::Remote => Arc::new(RemoteLoader::new(settings)?),
    };
    Ok(loader)
}

/// Unbuilt model manager for `settings`. Nothing is loaded until first use.
pub fn model_manager(settings: &ModelSettings) -> Result<ModelManager> {
    Ok(ModelManager::new(settings.name.clone(), model_loader(settings)?))
}
