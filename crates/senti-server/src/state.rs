//! Shared application state handed to every route and pipeline stage

use crate::Result;
use senti_core::{Settings, TextLimits};
use senti_metrics::MetricsCollector;
use senti_model::{model_manager, ModelManager};
use std::sync::Arc;

/// Everything a request needs, constructed once at startup
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub manager: Arc<ModelManager>,
    pub metrics: Arc<MetricsCollector>,
}

impl AppState {
    /// Build the state for `settings`. The model itself stays unbuilt.
    pub fn new(settings: Settings) -> Result<Self> {
        let manager = model_manager(&settings.model)?;
        Ok(Self::from_parts(
            settings,
            Arc::new(manager),
            Arc::new(MetricsCollector::new()),
        ))
    }

    /// Assemble state from already constructed components
    pub fn from_parts(
        settings: Settings,
        manager: Arc<ModelManager>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            manager,
            metrics,
        }
    }

    pub fn limits(&self) -> &TextLimits {
        &self.settings.limits
    }
}
