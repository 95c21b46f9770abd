//! Process-wide access to the sentiment model.

use crate::classifier::Classifier;
use crate::loader_plugin::ModelLoader;
use kanjo_core::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;

/// Owns the single handle to the classification model.
///
/// The model is constructed on the first call to [`ModelAccessor::get`]
/// (or [`ModelAccessor::preload`] for eager loading) and reused for the
/// rest of the process. Concurrent first callers wait on one construction.
/// A failed construction leaves the accessor empty, so the next call
/// tries again.
pub struct ModelAccessor {
    model_id: String,
    loader: Arc<dyn ModelLoader>,
    handle: OnceCell<Arc<dyn Classifier>>,
}

impl ModelAccessor {
    /// Create an empty accessor; nothing is loaded until first use
    pub fn new(model_id: impl Into<String>, loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            model_id: model_id.into(),
            loader,
            handle: OnceCell::new(),
        }
    }

    /// Get the model, constructing it if this is the first call
    pub async fn get(&self) -> Result<Arc<dyn Classifier>> {
        // Lock-free once constructed
        if let Some(classifier) = self.handle.get() {
            return Ok(Arc::clone(classifier));
        }

        let classifier = self
            .handle
            .get_or_try_init(|| self.construct())
            .await?;

        Ok(Arc::clone(classifier))
    }

    /// Construct the model now instead of on the first request
    pub async fn preload(&self) -> Result<()> {
        self.get().await.map(|_| ())
    }

    /// Whether the model has been constructed
    pub fn is_loaded(&self) -> bool {
        self.handle.initialized()
    }

    /// Identifier the model is loaded from
    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn construct(&self) -> Result<Arc<dyn Classifier>> {
        tracing::info!("Loading sentiment model: {}", self.model_id);
        let start = Instant::now();

        let classifier = self.loader.load(&self.model_id).await.map_err(|e| match e {
            Error::ModelInit(_) => e,
            other => Error::model_init(format!(
                "failed to load '{}': {}",
                self.model_id, other
            )),
        })?;

        tracing::info!(
            "Model '{}' loaded successfully in {:?}",
            classifier.name(),
            start.elapsed()
        );

        Ok(Arc::from(classifier))
    }
}

impl std::fmt::Debug for ModelAccessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelAccessor")
            .field("model_id", &self.model_id)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
