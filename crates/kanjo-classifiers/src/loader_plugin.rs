//! Extension point for model construction.

use crate::classifier::Classifier;
use kanjo_core::Result;

/// Pluggable backend that constructs the classification model.
///
/// [`crate::HubModelLoader`] is the production implementation; tests and
/// alternative runtimes plug in their own without touching the accessor.
#[async_trait::async_trait]
pub trait ModelLoader: Send + Sync {
    /// Construct a classifier for the given model identifier.
    ///
    /// This is expensive (downloads, weight loading) and is called at most
    /// once per successful construction by [`crate::ModelAccessor`].
    async fn load(&self, model_id: &str) -> Result<Box<dyn Classifier>>;
}
