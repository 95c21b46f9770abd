//! kanjo Classifiers
//!
//! The classification capability behind the sentiment service.
//!
//! - [`Classifier`]: the opaque `classify(text) -> [{label, score}]` seam
//! - [`ModelLoader`]: how a classifier is constructed from a model identifier
//! - [`ModelAccessor`]: single-construction, lock-free-read cache of the model
//! - [`HubModelLoader`]: Candle BERT loader for Hugging Face checkpoints
//!   (feature `ml-models`, on by default)

pub mod accessor;
pub mod classifier;
#[cfg(feature = "ml-models")]
pub mod hub_loader;
pub mod loader_plugin;
pub mod model_config;

pub use accessor::ModelAccessor;
pub use classifier::{ClassificationMetadata, ClassificationResult, Classifier};
#[cfg(feature = "ml-models")]
pub use hub_loader::HubModelLoader;
pub use loader_plugin::ModelLoader;
pub use model_config::{ModelConfig, DEFAULT_MODEL_ID};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::accessor::ModelAccessor;
    pub use crate::classifier::{ClassificationResult, Classifier};
    pub use crate::loader_plugin::ModelLoader;
    pub use crate::model_config::ModelConfig;
}
