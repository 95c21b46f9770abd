//! Model configuration

use serde::{Deserialize, Serialize};

/// Default pretrained model: a BERT sentiment classifier for Japanese
pub const DEFAULT_MODEL_ID: &str = "jarvisx17/japanese-sentiment-analysis";

/// Configuration of the sentiment model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Hugging Face Hub repository, or a local directory with the same layout
    #[serde(default = "default_identifier")]
    pub identifier: String,

    /// Hub revision (branch, tag or commit)
    #[serde(default = "default_revision")]
    pub revision: String,

    /// Device to run on (cpu, cuda, metal)
    #[serde(default = "default_device")]
    pub device: String,

    /// Maximum sequence length in tokens; longer input is truncated
    #[serde(default = "default_max_length")]
    pub max_length: usize,
}

fn default_identifier() -> String {
    DEFAULT_MODEL_ID.to_string()
}

fn default_revision() -> String {
    "main".to_string()
}

fn default_device() -> String {
    "cpu".to_string()
}

fn default_max_length() -> usize {
    512
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            identifier: default_identifier(),
            revision: default_revision(),
            device: default_device(),
            max_length: default_max_length(),
        }
    }
}

impl ModelConfig {
    /// Check values that would only fail later, at load time
    pub fn validate(&self) -> kanjo_core::Result<()> {
        if self.identifier.trim().is_empty() {
            return Err(kanjo_core::Error::config("model identifier must not be empty"));
        }
        if self.max_length == 0 {
            return Err(kanjo_core::Error::config("model max_length must be positive"));
        }
        Ok(())
    }
}

/// Resolve class labels from a Hugging Face `config.json`.
///
/// Uses `id2label` ordered by id when present. Otherwise falls back to
/// `["negative", "positive"]` for two-label models and `label_N` names.
pub fn resolve_labels(config_json: &serde_json::Value) -> Vec<String> {
    if let Some(id2label) = config_json.get("id2label").and_then(|v| v.as_object()) {
        let mut pairs: Vec<(usize, String)> = id2label
            .iter()
            .filter_map(|(id, label)| {
                let id = id.parse::<usize>().ok()?;
                let label = label.as_str()?.to_string();
                Some((id, label))
            })
            .collect();

        if !pairs.is_empty() {
            pairs.sort_by_key(|(id, _)| *id);
            let len = pairs.last().map(|(id, _)| id + 1).unwrap_or(0);
            let mut labels: Vec<String> = (0..len).map(|idx| format!("label_{}", idx)).collect();
            for (id, label) in pairs {
                labels[id] = label;
            }
            return labels;
        }
    }

    let num_labels = config_json
        .get("num_labels")
        .and_then(|v| v.as_u64())
        .unwrap_or(2) as usize;

    match num_labels {
        0 | 2 => vec!["negative".to_string(), "positive".to_string()],
        n => (0..n).map(|idx| format!("label_{}", idx)).collect(),
    }
}
