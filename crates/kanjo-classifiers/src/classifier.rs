//! Classifier trait and common types

use async_trait::async_trait;
use kanjo_core::Result;

/// Trait for all classifiers
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify the given text.
    ///
    /// Returns one result per class ordered by descending score. A
    /// successful call never returns an empty vector; callers still treat
    /// an empty vector as an inference failure.
    async fn classify(&self, text: &str) -> Result<Vec<ClassificationResult>>;

    /// Get the classifier name
    fn name(&self) -> &str;
}

/// Result of classification
#[derive(Debug, Clone)]
pub struct ClassificationResult {
    /// Raw classification label as emitted by the model
    pub label: String,

    /// Confidence score (0.0-1.0)
    pub score: f32,

    /// Additional metadata
    pub metadata: ClassificationMetadata,

    /// Latency in microseconds
    pub latency_us: u64,
}

impl ClassificationResult {
    /// Create a new classification result
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
            metadata: ClassificationMetadata::default(),
            latency_us: 0,
        }
    }

    /// Build one result per label from class probabilities, highest first.
    ///
    /// `labels` and `probs` are matched by index; extra probabilities get a
    /// `label_N` name.
    pub fn ranked(
        labels: &[String],
        probs: &[f32],
        model: Option<&str>,
        latency_us: u64,
    ) -> Vec<Self> {
        let mut results: Vec<Self> = probs
            .iter()
            .enumerate()
            .map(|(idx, &score)| Self {
                label: labels
                    .get(idx)
                    .cloned()
                    .unwrap_or_else(|| format!("label_{}", idx)),
                score,
                metadata: ClassificationMetadata {
                    model: model.map(str::to_string),
                },
                latency_us,
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results
    }
}

/// Metadata about classification
#[derive(Debug, Clone, Default)]
pub struct ClassificationMetadata {
    /// Model name or version
    pub model: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        vec!["negative".to_string(), "positive".to_string()]
    }

    #[test]
    fn test_ranked_orders_by_score() {
        let results = ClassificationResult::ranked(&labels(), &[0.2, 0.8], Some("bert"), 42);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].label, "positive");
        assert!((results[0].score - 0.8).abs() < f32::EPSILON);
        assert_eq!(results[1].label, "negative");
        assert_eq!(results[0].metadata.model.as_deref(), Some("bert"));
        assert_eq!(results[0].latency_us, 42);
    }

    #[test]
    fn test_ranked_names_unlabelled_classes() {
        let results = ClassificationResult::ranked(&labels(), &[0.1, 0.2, 0.7], None, 0);
        assert_eq!(results[0].label, "label_2");
    }

    #[test]
    fn test_ranked_empty_probs() {
        assert!(ClassificationResult::ranked(&labels(), &[], None, 0).is_empty());
    }
}
