//! Core types for kanjo

use serde::{Deserialize, Serialize};
use std::fmt;

/// Output label of the service.
///
/// Model output is coerced into exactly these two values, see
/// [`SentimentLabel::normalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
}

impl SentimentLabel {
    /// Collapse a raw model label into the two-valued set.
    ///
    /// Only a case-insensitive exact match on `"positive"` is positive.
    /// Everything else, including `"negative"`, unknown labels such as
    /// `"neutral"` and the empty string, is negative.
    pub fn normalize(raw: &str) -> Self {
        if raw.to_lowercase() == "positive" {
            Self::Positive
        } else {
            Self::Negative
        }
    }

    /// Whether `raw` is one of the labels the model is expected to emit.
    ///
    /// Labels for which this is false still normalize to
    /// [`SentimentLabel::Negative`].
    pub fn is_recognized(raw: &str) -> bool {
        matches!(raw.to_lowercase().as_str(), "positive" | "negative")
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
