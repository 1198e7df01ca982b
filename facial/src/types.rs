use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One classified video frame: the winning label plus the full score
/// distribution the classifier reported for that frame.
///
/// Observations only ever live inside the aggregator window; they are
/// not persisted individually.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacialObservation {
    /// Highest-confidence label for this frame (e.g., "happy").
    pub dominant: String,

    /// Per-label probabilities, summing to ~1.
    pub scores: BTreeMap<String, f64>,
}

impl FacialObservation {
    /// Creates an observation from a label and its score map.
    pub fn new(dominant: impl Into<String>, scores: BTreeMap<String, f64>) -> Self {
        Self {
            dominant: dominant.into(),
            scores,
        }
    }

    /// Creates an observation whose distribution has a single entry.
    /// Mostly useful in tests and simple callers.
    pub fn single(label: &str, score: f64) -> Self {
        let mut scores = BTreeMap::new();
        scores.insert(label.to_string(), score);
        Self {
            dominant: label.to_string(),
            scores,
        }
    }
}

/// Stabilized summary over the current window.
///
/// `dominant` is the mode of the per-frame dominant labels; ties are
/// broken by first occurrence in window order. `mean_scores` averages
/// each label's score across the window. Consumers always receive a
/// copy of this view, never a live reference into the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateEmotionView {
    /// Most frequent per-frame winner across the window.
    pub dominant: String,

    /// Mean score per label across the window.
    pub mean_scores: BTreeMap<String, f64>,
}
