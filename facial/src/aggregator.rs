//! Mutex-guarded bounded window with a cached aggregate view.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::types::{AggregateEmotionView, FacialObservation};

/// Default number of observations retained in the window.
pub const DEFAULT_WINDOW_CAPACITY: usize = 10;

/// A thread-safe bounded FIFO window over facial observations.
///
/// One producer thread pushes classified frames at high frequency while
/// any number of readers call [`snapshot`](EmotionAggregator::snapshot).
/// The window and the cached aggregate are guarded by a single mutex
/// held only across the read-modify-write, so readers never observe a
/// torn view and the producer is never blocked on I/O.
///
/// Cloning the aggregator is cheap and yields another handle to the
/// same window.
pub struct EmotionAggregator {
    inner: Arc<Mutex<AggregatorState>>,
}

struct AggregatorState {
    window: VecDeque<FacialObservation>,
    capacity: usize,
    view: Option<AggregateEmotionView>,
}

impl Clone for EmotionAggregator {
    fn clone(&self) -> Self {
        EmotionAggregator {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Default for EmotionAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl EmotionAggregator {
    /// Creates an aggregator with [`DEFAULT_WINDOW_CAPACITY`].
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_WINDOW_CAPACITY)
    }

    /// Creates an aggregator retaining the `capacity` most recent
    /// observations.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be greater than 0");
        EmotionAggregator {
            inner: Arc::new(Mutex::new(AggregatorState {
                window: VecDeque::with_capacity(capacity),
                capacity,
                view: None,
            })),
        }
    }

    /// Appends an observation, evicting the oldest when at capacity,
    /// and recomputes the cached aggregate under the same lock.
    pub fn push(&self, observation: FacialObservation) {
        let mut state = self.inner.lock().unwrap();
        if state.window.len() == state.capacity {
            state.window.pop_front();
        }
        state.window.push_back(observation);
        state.view = Some(aggregate(&state.window));
    }

    /// Returns a copy of the current aggregate view, or `None` while
    /// the window is empty. An empty window is expected steady-state
    /// (no face in frame yet), not an error.
    pub fn snapshot(&self) -> Option<AggregateEmotionView> {
        self.inner.lock().unwrap().view.clone()
    }

    /// Number of observations currently in the window.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().window.len()
    }

    /// Returns true if no observation has been pushed yet.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().window.is_empty()
    }

    /// Window capacity.
    pub fn capacity(&self) -> usize {
        self.inner.lock().unwrap().capacity
    }

    /// Clears the window and the cached view.
    pub fn reset(&self) {
        let mut state = self.inner.lock().unwrap();
        state.window.clear();
        state.view = None;
    }
}

/// Computes the aggregate over a non-empty window.
///
/// Mean scores are averaged per label over the whole window; a label
/// missing from some frames contributes zero for those frames. The
/// dominant label is the mode of the per-frame winners; a tie goes to
/// the label whose first occurrence is earliest in the window.
fn aggregate(window: &VecDeque<FacialObservation>) -> AggregateEmotionView {
    let n = window.len() as f64;

    let mut sums: BTreeMap<String, f64> = BTreeMap::new();
    for obs in window {
        for (label, score) in &obs.scores {
            *sums.entry(label.clone()).or_insert(0.0) += score;
        }
    }
    let mean_scores: BTreeMap<String, f64> =
        sums.into_iter().map(|(k, v)| (k, v / n)).collect();

    // Majority vote over per-frame winners. Tracks (count, first index)
    // per label so ties resolve to the earliest first occurrence.
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (i, obs) in window.iter().enumerate() {
        let entry = counts.entry(obs.dominant.as_str()).or_insert((0, i));
        entry.0 += 1;
    }
    let dominant = counts
        .iter()
        .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then(b.1 .1.cmp(&a.1 .1)))
        .map(|(label, _)| label.to_string())
        .unwrap_or_default();

    AggregateEmotionView {
        dominant,
        mean_scores,
    }
}
