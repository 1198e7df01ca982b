//! Sliding-window fusion of per-frame facial emotion classifications.
//!
//! A frame-analysis collaborator produces one noisy classification per
//! processed video frame. This crate smooths that stream: the most
//! recent observations are kept in a bounded FIFO window, and consumers
//! read a stabilized summary instead of raw frames.
//!
//! # Semantics
//!
//! - **Push**: Never blocks, evicts the oldest observation when full
//! - **Snapshot**: Returns a copy of the cached aggregate, or `None`
//!   while the window is empty
//! - The stable dominant label is the *mode* of per-frame winners, not
//!   the argmax of the mean distribution, so a few noisy frames cannot
//!   make the label flicker
//!
//! # Example
//!
//! ```
//! use lumen_facial::{EmotionAggregator, FacialObservation};
//!
//! let agg = EmotionAggregator::new();
//! agg.push(FacialObservation::single("happy", 0.9));
//! agg.push(FacialObservation::single("happy", 0.8));
//!
//! let view = agg.snapshot().unwrap();
//! assert_eq!(view.dominant, "happy");
//! ```

mod aggregator;
mod types;

pub use aggregator::{EmotionAggregator, DEFAULT_WINDOW_CAPACITY};
pub use types::{AggregateEmotionView, FacialObservation};
