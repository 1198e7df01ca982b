//! Vocal emotion classification with bounded fixed-size inference.
//!
//! A short recording arrives as WAV bytes; the classifier decodes it to
//! normalized mono samples at the model's mandated rate, splits long
//! audio into fixed-duration chunks, runs one inference per chunk, and
//! recombines per-chunk logits into a single ranked probability
//! distribution.
//!
//! Recombination happens in logit space: average the logits, then one
//! softmax. Normalizing per chunk and averaging probabilities would
//! over-smooth the distribution and is deliberately not supported.
//!
//! The inference engine itself plugs in behind [`EmotionModel`]; the
//! loaded model is immutable, so one classifier may serve concurrent
//! `predict` calls from any number of threads.

mod classifier;
mod error;
mod model;
mod resample;
mod wav;

pub use classifier::{EmotionScore, VocalEmotionClassifier, DEFAULT_CHUNK_SECS};
pub use error::VocalError;
pub use model::EmotionModel;
pub use resample::resample;
pub use wav::decode_wav;
