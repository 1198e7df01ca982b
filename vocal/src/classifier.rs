//! Chunked inference pipeline: decode, resample, infer, recombine.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::EmotionModel;
use crate::resample::resample;
use crate::wav::decode_wav;
use crate::VocalError;

/// Default chunk duration for long audio, in seconds.
pub const DEFAULT_CHUNK_SECS: f64 = 10.0;

/// One entry of the ranked output distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionScore {
    /// Upper-cased emotion label (e.g., "HAP").
    pub label: String,
    /// Probability in `[0, 1]`; the full ranking sums to 1.
    pub score: f64,
}

/// Classifies arbitrary-length audio into a ranked emotion distribution.
///
/// Short clips run through the model in one call. Clips longer than the
/// chunk budget are partitioned into contiguous, non-overlapping chunks
/// with one inference each; the per-chunk logits are averaged
/// element-wise and a single softmax produces the final distribution.
///
/// Averaging must happen before normalization: softmaxing each chunk
/// and then averaging probabilities yields a materially smoother, wrong
/// distribution, so that ordering is not offered.
pub struct VocalEmotionClassifier {
    model: Arc<dyn EmotionModel>,
}

impl VocalEmotionClassifier {
    /// Wraps a loaded inference backend.
    ///
    /// Fails fast with [`VocalError::ModelUnavailable`] when the
    /// backend is unusable, rather than deferring the failure to the
    /// first `predict` call.
    pub fn new(model: Arc<dyn EmotionModel>) -> Result<Self, VocalError> {
        if model.labels().is_empty() {
            return Err(VocalError::ModelUnavailable(
                "model reports an empty label set".into(),
            ));
        }
        if model.sample_rate() == 0 {
            return Err(VocalError::ModelUnavailable(
                "model reports a zero sample rate".into(),
            ));
        }
        Ok(Self { model })
    }

    /// The model's ordered label set.
    pub fn labels(&self) -> &[String] {
        self.model.labels()
    }

    /// Classifies a WAV clip with the default 10-second chunk budget.
    pub fn predict(&self, audio: &[u8]) -> Result<Vec<EmotionScore>, VocalError> {
        self.predict_chunked(audio, DEFAULT_CHUNK_SECS)
    }

    /// Classifies a WAV clip, splitting audio longer than `chunk_secs`
    /// into fixed-duration chunks.
    ///
    /// Returns the distribution ordered descending by score, ties
    /// broken by label sort order for determinism.
    pub fn predict_chunked(
        &self,
        audio: &[u8],
        chunk_secs: f64,
    ) -> Result<Vec<EmotionScore>, VocalError> {
        if !chunk_secs.is_finite() || chunk_secs <= 0.0 {
            return Err(VocalError::InvalidChunkDuration(chunk_secs));
        }

        let rate = self.model.sample_rate();
        let (decoded, src_rate) = decode_wav(audio)?;
        let samples = resample(&decoded, src_rate, rate)?;
        if samples.is_empty() {
            return Err(VocalError::Decode("clip contains no samples".into()));
        }

        let chunk_samples = ((chunk_secs * rate as f64) as usize).max(1);

        // Splitting only triggers when the clip strictly exceeds one
        // chunk's sample budget.
        let logits = if samples.len() <= chunk_samples {
            self.infer(&samples)?
        } else {
            let num_chunks = samples.len().div_ceil(chunk_samples);
            let dim = self.model.labels().len();
            let mut sum = vec![0.0f64; dim];
            for i in 0..num_chunks {
                let start = i * chunk_samples;
                let end = (start + chunk_samples).min(samples.len());
                let chunk_logits = self.infer(&samples[start..end])?;
                for (acc, v) in sum.iter_mut().zip(chunk_logits.iter()) {
                    *acc += v;
                }
            }
            for v in &mut sum {
                *v /= num_chunks as f64;
            }
            sum
        };

        let scores = softmax(&logits);

        let mut ranking: Vec<EmotionScore> = self
            .model
            .labels()
            .iter()
            .zip(scores.iter())
            .map(|(label, &score)| EmotionScore {
                label: label.to_uppercase(),
                score,
            })
            .collect();
        ranking.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.label.cmp(&b.label))
        });
        Ok(ranking)
    }

    /// Runs one model call and lifts the logits to f64, validating the
    /// output dimension against the label set.
    fn infer(&self, chunk: &[f32]) -> Result<Vec<f64>, VocalError> {
        let logits = self.model.infer_logits(chunk)?;
        let expected = self.model.labels().len();
        if logits.len() != expected {
            return Err(VocalError::DimensionMismatch {
                expected,
                got: logits.len(),
            });
        }
        Ok(logits.into_iter().map(f64::from).collect())
    }
}

/// Numerically stable softmax.
fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|&x| (x - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}
