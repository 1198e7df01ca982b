use crate::VocalError;

/// Produces emotion logits from a fixed-size window of audio samples.
///
/// The input is normalized mono f32 in `[-1, 1]` at
/// [`sample_rate`](EmotionModel::sample_rate) Hz. The output is one
/// raw logits vector, index-aligned with
/// [`labels`](EmotionModel::labels). Logits stay unnormalized because
/// recombination across chunks happens in logit space.
///
/// # Variable Length
///
/// Implementations must accept any sample count up to one chunk; any
/// windowing or padding the feature extractor needs is handled
/// internally, not by the caller.
///
/// # Thread Safety
///
/// Implementations must be safe for concurrent use: the loaded weights
/// are read-only and `infer_logits` may be called from several request
/// threads at once.
pub trait EmotionModel: Send + Sync {
    /// Ordered label set; logits index `i` scores `labels()[i]`.
    fn labels(&self) -> &[String];

    /// Sampling rate the model was trained for (e.g., 16000).
    fn sample_rate(&self) -> u32;

    /// Runs one inference over a single chunk of samples.
    fn infer_logits(&self, samples: &[f32]) -> Result<Vec<f32>, VocalError>;
}
