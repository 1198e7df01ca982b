use thiserror::Error;

/// Errors returned by vocal classification operations.
#[derive(Debug, Error)]
pub enum VocalError {
    #[error("vocal: malformed audio: {0}")]
    Decode(String),

    #[error("vocal: model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("vocal: inference failed: {0}")]
    Model(String),

    #[error("vocal: logits dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("vocal: resample error: {0}")]
    Resample(String),

    #[error("vocal: invalid chunk duration {0}")]
    InvalidChunkDuration(f64),
}

impl From<rubato::ResamplerConstructionError> for VocalError {
    fn from(e: rubato::ResamplerConstructionError) -> Self {
        VocalError::Resample(e.to_string())
    }
}

impl From<rubato::ResampleError> for VocalError {
    fn from(e: rubato::ResampleError) -> Self {
        VocalError::Resample(e.to_string())
    }
}
