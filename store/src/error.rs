use lumen_cipher::CipherError;
use thiserror::Error;

/// Errors returned by [`crate::InteractionStore`] operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Caller passed a role outside the closed `user`/`assistant` enum.
    /// Never retried automatically; nothing is written.
    #[error("store: invalid role {0:?}")]
    InvalidRole(String),

    /// A stored value failed to decrypt or a plaintext failed to
    /// encrypt. Treated as a data-integrity incident and surfaced,
    /// never swallowed.
    #[error("store: crypto error: {0}")]
    Crypto(#[from] CipherError),

    /// Underlying SQLite failure.
    #[error("store: sqlite error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// JSON (de)serialization of a settings blob or emotion column.
    #[error("store: serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
