use thiserror::Error;

/// Errors returned by [`crate::CipherBox`] operations.
#[derive(Debug, Error)]
pub enum CipherError {
    #[error("cipher: key must not be empty")]
    EmptyKey,

    #[error("cipher: key derivation failed")]
    KeyDerivation,

    #[error("cipher: encryption failed")]
    EncryptionFailed,

    #[error("cipher: malformed token: {0}")]
    MalformedToken(String),

    #[error("cipher: unsupported token version {0}")]
    UnsupportedVersion(u8),

    #[error("cipher: authentication failed")]
    AuthenticationFailed,

    #[error("cipher: decrypted payload is not valid utf-8")]
    InvalidPlaintext,
}
