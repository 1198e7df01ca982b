//! [`CipherBox`]: authenticated symmetric encryption of text fields.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chacha20poly1305::aead::Aead;
use chacha20poly1305::{Key, KeyInit, XChaCha20Poly1305, XNonce};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::error::CipherError;

/// Token format version. Bumped when the construction changes so that
/// re-encryption after a key rotation can tell formats apart.
const TOKEN_VERSION: u8 = 1;

/// XChaCha20 nonce length in bytes.
const NONCE_LEN: usize = 24;

/// Poly1305 authentication tag length in bytes.
const TAG_LEN: usize = 16;

/// HKDF info string binding derived keys to this crate's token format.
const HKDF_INFO: &[u8] = b"lumen-field-cipher-v1";

/// Encrypts and decrypts opaque text fields with one symmetric key.
///
/// The key may be any non-empty byte sequence; a 256-bit AEAD key is
/// derived from it with HKDF-SHA256. Tokens are URL-safe base64 over
/// `version || nonce || ciphertext+tag`, so decryption verifies
/// integrity as well as confidentiality: a token produced by a
/// different key, or tampered with in storage, fails deterministically.
///
/// Empty input is passed through unchanged in both directions. This
/// keeps "no data" distinct from "encrypted empty string" and avoids
/// spurious round-trip failures on absent columns.
pub struct CipherBox {
    key: [u8; 32],
}

impl CipherBox {
    /// Creates a cipher from raw key material. Fails on an empty key.
    pub fn new(key_material: &[u8]) -> Result<Self, CipherError> {
        if key_material.is_empty() {
            return Err(CipherError::EmptyKey);
        }
        let hk = Hkdf::<Sha256>::new(None, key_material);
        let mut key = [0u8; 32];
        hk.expand(HKDF_INFO, &mut key)
            .map_err(|_| CipherError::KeyDerivation)?;
        Ok(Self { key })
    }

    /// Encrypts plaintext into a printable token.
    ///
    /// Returns the input unchanged when it is empty.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let ciphertext = self
            .aead()
            .encrypt(XNonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| CipherError::EncryptionFailed)?;

        let mut blob = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
        blob.push(TOKEN_VERSION);
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(blob))
    }

    /// Decrypts a token produced by [`CipherBox::encrypt`].
    ///
    /// Returns the input unchanged when it is empty. Fails with
    /// [`CipherError::AuthenticationFailed`] for wrong-key or tampered
    /// tokens, and [`CipherError::MalformedToken`] for anything that is
    /// not a token at all.
    pub fn decrypt(&self, token: &str) -> Result<String, CipherError> {
        if token.is_empty() {
            return Ok(String::new());
        }

        let blob = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|e| CipherError::MalformedToken(e.to_string()))?;

        if blob.len() < 1 + NONCE_LEN + TAG_LEN {
            return Err(CipherError::MalformedToken(format!(
                "token too short: {} bytes",
                blob.len()
            )));
        }
        if blob[0] != TOKEN_VERSION {
            return Err(CipherError::UnsupportedVersion(blob[0]));
        }

        let nonce = &blob[1..1 + NONCE_LEN];
        let ciphertext = &blob[1 + NONCE_LEN..];

        let plaintext = self
            .aead()
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| CipherError::AuthenticationFailed)?;

        String::from_utf8(plaintext).map_err(|_| CipherError::InvalidPlaintext)
    }

    fn aead(&self) -> XChaCha20Poly1305 {
        XChaCha20Poly1305::new(Key::from_slice(&self.key))
    }
}

impl Drop for CipherBox {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl std::fmt::Debug for CipherBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print key material.
        f.debug_struct("CipherBox").finish_non_exhaustive()
    }
}
