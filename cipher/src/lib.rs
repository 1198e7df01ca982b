//! Authenticated encryption for opaque text fields.
//!
//! This crate provides [`CipherBox`], a small wrapper around
//! XChaCha20-Poly1305 used to encrypt conversation text and memory
//! values before they reach the database. Tokens are self-contained
//! base64 strings carrying a version byte and a random nonce, so a
//! stored column can be decrypted with nothing but the key.
//!
//! # Example
//!
//! ```
//! use lumen_cipher::CipherBox;
//!
//! let cipher = CipherBox::new(b"session key material").unwrap();
//! let token = cipher.encrypt("hola").unwrap();
//! assert_eq!(cipher.decrypt(&token).unwrap(), "hola");
//! ```

mod cipher;
mod error;

pub use cipher::CipherBox;
pub use error::CipherError;
