//! Encrypted SQLite persistence for conversational sessions.
//!
//! [`InteractionStore`] owns three relations: `sessions` (one row per
//! conversation), `interactions` (immutable turns with encrypted text)
//! and `user_memory` (upserted long-term facts with encrypted values).
//! Text payloads never reach the database in plaintext; everything
//! else (emotion summaries, settings) is stored as JSON.
//!
//! Every public operation opens its own connection and transaction and
//! releases them on every exit path, so operations from different
//! threads never share in-process connection state.

mod error;
mod store;
mod types;

pub use error::StoreError;
pub use store::InteractionStore;
pub use types::{Role, TurnPayload, TurnRecord, VocalScore};
