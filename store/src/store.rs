//! [`InteractionStore`]: per-operation connections, field encryption.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection};
use serde_json::Value;
use tracing::{error, warn};

use lumen_cipher::CipherBox;

use crate::types::{Role, TurnPayload, TurnRecord, VocalScore};
use crate::StoreError;

/// How long a connection waits on a locked database before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Durable CRUD over sessions, turns and long-term memory facts.
///
/// The store holds a database path and a shared [`CipherBox`]; both are
/// injected at construction. Each public operation opens a fresh
/// connection, runs one transaction and releases the connection on
/// every exit path, so calls from different threads only contend at
/// SQLite's own isolation level. Cloning the store is cheap and safe.
#[derive(Debug, Clone)]
pub struct InteractionStore {
    db_path: PathBuf,
    cipher: Arc<CipherBox>,
}

impl InteractionStore {
    /// Creates a store over the database at `path`. The file is created
    /// lazily on first use; call
    /// [`initialize_schema`](InteractionStore::initialize_schema) once
    /// at startup.
    pub fn new(path: impl AsRef<Path>, cipher: Arc<CipherBox>) -> Self {
        Self {
            db_path: path.as_ref().to_path_buf(),
            cipher,
        }
    }

    /// Creates the three relations if absent. Idempotent, and safe when
    /// several processes race to initialize the same database.
    pub fn initialize_schema(&self) -> Result<(), StoreError> {
        let conn = self.connect()?;
        conn.execute_batch(
            "BEGIN;
            CREATE TABLE IF NOT EXISTS sessions (
                session_id INTEGER PRIMARY KEY AUTOINCREMENT,
                start_time TEXT NOT NULL,
                end_time TEXT,
                model_used TEXT,
                settings_json TEXT
            );
            CREATE TABLE IF NOT EXISTS interactions (
                interaction_id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                role TEXT NOT NULL CHECK(role IN ('user', 'assistant')),
                text_content TEXT,
                facial_emotion_dominant TEXT,
                facial_emotion_scores_json TEXT,
                vocal_analysis_json TEXT,
                FOREIGN KEY (session_id) REFERENCES sessions (session_id)
            );
            CREATE INDEX IF NOT EXISTS interactions_session_idx
                ON interactions(session_id, interaction_id);
            CREATE TABLE IF NOT EXISTS user_memory (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                last_updated TEXT NOT NULL
            );
            COMMIT;",
        )?;
        Ok(())
    }

    /// Inserts a new session row and returns its identifier.
    ///
    /// Returns `None` (the "no id" sentinel) on any failure, after
    /// logging it: a session that cannot be recorded should surface as
    /// "session unavailable" upstream, not crash the conversation.
    pub fn start_session(&self, model_used: &str, settings: Option<&Value>) -> Option<i64> {
        let conn = match self.connect() {
            Ok(conn) => conn,
            Err(e) => {
                error!("start_session: connection failed: {e}");
                return None;
            }
        };

        let settings_json = settings.map(|v| v.to_string());
        let result = conn.execute(
            "INSERT INTO sessions (start_time, model_used, settings_json) VALUES (?1, ?2, ?3)",
            params![now_rfc3339(), model_used, settings_json],
        );
        match result {
            Ok(_) => Some(conn.last_insert_rowid()),
            Err(e) => {
                error!("start_session: insert failed: {e}");
                None
            }
        }
    }

    /// Sets the session's end timestamp, the only permitted mutation
    /// of a session row.
    pub fn end_session(&self, session_id: i64) -> Result<(), StoreError> {
        let conn = self.connect()?;
        conn.execute(
            "UPDATE sessions SET end_time = ?1 WHERE session_id = ?2",
            params![now_rfc3339(), session_id],
        )?;
        Ok(())
    }

    /// Persists one conversational turn.
    ///
    /// The role string is validated against the closed enum before
    /// anything touches the database; `text` is encrypted via the
    /// injected cipher. Returns the new turn id.
    pub fn save_turn(
        &self,
        session_id: i64,
        role: &str,
        turn: &TurnPayload,
    ) -> Result<i64, StoreError> {
        let role = Role::parse(role)?;

        let text_token = match turn.text.as_deref() {
            Some(text) => Some(self.cipher.encrypt(text)?),
            None => None,
        };
        let scores_json = turn
            .facial_scores
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let vocal_json = turn
            .vocal_analysis
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let timestamp = turn.timestamp.clone().unwrap_or_else(now_rfc3339);

        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO interactions
                (session_id, timestamp, role, text_content,
                 facial_emotion_dominant, facial_emotion_scores_json, vocal_analysis_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                session_id,
                timestamp,
                role.as_str(),
                text_token,
                turn.facial_dominant,
                scores_json,
                vocal_json,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Reads the newest `limit` turns of a session in chronological
    /// order, decrypting text payloads.
    pub fn recent_turns(
        &self,
        session_id: i64,
        limit: usize,
    ) -> Result<Vec<TurnRecord>, StoreError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT interaction_id, timestamp, role, text_content,
                    facial_emotion_dominant, facial_emotion_scores_json, vocal_analysis_json
             FROM interactions
             WHERE session_id = ?1
             ORDER BY interaction_id DESC
             LIMIT ?2",
        )?;

        let mut rows = stmt.query(params![session_id, limit as i64])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let role: String = row.get(2)?;
            let text_token: Option<String> = row.get(3)?;
            let scores_json: Option<String> = row.get(5)?;
            let vocal_json: Option<String> = row.get(6)?;

            let text = match text_token {
                Some(token) => Some(self.cipher.decrypt(&token)?),
                None => None,
            };
            let facial_scores: Option<BTreeMap<String, f64>> = scores_json
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?;
            let vocal_analysis: Option<Vec<VocalScore>> = vocal_json
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?;

            out.push(TurnRecord {
                turn_id: row.get(0)?,
                session_id,
                timestamp: row.get(1)?,
                role: Role::parse(&role)?,
                text,
                facial_dominant: row.get(4)?,
                facial_scores,
                vocal_analysis,
            });
        }
        out.reverse();
        Ok(out)
    }

    /// Writes or refreshes one long-term memory fact.
    ///
    /// The value is coerced to text (JSON strings stored bare, other
    /// values serialized), encrypted, and written with
    /// overwrite-on-conflict semantics keyed by `key`.
    pub fn upsert_memory_fact(&self, key: &str, value: &Value) -> Result<(), StoreError> {
        let plaintext = match value.as_str() {
            Some(s) => s.to_string(),
            None => value.to_string(),
        };
        let token = self.cipher.encrypt(&plaintext)?;

        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO user_memory (key, value, last_updated) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
               value = excluded.value,
               last_updated = excluded.last_updated",
            params![key, token, now_rfc3339()],
        )?;
        Ok(())
    }

    /// Reads and decrypts every memory fact.
    ///
    /// A failed connection yields an empty map with a logged error (the
    /// store being briefly unavailable must not crash the caller). A
    /// decryption failure fails the whole call: a partially garbled
    /// memory is worse than none.
    pub fn get_all_memory(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let conn = match self.connect() {
            Ok(conn) => conn,
            Err(e) => {
                warn!("get_all_memory: connection failed, returning empty memory: {e}");
                return Ok(BTreeMap::new());
            }
        };

        let mut stmt = conn.prepare("SELECT key, value FROM user_memory")?;
        let mut rows = stmt.query([])?;
        let mut out = BTreeMap::new();
        while let Some(row) = rows.next()? {
            let key: String = row.get(0)?;
            let token: String = row.get(1)?;
            out.insert(key, self.cipher.decrypt(&token)?);
        }
        Ok(out)
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, InteractionStore) {
        let dir = TempDir::new().unwrap();
        let cipher = Arc::new(CipherBox::new(b"test key").unwrap());
        let store = InteractionStore::new(dir.path().join("lumen.db"), cipher);
        store.initialize_schema().unwrap();
        (dir, store)
    }

    fn turn_with_text(text: &str) -> TurnPayload {
        TurnPayload {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn schema_init_is_idempotent() {
        let (_dir, store) = test_store();
        store.initialize_schema().unwrap();
        store.initialize_schema().unwrap();
        assert!(store.start_session("test-model", None).is_some());
    }

    #[test]
    fn start_session_returns_fresh_ids() {
        let (_dir, store) = test_store();
        let a = store.start_session("model-a", None).unwrap();
        let b = store.start_session("model-b", None).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn start_session_failure_is_sentinel_not_panic() {
        let dir = TempDir::new().unwrap();
        let cipher = Arc::new(CipherBox::new(b"test key").unwrap());
        // Parent directory does not exist, so the connection fails.
        let store =
            InteractionStore::new(dir.path().join("missing").join("lumen.db"), cipher);
        assert!(store.start_session("model", None).is_none());
    }

    #[test]
    fn start_session_stores_settings_blob() {
        let (dir, store) = test_store();
        let settings = serde_json::json!({"voice": "es-ES", "temperature": 0.7});
        let sid = store.start_session("model", Some(&settings)).unwrap();

        let conn = Connection::open(dir.path().join("lumen.db")).unwrap();
        let stored: String = conn
            .query_row(
                "SELECT settings_json FROM sessions WHERE session_id = ?1",
                params![sid],
                |r| r.get(0),
            )
            .unwrap();
        let parsed: Value = serde_json::from_str(&stored).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn end_session_sets_end_time_only() {
        let (dir, store) = test_store();
        let sid = store.start_session("model", None).unwrap();
        store.end_session(sid).unwrap();

        let conn = Connection::open(dir.path().join("lumen.db")).unwrap();
        let (start, end): (String, Option<String>) = conn
            .query_row(
                "SELECT start_time, end_time FROM sessions WHERE session_id = ?1",
                params![sid],
                |r| Ok((r.get(0)?, r.get(1)?)),
            )
            .unwrap();
        assert!(!start.is_empty());
        assert!(end.is_some());
    }

    #[test]
    fn turn_text_is_encrypted_at_rest_and_decrypted_on_read() {
        let (dir, store) = test_store();
        let sid = store.start_session("model", None).unwrap();
        let original = "Este es un mensaje secreto de prueba.";
        store.save_turn(sid, "user", &turn_with_text(original)).unwrap();

        // Raw column must hold ciphertext, not plaintext.
        let conn = Connection::open(dir.path().join("lumen.db")).unwrap();
        let stored: String = conn
            .query_row(
                "SELECT text_content FROM interactions WHERE session_id = ?1",
                params![sid],
                |r| r.get(0),
            )
            .unwrap();
        assert_ne!(stored, original);

        let turns = store.recent_turns(sid, 10).unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].text.as_deref(), Some(original));
    }

    #[test]
    fn invalid_role_is_rejected_before_write() {
        let (dir, store) = test_store();
        let sid = store.start_session("model", None).unwrap();
        let err = store
            .save_turn(sid, "moderator", &turn_with_text("hola"))
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidRole(_)));

        let conn = Connection::open(dir.path().join("lumen.db")).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM interactions", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn turn_emotion_columns_roundtrip() {
        let (_dir, store) = test_store();
        let sid = store.start_session("model", None).unwrap();

        let mut scores = BTreeMap::new();
        scores.insert("happy".to_string(), 0.8);
        scores.insert("neutral".to_string(), 0.2);
        let turn = TurnPayload {
            text: Some("me siento bien".into()),
            facial_dominant: Some("happy".into()),
            facial_scores: Some(scores.clone()),
            vocal_analysis: Some(vec![VocalScore {
                label: "HAP".into(),
                score: 0.9,
            }]),
            timestamp: None,
        };
        store.save_turn(sid, "user", &turn).unwrap();

        let read = &store.recent_turns(sid, 1).unwrap()[0];
        assert_eq!(read.facial_dominant.as_deref(), Some("happy"));
        assert_eq!(read.facial_scores.as_ref().unwrap(), &scores);
        assert_eq!(read.vocal_analysis.as_ref().unwrap()[0].label, "HAP");
    }

    #[test]
    fn textless_turn_stays_null() {
        let (_dir, store) = test_store();
        let sid = store.start_session("model", None).unwrap();
        store
            .save_turn(sid, "assistant", &TurnPayload::default())
            .unwrap();
        let read = &store.recent_turns(sid, 1).unwrap()[0];
        assert_eq!(read.text, None);
    }

    #[test]
    fn empty_text_survives_as_empty_not_null() {
        let (_dir, store) = test_store();
        let sid = store.start_session("model", None).unwrap();
        store.save_turn(sid, "user", &turn_with_text("")).unwrap();
        let read = &store.recent_turns(sid, 1).unwrap()[0];
        assert_eq!(read.text.as_deref(), Some(""));
    }

    #[test]
    fn recent_turns_are_chronological_and_bounded() {
        let (_dir, store) = test_store();
        let sid = store.start_session("model", None).unwrap();
        for i in 0..5 {
            let role = if i % 2 == 0 { "user" } else { "assistant" };
            store
                .save_turn(sid, role, &turn_with_text(&format!("turno {i}")))
                .unwrap();
        }

        let turns = store.recent_turns(sid, 3).unwrap();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].text.as_deref(), Some("turno 2"));
        assert_eq!(turns[2].text.as_deref(), Some("turno 4"));
    }

    #[test]
    fn memory_upsert_overwrites_single_row() {
        let (dir, store) = test_store();
        store
            .upsert_memory_fact("nombre", &Value::String("Ana".into()))
            .unwrap();
        let first_ts: String = {
            let conn = Connection::open(dir.path().join("lumen.db")).unwrap();
            conn.query_row(
                "SELECT last_updated FROM user_memory WHERE key = 'nombre'",
                [],
                |r| r.get(0),
            )
            .unwrap()
        };

        store
            .upsert_memory_fact("nombre", &Value::String("Lucía".into()))
            .unwrap();

        let conn = Connection::open(dir.path().join("lumen.db")).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM user_memory WHERE key = 'nombre'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
        let second_ts: String = conn
            .query_row(
                "SELECT last_updated FROM user_memory WHERE key = 'nombre'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert!(second_ts >= first_ts);

        let memory = store.get_all_memory().unwrap();
        assert_eq!(memory["nombre"], "Lucía");
    }

    #[test]
    fn memory_value_coercion() {
        let (_dir, store) = test_store();
        store
            .upsert_memory_fact("edad", &serde_json::json!(34))
            .unwrap();
        store
            .upsert_memory_fact("metas", &serde_json::json!(["dormir mejor"]))
            .unwrap();

        let memory = store.get_all_memory().unwrap();
        assert_eq!(memory["edad"], "34");
        assert_eq!(memory["metas"], r#"["dormir mejor"]"#);
    }

    #[test]
    fn memory_values_are_encrypted_at_rest() {
        let (dir, store) = test_store();
        store
            .upsert_memory_fact("tema_recurrente", &Value::String("Estrés laboral".into()))
            .unwrap();

        let conn = Connection::open(dir.path().join("lumen.db")).unwrap();
        let stored: String = conn
            .query_row(
                "SELECT value FROM user_memory WHERE key = 'tema_recurrente'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_ne!(stored, "Estrés laboral");
    }

    #[test]
    fn undecryptable_memory_row_fails_whole_read() {
        let (dir, store) = test_store();
        store
            .upsert_memory_fact("nombre", &Value::String("Ana".into()))
            .unwrap();

        // Simulate a value written under a rotated/foreign key.
        let conn = Connection::open(dir.path().join("lumen.db")).unwrap();
        conn.execute(
            "UPDATE user_memory SET value = 'not-a-real-token' WHERE key = 'nombre'",
            [],
        )
        .unwrap();

        assert!(matches!(
            store.get_all_memory(),
            Err(StoreError::Crypto(_))
        ));
    }

    #[test]
    fn unavailable_database_reads_as_empty_memory() {
        let dir = TempDir::new().unwrap();
        let cipher = Arc::new(CipherBox::new(b"test key").unwrap());
        let store =
            InteractionStore::new(dir.path().join("missing").join("lumen.db"), cipher);
        assert!(store.get_all_memory().unwrap().is_empty());
    }

    #[test]
    fn concurrent_turn_writes_all_land() {
        let (_dir, store) = test_store();
        let sid = store.start_session("model", None).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = store.clone();
                thread::spawn(move || {
                    for i in 0..5 {
                        store
                            .save_turn(sid, "user", &turn_with_text(&format!("t{t}-{i}")))
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let turns = store.recent_turns(sid, 100).unwrap();
        assert_eq!(turns.len(), 20);
    }
}
