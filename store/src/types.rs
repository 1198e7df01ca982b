use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::StoreError;

/// Who produced a conversational turn. Closed enum; the schema carries
/// a matching CHECK constraint as a second line of defense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant")]
    Assistant,
}

impl Role {
    /// Validates a role string at the storage boundary.
    pub fn parse(s: &str) -> Result<Role, StoreError> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(StoreError::InvalidRole(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a vocal emotion ranking, stored as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocalScore {
    pub label: String,
    pub score: f64,
}

/// Everything a caller hands over for one turn. Only `text` is treated
/// as sensitive and encrypted before the write; the emotion columns
/// are derived summaries and stored as plain JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnPayload {
    /// Transcribed or generated text; `None` means the turn carried no
    /// text (distinct from an empty string).
    pub text: Option<String>,

    /// Stable dominant facial emotion at the time of the turn.
    pub facial_dominant: Option<String>,

    /// Mean facial score per label over the aggregation window.
    pub facial_scores: Option<BTreeMap<String, f64>>,

    /// Ranked vocal emotion distribution, descending by score.
    pub vocal_analysis: Option<Vec<VocalScore>>,

    /// Explicit turn timestamp (RFC 3339); the write time is used when
    /// absent.
    pub timestamp: Option<String>,
}

/// A decrypted turn as read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnRecord {
    pub turn_id: i64,
    pub session_id: i64,
    pub timestamp: String,
    pub role: Role,
    pub text: Option<String>,
    pub facial_dominant: Option<String>,
    pub facial_scores: Option<BTreeMap<String, f64>>,
    pub vocal_analysis: Option<Vec<VocalScore>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_accepts_closed_enum() {
        assert_eq!(Role::parse("user").unwrap(), Role::User);
        assert_eq!(Role::parse("assistant").unwrap(), Role::Assistant);
    }

    #[test]
    fn role_parse_rejects_everything_else() {
        for bad in ["moderator", "User", "ASSISTANT", "", "system"] {
            assert!(
                matches!(Role::parse(bad), Err(StoreError::InvalidRole(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn role_display_matches_schema_values() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
    }

    #[test]
    fn vocal_score_json_shape() {
        let ranking = vec![
            VocalScore {
                label: "HAP".into(),
                score: 0.7,
            },
            VocalScore {
                label: "NEU".into(),
                score: 0.3,
            },
        ];
        let json = serde_json::to_string(&ranking).unwrap();
        assert_eq!(
            json,
            r#"[{"label":"HAP","score":0.7},{"label":"NEU","score":0.3}]"#
        );
    }
}
