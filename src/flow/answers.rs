//! The per-conversation answer accumulator and its record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::StateTag;

/// How the participant prefers the bot to respond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    Text,
    Voice,
}

impl ResponseMode {
    /// Parse a user-supplied token, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "voice" => Some(Self::Voice),
            _ => None,
        }
    }
}

impl std::fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Voice => write!(f, "voice"),
        }
    }
}

/// Answers collected so far. Fields stay `None` until their step completes;
/// `name` and `age` are always present by the time the conversation reaches
/// the confirmation step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Answers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mode: Option<ResponseMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Answers {
    /// Render the collected details as the lines shown at confirmation and
    /// in the final summary. Optional fields appear only when present.
    pub fn detail_lines(&self) -> String {
        let mut parts = Vec::new();
        parts.push(format!("Name: {}", self.name.as_deref().unwrap_or("-")));
        match self.age {
            Some(age) => parts.push(format!("Age: {age}")),
            None => parts.push("Age: -".to_string()),
        }
        if let Some(ref phone) = self.phone {
            parts.push(format!("Phone: {phone}"));
        }
        if let Some(ref location) = self.location {
            parts.push(format!("Location: {location}"));
        }
        parts.join("\n")
    }
}

/// One conversation's full record: where it is plus what it has collected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub state: StateTag,
    pub answers: Answers,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationRecord {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            state: StateTag::default(),
            answers: Answers::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Reset to a clean slate: initial state, empty answers.
    pub fn reset(&mut self) {
        self.state = StateTag::default();
        self.answers = Answers::default();
        self.updated_at = Utc::now();
    }

    /// Move to `next` and touch the update timestamp. Answer mutation is the
    /// caller's business; this only records the position change.
    pub fn advance_to(&mut self, next: StateTag) {
        self.state = next;
        self.updated_at = Utc::now();
    }
}

impl Default for ConversationRecord {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_mode_parse() {
        assert_eq!(ResponseMode::parse("text"), Some(ResponseMode::Text));
        assert_eq!(ResponseMode::parse("VOICE"), Some(ResponseMode::Voice));
        assert_eq!(ResponseMode::parse("video"), None);
        assert_eq!(ResponseMode::parse(""), None);
    }

    #[test]
    fn response_mode_display_matches_token() {
        assert_eq!(ResponseMode::Text.to_string(), "text");
        assert_eq!(ResponseMode::Voice.to_string(), "voice");
    }

    #[test]
    fn detail_lines_required_fields() {
        let answers = Answers {
            response_mode: Some(ResponseMode::Text),
            name: Some("Alice".to_string()),
            age: Some(30),
            ..Default::default()
        };
        let lines = answers.detail_lines();
        assert!(lines.contains("Name: Alice"));
        assert!(lines.contains("Age: 30"));
        assert!(!lines.contains("Phone:"));
        assert!(!lines.contains("Location:"));
    }

    #[test]
    fn detail_lines_optional_fields_present() {
        let answers = Answers {
            response_mode: Some(ResponseMode::Voice),
            name: Some("Bob".to_string()),
            age: Some(41),
            phone: Some("+15551234".to_string()),
            location: Some("Lat: 1.5, Lon: 2.5".to_string()),
        };
        let lines = answers.detail_lines();
        assert!(lines.contains("Phone: +15551234"));
        assert!(lines.contains("Location: Lat: 1.5, Lon: 2.5"));
    }

    #[test]
    fn record_reset_clears_everything() {
        let mut record = ConversationRecord::new();
        record.advance_to(StateTag::CollectAge);
        record.answers.name = Some("Alice".to_string());
        record.reset();
        assert_eq!(record.state, StateTag::ModeSelect);
        assert_eq!(record.answers, Answers::default());
    }

    #[test]
    fn answers_serde_roundtrip() {
        let answers = Answers {
            response_mode: Some(ResponseMode::Text),
            name: Some("Alice".to_string()),
            age: Some(30),
            phone: None,
            location: None,
        };
        let json = serde_json::to_string(&answers).unwrap();
        assert!(!json.contains("phone"), "absent fields are omitted: {json}");
        let parsed: Answers = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, answers);
    }
}
