//! Conversation state tags and identities.

use serde::{Deserialize, Serialize};

/// The steps of the data-collection conversation.
///
/// A conversation always sits at exactly one of these. `CollectPhone` and
/// `CollectLocation` are only reachable in the extended flow variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateTag {
    ModeSelect,
    CollectName,
    CollectAge,
    CollectPhone,
    CollectLocation,
    Confirmation,
}

impl StateTag {
    /// Stable tag used as a navigation callback payload (e.g. inline-button
    /// `callback_data`). Matches the serde representation.
    pub fn nav_tag(&self) -> &'static str {
        match self {
            Self::ModeSelect => "mode_select",
            Self::CollectName => "collect_name",
            Self::CollectAge => "collect_age",
            Self::CollectPhone => "collect_phone",
            Self::CollectLocation => "collect_location",
            Self::Confirmation => "confirmation",
        }
    }

    /// Parse a navigation tag back into a state. Unknown tags map to `None`
    /// so a stale or forged callback payload is ignorable, not an error.
    pub fn from_nav_tag(tag: &str) -> Option<Self> {
        match tag {
            "mode_select" => Some(Self::ModeSelect),
            "collect_name" => Some(Self::CollectName),
            "collect_age" => Some(Self::CollectAge),
            "collect_phone" => Some(Self::CollectPhone),
            "collect_location" => Some(Self::CollectLocation),
            "confirmation" => Some(Self::Confirmation),
            _ => None,
        }
    }
}

impl Default for StateTag {
    fn default() -> Self {
        Self::ModeSelect
    }
}

impl std::fmt::Display for StateTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.nav_tag())
    }
}

/// Opaque identity of one ongoing dialogue with one remote participant.
///
/// Transport-scoped (a Telegram chat id, a CLI session name); never reused
/// across unrelated dialogues.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
