//! Inbound events, abstracted away from any transport payload.

use serde::{Deserialize, Serialize};

use super::state::StateTag;

/// One inbound event for a conversation.
///
/// Adapters map whatever their transport delivers (text message,
/// contact-share, location-share, UI callback, session-start signal) onto
/// exactly one of these shapes before handing it to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    /// A plain text reply from the participant.
    TextReply { text: String },
    /// The participant shared a contact card; payload is the phone number.
    ContactShared { phone: String },
    /// The participant shared a geographic location.
    LocationShared { lat: f64, lon: f64 },
    /// The participant pressed a back affordance targeting `target`.
    BackRequested { target: StateTag },
    /// Explicit session (re)start, e.g. a `/start` command.
    StartRequested,
}

impl Event {
    pub fn text(text: impl Into<String>) -> Self {
        Self::TextReply { text: text.into() }
    }

    pub fn contact(phone: impl Into<String>) -> Self {
        Self::ContactShared {
            phone: phone.into(),
        }
    }

    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TextReply { .. } => "text_reply",
            Self::ContactShared { .. } => "contact_shared",
            Self::LocationShared { .. } => "location_shared",
            Self::BackRequested { .. } => "back_requested",
            Self::StartRequested => "start_requested",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_labels() {
        assert_eq!(Event::text("hi").kind(), "text_reply");
        assert_eq!(Event::contact("+123").kind(), "contact_shared");
        assert_eq!(
            Event::LocationShared { lat: 1.0, lon: 2.0 }.kind(),
            "location_shared"
        );
        assert_eq!(
            Event::BackRequested {
                target: StateTag::CollectAge
            }
            .kind(),
            "back_requested"
        );
        assert_eq!(Event::StartRequested.kind(), "start_requested");
    }

    #[test]
    fn serde_tagged_roundtrip() {
        let event = Event::BackRequested {
            target: StateTag::CollectName,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"kind\":\"back_requested\""), "{json}");
        let parsed: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
