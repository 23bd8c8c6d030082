//! Channel abstraction: transports map their native payloads onto abstract
//! events on the way in and render effects on the way out.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::ChannelError;
use crate::flow::{ConversationId, Effect, Event};

/// One inbound event, already mapped to the abstract shape the engine
/// consumes, plus enough transport metadata to address the reply.
#[derive(Debug, Clone)]
pub struct IncomingEvent {
    /// Channel name (e.g. "telegram", "cli").
    pub channel: String,
    /// The conversation this event belongs to.
    pub conversation_id: ConversationId,
    /// The abstract event.
    pub event: Event,
    /// Transport-specific metadata (chat id, username, ...).
    pub metadata: serde_json::Value,
}

impl IncomingEvent {
    pub fn new(channel: impl Into<String>, conversation_id: ConversationId, event: Event) -> Self {
        Self {
            channel: channel.into(),
            conversation_id,
            event,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Stream of inbound events produced by a running channel.
pub type EventStream = Pin<Box<dyn Stream<Item = IncomingEvent> + Send>>;

/// A message transport.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name for logging and routing.
    fn name(&self) -> &str;

    /// Start listening; returns the stream of mapped inbound events.
    async fn start(&self) -> Result<EventStream, ChannelError>;

    /// Deliver one effect back to the participant the event came from.
    async fn deliver(
        &self,
        incoming: &IncomingEvent,
        effect: &Effect,
    ) -> Result<(), ChannelError>;

    /// Verify the channel can reach its transport.
    async fn health_check(&self) -> Result<(), ChannelError>;

    /// Graceful shutdown.
    async fn shutdown(&self) -> Result<(), ChannelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incoming_event_builder() {
        let incoming = IncomingEvent::new("cli", ConversationId::new("local"), Event::StartRequested)
            .with_metadata(serde_json::json!({"chat_id": "42"}));
        assert_eq!(incoming.channel, "cli");
        assert_eq!(incoming.metadata["chat_id"], "42");
    }
}
