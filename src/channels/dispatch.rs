//! Event dispatch: pumps a channel's stream into the engine.
//!
//! Same-conversation events must be handled one at a time in arrival
//! order, so each conversation gets its own worker task fed from a queue
//! in stream order. Distinct conversations proceed independently; a slow
//! conversation only ever delays itself.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::channels::{Channel, IncomingEvent};
use crate::flow::{ConversationEngine, ConversationId};

/// Routes channel events through the engine and effects back out.
pub struct Dispatcher {
    engine: Arc<ConversationEngine>,
}

impl Dispatcher {
    pub fn new(engine: Arc<ConversationEngine>) -> Self {
        Self { engine }
    }

    /// Pump one channel until its stream ends, then drain every worker
    /// queue before shutting the channel down.
    pub async fn run(&self, channel: Arc<dyn Channel>) {
        let mut stream = match channel.start().await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(channel = channel.name(), "Channel failed to start: {e}");
                return;
            }
        };

        // Worker entries live for the life of the channel, matching the
        // store's no-expiry policy for conversations.
        let mut workers: HashMap<ConversationId, ConversationWorker> = HashMap::new();

        while let Some(incoming) = stream.next().await {
            let worker = workers
                .entry(incoming.conversation_id.clone())
                .or_insert_with(|| spawn_worker(Arc::clone(&self.engine), Arc::clone(&channel)));
            if worker.queue.send(incoming).is_err() {
                tracing::warn!("Conversation worker gone; dropping event");
            }
        }

        tracing::info!(channel = channel.name(), "Channel stream ended");

        for (_, worker) in workers.drain() {
            let ConversationWorker { queue, handle } = worker;
            drop(queue);
            if let Err(e) = handle.await {
                tracing::warn!("Conversation worker join error: {e}");
            }
        }

        if let Err(e) = channel.shutdown().await {
            tracing::warn!(channel = channel.name(), "Shutdown error: {e}");
        }
    }
}

struct ConversationWorker {
    queue: mpsc::UnboundedSender<IncomingEvent>,
    handle: JoinHandle<()>,
}

/// One worker per conversation: a FIFO queue whose consumer runs each
/// event to completion (engine transition plus effect delivery) before
/// dequeuing the next.
fn spawn_worker(engine: Arc<ConversationEngine>, channel: Arc<dyn Channel>) -> ConversationWorker {
    let (queue, mut rx) = mpsc::unbounded_channel::<IncomingEvent>();
    let handle = tokio::spawn(async move {
        while let Some(incoming) = rx.recv().await {
            let effects = engine
                .handle_event(&incoming.conversation_id, incoming.event.clone())
                .await;
            for effect in &effects {
                if let Err(e) = channel.deliver(&incoming, effect).await {
                    tracing::warn!(
                        channel = channel.name(),
                        conversation = %incoming.conversation_id,
                        "Failed to deliver effect: {e}"
                    );
                }
            }
        }
    });
    ConversationWorker { queue, handle }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::channels::EventStream;
    use crate::error::ChannelError;
    use crate::flow::{Effect, Event, FlowConfig, ResponseMode, StateTag};

    /// Replays a scripted event sequence and records delivered effects.
    struct ScriptedChannel {
        events: Mutex<Option<Vec<IncomingEvent>>>,
        delivered: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedChannel {
        fn new(events: Vec<IncomingEvent>) -> Self {
            Self {
                events: Mutex::new(Some(events)),
                delivered: Mutex::new(Vec::new()),
            }
        }

        fn delivered(&self) -> Vec<(String, String)> {
            self.delivered.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Channel for ScriptedChannel {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn start(&self) -> Result<EventStream, ChannelError> {
            let events = self.events.lock().unwrap().take().unwrap_or_default();
            Ok(Box::pin(futures::stream::iter(events)))
        }

        async fn deliver(
            &self,
            incoming: &IncomingEvent,
            effect: &Effect,
        ) -> Result<(), ChannelError> {
            self.delivered.lock().unwrap().push((
                incoming.conversation_id.to_string(),
                effect.text().to_string(),
            ));
            Ok(())
        }

        async fn health_check(&self) -> Result<(), ChannelError> {
            Ok(())
        }

        async fn shutdown(&self) -> Result<(), ChannelError> {
            Ok(())
        }
    }

    fn incoming(id: &str, event: Event) -> IncomingEvent {
        IncomingEvent::new("scripted", ConversationId::new(id), event)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn same_conversation_events_keep_arrival_order() {
        let engine = Arc::new(ConversationEngine::new(FlowConfig::minimal()));
        // A swap of the name and age replies would store "30" as the name
        // and re-prompt on "Alice".
        let channel = Arc::new(ScriptedChannel::new(vec![
            incoming("chat-1", Event::text("text")),
            incoming("chat-1", Event::text("Alice")),
            incoming("chat-1", Event::text("30")),
        ]));

        Dispatcher::new(Arc::clone(&engine))
            .run(Arc::clone(&channel) as Arc<dyn Channel>)
            .await;

        let record = engine
            .store()
            .snapshot(&ConversationId::new("chat-1"))
            .await
            .unwrap();
        assert_eq!(record.state, StateTag::Confirmation);
        assert_eq!(record.answers.name.as_deref(), Some("Alice"));
        assert_eq!(record.answers.age, Some(30));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn burst_of_replies_lands_in_order() {
        let engine = Arc::new(ConversationEngine::new(FlowConfig::minimal()));
        let channel = Arc::new(ScriptedChannel::new(vec![
            incoming("chat-1", Event::text("voice")),
            incoming("chat-1", Event::text("Bob")),
            incoming("chat-1", Event::text("41")),
            incoming("chat-1", Event::text("yes")),
        ]));

        Dispatcher::new(Arc::clone(&engine))
            .run(Arc::clone(&channel) as Arc<dyn Channel>)
            .await;

        // Only an in-order run reaches the summary; the store is pruned.
        let delivered = channel.delivered();
        let last = &delivered.last().unwrap().1;
        assert!(last.contains("Confirmed!"), "got: {last}");
        assert!(last.contains("Bob"));
        assert!(engine.store().is_empty().await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn interleaved_conversations_stay_separate() {
        let engine = Arc::new(ConversationEngine::new(FlowConfig::minimal()));
        let channel = Arc::new(ScriptedChannel::new(vec![
            incoming("alice", Event::text("text")),
            incoming("bob", Event::text("voice")),
            incoming("alice", Event::text("Alice")),
            incoming("bob", Event::text("Bob")),
            incoming("alice", Event::text("30")),
            incoming("bob", Event::text("41")),
        ]));

        Dispatcher::new(Arc::clone(&engine))
            .run(Arc::clone(&channel) as Arc<dyn Channel>)
            .await;

        let a = engine
            .store()
            .snapshot(&ConversationId::new("alice"))
            .await
            .unwrap();
        let b = engine
            .store()
            .snapshot(&ConversationId::new("bob"))
            .await
            .unwrap();
        assert_eq!(a.answers.name.as_deref(), Some("Alice"));
        assert_eq!(a.answers.age, Some(30));
        assert_eq!(a.answers.response_mode, Some(ResponseMode::Text));
        assert_eq!(b.answers.name.as_deref(), Some("Bob"));
        assert_eq!(b.answers.age, Some(41));
        assert_eq!(b.answers.response_mode, Some(ResponseMode::Voice));
    }
}
