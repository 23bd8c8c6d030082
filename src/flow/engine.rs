//! The conversation state machine and its engine.
//!
//! `transition` is a pure synchronous function from (record, event) to
//! effects; it never performs I/O and has no suspension points. The
//! `ConversationEngine` wraps it with the store and per-conversation
//! serialization, and is the single entry point adapters call.

use super::answers::{Answers, ConversationRecord, ResponseMode};
use super::event::Event;
use super::prompts;
use super::state::{ConversationId, StateTag};
use super::store::ConversationStore;
use super::validate;
use super::variant::FlowConfig;

/// An instruction for the adapter to deliver to the participant. The core
/// never sends anything itself.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// A step prompt, optionally carrying a back-navigation affordance the
    /// adapter may render as a button.
    Prompt {
        text: String,
        back: Option<StateTag>,
    },
    /// The final summary of a confirmed submission.
    Summary { text: String },
}

impl Effect {
    pub fn text(&self) -> &str {
        match self {
            Self::Prompt { text, .. } => text,
            Self::Summary { text } => text,
        }
    }
}

/// What should happen to the stored record after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Keep the (possibly mutated) record.
    Keep,
    /// The conversation completed; remove the record from the store.
    Clear,
}

/// Result of one transition.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub effects: Vec<Effect>,
    pub disposition: Disposition,
}

impl Outcome {
    fn keep(effects: Vec<Effect>) -> Self {
        Self {
            effects,
            disposition: Disposition::Keep,
        }
    }

    fn clear(effects: Vec<Effect>) -> Self {
        Self {
            effects,
            disposition: Disposition::Clear,
        }
    }
}

fn prompt_for(flow: &FlowConfig, state: StateTag, answers: &Answers) -> Effect {
    Effect::Prompt {
        text: prompts::step_prompt(state, answers),
        back: flow.nav_affordance(state),
    }
}

fn retry_for(flow: &FlowConfig, state: StateTag, answers: &Answers) -> Effect {
    Effect::Prompt {
        text: prompts::retry_prompt(state, answers),
        back: flow.nav_affordance(state),
    }
}

/// Apply one inbound event to a conversation record.
///
/// Validation failure is non-fatal: the record stays put and the step
/// re-prompts. An event shape that makes no sense for the current state is
/// handled the same way (ignored with a re-prompt), except in the optional
/// phone/location steps where any input advances the flow.
pub fn transition(flow: &FlowConfig, record: &mut ConversationRecord, event: Event) -> Outcome {
    match event {
        // Idempotent reset from anywhere.
        Event::StartRequested => {
            record.reset();
            Outcome::keep(vec![prompt_for(flow, StateTag::ModeSelect, &record.answers)])
        }

        // Back navigation never validates and never touches answers. A flow
        // without a mapping for the target (the minimal flow, always)
        // ignores the event entirely.
        Event::BackRequested { target } => match flow.back_target(target) {
            Some(prev) => {
                record.advance_to(prev);
                Outcome::keep(vec![prompt_for(flow, prev, &record.answers)])
            }
            None => Outcome::keep(Vec::new()),
        },

        event => step_transition(flow, record, event),
    }
}

/// Per-step handling of the non-navigation events.
fn step_transition(flow: &FlowConfig, record: &mut ConversationRecord, event: Event) -> Outcome {
    match record.state {
        StateTag::ModeSelect => {
            if let Event::TextReply { ref text } = event {
                if validate::is_mode_token(text) {
                    record.answers.response_mode = ResponseMode::parse(text);
                    record.advance_to(StateTag::CollectName);
                    return Outcome::keep(vec![prompt_for(
                        flow,
                        StateTag::CollectName,
                        &record.answers,
                    )]);
                }
            }
            Outcome::keep(vec![retry_for(flow, StateTag::ModeSelect, &record.answers)])
        }

        StateTag::CollectName => {
            if let Event::TextReply { ref text } = event {
                // Any non-empty reply is accepted verbatim.
                if !text.is_empty() {
                    record.answers.name = Some(text.clone());
                    record.advance_to(StateTag::CollectAge);
                    return Outcome::keep(vec![prompt_for(
                        flow,
                        StateTag::CollectAge,
                        &record.answers,
                    )]);
                }
            }
            Outcome::keep(vec![retry_for(flow, StateTag::CollectName, &record.answers)])
        }

        StateTag::CollectAge => {
            if let Event::TextReply { ref text } = event {
                // Digits-only, then parse; a literal too large for u64 is
                // treated like any other invalid input.
                if validate::is_digits_only(text) {
                    if let Ok(age) = text.parse::<u64>() {
                        record.answers.age = Some(age);
                        let next = flow.after_age();
                        record.advance_to(next);
                        return Outcome::keep(vec![prompt_for(flow, next, &record.answers)]);
                    }
                }
            }
            Outcome::keep(vec![retry_for(flow, StateTag::CollectAge, &record.answers)])
        }

        // Optional step: a shared contact is recorded, anything else skips.
        StateTag::CollectPhone => {
            if let Event::ContactShared { phone } = event {
                record.answers.phone = Some(phone);
            }
            record.advance_to(StateTag::CollectLocation);
            Outcome::keep(vec![prompt_for(
                flow,
                StateTag::CollectLocation,
                &record.answers,
            )])
        }

        // Optional step, symmetric to phone.
        StateTag::CollectLocation => {
            if let Event::LocationShared { lat, lon } = event {
                record.answers.location = Some(format!("Lat: {lat}, Lon: {lon}"));
            }
            record.advance_to(StateTag::Confirmation);
            Outcome::keep(vec![prompt_for(
                flow,
                StateTag::Confirmation,
                &record.answers,
            )])
        }

        StateTag::Confirmation => match event {
            Event::TextReply { ref text } if text.eq_ignore_ascii_case("yes") => {
                let effect = Effect::Summary {
                    text: prompts::summary(&record.answers),
                };
                Outcome::clear(vec![effect])
            }
            Event::TextReply { .. } => {
                // Reject restarts collection from the name step; previously
                // entered answers (including the mode) are retained.
                record.advance_to(StateTag::CollectName);
                Outcome::keep(vec![Effect::Prompt {
                    text: prompts::restart_prompt(),
                    back: flow.nav_affordance(StateTag::CollectName),
                }])
            }
            _ => Outcome::keep(vec![retry_for(flow, StateTag::Confirmation, &record.answers)]),
        },
    }
}

/// Owns the store and the flow configuration; one per process.
pub struct ConversationEngine {
    flow: FlowConfig,
    store: ConversationStore,
}

impl ConversationEngine {
    pub fn new(flow: FlowConfig) -> Self {
        Self {
            flow,
            store: ConversationStore::new(),
        }
    }

    pub fn flow(&self) -> &FlowConfig {
        &self.flow
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Handle one inbound event for one conversation.
    ///
    /// Events for the same id are serialized in arrival order by the
    /// per-record lock; events for different ids proceed independently. A
    /// record is created lazily for an unknown id, so the first event of a
    /// new conversation is processed against a fresh initial record.
    pub async fn handle_event(&self, id: &ConversationId, event: Event) -> Vec<Effect> {
        loop {
            let handle = self.store.entry(id).await;
            let mut record = handle.lock().await;

            // The entry may have been pruned by a confirmation-accept that
            // finished while we waited on the record lock; restart against
            // the live entry so the write is never lost.
            if !self.store.is_current(id, &handle).await {
                continue;
            }

            let kind = event.kind();
            let outcome = transition(&self.flow, &mut record, event.clone());
            tracing::debug!(
                conversation = %id,
                event = kind,
                state = %record.state,
                effects = outcome.effects.len(),
                "event handled"
            );

            if outcome.disposition == Disposition::Clear {
                record.reset();
                self.store.prune(id, &handle).await;
            }
            return outcome.effects;
        }
    }
}
