//! The transport-agnostic conversation core: states, events, the transition
//! function, and the per-conversation store.

pub mod answers;
pub mod engine;
pub mod event;
pub mod prompts;
pub mod state;
pub mod store;
pub mod validate;
pub mod variant;

pub use answers::{Answers, ConversationRecord, ResponseMode};
pub use engine::{ConversationEngine, Disposition, Effect, Outcome, transition};
pub use event::Event;
pub use state::{ConversationId, StateTag};
pub use store::ConversationStore;
pub use variant::{FlowConfig, FlowVariant};
