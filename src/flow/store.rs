//! In-memory conversation store.
//!
//! Single process, no persistence across restarts. Conversations are
//! ephemeral call-and-response sessions; the entry for an id lives until the
//! participant confirms a submission, at which point it is pruned.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::answers::ConversationRecord;
use super::state::ConversationId;

/// Handle to one conversation's record. Holding the inner lock serializes
/// event handling for that conversation without blocking any other id.
pub type RecordHandle = Arc<Mutex<ConversationRecord>>;

/// Map of conversation id → record handle. The outer lock is held only for
/// O(1) map accesses, never across a record lock await.
#[derive(Default)]
pub struct ConversationStore {
    inner: Mutex<HashMap<ConversationId, RecordHandle>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the handle for `id`, lazily creating a fresh record at the
    /// initial state if none exists.
    pub async fn entry(&self, id: &ConversationId) -> RecordHandle {
        let mut map = self.inner.lock().await;
        map.entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(ConversationRecord::new())))
            .clone()
    }

    /// Whether `handle` is still the live entry for `id`. A caller that
    /// awaited the record lock re-checks this before transitioning, so an
    /// event racing a prune restarts against the fresh entry instead of
    /// writing into a removed one.
    pub async fn is_current(&self, id: &ConversationId, handle: &RecordHandle) -> bool {
        let map = self.inner.lock().await;
        map.get(id).is_some_and(|live| Arc::ptr_eq(live, handle))
    }

    /// Snapshot the record for `id`, if one exists.
    pub async fn snapshot(&self, id: &ConversationId) -> Option<ConversationRecord> {
        let handle = {
            let map = self.inner.lock().await;
            map.get(id).cloned()
        };
        match handle {
            Some(handle) => Some(handle.lock().await.clone()),
            None => None,
        }
    }

    /// Remove the entry for `id` if it is still `handle`.
    pub async fn prune(&self, id: &ConversationId, handle: &RecordHandle) {
        let mut map = self.inner.lock().await;
        if map.get(id).is_some_and(|live| Arc::ptr_eq(live, handle)) {
            map.remove(id);
        }
    }

    /// Number of live conversations.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::state::StateTag;

    #[tokio::test]
    async fn entry_creates_initial_record() {
        let store = ConversationStore::new();
        let id = ConversationId::new("a");
        let handle = store.entry(&id).await;
        assert_eq!(handle.lock().await.state, StateTag::ModeSelect);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn entry_is_stable_across_calls() {
        let store = ConversationStore::new();
        let id = ConversationId::new("a");
        let first = store.entry(&id).await;
        let second = store.entry(&id).await;
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn distinct_ids_get_distinct_records() {
        let store = ConversationStore::new();
        let a = store.entry(&ConversationId::new("a")).await;
        let b = store.entry(&ConversationId::new("b")).await;
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn prune_removes_only_the_matching_handle() {
        let store = ConversationStore::new();
        let id = ConversationId::new("a");
        let stale = store.entry(&id).await;
        store.prune(&id, &stale).await;
        assert!(store.is_empty().await);

        // A pruned handle cannot remove a successor entry.
        let fresh = store.entry(&id).await;
        store.prune(&id, &stale).await;
        assert!(store.is_current(&id, &fresh).await);
    }

    #[tokio::test]
    async fn snapshot_reflects_mutations() {
        let store = ConversationStore::new();
        let id = ConversationId::new("a");
        let handle = store.entry(&id).await;
        handle.lock().await.advance_to(StateTag::CollectAge);
        let snap = store.snapshot(&id).await.unwrap();
        assert_eq!(snap.state, StateTag::CollectAge);
        assert!(store.snapshot(&ConversationId::new("b")).await.is_none());
    }
}
