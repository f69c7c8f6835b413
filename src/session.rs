//! Per-chat session slots.
//!
//! Each chat gets its own async mutex. Whoever processes an event for a chat
//! holds that chat's guard for the whole step, so events for one chat are handled
//! strictly one at a time while different chats never wait on each other.

use crate::dialog::state::Session;
use crate::transport::ChatId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

type Slot = Arc<Mutex<Option<Session>>>;

/// Exclusive access to one chat's session for the duration of an event.
pub type SessionGuard = OwnedMutexGuard<Option<Session>>;

#[derive(Default)]
pub struct SessionStore {
    slots: RwLock<HashMap<ChatId, Slot>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, chat: ChatId) -> Slot {
        if let Some(slot) = self.slots.read().await.get(&chat) {
            return slot.clone();
        }
        self.slots.write().await.entry(chat).or_default().clone()
    }

    /// Waits until no other event for `chat` is in progress.
    pub async fn lock(&self, chat: ChatId) -> SessionGuard {
        self.slot(chat).await.lock_owned().await
    }

    pub async fn get(&self, chat: ChatId) -> Option<Session> {
        self.lock(chat).await.clone()
    }

    pub async fn set(&self, chat: ChatId, session: Session) {
        *self.lock(chat).await = Some(session);
    }

    pub async fn delete(&self, chat: ChatId) {
        *self.lock(chat).await = None;
    }

    /// Number of chats with an active session. Slots busy with an event count as active.
    pub async fn len(&self) -> usize {
        self.slots
            .read()
            .await
            .values()
            .filter(|slot| slot.try_lock().map(|s| s.is_some()).unwrap_or(true))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drops slots that hold no session and are not in use. Returns how many were removed.
    pub async fn prune_idle(&self) -> usize {
        let mut slots = self.slots.write().await;
        let before = slots.len();
        slots.retain(|_, slot| {
            Arc::strong_count(slot) > 1 || slot.try_lock().map(|s| s.is_some()).unwrap_or(true)
        });
        before - slots.len()
    }
}
