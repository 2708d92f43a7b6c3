//! Per-conversation dialogue state.
//!
//! Sessions live in an explicit store keyed by user and chat, independent
//! of the gateway. A dialogue started in one chat never captures the same
//! user's messages elsewhere. A missing entry is the same as an idle session.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::gateway::traits::{ChatId, UserId};
use crate::queue::ticket::QueueNumber;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    AwaitingPlate,
}

/// Dialogue state for one user.
///
/// While awaiting a plate, `pending` holds the customer's Pending ticket.
/// A staff registration has no ticket yet, so `pending` is `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    pub phase: Phase,
    pub pending: Option<QueueNumber>,
}

impl Session {
    pub fn awaiting_customer_plate(queue_number: QueueNumber) -> Self {
        Self {
            phase: Phase::AwaitingPlate,
            pending: Some(queue_number),
        }
    }

    pub fn awaiting_staff_plate() -> Self {
        Self {
            phase: Phase::AwaitingPlate,
            pending: None,
        }
    }

    pub fn is_awaiting_plate(&self) -> bool {
        self.phase == Phase::AwaitingPlate
    }
}

/// One user in one chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub user: UserId,
    pub chat: ChatId,
}

impl SessionKey {
    pub fn new(user: UserId, chat: ChatId) -> Self {
        Self { user, chat }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<SessionKey, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user: UserId, chat: ChatId) -> Session {
        self.sessions
            .lock()
            .await
            .get(&SessionKey::new(user, chat))
            .cloned()
            .unwrap_or_default()
    }

    pub async fn set(&self, user: UserId, chat: ChatId, session: Session) {
        let key = SessionKey::new(user, chat);
        let mut sessions = self.sessions.lock().await;
        if session.phase == Phase::Idle {
            sessions.remove(&key);
        } else {
            sessions.insert(key, session);
        }
    }

    /// Back to Idle. Returns the session that was cleared.
    pub async fn clear(&self, user: UserId, chat: ChatId) -> Session {
        self.sessions
            .lock()
            .await
            .remove(&SessionKey::new(user, chat))
            .unwrap_or_default()
    }

    /// Number of conversations currently mid-dialogue.
    pub async fn active(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_user_is_idle() {
        let store = SessionStore::new();
        assert_eq!(store.get(UserId(1), ChatId(1)).await, Session::default());
        assert!(!store.get(UserId(1), ChatId(1)).await.is_awaiting_plate());
    }

    #[tokio::test]
    async fn test_sessions_are_per_user() {
        let store = SessionStore::new();
        store
            .set(
                UserId(1),
                ChatId(1),
                Session::awaiting_customer_plate(QueueNumber::new("20240101-001")),
            )
            .await;
        store
            .set(UserId(2), ChatId(2), Session::awaiting_staff_plate())
            .await;

        assert_eq!(
            store.get(UserId(1), ChatId(1)).await.pending,
            Some(QueueNumber::new("20240101-001"))
        );
        assert_eq!(store.get(UserId(2), ChatId(2)).await.pending, None);
        assert!(store.get(UserId(2), ChatId(2)).await.is_awaiting_plate());
        assert_eq!(store.active().await, 2);
    }

    #[tokio::test]
    async fn test_clear_and_idle_set_drop_entry() {
        let store = SessionStore::new();
        store
            .set(UserId(1), ChatId(1), Session::awaiting_staff_plate())
            .await;
        let cleared = store.clear(UserId(1), ChatId(1)).await;
        assert!(cleared.is_awaiting_plate());
        assert_eq!(store.active().await, 0);

        store
            .set(UserId(1), ChatId(1), Session::awaiting_staff_plate())
            .await;
        store.set(UserId(1), ChatId(1), Session::default()).await;
        assert_eq!(store.active().await, 0);
    }

    #[tokio::test]
    async fn test_sessions_are_per_chat() {
        let store = SessionStore::new();
        store
            .set(UserId(1), ChatId(1), Session::awaiting_staff_plate())
            .await;

        assert!(store.get(UserId(1), ChatId(1)).await.is_awaiting_plate());
        assert!(!store.get(UserId(1), ChatId(-900)).await.is_awaiting_plate());

        store.clear(UserId(1), ChatId(-900)).await;
        assert!(store.get(UserId(1), ChatId(1)).await.is_awaiting_plate());
    }
}
