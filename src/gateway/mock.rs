//! Mock Gateway for Testing
//!
//! Records every outbound call and lets tests inject inbound events,
//! per-destination delivery failures and delete permissions.

use super::traits::*;
use crate::qr::RenderedQr;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Mock messaging gateway
#[derive(Clone, Default)]
pub struct MockGateway {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    sent: Vec<SentMessage>,
    incoming: Vec<InboundEvent>,
    failing: HashSet<ChatId>,
    deletable: HashSet<ChatId>,
    permission_probe_fails: bool,
    delete_fails: bool,
    deleted: Vec<(ChatId, MessageId)>,
    next_send_delay: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub chat: ChatId,
    pub kind: SentKind,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentKind {
    Text,
    Qr { payload: String },
    Choices(Vec<Choice>),
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue an inbound event for `receive_events`
    pub fn push_event(&self, event: InboundEvent) {
        self.state().incoming.push(event);
    }

    /// Make every send to `chat` fail with a network error
    pub fn fail_destination(&self, chat: ChatId) {
        self.state().failing.insert(chat);
    }

    /// Grant delete permission in `chat`
    pub fn allow_delete(&self, chat: ChatId) {
        self.state().deletable.insert(chat);
    }

    /// Make the permission probe itself error out
    pub fn fail_permission_probe(&self) {
        self.state().permission_probe_fails = true;
    }

    /// Stall the next outbound send by `delay` (a slow transport)
    pub fn delay_next_send(&self, delay: Duration) {
        self.state().next_send_delay = Some(delay);
    }

    /// Make deletions fail even when permitted
    pub fn fail_deletes(&self) {
        self.state().delete_fails = true;
    }

    /// All outbound messages, in send order
    pub fn sent_messages(&self) -> Vec<SentMessage> {
        self.state().sent.clone()
    }

    /// Outbound messages delivered to one chat
    pub fn sent_to(&self, chat: ChatId) -> Vec<SentMessage> {
        self.state()
            .sent
            .iter()
            .filter(|m| m.chat == chat)
            .cloned()
            .collect()
    }

    pub fn deleted_messages(&self) -> Vec<(ChatId, MessageId)> {
        self.state().deleted.clone()
    }

    /// Clear recorded traffic (failure settings are kept)
    pub fn clear_sent(&self) {
        self.state().sent.clear();
    }

    async fn record(&self, chat: ChatId, kind: SentKind, text: &str) -> GatewayResult<()> {
        let delay = self.state().next_send_delay.take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        if state.failing.contains(&chat) {
            return Err(GatewayError::Network(format!("unreachable chat {}", chat)));
        }
        state.sent.push(SentMessage {
            chat,
            kind,
            text: text.to_string(),
        });
        Ok(())
    }
}

#[async_trait]
impl MessagingGateway for MockGateway {
    async fn send_text(&self, chat: ChatId, text: &str) -> GatewayResult<()> {
        self.record(chat, SentKind::Text, text).await
    }

    async fn send_qr(&self, chat: ChatId, qr: &RenderedQr, caption: &str) -> GatewayResult<()> {
        self.record(
            chat,
            SentKind::Qr {
                payload: qr.payload.clone(),
            },
            caption,
        )
        .await
    }

    async fn send_choices(
        &self,
        chat: ChatId,
        text: &str,
        choices: &[Choice],
    ) -> GatewayResult<()> {
        self.record(chat, SentKind::Choices(choices.to_vec()), text)
            .await
    }

    async fn can_delete_messages(&self, chat: ChatId) -> GatewayResult<bool> {
        let state = self.state();
        if state.permission_probe_fails {
            return Err(GatewayError::Network("permission probe failed".to_string()));
        }
        Ok(state.deletable.contains(&chat))
    }

    async fn delete_message(&self, chat: ChatId, message: MessageId) -> GatewayResult<()> {
        let mut state = self.state();
        if state.delete_fails {
            return Err(GatewayError::Rejected(
                "message can't be deleted for everyone".to_string(),
            ));
        }
        state.deleted.push((chat, message));
        Ok(())
    }

    async fn receive_events(&self) -> GatewayResult<Vec<InboundEvent>> {
        Ok(self.state().incoming.drain(..).collect())
    }
}
