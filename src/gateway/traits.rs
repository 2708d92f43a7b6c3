//! Messaging Gateway Trait Abstractions
//!
//! The queue engine never talks to a chat transport directly. It consumes
//! inbound events from a [`MessagingGateway`] and calls back into it to send
//! replies and notifications. Tests swap in `MockGateway`.

use async_trait::async_trait;
use std::fmt;

use crate::qr::RenderedQr;

/// Identity of a person talking to the bot (staff or customer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub i64);

impl UserId {
    /// The private chat with this user.
    pub fn direct_chat(self) -> ChatId {
        ChatId(self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A delivery destination: a private chat or a broadcast group.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transport-assigned identifier of an inbound message (used for deletion).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(pub i64);

/// Kind of chat a message arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatKind {
    /// 1-on-1 conversation with the bot
    Private,
    /// Group or supergroup the bot belongs to
    Group,
}

/// Who sent an inbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub user: UserId,
    pub display_name: String,
}

/// Where an inbound event happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatContext {
    pub id: ChatId,
    pub kind: ChatKind,
}

/// Inbound message body.
#[derive(Debug, Clone)]
pub enum MessageContent {
    Text(String),
    Photo {
        data: Vec<u8>,
        caption: Option<String>,
    },
}

/// Inbound message.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub id: MessageId,
    pub sender: Sender,
    pub chat: ChatContext,
    pub content: MessageContent,
}

/// A selectable control was pressed (e.g. the per-ticket "notify ready" button).
#[derive(Debug, Clone)]
pub struct ActionEvent {
    pub sender: Sender,
    pub chat: ChatContext,
    pub payload: String,
}

/// Everything the gateway can hand to the bot.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Message(InboundMessage),
    Action(ActionEvent),
}

impl InboundEvent {
    pub fn sender(&self) -> &Sender {
        match self {
            InboundEvent::Message(m) => &m.sender,
            InboundEvent::Action(a) => &a.sender,
        }
    }

    pub fn chat(&self) -> ChatContext {
        match self {
            InboundEvent::Message(m) => m.chat,
            InboundEvent::Action(a) => a.chat,
        }
    }
}

/// One selectable option attached to an outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    pub payload: String,
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Gateway errors
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Chat not found: {0}")]
    ChatNotFound(ChatId),

    #[error("Rejected by transport: {0}")]
    Rejected(String),

    #[error("Not supported by this gateway: {0}")]
    Unsupported(String),
}

/// Messaging gateway abstraction
///
/// Implementations must be cheap to clone and safe to share across the
/// per-event tasks spawned by the dispatcher.
#[async_trait]
pub trait MessagingGateway: Clone + Send + Sync + 'static {
    /// Send a text message to a chat
    async fn send_text(&self, chat: ChatId, text: &str) -> GatewayResult<()>;

    /// Send a rendered QR code with a caption
    async fn send_qr(&self, chat: ChatId, qr: &RenderedQr, caption: &str) -> GatewayResult<()>;

    /// Send a message with selectable controls attached
    async fn send_choices(&self, chat: ChatId, text: &str, choices: &[Choice])
        -> GatewayResult<()>;

    /// Whether the bot may delete other members' messages in this chat
    async fn can_delete_messages(&self, chat: ChatId) -> GatewayResult<bool>;

    /// Delete a message
    async fn delete_message(&self, chat: ChatId, message: MessageId) -> GatewayResult<()>;

    /// Receive pending inbound events (empty when nothing arrived)
    async fn receive_events(&self) -> GatewayResult<Vec<InboundEvent>>;
}
