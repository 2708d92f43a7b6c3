//! Messaging gateway seam.
//!
//! The chat transport lives outside the core. The core receives
//! [`InboundEvent`]s from a [`MessagingGateway`] and calls back into it to
//! deliver replies, notifications, QR codes and selectable controls.

pub mod console;
pub mod mock;
pub mod traits;

pub use console::ConsoleGateway;
pub use mock::MockGateway;
pub use traits::{
    ActionEvent, ChatContext, ChatId, ChatKind, Choice, GatewayError, GatewayResult,
    InboundEvent, InboundMessage, MessageContent, MessageId, MessagingGateway, Sender, UserId,
};
