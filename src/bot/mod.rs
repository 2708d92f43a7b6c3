//! Conversation layer: commands, sessions, templates, fanout and the
//! dispatcher that ties them to a messaging gateway.

pub mod command;
pub mod dispatcher;
pub mod fanout;
pub mod messages;
pub mod session;

pub use dispatcher::{BotSettings, QueueBot, DEFAULT_POLL_INTERVAL};
pub use fanout::{FanoutReport, NotificationFanout, ReadyOutcome, TicketEvent};
pub use session::{Phase, Session, SessionKey, SessionStore};

use crate::directory::DirectoryError;
use crate::gateway::traits::GatewayError;
use crate::queue::RegistryError;

/// Result type for event handling
pub type BotResult<T> = Result<T, BotError>;

/// Failures that escape a handler. The dispatcher logs them and answers
/// with a generic notice.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),
}
