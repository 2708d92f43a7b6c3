//! Inbound content moderation.
//!
//! Text and captions go through the keyword and URL filter, images through
//! the color heuristic. A flagged message is deleted when the bot can
//! confirm it is allowed to, and a bilingual warning is posted either way.
//! Nothing here returns an error to the dispatcher.

pub mod filter;
pub mod image;

use tracing::{info, warn};

use crate::bot::messages;
use crate::gateway::traits::{ChatKind, InboundMessage, MessageContent, MessagingGateway};

pub use filter::{ContentFilter, FlagReason};
pub use image::ImageThresholds;

/// Which part of the message tripped the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlaggedPart {
    Text,
    Caption,
    Image,
}

impl FlaggedPart {
    fn label(self) -> &'static str {
        match self {
            FlaggedPart::Text => "text",
            FlaggedPart::Caption => "image caption",
            FlaggedPart::Image => "image content",
        }
    }
}

/// What moderation did with a flagged message.
#[derive(Debug, Clone, PartialEq)]
pub struct ModerationOutcome {
    pub part: FlaggedPart,
    pub reason: FlagReason,
    pub deleted: bool,
    pub warned: bool,
}

#[derive(Clone)]
pub struct Moderator<G: MessagingGateway> {
    gateway: G,
    filter: ContentFilter,
    enabled: bool,
}

impl<G: MessagingGateway> Moderator<G> {
    pub fn new(gateway: G, filter: ContentFilter, enabled: bool) -> Self {
        Self {
            gateway,
            filter,
            enabled,
        }
    }

    /// Flagged part of `message`, if any.
    pub fn inspect(&self, message: &InboundMessage) -> Option<(FlaggedPart, FlagReason)> {
        match &message.content {
            MessageContent::Text(text) => self
                .filter
                .check_text(text)
                .map(|reason| (FlaggedPart::Text, reason)),
            MessageContent::Photo { data, caption } => caption
                .as_deref()
                .and_then(|c| self.filter.check_text(c))
                .map(|reason| (FlaggedPart::Caption, reason))
                .or_else(|| {
                    self.filter
                        .check_image(data)
                        .map(|reason| (FlaggedPart::Image, reason))
                }),
        }
    }

    /// Screen one message. `None` when it is clean or moderation is off.
    pub async fn screen(&self, message: &InboundMessage) -> Option<ModerationOutcome> {
        if !self.enabled {
            return None;
        }
        let (part, reason) = self.inspect(message)?;

        let deleted = self.try_delete(message).await;
        let warned = match self
            .gateway
            .send_text(message.chat.id, &messages::moderation_warning(part.label()))
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!(chat = %message.chat.id, error = %e, "Failed to post moderation warning");
                false
            }
        };

        info!(
            user = %message.sender.user,
            chat = %message.chat.id,
            part = part.label(),
            reason = ?reason,
            deleted,
            "Blocked prohibited content"
        );

        Some(ModerationOutcome {
            part,
            reason,
            deleted,
            warned,
        })
    }

    /// Delete only in groups where the permission probe says yes.
    async fn try_delete(&self, message: &InboundMessage) -> bool {
        if message.chat.kind != ChatKind::Group {
            return false;
        }
        match self.gateway.can_delete_messages(message.chat.id).await {
            Ok(true) => {}
            Ok(false) => {
                info!(chat = %message.chat.id, "No permission to delete messages here");
                return false;
            }
            Err(e) => {
                warn!(chat = %message.chat.id, error = %e, "Delete permission probe failed");
                return false;
            }
        }
        match self.gateway.delete_message(message.chat.id, message.id).await {
            Ok(()) => true,
            Err(e) => {
                warn!(chat = %message.chat.id, error = %e, "Couldn't delete prohibited message");
                false
            }
        }
    }
}
