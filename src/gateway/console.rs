//! Line-oriented console gateway for running the bot locally.
//!
//! Input lines on stdin:
//!
//! ```text
//! <user> <text>               text in the user's private chat
//! <user>@<chat> <text>        text in a group chat (negative chat id)
//! <user> !<payload>           press a selectable control, e.g. !ready:20240101-001
//! <user> photo <path> [cap]   send an image file with an optional caption
//! ```
//!
//! Outbound messages are printed to stdout.

use super::traits::*;
use crate::qr::RenderedQr;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

/// Console gateway
#[derive(Clone)]
pub struct ConsoleGateway {
    events: Arc<Mutex<mpsc::UnboundedReceiver<InboundEvent>>>,
}

/// One parsed input line, before any file I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ConsoleLine {
    Text {
        user: i64,
        chat: Option<i64>,
        text: String,
    },
    Action {
        user: i64,
        chat: Option<i64>,
        payload: String,
    },
    Photo {
        user: i64,
        chat: Option<i64>,
        path: PathBuf,
        caption: Option<String>,
    },
}

impl ConsoleGateway {
    /// Start reading stdin in a background task.
    pub fn spawn_stdin() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let next_id = AtomicI64::new(1);
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        debug!("Console input closed");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to read console input");
                        break;
                    }
                };

                let Some(parsed) = parse_line(&line) else {
                    if !line.trim().is_empty() {
                        println!("?? expected `<user>[@<chat>] <text>`");
                    }
                    continue;
                };

                let id = MessageId(next_id.fetch_add(1, Ordering::Relaxed));
                if let Some(event) = into_event(parsed, id).await {
                    if tx.send(event).is_err() {
                        break;
                    }
                }
            }
        });

        Self {
            events: Arc::new(Mutex::new(rx)),
        }
    }
}

fn parse_line(line: &str) -> Option<ConsoleLine> {
    let (who, rest) = line.trim().split_once(' ')?;
    let (user, chat) = match who.split_once('@') {
        Some((user, chat)) => (user.parse().ok()?, Some(chat.parse().ok()?)),
        None => (who.parse().ok()?, None),
    };
    let rest = rest.trim();
    if rest.is_empty() {
        return None;
    }

    if let Some(payload) = rest.strip_prefix('!') {
        return Some(ConsoleLine::Action {
            user,
            chat,
            payload: payload.to_string(),
        });
    }

    if let Some(args) = rest.strip_prefix("photo ") {
        let mut parts = args.trim().splitn(2, ' ');
        let path = PathBuf::from(parts.next()?);
        let caption = parts.next().map(|c| c.trim().to_string());
        return Some(ConsoleLine::Photo {
            user,
            chat,
            path,
            caption,
        });
    }

    Some(ConsoleLine::Text {
        user,
        chat,
        text: rest.to_string(),
    })
}

fn context(user: i64, chat: Option<i64>) -> (Sender, ChatContext) {
    let sender = Sender {
        user: UserId(user),
        display_name: format!("user {}", user),
    };
    let chat = match chat {
        Some(id) => ChatContext {
            id: ChatId(id),
            kind: ChatKind::Group,
        },
        None => ChatContext {
            id: ChatId(user),
            kind: ChatKind::Private,
        },
    };
    (sender, chat)
}

async fn into_event(line: ConsoleLine, id: MessageId) -> Option<InboundEvent> {
    match line {
        ConsoleLine::Text { user, chat, text } => {
            let (sender, chat) = context(user, chat);
            Some(InboundEvent::Message(InboundMessage {
                id,
                sender,
                chat,
                content: MessageContent::Text(text),
            }))
        }
        ConsoleLine::Action {
            user,
            chat,
            payload,
        } => {
            let (sender, chat) = context(user, chat);
            Some(InboundEvent::Action(ActionEvent {
                sender,
                chat,
                payload,
            }))
        }
        ConsoleLine::Photo {
            user,
            chat,
            path,
            caption,
        } => match tokio::fs::read(&path).await {
            Ok(data) => {
                let (sender, chat) = context(user, chat);
                Some(InboundEvent::Message(InboundMessage {
                    id,
                    sender,
                    chat,
                    content: MessageContent::Photo { data, caption },
                }))
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read photo");
                None
            }
        },
    }
}

#[async_trait]
impl MessagingGateway for ConsoleGateway {
    async fn send_text(&self, chat: ChatId, text: &str) -> GatewayResult<()> {
        println!("[to {}]\n{}\n", chat, text);
        Ok(())
    }

    async fn send_qr(&self, chat: ChatId, qr: &RenderedQr, caption: &str) -> GatewayResult<()> {
        println!("[to {}] QR for {}\n{}\n{}\n", chat, qr.payload, qr.art, caption);
        Ok(())
    }

    async fn send_choices(
        &self,
        chat: ChatId,
        text: &str,
        choices: &[Choice],
    ) -> GatewayResult<()> {
        println!("[to {}]\n{}", chat, text);
        for choice in choices {
            println!("  [{}] -> !{}", choice.label, choice.payload);
        }
        println!();
        Ok(())
    }

    async fn can_delete_messages(&self, _chat: ChatId) -> GatewayResult<bool> {
        Ok(false)
    }

    async fn delete_message(&self, _chat: ChatId, _message: MessageId) -> GatewayResult<()> {
        Err(GatewayError::Unsupported(
            "console cannot delete messages".to_string(),
        ))
    }

    async fn receive_events(&self) -> GatewayResult<Vec<InboundEvent>> {
        let mut rx = self.events.lock().await;
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_private_text() {
        assert_eq!(
            parse_line("42 /start"),
            Some(ConsoleLine::Text {
                user: 42,
                chat: None,
                text: "/start".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_group_text() {
        assert_eq!(
            parse_line("42@-100 hello there"),
            Some(ConsoleLine::Text {
                user: 42,
                chat: Some(-100),
                text: "hello there".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_action() {
        assert_eq!(
            parse_line("7 !ready:20240101-001"),
            Some(ConsoleLine::Action {
                user: 7,
                chat: None,
                payload: "ready:20240101-001".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_photo_with_caption() {
        assert_eq!(
            parse_line("7 photo /tmp/a.png free airdrop"),
            Some(ConsoleLine::Photo {
                user: 7,
                chat: None,
                path: PathBuf::from("/tmp/a.png"),
                caption: Some("free airdrop".to_string()),
            })
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_line("alice hello"), None);
        assert_eq!(parse_line("42"), None);
        assert_eq!(parse_line(""), None);
    }

    #[tokio::test]
    async fn test_into_event_private_chat_uses_user_id() {
        let event = into_event(
            ConsoleLine::Text {
                user: 5,
                chat: None,
                text: "hi".to_string(),
            },
            MessageId(1),
        )
        .await
        .unwrap();
        assert_eq!(event.chat().id, ChatId(5));
        assert_eq!(event.chat().kind, ChatKind::Private);
    }
}
