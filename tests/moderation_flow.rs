//! Moderation through the full dispatcher.
//!
//! Scenarios:
//! 1. Casino spam in a group where the bot may delete -> deleted + warned
//! 2. Same spam where the bot may not delete -> warned only
//! 3. Clean chatter -> untouched
//! 4. Red banner photo -> flagged by image content
//! 5. Moderation disabled -> spam passes
//! 6. Registration open in a private chat -> group spam still screened
//! 7. Spam typed while a plate is awaited -> screened, not re-prompted

use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use tempfile::TempDir;

use queuekeeper::bot::{BotSettings, QueueBot};
use queuekeeper::directory::{AdminDirectory, GroupDirectory};
use queuekeeper::gateway::mock::MockGateway;
use queuekeeper::gateway::traits::{
    ChatContext, ChatId, ChatKind, InboundEvent, InboundMessage, MessageContent, MessageId, Sender,
    UserId,
};
use queuekeeper::queue::{QueueIdGenerator, TicketRegistry};

const GROUP: ChatId = ChatId(-900);

async fn bot_with(dir: &TempDir, moderation_enabled: bool) -> (MockGateway, QueueBot<MockGateway>) {
    let admins = AdminDirectory::load(dir.path().join("admins.json"), &[1]).await;
    let groups = GroupDirectory::load(dir.path().join("groups.json"), &[], admins.clone()).await;
    let gateway = MockGateway::new();
    let settings = BotSettings {
        moderation_enabled,
        ..BotSettings::default()
    };
    let bot = QueueBot::new(
        gateway.clone(),
        TicketRegistry::new(),
        QueueIdGenerator::new(),
        admins,
        groups,
        settings,
    );
    (gateway, bot)
}

fn group_message(id: i64, content: MessageContent) -> InboundEvent {
    InboundEvent::Message(InboundMessage {
        id: MessageId(id),
        sender: Sender {
            user: UserId(42),
            display_name: "Stranger".to_string(),
        },
        chat: ChatContext {
            id: GROUP,
            kind: ChatKind::Group,
        },
        content,
    })
}

fn private_message(user: i64, body: &str) -> InboundEvent {
    InboundEvent::Message(InboundMessage {
        id: MessageId(1),
        sender: Sender {
            user: UserId(user),
            display_name: "Stranger".to_string(),
        },
        chat: ChatContext {
            id: ChatId(user),
            kind: ChatKind::Private,
        },
        content: text(body),
    })
}

fn text(value: &str) -> MessageContent {
    MessageContent::Text(value.to_string())
}

fn red_banner() -> Vec<u8> {
    let img = RgbImage::from_pixel(16, 16, Rgb([240, 10, 10]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

#[tokio::test]
async fn test_spam_deleted_and_warned_when_permitted() {
    let dir = TempDir::new().unwrap();
    let (gateway, bot) = bot_with(&dir, true).await;
    gateway.allow_delete(GROUP);

    bot.handle_event(group_message(11, text("Best CASINO bonus, join now")))
        .await
        .unwrap();

    assert_eq!(gateway.deleted_messages(), vec![(GROUP, MessageId(11))]);
    let warnings = gateway.sent_to(GROUP);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].text.contains("text"));
}

#[tokio::test]
async fn test_spam_warned_without_delete_permission() {
    let dir = TempDir::new().unwrap();
    let (gateway, bot) = bot_with(&dir, true).await;

    bot.handle_event(group_message(12, text("promo at www.example.com")))
        .await
        .unwrap();

    assert!(gateway.deleted_messages().is_empty());
    assert_eq!(gateway.sent_to(GROUP).len(), 1);
}

#[tokio::test]
async fn test_clean_message_untouched() {
    let dir = TempDir::new().unwrap();
    let (gateway, bot) = bot_with(&dir, true).await;
    gateway.allow_delete(GROUP);

    bot.handle_event(group_message(13, text("is the wash open today?")))
        .await
        .unwrap();

    assert!(gateway.deleted_messages().is_empty());
    assert!(gateway.sent_messages().is_empty());
}

#[tokio::test]
async fn test_red_banner_photo_flagged() {
    let dir = TempDir::new().unwrap();
    let (gateway, bot) = bot_with(&dir, true).await;
    gateway.allow_delete(GROUP);

    bot.handle_event(group_message(
        14,
        MessageContent::Photo {
            data: red_banner(),
            caption: Some("nice car".to_string()),
        },
    ))
    .await
    .unwrap();

    assert_eq!(gateway.deleted_messages(), vec![(GROUP, MessageId(14))]);
    assert!(gateway.sent_to(GROUP)[0].text.contains("image content"));
}

#[tokio::test]
async fn test_moderation_disabled_lets_spam_through() {
    let dir = TempDir::new().unwrap();
    let (gateway, bot) = bot_with(&dir, false).await;
    gateway.allow_delete(GROUP);

    bot.handle_event(group_message(15, text("casino casino casino")))
        .await
        .unwrap();

    assert!(gateway.deleted_messages().is_empty());
    assert!(gateway.sent_messages().is_empty());
}

#[tokio::test]
async fn test_private_registration_does_not_shield_group_spam() {
    let dir = TempDir::new().unwrap();
    let (gateway, bot) = bot_with(&dir, true).await;
    gateway.allow_delete(GROUP);

    bot.handle_event(private_message(42, "/start")).await.unwrap();
    bot.handle_event(group_message(16, text("casino www.scam.io")))
        .await
        .unwrap();

    assert_eq!(gateway.deleted_messages(), vec![(GROUP, MessageId(16))]);
    let replies = gateway.sent_to(GROUP);
    assert_eq!(replies.len(), 1);
    assert!(replies[0].text.contains("WARNING"));
    assert!(bot
        .sessions()
        .get(UserId(42), ChatId(42))
        .await
        .is_awaiting_plate());
}

#[tokio::test]
async fn test_spam_while_awaiting_plate_is_screened() {
    let dir = TempDir::new().unwrap();
    let (gateway, bot) = bot_with(&dir, true).await;
    gateway.allow_delete(GROUP);

    bot.handle_event(group_message(17, text("/start"))).await.unwrap();
    gateway.clear_sent();
    bot.handle_event(group_message(18, text("claim free airdrop now")))
        .await
        .unwrap();

    assert_eq!(gateway.deleted_messages(), vec![(GROUP, MessageId(18))]);
    let replies = gateway.sent_to(GROUP);
    assert_eq!(replies.len(), 1);
    assert!(replies[0].text.contains("WARNING"));
}
