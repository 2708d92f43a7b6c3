//! Queue Bot
//!
//! Routes inbound events by identity (staff or customer), drives the
//! per-user registration dialogue and hands state changes to the fanout.
//! Validation and authorization failures become replies; anything else
//! surfaces as a [`BotError`] that the run loop logs and answers with a
//! generic notice.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::command::{parse_action, parse_command, Action, Command};
use super::fanout::{NotificationFanout, ReadyOutcome, TicketEvent};
use super::messages::{self, Templates, MAX_MESSAGE_CHARS};
use super::session::{Session, SessionStore};
use super::{BotError, BotResult};
use crate::directory::{AdminDirectory, DirectoryError, GroupDirectory};
use crate::gateway::traits::{
    ActionEvent, ChatContext, ChatId, ChatKind, Choice, InboundEvent, InboundMessage,
    MessageContent, MessagingGateway, Sender, UserId,
};
use crate::moderation::{ContentFilter, Moderator};
use crate::qr::{deep_link, QrRenderer, TerminalQrRenderer};
use crate::queue::{
    Plate, QueueIdGenerator, QueueNumber, RegistryError, Ticket, TicketRegistry, TicketStatus,
};

/// Default gateway polling interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Runtime settings for [`QueueBot`].
#[derive(Clone)]
pub struct BotSettings {
    /// Deep-link base, e.g. `https://t.me/speedwash_bot`
    pub deep_link_base: String,
    pub business_name: String,
    pub moderation_enabled: bool,
    pub filter: ContentFilter,
    pub renderer: Arc<dyn QrRenderer>,
    pub poll_interval: Duration,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            deep_link_base: "https://t.me/speedwash_bot".to_string(),
            business_name: "Speed Car Wash".to_string(),
            moderation_enabled: true,
            filter: ContentFilter::default(),
            renderer: Arc::new(TerminalQrRenderer),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// What opening a deep link did to the ticket.
enum LinkResult {
    /// Registered -> Waiting, customer bound
    Linked,
    /// Already Waiting, customer rebound
    Rebound,
    /// Already Ready, customer rebound
    Finished,
}

#[derive(Clone)]
pub struct QueueBot<G: MessagingGateway> {
    gateway: G,
    registry: TicketRegistry,
    ids: QueueIdGenerator,
    admins: AdminDirectory,
    groups: GroupDirectory,
    sessions: SessionStore,
    fanout: NotificationFanout<G>,
    moderator: Moderator<G>,
    templates: Templates,
    deep_link_base: String,
    poll_interval: Duration,
}

impl<G: MessagingGateway> QueueBot<G> {
    pub fn new(
        gateway: G,
        registry: TicketRegistry,
        ids: QueueIdGenerator,
        admins: AdminDirectory,
        groups: GroupDirectory,
        settings: BotSettings,
    ) -> Self {
        let fanout = NotificationFanout::new(
            gateway.clone(),
            registry.clone(),
            admins.clone(),
            groups.clone(),
            settings.renderer,
        );
        let moderator = Moderator::new(
            gateway.clone(),
            settings.filter,
            settings.moderation_enabled,
        );
        Self {
            gateway,
            registry,
            ids,
            admins,
            groups,
            sessions: SessionStore::new(),
            fanout,
            moderator,
            templates: Templates::new(settings.business_name),
            deep_link_base: settings.deep_link_base,
            poll_interval: settings.poll_interval,
        }
    }

    pub fn registry(&self) -> &TicketRegistry {
        &self.registry
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn admins(&self) -> &AdminDirectory {
        &self.admins
    }

    pub fn groups(&self) -> &GroupDirectory {
        &self.groups
    }

    /// Run the event loop.
    ///
    /// Polls the gateway and spawns one task per sender for each batch, so
    /// different users are served concurrently. A sender's batch waits for
    /// that sender's previous batch, so one user's events keep their order
    /// across polls. Never returns; the caller cancels it.
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(self.poll_interval);
        let mut in_flight: HashMap<UserId, JoinHandle<()>> = HashMap::new();
        info!(interval = ?self.poll_interval, "Queue bot running");

        loop {
            interval.tick().await;
            in_flight.retain(|_, task| !task.is_finished());

            let events = match self.gateway.receive_events().await {
                Ok(events) => events,
                Err(e) => {
                    warn!("Error receiving events, will retry: {}", e);
                    continue;
                }
            };

            let mut by_sender: HashMap<UserId, Vec<InboundEvent>> = HashMap::new();
            for event in events {
                by_sender
                    .entry(event.sender().user)
                    .or_default()
                    .push(event);
            }

            for (user, batch) in by_sender {
                let previous = in_flight.remove(&user);
                let bot = self.clone();
                let task = tokio::spawn(async move {
                    if let Some(previous) = previous {
                        if let Err(e) = previous.await {
                            warn!(user = %user, error = %e, "Previous event batch failed");
                        }
                    }
                    for event in batch {
                        bot.dispatch(event).await;
                    }
                });
                in_flight.insert(user, task);
            }
        }
    }

    /// Handle one event, turning any failure into a logged error and a
    /// generic reply. Never fails.
    pub async fn dispatch(&self, event: InboundEvent) {
        let sender = event.sender().user;
        let chat = event.chat().id;
        if let Err(e) = self.handle_event(event).await {
            warn!(user = %sender, chat = %chat, error = %e, "Error handling event");
            if let Err(e) = self.gateway.send_text(chat, &messages::internal_error()).await {
                warn!(chat = %chat, error = %e, "Failed to send error notice");
            }
        }
    }

    pub async fn handle_event(&self, event: InboundEvent) -> BotResult<()> {
        match event {
            InboundEvent::Message(message) => self.handle_message(message).await,
            InboundEvent::Action(action) => self.handle_action(action).await,
        }
    }

    async fn handle_message(&self, message: InboundMessage) -> BotResult<()> {
        if let MessageContent::Text(text) = &message.content {
            if let Some(command) = parse_command(text) {
                return self.handle_command(command, &message).await;
            }

            let session = self
                .sessions
                .get(message.sender.user, message.chat.id)
                .await;
            if session.is_awaiting_plate() {
                return self.handle_plate(text, session, &message).await;
            }
        }

        self.moderator.screen(&message).await;
        Ok(())
    }

    async fn handle_command(&self, command: Command, message: &InboundMessage) -> BotResult<()> {
        let sender = &message.sender;
        let chat = message.chat;
        let is_admin = self.admins.is_admin(sender.user).await;

        if command.requires_admin() && !is_admin {
            info!(user = %sender.user, command = ?command, "Unauthorized command");
            return self.reply(chat.id, &messages::unauthorized()).await;
        }

        match command {
            Command::Start { .. } if is_admin => {
                self.reply(chat.id, &self.templates.staff_panel()).await
            }
            Command::Start { token } => self.start(token, sender, chat).await,
            Command::Register => {
                self.sessions
                    .set(sender.user, chat.id, Session::awaiting_staff_plate())
                    .await;
                self.reply(chat.id, &messages::staff_plate_prompt()).await
            }
            Command::Cancel => {
                let cleared = self.sessions.clear(sender.user, chat.id).await;
                if let Some(pending) = cleared.pending {
                    debug!(queue_number = %pending, "Registration cancelled, ticket left for eviction");
                }
                self.reply(chat.id, &messages::cancelled()).await
            }
            Command::Ready => self.list_ready_choices(chat.id).await,
            Command::Status { ticket } => self.status(ticket, sender.user, is_admin, chat.id).await,
            Command::Help => self.reply(chat.id, &self.templates.help(is_admin)).await,
            Command::AddAdmin { ids } if ids.is_empty() => {
                self.reply(chat.id, &messages::usage("/addadmin <user_id> [user_id...]"))
                    .await
            }
            Command::AddAdmin { ids } => {
                let text = match self.admins.add_many(sender.user, &ids).await {
                    Ok(report) => messages::add_report(&report, "admins"),
                    Err(e) => directory_reply(&e),
                };
                self.reply(chat.id, &text).await
            }
            Command::RemoveAdmin { ids } if ids.is_empty() => {
                self.reply(chat.id, &messages::usage("/removeadmin <user_id> [user_id...]"))
                    .await
            }
            Command::RemoveAdmin { ids } => {
                let text = match self.admins.remove_many(sender.user, &ids).await {
                    Ok(report) => messages::remove_report(&report, "admins"),
                    Err(e) => directory_reply(&e),
                };
                self.reply(chat.id, &text).await
            }
            Command::ListAdmins => {
                let text = match self.admins.list(sender.user).await {
                    Ok(ids) => {
                        messages::id_list("Current admins", &ids, "No admins are currently set.")
                    }
                    Err(e) => directory_reply(&e),
                };
                self.reply(chat.id, &text).await
            }
            Command::AddGroups { ids } if ids.is_empty() => {
                self.reply(chat.id, &messages::usage("/addgroups <group_id> [group_id...]"))
                    .await
            }
            Command::AddGroups { ids } => {
                let text = match self.groups.add_many(sender.user, &ids).await {
                    Ok(report) => messages::add_report(&report, "groups"),
                    Err(e) => directory_reply(&e),
                };
                self.reply(chat.id, &text).await
            }
            Command::RemoveGroup { id: None } => {
                self.reply(chat.id, &messages::usage("/removegroup <group_id>"))
                    .await
            }
            Command::RemoveGroup { id: Some(id) } => {
                let text = match self.groups.remove(sender.user, &id).await {
                    Ok(report) => messages::remove_report(&report, "groups"),
                    Err(e) => directory_reply(&e),
                };
                self.reply(chat.id, &text).await
            }
            Command::ListGroups => {
                let text = match self.groups.list(sender.user).await {
                    Ok(ids) => messages::id_list(
                        "Notification groups",
                        &ids,
                        "No notification groups are currently set.",
                    ),
                    Err(e) => directory_reply(&e),
                };
                self.reply(chat.id, &text).await
            }
            Command::Unknown(text) => {
                debug!(user = %sender.user, command = %text, "Unknown command");
                if chat.kind == ChatKind::Private {
                    self.reply(chat.id, &messages::unknown_command()).await
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Customer `/start`, with or without a deep-link token.
    async fn start(&self, token: Option<String>, sender: &Sender, chat: ChatContext) -> BotResult<()> {
        if let Some(token) = token {
            match self.open_deep_link(&token, sender, chat).await {
                Ok(()) => return Ok(()),
                Err(BotError::Registry(RegistryError::NotFound(_))) => {
                    debug!(token = %token, "Unknown deep link, starting fresh registration");
                }
                Err(e) => return Err(e),
            }
        }

        let session = self.sessions.get(sender.user, chat.id).await;
        if let Some(pending) = &session.pending {
            let still_pending = self
                .registry
                .get(pending.as_str())
                .await
                .is_some_and(|t| t.status == TicketStatus::Pending);
            if still_pending {
                return self.reply(chat.id, &self.templates.welcome()).await;
            }
        }

        let queue_number = self.ids.next();
        self.registry
            .create(Ticket::pending(
                queue_number.clone(),
                sender.user.direct_chat(),
                Utc::now(),
            ))
            .await?;
        info!(queue_number = %queue_number, user = %sender.user, "Customer registration started");

        self.sessions
            .set(
                sender.user,
                chat.id,
                Session::awaiting_customer_plate(queue_number),
            )
            .await;
        self.reply(chat.id, &self.templates.welcome()).await
    }

    /// Bind the customer to the ticket named by a deep link.
    ///
    /// A Pending ticket is never a deep-link target and reads as not found.
    async fn open_deep_link(&self, token: &str, sender: &Sender, chat: ChatContext) -> BotResult<()> {
        let name = sender.display_name.clone();
        let customer = sender.user.direct_chat();
        let (ticket, result) = self
            .registry
            .update(token, |ticket| {
                let result = match ticket.status {
                    TicketStatus::Pending => {
                        return Err(RegistryError::NotFound(ticket.queue_number.to_string()))
                    }
                    TicketStatus::Registered => {
                        ticket.status = TicketStatus::Waiting;
                        LinkResult::Linked
                    }
                    TicketStatus::Waiting => LinkResult::Rebound,
                    TicketStatus::Ready => LinkResult::Finished,
                };
                ticket.customer_ref = Some(customer);
                ticket.customer_name = Some(name);
                Ok(result)
            })
            .await?;

        // A half-finished /start is abandoned in favor of the linked ticket.
        self.sessions.clear(sender.user, chat.id).await;

        match result {
            LinkResult::Linked => {
                info!(queue_number = %ticket.queue_number, user = %sender.user, "Customer linked via deep link");
                self.fanout.deliver(&TicketEvent::Linked, &ticket).await;
                Ok(())
            }
            LinkResult::Rebound => {
                self.reply(chat.id, &messages::customer_registered(&ticket))
                    .await
            }
            LinkResult::Finished => self.reply(chat.id, &messages::ticket_status(&ticket)).await,
        }
    }

    /// Plain text while awaiting a plate.
    async fn handle_plate(
        &self,
        text: &str,
        session: Session,
        message: &InboundMessage,
    ) -> BotResult<()> {
        let chat = message.chat.id;
        let plate = match Plate::parse(text) {
            Ok(plate) => plate,
            Err(e) => {
                debug!(user = %message.sender.user, error = %e, "Plate rejected");
                // Not a plate, so it is ordinary chat text and gets screened.
                if self.moderator.screen(message).await.is_some() {
                    return Ok(());
                }
                return self.reply(chat, &messages::invalid_plate()).await;
            }
        };

        match session.pending {
            Some(queue_number) => {
                self.customer_plate(queue_number, plate, message).await
            }
            None => self.staff_plate(plate, message).await,
        }
    }

    async fn staff_plate(&self, plate: Plate, message: &InboundMessage) -> BotResult<()> {
        let sender = &message.sender;
        let chat = message.chat.id;

        // Membership may have changed since /register.
        if !self.admins.is_admin(sender.user).await {
            self.sessions.clear(sender.user, chat).await;
            return self.reply(chat, &messages::unauthorized()).await;
        }

        let queue_number = self.ids.next();
        let ticket = Ticket::registered(queue_number.clone(), plate, chat, Utc::now());
        match self.registry.create(ticket.clone()).await {
            Ok(()) => {}
            Err(RegistryError::DuplicatePlate(plate)) => {
                info!(plate = %plate, "Duplicate plate from staff registration");
                return self.reply(chat, &messages::duplicate_plate()).await;
            }
            Err(e) => return Err(e.into()),
        }

        self.sessions.clear(sender.user, chat).await;
        info!(queue_number = %queue_number, plate = %ticket.plate_display(), staff = %sender.user, "Staff registered ticket");

        let event = TicketEvent::Registered {
            staff_name: sender.display_name.clone(),
            deep_link: deep_link(&self.deep_link_base, &queue_number),
        };
        self.fanout.deliver(&event, &ticket).await;
        Ok(())
    }

    async fn customer_plate(
        &self,
        queue_number: QueueNumber,
        plate: Plate,
        message: &InboundMessage,
    ) -> BotResult<()> {
        let sender = &message.sender;
        let chat = message.chat.id;
        let name = sender.display_name.clone();

        let result = self
            .registry
            .update(queue_number.as_str(), |ticket| {
                ticket.plate = Some(plate);
                ticket.status = TicketStatus::Waiting;
                ticket.customer_name = Some(name);
                ticket.customer_ref = Some(sender.user.direct_chat());
                Ok(())
            })
            .await;

        let ticket = match result {
            Ok((ticket, ())) => ticket,
            Err(RegistryError::DuplicatePlate(plate)) => {
                info!(plate = %plate, queue_number = %queue_number, "Duplicate plate from customer");
                return self.reply(chat, &messages::duplicate_plate()).await;
            }
            Err(RegistryError::NotFound(_)) | Err(RegistryError::InvalidTransition { .. }) => {
                info!(queue_number = %queue_number, "Pending ticket gone, resetting session");
                self.sessions.clear(sender.user, chat).await;
                return self.reply(chat, &messages::session_expired()).await;
            }
            Err(e) => return Err(e.into()),
        };

        self.sessions.clear(sender.user, chat).await;
        info!(queue_number = %queue_number, plate = %ticket.plate_display(), "Customer self-registered");
        self.fanout.deliver(&TicketEvent::SelfRegistered, &ticket).await;
        Ok(())
    }

    async fn list_ready_choices(&self, chat: ChatId) -> BotResult<()> {
        let waiting = self
            .registry
            .list(|t| t.status == TicketStatus::Waiting && t.customer_ref.is_some())
            .await;
        if waiting.is_empty() {
            return self.reply(chat, &messages::no_waiting_customers()).await;
        }

        let choices: Vec<Choice> = waiting
            .iter()
            .map(|ticket| Choice {
                label: messages::ready_choice_label(ticket),
                payload: Action::NotifyReady {
                    queue_number: ticket.queue_number.to_string(),
                }
                .payload(),
            })
            .collect();
        self.gateway
            .send_choices(chat, &messages::ready_prompt(), &choices)
            .await?;
        Ok(())
    }

    async fn status(
        &self,
        ticket: Option<String>,
        user: UserId,
        is_admin: bool,
        chat: ChatId,
    ) -> BotResult<()> {
        let own = Some(user.direct_chat());

        if let Some(queue_number) = ticket {
            let text = match self.registry.get(&queue_number).await {
                None => messages::ticket_not_found(),
                Some(ticket) if is_admin || ticket.customer_ref == own => {
                    messages::ticket_status(&ticket)
                }
                Some(_) => messages::not_your_ticket(),
            };
            return self.reply(chat, &text).await;
        }

        let tickets = self
            .registry
            .list(|t| is_admin || t.customer_ref == own)
            .await;
        if tickets.is_empty() {
            return self.reply(chat, &messages::no_tickets()).await;
        }

        let overview = messages::status_overview(&tickets, is_admin);
        for part in messages::split_message(&overview, MAX_MESSAGE_CHARS) {
            self.reply(chat, &part).await?;
        }
        Ok(())
    }

    async fn handle_action(&self, action: ActionEvent) -> BotResult<()> {
        let Some(parsed) = parse_action(&action.payload) else {
            debug!(payload = %action.payload, "Ignoring unknown action");
            return Ok(());
        };
        let chat = action.chat.id;

        match parsed {
            Action::NotifyReady { queue_number } => {
                if !self.admins.is_admin(action.sender.user).await {
                    info!(user = %action.sender.user, "Unauthorized ready action");
                    return self.reply(chat, &messages::unauthorized()).await;
                }

                match self
                    .fanout
                    .notify_ready(&queue_number, &action.sender.display_name)
                    .await
                {
                    Ok(ReadyOutcome::Notified { ticket, report }) => {
                        info!(
                            queue_number = %ticket.queue_number,
                            delivered = report.delivered.len(),
                            failed = report.failed.len(),
                            "Ready notice sent"
                        );
                        Ok(())
                    }
                    Ok(ReadyOutcome::AlreadyReady(ticket)) => {
                        self.reply(chat, &messages::already_ready(&ticket)).await
                    }
                    Err(RegistryError::NotFound(_))
                    | Err(RegistryError::InvalidTransition { .. }) => {
                        self.reply(chat, &messages::customer_not_found()).await
                    }
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    async fn reply(&self, chat: ChatId, text: &str) -> BotResult<()> {
        self.gateway.send_text(chat, text).await?;
        Ok(())
    }
}

fn directory_reply(error: &DirectoryError) -> String {
    match error {
        DirectoryError::Unauthorized => messages::unauthorized(),
        DirectoryError::LastAdmin => messages::last_admin(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::mock::{MockGateway, SentKind};
    use crate::gateway::traits::MessageId;
    use tempfile::TempDir;

    const STAFF: i64 = 10;

    async fn bot(dir: &TempDir) -> (MockGateway, QueueBot<MockGateway>) {
        let admins = AdminDirectory::load(dir.path().join("admins.json"), &[STAFF]).await;
        let groups =
            GroupDirectory::load(dir.path().join("groups.json"), &[-100], admins.clone()).await;
        let gateway = MockGateway::new();
        let bot = QueueBot::new(
            gateway.clone(),
            TicketRegistry::new(),
            QueueIdGenerator::new(),
            admins,
            groups,
            BotSettings::default(),
        );
        (gateway, bot)
    }

    fn text(user: i64, body: &str) -> InboundEvent {
        InboundEvent::Message(InboundMessage {
            id: MessageId(1),
            sender: Sender {
                user: UserId(user),
                display_name: format!("user {}", user),
            },
            chat: ChatContext {
                id: ChatId(user),
                kind: ChatKind::Private,
            },
            content: MessageContent::Text(body.to_string()),
        })
    }

    fn group_text(user: i64, chat: i64, body: &str) -> InboundEvent {
        InboundEvent::Message(InboundMessage {
            id: MessageId(2),
            sender: Sender {
                user: UserId(user),
                display_name: format!("user {}", user),
            },
            chat: ChatContext {
                id: ChatId(chat),
                kind: ChatKind::Group,
            },
            content: MessageContent::Text(body.to_string()),
        })
    }

    #[tokio::test]
    async fn test_customer_start_creates_pending_ticket() {
        let dir = TempDir::new().unwrap();
        let (_, bot) = bot(&dir).await;

        bot.handle_event(text(55, "/start")).await.unwrap();

        let session = bot.sessions().get(UserId(55), ChatId(55)).await;
        assert!(session.is_awaiting_plate());
        let pending = session.pending.unwrap();
        let ticket = bot.registry().get(pending.as_str()).await.unwrap();
        assert_eq!(ticket.status, TicketStatus::Pending);
        assert_eq!(ticket.customer_ref, Some(ChatId(55)));
    }

    #[tokio::test]
    async fn test_repeated_start_does_not_create_second_ticket() {
        let dir = TempDir::new().unwrap();
        let (_, bot) = bot(&dir).await;

        bot.handle_event(text(55, "/start")).await.unwrap();
        bot.handle_event(text(55, "/start")).await.unwrap();

        assert_eq!(bot.registry().len().await, 1);
    }

    #[tokio::test]
    async fn test_staff_start_shows_panel() {
        let dir = TempDir::new().unwrap();
        let (gateway, bot) = bot(&dir).await;

        bot.handle_event(text(STAFF, "/start")).await.unwrap();

        assert!(bot.registry().is_empty().await);
        assert!(gateway.sent_to(ChatId(STAFF))[0].text.contains("/register"));
    }

    #[tokio::test]
    async fn test_invalid_plate_keeps_session() {
        let dir = TempDir::new().unwrap();
        let (gateway, bot) = bot(&dir).await;

        bot.handle_event(text(55, "/start")).await.unwrap();
        gateway.clear_sent();
        bot.handle_event(text(55, "AB")).await.unwrap();

        assert!(bot.sessions().get(UserId(55), ChatId(55)).await.is_awaiting_plate());
        assert_eq!(gateway.sent_to(ChatId(55))[0].text, messages::invalid_plate());
        let tickets = bot.registry().list(|_| true).await;
        assert_eq!(tickets[0].status, TicketStatus::Pending);
        assert_eq!(tickets[0].plate, None);
    }

    #[tokio::test]
    async fn test_cancel_leaves_orphan_ticket() {
        let dir = TempDir::new().unwrap();
        let (_, bot) = bot(&dir).await;

        bot.handle_event(text(55, "/start")).await.unwrap();
        bot.handle_event(text(55, "/cancel")).await.unwrap();

        assert!(!bot.sessions().get(UserId(55), ChatId(55)).await.is_awaiting_plate());
        assert_eq!(bot.registry().len().await, 1);
    }

    #[tokio::test]
    async fn test_customer_cannot_register() {
        let dir = TempDir::new().unwrap();
        let (gateway, bot) = bot(&dir).await;

        bot.handle_event(text(55, "/register")).await.unwrap();

        assert_eq!(gateway.sent_to(ChatId(55))[0].text, messages::unauthorized());
        assert!(!bot.sessions().get(UserId(55), ChatId(55)).await.is_awaiting_plate());
    }

    #[tokio::test]
    async fn test_evicted_pending_ticket_resets_session() {
        let dir = TempDir::new().unwrap();
        let (gateway, bot) = bot(&dir).await;

        bot.handle_event(text(55, "/start")).await.unwrap();
        let pending = bot.sessions().get(UserId(55), ChatId(55)).await.pending.unwrap();
        bot.registry().delete(pending.as_str()).await;
        gateway.clear_sent();

        bot.handle_event(text(55, "ABC123")).await.unwrap();

        assert_eq!(gateway.sent_to(ChatId(55))[0].text, messages::session_expired());
        assert!(!bot.sessions().get(UserId(55), ChatId(55)).await.is_awaiting_plate());
    }

    #[tokio::test]
    async fn test_ready_lists_waiting_customers_as_choices() {
        let dir = TempDir::new().unwrap();
        let (gateway, bot) = bot(&dir).await;

        bot.handle_event(text(55, "/start")).await.unwrap();
        bot.handle_event(text(55, "QQQ-1")).await.unwrap();
        gateway.clear_sent();

        bot.handle_event(text(STAFF, "/ready")).await.unwrap();

        let sent = gateway.sent_to(ChatId(STAFF));
        let SentKind::Choices(choices) = &sent[0].kind else {
            panic!("expected choices");
        };
        assert_eq!(choices.len(), 1);
        assert!(choices[0].label.contains("QQQ-1"));
        assert!(choices[0].payload.starts_with("ready:"));
    }

    #[tokio::test]
    async fn test_ready_with_nobody_waiting() {
        let dir = TempDir::new().unwrap();
        let (gateway, bot) = bot(&dir).await;

        bot.handle_event(text(STAFF, "/ready")).await.unwrap();

        assert_eq!(
            gateway.sent_to(ChatId(STAFF))[0].text,
            messages::no_waiting_customers()
        );
    }

    #[tokio::test]
    async fn test_status_visibility() {
        let dir = TempDir::new().unwrap();
        let (gateway, bot) = bot(&dir).await;

        bot.handle_event(text(55, "/start")).await.unwrap();
        bot.handle_event(text(55, "OWN-1")).await.unwrap();
        let qn = bot.registry().list(|_| true).await[0].queue_number.clone();
        gateway.clear_sent();

        bot.handle_event(text(66, &format!("/status {}", qn))).await.unwrap();
        assert_eq!(gateway.sent_to(ChatId(66))[0].text, messages::not_your_ticket());

        bot.handle_event(text(66, "/status")).await.unwrap();
        assert_eq!(gateway.sent_to(ChatId(66))[1].text, messages::no_tickets());

        bot.handle_event(text(55, "/status")).await.unwrap();
        assert!(gateway.sent_to(ChatId(55))[0].text.contains("OWN-1"));

        bot.handle_event(text(STAFF, &format!("/status {}", qn))).await.unwrap();
        assert!(gateway.sent_to(ChatId(STAFF))[0].text.contains("OWN-1"));

        bot.handle_event(text(STAFF, "/status 19990101-999")).await.unwrap();
        assert_eq!(gateway.sent_to(ChatId(STAFF))[1].text, messages::ticket_not_found());
    }

    #[tokio::test]
    async fn test_unknown_deep_link_starts_fresh_registration() {
        let dir = TempDir::new().unwrap();
        let (_, bot) = bot(&dir).await;

        bot.handle_event(text(55, "/start 19990101-999")).await.unwrap();

        assert!(bot.sessions().get(UserId(55), ChatId(55)).await.is_awaiting_plate());
        assert_eq!(bot.registry().len().await, 1);
    }

    #[tokio::test]
    async fn test_idle_spam_is_moderated() {
        let dir = TempDir::new().unwrap();
        let (gateway, bot) = bot(&dir).await;

        bot.handle_event(text(55, "free crypto airdrop")).await.unwrap();

        assert!(gateway.sent_to(ChatId(55))[0].text.contains("WARNING"));
    }

    #[tokio::test]
    async fn test_dispatch_turns_errors_into_notice() {
        let dir = TempDir::new().unwrap();
        let (gateway, bot) = bot(&dir).await;
        gateway.fail_destination(ChatId(55));

        // The reply itself fails; dispatch must swallow it.
        bot.dispatch(text(55, "/help")).await;
        assert!(gateway.sent_to(ChatId(55)).is_empty());
    }

    #[tokio::test]
    async fn test_group_registration_binds_customer_direct_chat() {
        let dir = TempDir::new().unwrap();
        let (gateway, bot) = bot(&dir).await;

        bot.handle_event(group_text(55, -100, "/start")).await.unwrap();
        assert!(bot.sessions().get(UserId(55), ChatId(-100)).await.is_awaiting_plate());
        bot.handle_event(group_text(55, -100, "GRP-1")).await.unwrap();

        let ticket = bot.registry().list(|_| true).await.remove(0);
        assert_eq!(ticket.status, TicketStatus::Waiting);
        assert_eq!(ticket.customer_ref, Some(ChatId(55)));

        gateway.clear_sent();
        bot.handle_event(text(55, "/status")).await.unwrap();
        assert!(gateway.sent_to(ChatId(55))[0].text.contains("GRP-1"));
    }

    #[tokio::test]
    async fn test_run_keeps_sender_order_across_polls() {
        let dir = TempDir::new().unwrap();
        let admins = AdminDirectory::load(dir.path().join("admins.json"), &[STAFF]).await;
        let groups =
            GroupDirectory::load(dir.path().join("groups.json"), &[], admins.clone()).await;
        let gateway = MockGateway::new();
        let bot = QueueBot::new(
            gateway.clone(),
            TicketRegistry::new(),
            QueueIdGenerator::new(),
            admins,
            groups,
            BotSettings {
                poll_interval: Duration::from_millis(10),
                ..BotSettings::default()
            },
        );

        // The first reply stalls on the transport while the next event
        // arrives in a later poll.
        gateway.delay_next_send(Duration::from_millis(300));
        gateway.push_event(text(55, "/help"));
        let runner = tokio::spawn({
            let bot = bot.clone();
            async move { bot.run().await }
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        gateway.push_event(text(55, "/status"));

        for _ in 0..100 {
            if gateway.sent_to(ChatId(55)).len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        runner.abort();

        let sent = gateway.sent_to(ChatId(55));
        assert_eq!(sent.len(), 2);
        assert_ne!(sent[0].text, messages::no_tickets());
        assert_eq!(sent[1].text, messages::no_tickets());
    }
}
