//! Notification Fanout
//!
//! Delivers one ticket event to the customer, the staff destination and
//! every broadcast group. Each destination is attempted on its own; a failed
//! send is logged and never stops the others.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::messages;
use crate::directory::{AdminDirectory, GroupDirectory};
use crate::gateway::traits::{ChatId, MessagingGateway};
use crate::qr::{QrRenderer, RenderedQr};
use crate::queue::registry::{ReadyTransition, RegistryResult, TicketRegistry};
use crate::queue::ticket::Ticket;

/// Ticket state changes that produce notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketEvent {
    /// Staff registered a plate; the staff destination receives the QR
    Registered {
        staff_name: String,
        deep_link: String,
    },
    /// Customer supplied a plate after /start
    SelfRegistered,
    /// Customer opened a staff-issued deep link
    Linked,
    /// Vehicle ready for pickup
    Ready { staff_name: String },
}

impl TicketEvent {
    fn name(&self) -> &'static str {
        match self {
            TicketEvent::Registered { .. } => "registered",
            TicketEvent::SelfRegistered => "self_registered",
            TicketEvent::Linked => "linked",
            TicketEvent::Ready { .. } => "ready",
        }
    }
}

/// Per-destination delivery results of one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanoutReport {
    pub delivered: Vec<ChatId>,
    pub failed: Vec<ChatId>,
}

/// Result of a notify-ready request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadyOutcome {
    /// This call moved the ticket to Ready and ran the fanout
    Notified { ticket: Ticket, report: FanoutReport },
    /// The ticket was already Ready; nothing was sent
    AlreadyReady(Ticket),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Audience {
    Customer,
    Staff,
    Group,
}

enum Payload {
    Text(String),
    Qr { qr: RenderedQr, caption: String },
}

struct Delivery {
    chat: ChatId,
    audience: Audience,
    payload: Payload,
}

#[derive(Clone)]
pub struct NotificationFanout<G: MessagingGateway> {
    gateway: G,
    registry: TicketRegistry,
    admins: AdminDirectory,
    groups: GroupDirectory,
    renderer: Arc<dyn QrRenderer>,
}

impl<G: MessagingGateway> NotificationFanout<G> {
    pub fn new(
        gateway: G,
        registry: TicketRegistry,
        admins: AdminDirectory,
        groups: GroupDirectory,
        renderer: Arc<dyn QrRenderer>,
    ) -> Self {
        Self {
            gateway,
            registry,
            admins,
            groups,
            renderer,
        }
    }

    /// Send `event` for `ticket` to every destination.
    pub async fn deliver(&self, event: &TicketEvent, ticket: &Ticket) -> FanoutReport {
        let plan = self.plan(event, ticket).await;

        let sends = plan.iter().map(|delivery| async move {
            let result = match &delivery.payload {
                Payload::Text(text) => self.gateway.send_text(delivery.chat, text).await,
                Payload::Qr { qr, caption } => {
                    self.gateway.send_qr(delivery.chat, qr, caption).await
                }
            };
            (delivery, result)
        });

        let mut report = FanoutReport::default();
        for (delivery, result) in join_all(sends).await {
            match result {
                Ok(()) => {
                    debug!(
                        event = event.name(),
                        queue_number = %ticket.queue_number,
                        chat = %delivery.chat,
                        audience = ?delivery.audience,
                        "Notification delivered"
                    );
                    report.delivered.push(delivery.chat);
                }
                Err(e) => {
                    warn!(
                        event = event.name(),
                        queue_number = %ticket.queue_number,
                        chat = %delivery.chat,
                        audience = ?delivery.audience,
                        error = %e,
                        "Notification delivery failed"
                    );
                    report.failed.push(delivery.chat);
                }
            }
        }

        info!(
            event = event.name(),
            queue_number = %ticket.queue_number,
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "Fanout complete"
        );
        report
    }

    /// Guarded Waiting -> Ready followed by the Ready fanout.
    ///
    /// The status is set before anything is sent, so a second call for the
    /// same ticket finds it Ready and sends nothing.
    pub async fn notify_ready(
        &self,
        queue_number: &str,
        staff_name: &str,
    ) -> RegistryResult<ReadyOutcome> {
        match self.registry.mark_ready(queue_number).await? {
            ReadyTransition::AlreadyReady(ticket) => {
                debug!(queue_number = %ticket.queue_number, "Ready already sent");
                Ok(ReadyOutcome::AlreadyReady(ticket))
            }
            ReadyTransition::Transitioned(ticket) => {
                let event = TicketEvent::Ready {
                    staff_name: staff_name.to_string(),
                };
                let report = self.deliver(&event, &ticket).await;
                Ok(ReadyOutcome::Notified { ticket, report })
            }
        }
    }

    /// Destinations in priority order: customer, staff, groups. A chat that
    /// already has a delivery is skipped.
    async fn plan(&self, event: &TicketEvent, ticket: &Ticket) -> Vec<Delivery> {
        let mut seen = HashSet::new();
        let mut plan = Vec::new();
        let mut push = |chat: ChatId, audience: Audience, payload: Payload| {
            if seen.insert(chat) {
                plan.push(Delivery {
                    chat,
                    audience,
                    payload,
                });
            }
        };

        if let Some(customer) = ticket.customer_ref {
            let text = match event {
                TicketEvent::Registered { .. } => None,
                TicketEvent::SelfRegistered | TicketEvent::Linked => {
                    Some(messages::customer_registered(ticket))
                }
                TicketEvent::Ready { staff_name } => {
                    Some(messages::ready_customer(ticket, staff_name))
                }
            };
            if let Some(text) = text {
                push(customer, Audience::Customer, Payload::Text(text));
            }
        }

        if let Some(staff) = self.staff_destination(ticket).await {
            let payload = match event {
                TicketEvent::Registered { deep_link, .. } => self.qr_payload(ticket, deep_link),
                TicketEvent::SelfRegistered => {
                    Payload::Text(messages::self_registered_notice(ticket))
                }
                TicketEvent::Linked => Payload::Text(messages::linked_notice(ticket)),
                TicketEvent::Ready { staff_name } => {
                    Payload::Text(messages::ready_staff(ticket, staff_name))
                }
            };
            push(staff, Audience::Staff, payload);
        }

        let group_text = match event {
            TicketEvent::Registered { staff_name, .. } => {
                messages::staff_registered_notice(ticket, staff_name)
            }
            TicketEvent::SelfRegistered => messages::self_registered_notice(ticket),
            TicketEvent::Linked => messages::linked_notice(ticket),
            TicketEvent::Ready { staff_name } => messages::ready_group(ticket, staff_name),
        };
        for group in self.groups.destinations().await {
            push(group, Audience::Group, Payload::Text(group_text.clone()));
        }

        plan
    }

    /// The ticket's admin, else any admin. With no admins at all the
    /// groups are the only staff-facing destinations.
    async fn staff_destination(&self, ticket: &Ticket) -> Option<ChatId> {
        match ticket.admin_ref {
            Some(chat) => Some(chat),
            None => self.admins.any_member().await.map(|user| user.direct_chat()),
        }
    }

    fn qr_payload(&self, ticket: &Ticket, deep_link: &str) -> Payload {
        let caption = messages::staff_qr_caption(ticket, deep_link);
        match self.renderer.render(deep_link) {
            Ok(qr) => Payload::Qr { qr, caption },
            Err(e) => {
                warn!(
                    queue_number = %ticket.queue_number,
                    error = %e,
                    "QR rendering failed, sending link only"
                );
                Payload::Text(caption)
            }
        }
    }
}
