//! Ticket registry.
//!
//! Authoritative in-memory store of tickets. One `RwLock` guards the whole
//! map, so uniqueness checks and the writes they protect happen under a
//! single write guard. The evictor goes through the same lock.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::ticket::{Plate, QueueNumber, Ticket, TicketStatus};

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Registry errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Queue number already exists: {0}")]
    DuplicateId(QueueNumber),

    #[error("Plate already registered: {0}")]
    DuplicatePlate(Plate),

    #[error("Ticket not found: {0}")]
    NotFound(String),

    #[error("Invalid transition for {queue_number}: {from} -> {to}")]
    InvalidTransition {
        queue_number: QueueNumber,
        from: TicketStatus,
        to: TicketStatus,
    },

    #[error("Queue number of ticket {0} cannot change")]
    IdentityChanged(QueueNumber),
}

/// Outcome of the guarded Waiting -> Ready transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadyTransition {
    /// This call moved the ticket to Ready
    Transitioned(Ticket),
    /// Someone already did; nothing changed
    AlreadyReady(Ticket),
}

/// Concurrent-safe ticket store.
#[derive(Debug, Clone, Default)]
pub struct TicketRegistry {
    tickets: Arc<RwLock<HashMap<QueueNumber, Ticket>>>,
}

impl TicketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new ticket.
    ///
    /// Fails with `DuplicateId` if the queue number exists and with
    /// `DuplicatePlate` if any present ticket carries the same plate.
    pub async fn create(&self, ticket: Ticket) -> RegistryResult<()> {
        let mut tickets = self.tickets.write().await;

        if tickets.contains_key(&ticket.queue_number) {
            return Err(RegistryError::DuplicateId(ticket.queue_number));
        }
        if let Some(plate) = &ticket.plate {
            ensure_plate_free(&tickets, plate, None)?;
        }

        debug!(
            queue_number = %ticket.queue_number,
            status = %ticket.status,
            "Ticket created"
        );
        tickets.insert(ticket.queue_number.clone(), ticket);
        Ok(())
    }

    /// Snapshot of one ticket.
    pub async fn get(&self, queue_number: &str) -> Option<Ticket> {
        self.tickets
            .read()
            .await
            .get(&QueueNumber::new(queue_number))
            .cloned()
    }

    /// Apply `mutator` to a copy of the ticket and commit it if the result
    /// respects the registry invariants.
    ///
    /// The mutator may abort by returning an error; nothing is written then.
    /// Returns the committed ticket together with the mutator's value.
    pub async fn update<F, R>(&self, queue_number: &str, mutator: F) -> RegistryResult<(Ticket, R)>
    where
        F: FnOnce(&mut Ticket) -> RegistryResult<R>,
    {
        let key = QueueNumber::new(queue_number);
        let mut tickets = self.tickets.write().await;

        let current = tickets
            .get(&key)
            .ok_or_else(|| RegistryError::NotFound(queue_number.to_string()))?;

        let mut next = current.clone();
        let value = mutator(&mut next)?;

        if next.queue_number != current.queue_number {
            return Err(RegistryError::IdentityChanged(key));
        }
        if next.status != current.status && !current.status.can_transition_to(next.status) {
            return Err(RegistryError::InvalidTransition {
                queue_number: key,
                from: current.status,
                to: next.status,
            });
        }
        if next.plate != current.plate {
            if let Some(plate) = &next.plate {
                ensure_plate_free(&tickets, plate, Some(&key))?;
            }
        }

        if next.status != current.status {
            debug!(
                queue_number = %key,
                from = %current.status,
                to = %next.status,
                "Ticket status advanced"
            );
        }
        tickets.insert(key, next.clone());
        Ok((next, value))
    }

    /// Move a ticket to `status`, enforcing the transition table.
    pub async fn advance(&self, queue_number: &str, status: TicketStatus) -> RegistryResult<Ticket> {
        let (ticket, ()) = self
            .update(queue_number, |ticket| {
                ticket.status = status;
                Ok(())
            })
            .await?;
        Ok(ticket)
    }

    /// Check-and-set Waiting -> Ready under one write guard.
    ///
    /// An already-Ready ticket is reported as such and left untouched.
    pub async fn mark_ready(&self, queue_number: &str) -> RegistryResult<ReadyTransition> {
        let key = QueueNumber::new(queue_number);
        let mut tickets = self.tickets.write().await;
        let ticket = tickets
            .get_mut(&key)
            .ok_or_else(|| RegistryError::NotFound(queue_number.to_string()))?;

        match ticket.status {
            TicketStatus::Ready => Ok(ReadyTransition::AlreadyReady(ticket.clone())),
            TicketStatus::Waiting => {
                ticket.status = TicketStatus::Ready;
                debug!(queue_number = %key, "Ticket marked ready");
                Ok(ReadyTransition::Transitioned(ticket.clone()))
            }
            from => Err(RegistryError::InvalidTransition {
                queue_number: key,
                from,
                to: TicketStatus::Ready,
            }),
        }
    }

    /// Tickets matching `predicate`, oldest first.
    pub async fn list<P>(&self, predicate: P) -> Vec<Ticket>
    where
        P: Fn(&Ticket) -> bool,
    {
        let tickets = self.tickets.read().await;
        let mut matching: Vec<Ticket> = tickets.values().filter(|t| predicate(t)).cloned().collect();
        matching.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.queue_number.cmp(&b.queue_number))
        });
        matching
    }

    /// Remove a ticket.
    pub async fn delete(&self, queue_number: &str) -> Option<Ticket> {
        self.tickets
            .write()
            .await
            .remove(&QueueNumber::new(queue_number))
    }

    /// Remove every ticket created before `cutoff`, whatever its status.
    pub async fn purge_created_before(&self, cutoff: DateTime<Utc>) -> Vec<QueueNumber> {
        let mut tickets = self.tickets.write().await;
        let mut purged = Vec::new();
        tickets.retain(|queue_number, ticket| {
            let keep = ticket.created_at >= cutoff;
            if !keep {
                purged.push(queue_number.clone());
            }
            keep
        });
        if !purged.is_empty() {
            info!(count = purged.len(), "Purged stale tickets");
        }
        purged.sort();
        purged
    }

    pub async fn len(&self) -> usize {
        self.tickets.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tickets.read().await.is_empty()
    }
}

/// Full scan for a plate collision, skipping `except`.
fn ensure_plate_free(
    tickets: &HashMap<QueueNumber, Ticket>,
    plate: &Plate,
    except: Option<&QueueNumber>,
) -> RegistryResult<()> {
    let taken = tickets
        .iter()
        .filter(|(key, _)| Some(*key) != except)
        .any(|(_, ticket)| ticket.plate.as_ref() == Some(plate));

    if taken {
        Err(RegistryError::DuplicatePlate(plate.clone()))
    } else {
        Ok(())
    }
}
