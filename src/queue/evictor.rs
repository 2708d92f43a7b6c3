//! Retention sweep.
//!
//! Every `period` the evictor removes each ticket older than the retention
//! window, whatever its status. It runs as a supervised tokio task that the
//! owner shuts down through [`EvictorHandle`].

use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::registry::TicketRegistry;
use super::ticket::QueueNumber;

/// Default retention window (7 days).
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Default sweep period (24 hours).
pub const DEFAULT_SWEEP_PERIOD: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, thiserror::Error)]
pub enum EvictorError {
    #[error("Retention window out of range: {0:?}")]
    RetentionOutOfRange(Duration),

    #[error("Sweep period must be non-zero")]
    ZeroPeriod,

    #[error("Evictor task failed: {0}")]
    TaskFailed(String),
}

/// Purges stale tickets from a registry.
#[derive(Debug, Clone)]
pub struct Evictor {
    registry: TicketRegistry,
    retention: chrono::Duration,
}

impl Evictor {
    pub fn new(registry: TicketRegistry, retention: Duration) -> Result<Self, EvictorError> {
        let window = chrono::Duration::from_std(retention)
            .ok()
            .filter(|window| Utc::now().checked_sub_signed(*window).is_some())
            .ok_or(EvictorError::RetentionOutOfRange(retention))?;
        Ok(Self {
            registry,
            retention: window,
        })
    }

    /// One eviction cycle relative to `now`. A cutoff before the start of
    /// representable time purges nothing.
    pub async fn sweep(&self, now: DateTime<Utc>) -> Vec<QueueNumber> {
        let Some(cutoff) = now.checked_sub_signed(self.retention) else {
            warn!(retention = %self.retention, "Retention cutoff out of range, nothing to purge");
            return Vec::new();
        };
        let purged = self.registry.purge_created_before(cutoff).await;
        debug!(%cutoff, purged = purged.len(), "Eviction sweep finished");
        purged
    }

    /// Start the recurring sweep. The first cycle runs immediately.
    pub fn spawn(self, period: Duration) -> Result<EvictorHandle, EvictorError> {
        if period.is_zero() {
            return Err(EvictorError::ZeroPeriod);
        }

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            info!(period = ?period, "Evictor started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.sweep(Utc::now()).await;
                    }
                    _ = &mut shutdown_rx => {
                        info!("Evictor stopped");
                        break;
                    }
                }
            }
        });

        Ok(EvictorHandle {
            shutdown_tx: Some(shutdown_tx),
            task,
        })
    }
}

/// Owner's handle on the running sweep.
pub struct EvictorHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl EvictorHandle {
    /// Stop the sweep and wait for the task to finish.
    pub async fn shutdown(mut self) -> Result<(), EvictorError> {
        if let Some(tx) = self.shutdown_tx.take() {
            if tx.send(()).is_err() {
                warn!("Evictor task already gone before shutdown");
            }
        }
        (&mut self.task)
            .await
            .map_err(|e| EvictorError::TaskFailed(e.to_string()))
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for EvictorHandle {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some() {
            self.task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::traits::ChatId;
    use crate::queue::ticket::{Plate, Ticket, TicketStatus};

    fn aged(number: &str, plate: &str, age: chrono::Duration, now: DateTime<Utc>) -> Ticket {
        let mut ticket = Ticket::registered(
            QueueNumber::new(number),
            Plate::parse(plate).unwrap(),
            ChatId(1),
            now - age,
        );
        ticket.status = TicketStatus::Registered;
        ticket
    }

    #[tokio::test]
    async fn test_sweep_removes_old_tickets_regardless_of_status() {
        let registry = TicketRegistry::new();
        let now = Utc::now();

        registry
            .create(aged("20240101-001", "OLD001", chrono::Duration::days(8), now))
            .await
            .unwrap();
        registry
            .create(aged("20240101-002", "OLD002", chrono::Duration::days(9), now))
            .await
            .unwrap();
        registry
            .advance("20240101-002", TicketStatus::Waiting)
            .await
            .unwrap();
        registry.mark_ready("20240101-002").await.unwrap();
        registry
            .create(Ticket::pending(
                QueueNumber::new("20240101-003"),
                ChatId(3),
                now - chrono::Duration::days(30),
            ))
            .await
            .unwrap();
        registry
            .create(aged("20240101-004", "NEW004", chrono::Duration::days(6), now))
            .await
            .unwrap();

        let evictor = Evictor::new(registry.clone(), DEFAULT_RETENTION).unwrap();
        let purged = evictor.sweep(now).await;

        assert_eq!(
            purged,
            vec![
                QueueNumber::new("20240101-001"),
                QueueNumber::new("20240101-002"),
                QueueNumber::new("20240101-003"),
            ]
        );
        assert_eq!(registry.len().await, 1);
        assert!(registry.get("20240101-004").await.is_some());
    }

    #[tokio::test]
    async fn test_sweep_keeps_ticket_exactly_at_cutoff() {
        let registry = TicketRegistry::new();
        let now = Utc::now();
        registry
            .create(aged("20240101-001", "EDGE01", chrono::Duration::days(7), now))
            .await
            .unwrap();

        let evictor = Evictor::new(registry.clone(), DEFAULT_RETENTION).unwrap();
        assert!(evictor.sweep(now).await.is_empty());
    }

    #[tokio::test]
    async fn test_spawned_evictor_runs_first_cycle_and_shuts_down() {
        let registry = TicketRegistry::new();
        registry
            .create(aged(
                "20240101-001",
                "OLD001",
                chrono::Duration::days(10),
                Utc::now(),
            ))
            .await
            .unwrap();

        let handle = Evictor::new(registry.clone(), DEFAULT_RETENTION)
            .unwrap()
            .spawn(Duration::from_millis(20))
            .unwrap();

        for _ in 0..50 {
            if registry.is_empty().await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(registry.is_empty().await);

        handle.shutdown().await.unwrap();
    }

    #[test]
    fn test_zero_period_rejected() {
        let evictor = Evictor::new(TicketRegistry::new(), DEFAULT_RETENTION).unwrap();
        assert!(matches!(
            evictor.spawn(Duration::ZERO),
            Err(EvictorError::ZeroPeriod)
        ));
    }

    #[test]
    fn test_unrepresentable_retention_rejected() {
        let retention = humantime::parse_duration("1000000years").unwrap();
        assert!(matches!(
            Evictor::new(TicketRegistry::new(), retention),
            Err(EvictorError::RetentionOutOfRange(_))
        ));
    }

    #[tokio::test]
    async fn test_sweep_with_cutoff_before_min_time_purges_nothing() {
        let registry = TicketRegistry::new();
        registry
            .create(aged("20240101-001", "OLD001", chrono::Duration::days(10), Utc::now()))
            .await
            .unwrap();

        let evictor = Evictor::new(registry.clone(), DEFAULT_RETENTION).unwrap();
        assert!(evictor.sweep(DateTime::<Utc>::MIN_UTC).await.is_empty());
        assert_eq!(registry.len().await, 1);
    }
}
