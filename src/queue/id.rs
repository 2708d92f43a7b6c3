//! Queue number generation.
//!
//! Format: `{YYYYMMDD}-{sequence:03}`. The sequence is one process-wide
//! counter shared by the staff and customer registration paths. It is not
//! reset when the date prefix rolls over.

use chrono::{Local, NaiveDate};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::ticket::QueueNumber;

/// Produces unique ticket identifiers.
#[derive(Debug, Clone)]
pub struct QueueIdGenerator {
    next_sequence: Arc<AtomicU64>,
}

impl QueueIdGenerator {
    /// Start numbering at 1.
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(first: u64) -> Self {
        Self {
            next_sequence: Arc::new(AtomicU64::new(first)),
        }
    }

    /// Next identifier, prefixed with today's local date.
    pub fn next(&self) -> QueueNumber {
        self.next_on(Local::now().date_naive())
    }

    /// Next identifier with an explicit date prefix.
    pub fn next_on(&self, date: NaiveDate) -> QueueNumber {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        QueueNumber::new(format!("{}-{:03}", date.format("%Y%m%d"), sequence))
    }
}

impl Default for QueueIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Numeric suffix of a queue number, if it has one.
pub fn sequence_of(queue_number: &QueueNumber) -> Option<u64> {
    queue_number
        .as_str()
        .rsplit_once('-')
        .and_then(|(_, seq)| seq.parse().ok())
}
