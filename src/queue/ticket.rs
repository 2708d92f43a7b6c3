//! Ticket value types and the status transition table.

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::gateway::traits::ChatId;

static PLATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9-]{3,10}$").expect("static plate pattern"));

/// Date-prefixed ticket identifier, e.g. `20240101-001`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueueNumber(String);

impl QueueNumber {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueueNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalized vehicle plate (uppercase, `[A-Z0-9-]{3,10}`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Plate(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid plate format: {0:?}")]
pub struct PlateError(pub String);

impl Plate {
    /// Trim, uppercase and validate user input.
    pub fn parse(input: &str) -> Result<Self, PlateError> {
        let normalized = input.trim().to_uppercase();
        if PLATE_PATTERN.is_match(&normalized) {
            Ok(Self(normalized))
        } else {
            Err(PlateError(input.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Plate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ticket lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketStatus {
    /// Customer pressed /start, plate not supplied yet
    Pending,
    /// Staff registered the plate, waiting for the customer to scan the QR
    Registered,
    /// Customer bound, vehicle in service
    Waiting,
    /// Vehicle ready for pickup (terminal)
    Ready,
}

impl TicketStatus {
    fn rank(self) -> u8 {
        match self {
            TicketStatus::Pending | TicketStatus::Registered => 0,
            TicketStatus::Waiting => 1,
            TicketStatus::Ready => 2,
        }
    }

    /// Whether `self -> next` is one of the permitted transitions.
    ///
    /// Permitted: Pending -> Waiting, Registered -> Waiting, Waiting -> Ready.
    pub fn can_transition_to(self, next: TicketStatus) -> bool {
        matches!(
            (self, next),
            (TicketStatus::Pending, TicketStatus::Waiting)
                | (TicketStatus::Registered, TicketStatus::Waiting)
                | (TicketStatus::Waiting, TicketStatus::Ready)
        )
    }

    /// Status never moves backwards.
    pub fn is_at_least(self, other: TicketStatus) -> bool {
        self.rank() >= other.rank()
    }

    pub fn label_en(self) -> &'static str {
        match self {
            TicketStatus::Pending => "⏳ Pending registration",
            TicketStatus::Registered => "📝 Registered (waiting for customer)",
            TicketStatus::Waiting => "🛠 In progress (waiting)",
            TicketStatus::Ready => "✅ Ready for pickup",
        }
    }

    pub fn label_km(self) -> &'static str {
        match self {
            TicketStatus::Pending => "⏳ កំពុងរង់ចាំការចុះឈ្មោះ",
            TicketStatus::Registered => "📝 បានចុះឈ្មោះ (រង់ចាំអតិថិជន)",
            TicketStatus::Waiting => "🛠 កំពុងដំណើរការ",
            TicketStatus::Ready => "✅ រួចរាល់សម្រាប់មកយក",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TicketStatus::Pending => "pending",
            TicketStatus::Registered => "registered",
            TicketStatus::Waiting => "waiting",
            TicketStatus::Ready => "ready",
        };
        f.write_str(name)
    }
}

/// One queue entry tracking a vehicle from intake to pickup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub queue_number: QueueNumber,
    pub plate: Option<Plate>,
    pub customer_name: Option<String>,
    pub admin_ref: Option<ChatId>,
    pub customer_ref: Option<ChatId>,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    /// Customer-initiated ticket awaiting a plate.
    pub fn pending(queue_number: QueueNumber, customer: ChatId, now: DateTime<Utc>) -> Self {
        Self {
            queue_number,
            plate: None,
            customer_name: None,
            admin_ref: None,
            customer_ref: Some(customer),
            status: TicketStatus::Pending,
            created_at: now,
        }
    }

    /// Staff-initiated ticket; the customer binds later through the deep link.
    pub fn registered(
        queue_number: QueueNumber,
        plate: Plate,
        admin: ChatId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            queue_number,
            plate: Some(plate),
            customer_name: None,
            admin_ref: Some(admin),
            customer_ref: None,
            status: TicketStatus::Registered,
            created_at: now,
        }
    }

    pub fn plate_display(&self) -> &str {
        self.plate.as_ref().map(Plate::as_str).unwrap_or("-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_plate_normalizes_case_and_whitespace() {
        let plate = Plate::parse("  abc-1234 ").unwrap();
        assert_eq!(plate.as_str(), "ABC-1234");
    }

    #[test]
    fn test_plate_rejects_bad_input() {
        assert!(Plate::parse("AB").is_err());
        assert!(Plate::parse("ABCDEFGHIJK").is_err());
        assert!(Plate::parse("AB C12").is_err());
        assert!(Plate::parse("ABC_12").is_err());
        assert!(Plate::parse("").is_err());
    }

    #[test]
    fn test_plate_accepts_boundaries() {
        assert!(Plate::parse("XYZ").is_ok());
        assert!(Plate::parse("XYZ-9").is_ok());
        assert!(Plate::parse("ABCDE-1234").is_ok());
    }

    #[test]
    fn test_permitted_transitions() {
        use TicketStatus::*;
        assert!(Pending.can_transition_to(Waiting));
        assert!(Registered.can_transition_to(Waiting));
        assert!(Waiting.can_transition_to(Ready));

        assert!(!Pending.can_transition_to(Ready));
        assert!(!Registered.can_transition_to(Ready));
        assert!(!Waiting.can_transition_to(Pending));
        assert!(!Ready.can_transition_to(Waiting));
        assert!(!Ready.can_transition_to(Ready));
        assert!(!Pending.can_transition_to(Registered));
    }

    fn any_status() -> impl Strategy<Value = TicketStatus> {
        prop_oneof![
            Just(TicketStatus::Pending),
            Just(TicketStatus::Registered),
            Just(TicketStatus::Waiting),
            Just(TicketStatus::Ready),
        ]
    }

    proptest! {
        /// Property: every permitted transition moves strictly forward
        #[test]
        fn permitted_transitions_never_regress(from in any_status(), to in any_status()) {
            if from.can_transition_to(to) {
                prop_assert!(to.is_at_least(from));
                prop_assert_ne!(from, to);
            }
        }

        /// Property: normalizing an accepted plate is idempotent
        #[test]
        fn plate_normalization_idempotent(input in "[a-zA-Z0-9-]{3,10}") {
            let once = Plate::parse(&input).unwrap();
            let twice = Plate::parse(once.as_str()).unwrap();
            prop_assert_eq!(once, twice);
        }
    }
}
