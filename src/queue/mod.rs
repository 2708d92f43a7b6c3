//! Ticket lifecycle core: identifiers, the registry and the retention sweep.

pub mod evictor;
pub mod id;
pub mod registry;
pub mod ticket;

pub use evictor::{Evictor, EvictorError, EvictorHandle, DEFAULT_RETENTION, DEFAULT_SWEEP_PERIOD};
pub use id::QueueIdGenerator;
pub use registry::{ReadyTransition, RegistryError, RegistryResult, TicketRegistry};
pub use ticket::{Plate, PlateError, QueueNumber, Ticket, TicketStatus};
