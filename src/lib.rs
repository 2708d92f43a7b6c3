//! Queuekeeper - Walk-in Service Queue Bot
//!
//! Customers register (directly or by scanning a staff-issued QR code),
//! wait, and are notified when their vehicle is ready.
//!
//! The core is transport-agnostic:
//! - `queue`: ticket registry, queue numbers and the retention sweep
//! - `directory`: persisted admin and broadcast-group lists
//! - `bot`: registration dialogue, commands and notification fanout
//! - `moderation`: best-effort keyword, URL and image filter
//! - `gateway`: the messaging seam the core consumes

pub mod bot;
pub mod directory;
pub mod gateway;
pub mod moderation;
pub mod qr;
pub mod queue;
