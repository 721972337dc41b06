//! orchestra-services: the auditor's membership state, the logic that folds
//! announcements into it, and the receive and expiry loops that drive it.
//! Socket setup lives in orchestra-core; the query side lives in orchestra-api.

pub mod ingest;
pub mod listener;
pub mod roster;

pub use ingest::{ingest_datagram, Ingested};
pub use listener::{expiry_loop, listener_loop};
pub use roster::{MusicianEntry, Roster, UpsertOutcome};
