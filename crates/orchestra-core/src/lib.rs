//! orchestra-core: shared wire format, instrument table, configuration and
//! socket helpers. Both the musician and the auditor depend on this crate so
//! the protocol can never drift between the two roles.

pub mod config;
pub mod transport;
pub mod wire;

pub use wire::{ActiveMusician, Announcement, Instrument, WireError};
