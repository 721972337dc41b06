//! Folding a received datagram into the roster.

use orchestra_core::wire::{Announcement, Instrument, WireError};

use crate::roster::{Roster, UpsertOutcome};

/// Result of applying one well-formed announcement.
#[derive(Debug, Clone, PartialEq)]
pub struct Ingested {
    pub uuid: String,
    pub instrument: Option<Instrument>,
    pub outcome: UpsertOutcome,
}

/// Decode `payload` and upsert it into `roster`.
///
/// A malformed payload leaves the roster untouched and returns the decode
/// error; the caller drops the datagram and keeps receiving.
pub async fn ingest_datagram(roster: &Roster, payload: &[u8]) -> Result<Ingested, WireError> {
    let announcement = Announcement::decode(payload)?;
    let instrument = announcement.instrument();

    if instrument.is_none() {
        tracing::debug!(
            uuid = %announcement.uuid,
            sound = ?announcement.sound,
            "announcement with unknown sound"
        );
    }

    let outcome = roster
        .upsert(announcement.uuid.clone(), instrument, announcement.timestamp)
        .await;

    Ok(Ingested {
        uuid: announcement.uuid,
        instrument,
        outcome,
    })
}
