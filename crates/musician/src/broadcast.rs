//! Announcement broadcast.
//!
//! Periodically multicasts this musician's announcement so auditors on the
//! group know it is still playing.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::net::UdpSocket;
use tokio::time;
use uuid::Uuid;

use orchestra_core::transport::send_datagram;
use orchestra_core::wire::{Announcement, Instrument};

/// Identity and instrument of this process. Both are fixed at startup.
#[derive(Debug, Clone)]
pub struct Musician {
    uuid: Uuid,
    instrument: Instrument,
}

impl Musician {
    /// A musician with a fresh random identity.
    pub fn new(instrument: Instrument) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            instrument,
        }
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    pub fn instrument(&self) -> Instrument {
        self.instrument
    }

    pub fn announcement(&self, now: DateTime<Utc>) -> Announcement {
        Announcement::new(self.uuid.to_string(), self.instrument, now)
    }
}

/// Send an announcement to `dest` every `period`.
///
/// A failed send is logged and the next tick proceeds as usual.
/// Runs forever; cancel by dropping the task handle.
pub async fn broadcast_loop(
    musician: Musician,
    socket: UdpSocket,
    dest: SocketAddr,
    period: Duration,
) -> Result<()> {
    let mut interval = time::interval(period);

    tracing::info!(
        uuid = %musician.uuid(),
        instrument = %musician.instrument(),
        %dest,
        interval_ms = period.as_millis() as u64,
        "announcement broadcast starting"
    );

    loop {
        interval.tick().await;

        let payload = match musician.announcement(Utc::now()).encode() {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode announcement");
                continue;
            }
        };

        match send_datagram(&socket, &payload, dest).await {
            Ok(n) => tracing::trace!(bytes = n, "announcement sent"),
            Err(e) => tracing::warn!(error = %e, "announcement send failed"),
        }
    }
}
