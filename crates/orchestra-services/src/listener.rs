//! Announcement listener.
//!
//! Receives musician announcements from the multicast group and upserts
//! them into the roster. A bad datagram is dropped and the loop moves on;
//! only process shutdown ends it.

use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use tokio::net::UdpSocket;

use orchestra_core::wire::MAX_DATAGRAM;
use crate::ingest::ingest_datagram;
use crate::roster::Roster;

/// Listen for announcements and populate the roster.
///
/// Runs forever; cancel by dropping the task handle.
pub async fn listener_loop(socket: UdpSocket, roster: Roster) -> Result<()> {
    let mut buf = vec![0u8; MAX_DATAGRAM];

    match socket.local_addr() {
        Ok(addr) => tracing::info!(%addr, "announcement listener starting"),
        Err(e) => tracing::warn!(error = %e, "announcement listener starting on unknown address"),
    }

    loop {
        let (len, source) = match socket.recv_from(&mut buf).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "recv_from failed");
                continue;
            }
        };

        match ingest_datagram(&roster, &buf[..len]).await {
            Ok(ingested) => tracing::debug!(
                uuid = %ingested.uuid,
                instrument = ?ingested.instrument,
                outcome = ?ingested.outcome,
                %source,
                "announcement received"
            ),
            Err(e) => tracing::debug!(%source, bytes = len, error = %e, "dropping malformed announcement"),
        }
    }
}

/// Remove roster entries that have gone stale, on a fixed interval.
///
/// Only spawned when a sweep interval is configured; otherwise staleness is
/// enforced when a snapshot is requested.
/// Runs forever; cancel by dropping the task handle.
pub async fn expiry_loop(roster: Roster, staleness: chrono::Duration, every: Duration) -> Result<()> {
    let mut interval = tokio::time::interval(every);

    loop {
        interval.tick().await;

        let removed = roster.sweep(Utc::now(), staleness).await;
        if removed > 0 {
            tracing::debug!(removed, "expired roster entries");
        }
    }
}
