//! Snapshot query server.
//!
//! A client connects, the auditor prunes the roster, writes the surviving
//! musicians as one JSON array and closes. Nothing is read from the client:
//! connecting is the request.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;

use orchestra_core::transport::{bind_tcp, TransportError};
use orchestra_services::Roster;

/// Bind the query port on all interfaces.
pub async fn bind_query(port: u16) -> Result<TcpListener, TransportError> {
    bind_tcp(SocketAddr::from(([0, 0, 0, 0], port))).await
}

/// Accept query clients forever, one snapshot per connection.
///
/// Runs forever; cancel by dropping the task handle.
pub async fn serve_snapshots(listener: TcpListener, roster: Roster, staleness: Duration) -> Result<()> {
    let addr = listener
        .local_addr()
        .context("query listener has no local address")?;
    tracing::info!(%addr, staleness_secs = staleness.num_seconds(), "snapshot query server listening");

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                continue;
            }
        };

        let roster = roster.clone();
        tokio::spawn(async move {
            match answer_query(stream, &roster, staleness).await {
                Ok(count) => tracing::debug!(%peer, musicians = count, "snapshot served"),
                // No error reply exists in the protocol; the client just sees a dropped connection.
                Err(e) => tracing::debug!(%peer, error = %e, "query client went away"),
            }
        });
    }
}

/// Prune, serialize and write one snapshot, then shut the stream down.
/// Returns the number of musicians sent.
pub async fn answer_query<W>(mut stream: W, roster: &Roster, staleness: Duration) -> std::io::Result<usize>
where
    W: AsyncWrite + Unpin,
{
    let snapshot = roster.snapshot(Utc::now(), staleness).await;
    let body = serde_json::to_vec(&snapshot)?;
    stream.write_all(&body).await?;
    stream.shutdown().await?;
    Ok(snapshot.len())
}
