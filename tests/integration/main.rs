//! Orchestra integration test harness.
//!
//! Tests drive real sockets on loopback: announcements go over UDP, snapshots
//! come back over TCP. Multicast tests need a multicast-capable loopback
//! route and skip gracefully when the host does not provide one.
//!
//!   cargo test --test integration

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::task::JoinHandle;

use orchestra_core::wire::ActiveMusician;
use orchestra_services::{listener_loop, Roster};

mod api;
mod multicast;
mod query;

// ── Harness ───────────────────────────────────────────────────────────────────

/// Serve snapshots of `roster` on an OS-assigned loopback port.
pub async fn start_query_server(
    roster: Roster,
    staleness: chrono::Duration,
) -> Result<(SocketAddr, JoinHandle<Result<()>>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let task = tokio::spawn(orchestra_api::serve_snapshots(listener, roster, staleness));
    Ok((addr, task))
}

/// Run the query protocol as a client: connect, send nothing, read to EOF.
pub async fn query(addr: SocketAddr) -> Result<Vec<ActiveMusician>> {
    let mut stream = TcpStream::connect(addr)
        .await
        .with_context(|| format!("failed to connect to {addr}"))?;
    let mut body = Vec::new();
    stream.read_to_end(&mut body).await?;
    serde_json::from_slice(&body).context("snapshot is not a JSON array of musicians")
}

/// Run the auditor's announcement listener on `socket`, feeding `roster`.
pub fn spawn_ingestion(socket: UdpSocket, roster: Roster) -> JoinHandle<Result<()>> {
    tokio::spawn(listener_loop(socket, roster))
}

/// Poll `roster` until it holds `n` entries or the deadline passes.
pub async fn wait_for_len(roster: &Roster, n: usize, deadline: Duration) -> bool {
    let step = Duration::from_millis(10);
    let mut waited = Duration::ZERO;
    while waited < deadline {
        if roster.len().await == n {
            return true;
        }
        tokio::time::sleep(step).await;
        waited += step;
    }
    roster.len().await == n
}
