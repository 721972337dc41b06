//! HTTP API handlers: exposes auditor state as JSON.

use std::time::Instant;

use axum::{extract::State, Json};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use orchestra_core::config::NetworkConfig;
use orchestra_core::wire::ActiveMusician;
use orchestra_services::Roster;

#[derive(Clone)]
pub struct ApiState {
    pub roster: Roster,
    /// Staleness threshold applied by `/musicians`.
    pub staleness: Duration,
    pub network: NetworkConfig,
    pub started_at: Instant,
}

// ── /status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Entries currently held, stale ones not yet pruned included.
    pub musicians_tracked: usize,
    pub staleness_secs: i64,
    pub multicast_group: String,
    pub multicast_port: u16,
    pub query_port: u16,
    pub uptime_secs: u64,
}

pub async fn handle_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        musicians_tracked: state.roster.len().await,
        staleness_secs: state.staleness.num_seconds(),
        multicast_group: state.network.multicast_group.to_string(),
        multicast_port: state.network.multicast_port,
        query_port: state.network.query_port,
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

// ── /musicians ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct MusiciansResponse {
    pub musicians: Vec<ActiveMusician>,
}

/// Same semantics as the TCP query: prunes before listing.
pub async fn handle_musicians(State(state): State<ApiState>) -> Json<MusiciansResponse> {
    let musicians = state.roster.snapshot(Utc::now(), state.staleness).await;
    Json(MusiciansResponse { musicians })
}
