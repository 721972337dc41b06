//! auditor: listens to the orchestra and reports which musicians are playing.

use std::time::Instant;

use anyhow::{Context, Result};
use tokio::task::{JoinError, JoinHandle};

use orchestra_api::ApiState;
use orchestra_core::config::OrchestraConfig;
use orchestra_core::transport;
use orchestra_services::{listener, Roster};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load config
    if let Err(e) = OrchestraConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = OrchestraConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        OrchestraConfig::default()
    });

    if std::env::args().len() > 1 {
        tracing::warn!("auditor takes no arguments, ignoring them");
    }

    let network = config.network.clone();
    let staleness = config.auditor.staleness();
    tracing::info!(
        group = %network.multicast_group,
        multicast_port = network.multicast_port,
        query_port = network.query_port,
        staleness_secs = config.auditor.staleness_secs,
        "auditor starting"
    );

    // Shared state
    let roster = Roster::with_out_of_order_rejection(config.auditor.reject_out_of_order);
    if config.auditor.reject_out_of_order {
        tracing::info!("out-of-order announcements will be ignored");
    }

    // Sockets. Failing to acquire either is fatal.
    let announce_socket = transport::multicast_listener(
        network.multicast_group,
        network.multicast_port,
        network.interface,
    )
    .context("failed to join announcement group")?;
    let query_listener = orchestra_api::bind_query(network.query_port)
        .await
        .context("failed to bind query port")?;

    // ── Spawn tasks ──────────────────────────────────────────────────────────

    let listener_task = {
        let roster = roster.clone();
        tokio::spawn(async move {
            if let Err(e) = listener::listener_loop(announce_socket, roster).await {
                tracing::error!(error = %e, "announcement listener failed");
            }
        })
    };

    let query_task = {
        let roster = roster.clone();
        tokio::spawn(async move {
            if let Err(e) = orchestra_api::serve_snapshots(query_listener, roster, staleness).await {
                tracing::error!(error = %e, "snapshot query server failed");
            }
        })
    };

    let expiry_task = config.auditor.sweep_interval().map(|every| {
        tracing::info!(interval_secs = every.as_secs(), "periodic roster sweep enabled");
        let roster = roster.clone();
        tokio::spawn(async move {
            if let Err(e) = listener::expiry_loop(roster, staleness, every).await {
                tracing::error!(error = %e, "roster sweep failed");
            }
        })
    });

    // Status HTTP endpoint. A failure here is logged, not fatal.
    let _api_task = (network.api_port != 0).then(|| {
        let state = ApiState {
            roster: roster.clone(),
            staleness,
            network: network.clone(),
            started_at: Instant::now(),
        };
        let port = network.api_port;
        tokio::spawn(async move {
            if let Err(e) = orchestra_api::serve(state, port).await {
                tracing::error!(error = %e, "status server failed");
            }
        })
    });

    // ── Wait for exit ────────────────────────────────────────────────────────

    tokio::select! {
        _ = tokio::signal::ctrl_c()  => tracing::info!("shutdown signal received"),
        r = listener_task            => tracing::error!("listener task exited: {:?}", r),
        r = query_task               => tracing::error!("query task exited: {:?}", r),
        r = optional(expiry_task)    => tracing::error!("expiry task exited: {:?}", r),
    }

    Ok(())
}

/// Await a task that may not have been spawned. An absent task never completes.
async fn optional(task: Option<JoinHandle<()>>) -> Result<(), JoinError> {
    match task {
        Some(task) => task.await,
        None => std::future::pending().await,
    }
}
