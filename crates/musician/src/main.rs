//! musician: plays an instrument in the orchestra.
//!
//! Every interval the musician multicasts the sound of its instrument,
//! tagged with an identity chosen at startup.

use std::net::SocketAddr;

use anyhow::{Context, Result};

use orchestra_core::config::OrchestraConfig;
use orchestra_core::transport;
use orchestra_core::wire::Instrument;

mod broadcast;

use broadcast::Musician;

fn print_usage() {
    println!("Usage: musician <instrument>");
    println!();
    println!("Instruments:");
    for instrument in Instrument::ALL {
        println!("  {:<8} plays {}", instrument.label(), instrument.sound());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let instrument = match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["help"] | ["--help"] | ["-h"] => {
            print_usage();
            return Ok(());
        }
        [label] => match label.parse::<Instrument>() {
            Ok(instrument) => instrument,
            Err(e) => {
                eprintln!("{e}");
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        },
        _ => {
            print_usage();
            std::process::exit(1);
        }
    };

    let config = OrchestraConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        OrchestraConfig::default()
    });
    let network = &config.network;

    let socket = transport::multicast_sender(network.interface, network.multicast_ttl)
        .context("failed to create multicast socket")?;
    let dest = SocketAddr::from((network.multicast_group, network.multicast_port));

    let musician = Musician::new(instrument);
    let period = config.musician.announce_interval();

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("shutdown signal received"),
        r = broadcast::broadcast_loop(musician, socket, dest, period) => {
            tracing::error!("broadcast loop exited: {:?}", r);
        }
    }

    Ok(())
}
