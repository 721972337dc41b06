use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use chrono::Utc;

use orchestra_core::transport::{multicast_listener, multicast_sender, send_datagram, TransportError};
use orchestra_core::wire::{Announcement, Instrument, MULTICAST_ADDR};
use orchestra_services::Roster;

use crate::*;

#[tokio::test]
async fn test_announcement_round_trip_over_multicast() {
    // Port 0 first to find a free port, so parallel test runs don't collide.
    let probe = std::net::UdpSocket::bind("0.0.0.0:0").unwrap();
    let port = probe.local_addr().unwrap().port();
    drop(probe);

    let listener = match multicast_listener(MULTICAST_ADDR, port, Ipv4Addr::UNSPECIFIED) {
        Ok(socket) => socket,
        Err(e) => {
            eprintln!("SKIP: cannot join {MULTICAST_ADDR}: {e}");
            return;
        }
    };

    let roster = Roster::new();
    let ingest = spawn_ingestion(listener, roster.clone());

    let sender = multicast_sender(Ipv4Addr::UNSPECIFIED, 1).unwrap();
    let dest = SocketAddr::from((MULTICAST_ADDR, port));
    let payload = Announcement::new("mc-1", Instrument::Violin, Utc::now())
        .encode()
        .unwrap();

    // Multicast is lossy by contract; send a few times like a real musician would.
    let mut delivered = false;
    for _ in 0..5 {
        if let Err(e) = send_datagram(&sender, &payload, dest).await {
            eprintln!("SKIP: no multicast route on this host: {e}");
            ingest.abort();
            return;
        }
        if wait_for_len(&roster, 1, Duration::from_millis(200)).await {
            delivered = true;
            break;
        }
    }
    ingest.abort();

    if !delivered {
        eprintln!("SKIP: multicast loopback not delivered on this host");
        return;
    }
    let entry = roster.get("mc-1").await.unwrap();
    assert_eq!(entry.instrument, Some(Instrument::Violin));
}

#[tokio::test]
async fn test_two_auditors_can_share_the_group_port() {
    let probe = std::net::UdpSocket::bind("0.0.0.0:0").unwrap();
    let port = probe.local_addr().unwrap().port();
    drop(probe);

    let first = match multicast_listener(MULTICAST_ADDR, port, Ipv4Addr::UNSPECIFIED) {
        Ok(socket) => socket,
        Err(e) => {
            eprintln!("SKIP: cannot join {MULTICAST_ADDR}: {e}");
            return;
        }
    };
    let second = multicast_listener(MULTICAST_ADDR, port, Ipv4Addr::UNSPECIFIED);
    assert!(second.is_ok(), "second auditor failed to bind: {:?}", second.err());
    drop(first);
}

#[tokio::test]
async fn test_non_multicast_group_is_a_startup_error() {
    let err = multicast_listener(Ipv4Addr::new(10, 0, 0, 1), 0, Ipv4Addr::UNSPECIFIED).unwrap_err();
    assert!(matches!(err, TransportError::Join { .. }));
}
