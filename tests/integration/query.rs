use std::time::Duration;

use chrono::Utc;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpStream, UdpSocket};

use orchestra_core::wire::{Announcement, Instrument};
use orchestra_services::Roster;

use crate::*;

#[tokio::test]
async fn test_query_on_empty_roster_returns_empty_array() {
    let (addr, server) = start_query_server(Roster::new(), chrono::Duration::seconds(5))
        .await
        .unwrap();

    let mut stream = TcpStream::connect(addr).await.unwrap();
    let mut body = String::new();
    stream.read_to_string(&mut body).await.unwrap();
    assert_eq!(body, "[]");

    server.abort();
}

#[tokio::test]
async fn test_announcements_over_udp_show_up_in_snapshot() {
    let roster = Roster::new();
    let udp = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let udp_addr = udp.local_addr().unwrap();
    let ingest = spawn_ingestion(udp, roster.clone());
    let (addr, server) = start_query_server(roster.clone(), chrono::Duration::seconds(5))
        .await
        .unwrap();

    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let now = Utc::now();
    for (uuid, instrument) in [("m-piano", Instrument::Piano), ("m-drum", Instrument::Drum)] {
        let payload = Announcement::new(uuid, instrument, now).encode().unwrap();
        sender.send_to(&payload, udp_addr).await.unwrap();
    }
    sender.send_to(b"definitely not json", udp_addr).await.unwrap();
    sender
        .send_to(
            format!(r#"{{"uuid":"m-odd","sound":"bwaaa","timestamp":{}}}"#, now.timestamp_millis())
                .as_bytes(),
            udp_addr,
        )
        .await
        .unwrap();

    assert!(wait_for_len(&roster, 3, Duration::from_secs(2)).await);

    let mut snapshot = query(addr).await.unwrap();
    snapshot.sort_by(|a, b| a.uuid.cmp(&b.uuid));
    let summary: Vec<_> = snapshot
        .iter()
        .map(|m| (m.uuid.as_str(), m.instrument))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("m-drum", Some(Instrument::Drum)),
            ("m-odd", None),
            ("m-piano", Some(Instrument::Piano)),
        ]
    );

    ingest.abort();
    server.abort();
}

#[tokio::test]
async fn test_stale_musicians_are_pruned_by_the_query() {
    let roster = Roster::new();
    roster
        .upsert("fresh", Some(Instrument::Violin), Utc::now())
        .await;
    roster
        .upsert(
            "silent",
            Some(Instrument::Trumpet),
            Utc::now() - chrono::Duration::seconds(30),
        )
        .await;

    let (addr, server) = start_query_server(roster.clone(), chrono::Duration::seconds(5))
        .await
        .unwrap();

    let snapshot = query(addr).await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].uuid, "fresh");
    assert_eq!(roster.len().await, 1, "stale entry should be gone after the query");

    server.abort();
}

#[tokio::test]
async fn test_each_connection_gets_one_complete_snapshot() {
    let roster = Roster::new();
    for i in 0..50 {
        roster
            .upsert(format!("m{i:02}"), Some(Instrument::Flute), Utc::now())
            .await;
    }
    let (addr, server) = start_query_server(roster, chrono::Duration::seconds(60))
        .await
        .unwrap();

    let clients: Vec<_> = (0..8).map(|_| tokio::spawn(query(addr))).collect();
    for client in clients {
        let snapshot = client.await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 50);
    }

    server.abort();
}

#[tokio::test]
async fn test_client_that_hangs_up_does_not_stop_the_server() {
    let roster = Roster::new();
    roster.upsert("m1", None, Utc::now()).await;
    let (addr, server) = start_query_server(roster, chrono::Duration::seconds(5))
        .await
        .unwrap();

    drop(TcpStream::connect(addr).await.unwrap());

    let snapshot = query(addr).await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert!(!server.is_finished());

    server.abort();
}
