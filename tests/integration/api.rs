use std::time::Instant;

use chrono::Utc;
use tokio::net::TcpListener;

use orchestra_api::handlers::{MusiciansResponse, StatusResponse};
use orchestra_api::ApiState;
use orchestra_core::config::NetworkConfig;
use orchestra_core::wire::Instrument;
use orchestra_services::Roster;

async fn start_api(roster: Roster) -> (String, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = ApiState {
        roster,
        staleness: chrono::Duration::seconds(5),
        network: NetworkConfig::default(),
        started_at: Instant::now(),
    };
    let task = tokio::spawn(async move {
        axum::serve(listener, orchestra_api::router(state)).await.unwrap();
    });
    (format!("http://{addr}/api"), task)
}

#[tokio::test]
async fn test_status_endpoint_reports_roster_size() {
    let roster = Roster::new();
    roster.upsert("a", Some(Instrument::Piano), Utc::now()).await;
    roster.upsert("b", None, Utc::now()).await;
    let (base, server) = start_api(roster).await;

    let status: StatusResponse = reqwest::get(format!("{base}/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status.musicians_tracked, 2);
    assert_eq!(status.staleness_secs, 5);
    assert_eq!(status.query_port, 2205);

    server.abort();
}

#[tokio::test]
async fn test_musicians_endpoint_prunes_stale_entries() {
    let roster = Roster::new();
    roster.upsert("live", Some(Instrument::Drum), Utc::now()).await;
    roster
        .upsert("gone", None, Utc::now() - chrono::Duration::seconds(120))
        .await;
    let (base, server) = start_api(roster.clone()).await;

    let resp: MusiciansResponse = reqwest::get(format!("{base}/musicians"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp.musicians.len(), 1);
    assert_eq!(resp.musicians[0].instrument, Some(Instrument::Drum));
    assert_eq!(roster.len().await, 1);

    server.abort();
}
