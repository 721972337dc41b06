//! orchestra-api: the auditor's query surfaces.
//!
//! * `query`: the raw TCP snapshot protocol (connect, receive JSON, closed).
//! * `serve`: a read-only HTTP status API for operators.

pub mod handlers;
pub mod query;

use std::net::SocketAddr;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use orchestra_core::transport::bind_tcp;

pub use handlers::ApiState;
pub use query::{answer_query, bind_query, serve_snapshots};

pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/status", get(handlers::handle_status))
        .route("/musicians", get(handlers::handle_musicians))
        .with_state(state);

    Router::new().nest("/api", api_routes).layer(cors)
}

pub async fn serve(state: ApiState, port: u16) -> anyhow::Result<()> {
    let listener = bind_tcp(SocketAddr::from(([127, 0, 0, 1], port))).await?;
    tracing::info!(port, "API listening on 127.0.0.1");
    axum::serve(listener, router(state)).await?;
    Ok(())
}
