//! orchestra-ctl: asks an auditor who is playing.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

use orchestra_core::wire::{ActiveMusician, API_PORT, QUERY_PORT};

const DEFAULT_HOST: &str = "127.0.0.1";

// ── Response types ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct StatusResponse {
    musicians_tracked: usize,
    staleness_secs:    i64,
    multicast_group:   String,
    multicast_port:    u16,
    query_port:        u16,
    uptime_secs:       u64,
}

// ── Query helpers ─────────────────────────────────────────────────────────────

/// Connect to the snapshot port and read until the auditor closes.
async fn fetch_snapshot(host: &str, port: u16) -> Result<Vec<ActiveMusician>> {
    let mut stream = TcpStream::connect((host, port))
        .await
        .with_context(|| format!("failed to connect to auditor at {host}:{port} — is it running?"))?;

    let mut body = Vec::new();
    stream
        .read_to_end(&mut body)
        .await
        .context("connection dropped before the snapshot was complete")?;

    serde_json::from_slice(&body).context("failed to parse snapshot")
}

async fn get_json<T: for<'de> Deserialize<'de>>(url: &str) -> Result<T> {
    reqwest::get(url)
    .await
    .with_context(|| format!("failed to connect to auditor at {} — is the status API enabled?", url))?
    .json::<T>()
    .await
    .context("failed to parse response")
}

// ── Subcommand handlers ───────────────────────────────────────────────────────

async fn cmd_active(host: &str, port: u16) -> Result<()> {
    let musicians = fetch_snapshot(host, port).await?;
    print!("{}", render_active(musicians, Utc::now()));
    Ok(())
}

fn render_active(mut musicians: Vec<ActiveMusician>, now: DateTime<Utc>) -> String {
    if musicians.is_empty() {
        return "No active musicians.\n".to_string();
    }

    musicians.sort_by(|a, b| a.uuid.cmp(&b.uuid));

    let mut out = String::new();
    out.push_str("═══════════════════════════════════════\n");
    out.push_str(&format!("  Active Musicians ({})\n", musicians.len()));
    out.push_str("═══════════════════════════════════════\n");

    for m in &musicians {
        let instrument = m
            .instrument
            .map(|i| i.label().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let age = now.signed_duration_since(m.active_since).num_seconds().max(0);
        out.push_str(&format!("  ┌─ {}\n", m.uuid));
        out.push_str(&format!("  │  instrument   : {}\n", instrument));
        out.push_str(&format!(
            "  └─ active since: {} ({}s ago)\n",
            m.active_since.to_rfc3339(),
            age
        ));
    }

    out
}

async fn cmd_status(host: &str, api_port: u16) -> Result<()> {
    let resp: StatusResponse = get_json(&format!("http://{}:{}/api/status", host, api_port)).await?;

    println!("═══════════════════════════════════════");
    println!("  Auditor Status");
    println!("═══════════════════════════════════════");
    println!("  Musicians tracked : {}", resp.musicians_tracked);
    println!("  Staleness         : {}s", resp.staleness_secs);
    println!("  Multicast group   : {}:{}", resp.multicast_group, resp.multicast_port);
    println!("  Query port        : {}", resp.query_port);
    println!("  Uptime            : {}s", resp.uptime_secs);

    Ok(())
}

fn print_usage() {
    println!("Usage: orchestra-ctl [--host <host>] [--port <port>] [--api-port <port>] <command>");
    println!();
    println!("Commands:");
    println!("  active        List musicians the auditor currently hears");
    println!("  status        Show auditor status (HTTP API)");
    println!();
    println!("Options:");
    println!("  --host <host>       Auditor host (default: {})", DEFAULT_HOST);
    println!("  --port <port>       Snapshot query port (default: {})", QUERY_PORT);
    println!("  --api-port <port>   Status API port (default: {})", API_PORT);
}

// ── Arguments ─────────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq)]
enum Command {
    Active,
    Status,
    Help,
    Unknown(String),
}

#[derive(Debug, PartialEq)]
struct Invocation {
    host:     String,
    port:     u16,
    api_port: u16,
    command:  Command,
}

fn flag_value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a String> {
    args.get(i).with_context(|| format!("{flag} requires a value"))
}

fn parse_args(args: &[String]) -> Result<Invocation> {
    let mut host = DEFAULT_HOST.to_string();
    let mut port = QUERY_PORT;
    let mut api_port = API_PORT;
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--host" => {
                i += 1;
                host = flag_value(args, i, "--host")?.clone();
            }
            "--port" => {
                i += 1;
                port = flag_value(args, i, "--port")?
                .parse()
                .context("--port must be a number")?;
            }
            "--api-port" => {
                i += 1;
                api_port = flag_value(args, i, "--api-port")?
                .parse()
                .context("--api-port must be a number")?;
            }
            other => remaining.push(other),
        }
        i += 1;
    }

    let command = match remaining.as_slice() {
        ["active"] | []                => Command::Active,
        ["status"]                     => Command::Status,
        ["help"] | ["--help"] | ["-h"] => Command::Help,
        other                          => Command::Unknown(other.join(" ")),
    };

    Ok(Invocation { host, port, api_port, command })
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let invocation = parse_args(&args)?;

    match invocation.command {
        Command::Active => cmd_active(&invocation.host, invocation.port).await,
        Command::Status => cmd_status(&invocation.host, invocation.api_port).await,
        Command::Help   => { print_usage(); Ok(()) }
        Command::Unknown(other) => {
            eprintln!("Unknown command: {}", other);
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
