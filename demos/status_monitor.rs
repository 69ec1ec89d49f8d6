//! Live status monitor.
//!
//! Demonstrates:
//! - Building a client for a given endpoint
//! - Re-issuing status queries on every (re)connect
//! - Watching torrent and renderer pushes
//! - Correlated search requests
//!
//! Usage:
//!   cargo run --example status_monitor
//!   cargo run --example status_monitor -- ws://nas.local:8883/ws
//!   cargo run --example status_monitor -- --debug
//!   cargo run --example status_monitor -- --search https://video.example/watch

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use mrc_client::{
    Call, ConnectionState, DEFAULT_ENDPOINT, LifecycleHooks, MediaLink, MrcClient, Push,
    ReconnectPolicy, Result,
};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Clone)]
struct Args {
    endpoint: String,
    debug: bool,
    search: Option<String>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let search = args
            .iter()
            .position(|a| a == "--search")
            .and_then(|i| args.get(i + 1).cloned());
        let endpoint = args
            .iter()
            .find(|a| a.starts_with("ws://"))
            .cloned()
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        Self {
            endpoint,
            debug: args.iter().any(|a| a == "--debug"),
            search,
        }
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== MRC Status Monitor ===\n");
    println!("[1] Endpoint: {}", args.endpoint);

    let client = MrcClient::builder()
        .endpoint(&args.endpoint)
        .reconnect(ReconnectPolicy::fixed(Duration::from_secs(2)))
        .on_push(print_push)
        .build()?;

    client.connect_with(
        LifecycleHooks::new()
            .on_open(|client| {
                println!("    ✓ Connected, querying status");
                client.send(Call::bt_status());
                client.send(Call::upnp_status());
            })
            .on_close(|| println!("    ✗ Disconnected, retrying in 2s")),
    );

    if let Some(page) = args.search {
        client
            .wait_for_state(ConnectionState::Connected)
            .await?;

        println!("[2] Searching {page}...");
        let reply = client.request(Call::search(page)).await?;
        let link: MediaLink = reply.parse()?;
        println!("    Title: {}", link.title);
        println!("    URL:   {}", link.url);
        for rendition in &link.bitrate {
            println!(
                "    - {} ({})",
                rendition.url,
                rendition.bitrate.as_deref().unwrap_or("?")
            );
        }
    }

    println!("\nPress Ctrl+C to exit...");
    tokio::signal::ctrl_c().await?;

    client.disconnect();
    client.shutdown();
    Ok(())
}

// ============================================================================
// Functions
// ============================================================================

fn init_logging(debug: bool) {
    let filter = if debug {
        "mrc_client=debug"
    } else {
        "mrc_client=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

fn print_push(push: &Push) {
    match push {
        Push::BtStatus(torrents) | Push::BtUpdate(torrents) => {
            println!("[bt] {} torrents", torrents.len());
            for torrent in torrents {
                println!("     {} ({} files)", torrent.title, torrent.files.len());
            }
        }
        Push::UpnpStatus(status) | Push::UpnpUpdate(status) => match status {
            Some(status) => println!(
                "[upnp] {} {}: {}",
                status.device,
                status.state.as_deref().unwrap_or("idle"),
                status.current_title().unwrap_or("-")
            ),
            None => println!("[upnp] no renderer"),
        },
        Push::Unknown { action, payload } => {
            println!("[?] {action:?}: {payload}");
        }
    }
}
