//! ExitWatch demo
//!
//! Refreshes the exit list and checks whether an address is a Tor exit.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use exitwatch_core::{client_address, RequestHeaders};
use exitwatch_detector::{DetectorConfig, MemorySessionStore, TorDetector};

#[derive(Parser)]
#[command(name = "exitwatch")]
#[command(author, version, about = "ExitWatch: Tor exit-node detection", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file
    #[arg(short, long, env = "EXITWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Exit list file (overrides the configuration)
    #[arg(short, long, env = "EXITWATCH_LIST")]
    list: Option<PathBuf>,

    /// Keep the list in memory between lookups
    #[arg(long)]
    list_cache: bool,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1")]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Download and save a fresh exit list
    Update,

    /// Check whether addresses are Tor exits
    Check {
        /// Addresses to check
        #[arg(required = true)]
        addresses: Vec<String>,

        /// Refresh the list before checking
        #[arg(long)]
        update: bool,
    },

    /// Resolve a client address from forwarded headers, then check it
    Client {
        /// Peer address of the connection
        #[arg(long)]
        remote: Option<String>,

        /// Request header as NAME=VALUE (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Ignore proxy forwarding headers
        #[arg(long)]
        no_proxy: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    let mut config = match &cli.config {
        Some(path) => DetectorConfig::from_file(path)?,
        None => DetectorConfig::default(),
    };
    if let Some(list) = cli.list {
        config.list_path = Some(list);
    }
    if cli.list_cache {
        config.list_cache = true;
    }

    let session_id = MemorySessionStore::new_session_id();
    let mut detector = TorDetector::new(config)?
        .with_session(Arc::new(MemorySessionStore::new()), &session_id);

    match cli.command {
        Commands::Update => {
            let count = detector.update_list().await?;
            println!("✅ Saved {} exit addresses", count);
        }
        Commands::Check { addresses, update } => {
            if update {
                detector.update_list().await?;
            }
            for address in &addresses {
                report(&mut detector, address)?;
            }
        }
        Commands::Client {
            remote,
            headers,
            no_proxy,
        } => {
            let headers = parse_headers(&headers)?;
            let address = client_address(&headers, remote.as_deref(), !no_proxy)
                .context("No valid client address found in headers or remote address")?;
            report(&mut detector, &address)?;
        }
    }

    Ok(())
}

fn report(detector: &mut TorDetector, address: &str) -> Result<()> {
    let is_tor = detector
        .is_tor(address)
        .with_context(|| format!("Checking {}", address))?;
    println!(
        "Is this client ({}) part of the Tor network? {}.",
        address,
        if is_tor { "Yes" } else { "No" }
    );
    Ok(())
}

fn parse_headers(raw: &[String]) -> Result<RequestHeaders> {
    raw.iter()
        .map(|header| {
            header
                .split_once('=')
                .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
                .with_context(|| format!("Header must be NAME=VALUE: {}", header))
        })
        .collect()
}
