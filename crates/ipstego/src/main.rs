// ============================================
// File: crates/ipstego/src/main.rs
// ============================================
//! # ipstego Entry Point
//!
//! ## Creation Reason
//! Command-line front end for trying the channel between two hosts.
//!
//! ## Usage
//! ```bash
//! # Host B: wait for a peer, read one transfer, answer
//! ipstego listen
//!
//! # Host A: find a peer, send one transfer, read the answer
//! ipstego dial
//!
//! # Other commands
//! ipstego validate                     # Validate config file
//! ipstego dial --data 1,2,3            # Send custom bytes
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Requires root or `CAP_NET_ADMIN` and matching iptables NFQUEUE rules
//! - Both hosts need some other traffic between them to carry symbols
//!
//! ## Last Modified
//! v0.1.0 - Initial CLI implementation

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ipstego::{dial, listen, StegoConfig, StegoError};

// ============================================
// CLI Definition
// ============================================

/// Covert byte stream over the IPv4 TOS field
#[derive(Parser, Debug)]
#[command(name = "ipstego")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Discover a peer, write one transfer, then read the reply
    Dial {
        /// Path to configuration file
        #[arg(short, long, default_value = "/etc/ipstego/ipstego.toml")]
        config: PathBuf,

        /// Bytes to send, comma separated
        #[arg(short, long, value_delimiter = ',', default_value = "34,80,2,50")]
        data: Vec<u8>,
    },

    /// Accept a peer, read one transfer, then write a reply
    Listen {
        /// Path to configuration file
        #[arg(short, long, default_value = "/etc/ipstego/ipstego.toml")]
        config: PathBuf,

        /// Bytes to reply with, comma separated
        #[arg(short, long, value_delimiter = ',', default_value = "127,56,78,90")]
        data: Vec<u8>,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "/etc/ipstego/ipstego.toml")]
        config: PathBuf,
    },
}

// ============================================
// Main
// ============================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Dial { config, data } => cmd_dial(&config, data).await,
        Commands::Listen { config, data } => cmd_listen(&config, data).await,
        Commands::Validate { config } => cmd_validate(&config).await,
    };

    if let Err(e) = result {
        report_failure(&e);
        std::process::exit(1);
    }
}

// ============================================
// Commands
// ============================================

/// Dials, writes `data`, reads the reply.
async fn cmd_dial(config_path: &Path, data: Vec<u8>) -> anyhow::Result<()> {
    let config = load_or_default_config(config_path).await?;
    init_logging(&config.logging.level);

    let channel = &config.channel;
    let mut conn = dial(
        &channel.kind,
        channel.inbound_queue,
        channel.outbound_queue,
        &config.limits,
    )
    .await
    .context("dial failed")?;
    info!(peer = %conn.peer(), "Connected");

    let written = conn.write(&data).await.context("write failed")?;
    println!("Wrote {written} bytes: {data:?}");

    let mut buf = vec![0u8; config.limits.max_payload];
    let n = conn.read(&mut buf).await.context("read failed")?;
    println!("Read {n} bytes: {:?}", &buf[..n]);

    conn.close().await?;
    Ok(())
}

/// Accepts, reads one transfer, writes `data` back.
async fn cmd_listen(config_path: &Path, data: Vec<u8>) -> anyhow::Result<()> {
    let config = load_or_default_config(config_path).await?;
    init_logging(&config.logging.level);

    let channel = &config.channel;
    let listener = listen(
        &channel.kind,
        channel.inbound_queue,
        channel.outbound_queue,
        &config.limits,
    )?;
    info!(addr = %listener.addr(), "Listening");

    let mut conn = listener.accept().await.context("accept failed")?;
    info!(peer = %conn.peer(), "Accepted");

    let mut buf = vec![0u8; config.limits.max_payload];
    let n = conn.read(&mut buf).await.context("read failed")?;
    println!("Read {n} bytes: {:?}", &buf[..n]);

    let written = conn.write(&data).await.context("write failed")?;
    println!("Wrote {written} bytes: {data:?}");

    conn.close().await?;
    Ok(())
}

/// Validates the configuration file and prints the effective values.
async fn cmd_validate(config_path: &Path) -> anyhow::Result<()> {
    init_logging("warn");

    if !config_path.exists() {
        println!("⚠️  Config file not found: {}", config_path.display());
        println!("   Defaults will be used.");
        return Ok(());
    }

    let config = StegoConfig::load(config_path).await?;

    println!("✅ Configuration is valid");
    println!();
    println!("Channel:");
    println!("   Kind:            {}", config.channel.kind);
    println!("   Inbound Queue:   {}", config.channel.inbound_queue);
    println!("   Outbound Queue:  {}", config.channel.outbound_queue);
    println!();
    println!("Limits:");
    println!("   Max Payload:       {} bytes", config.limits.max_payload);
    println!("   Queue Depth:       {} packets", config.limits.queue_depth);
    println!("   Handshake Timeout: {}s", config.limits.handshake_timeout_secs);
    println!("   Data Deadlines:    {}", config.limits.enforce_data_deadlines);
    println!();

    Ok(())
}

// ============================================
// Helpers
// ============================================

/// Initializes the logging system.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .try_init()
        .ok();
}

/// Logs a command failure.
///
/// Config errors surface before a command installs its subscriber, so a
/// default one is installed here; it is a no-op when one already exists.
fn report_failure(e: &anyhow::Error) {
    init_logging("info");
    error!("{:#}", e);
    if e.downcast_ref::<StegoError>().is_some_and(StegoError::requires_privileges) {
        error!("Binding netfilter queues needs root or CAP_NET_ADMIN");
    }
}

/// Loads config, or defaults when the file does not exist.
async fn load_or_default_config(path: &Path) -> anyhow::Result<StegoConfig> {
    if path.exists() {
        Ok(StegoConfig::load(path).await?)
    } else {
        Ok(StegoConfig::default())
    }
}

// ============================================
// Tests
// ============================================
