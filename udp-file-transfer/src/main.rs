//! Entry point for `uft`.
//!
//! Parses CLI arguments and dispatches into either **server** or **client** mode.
//! All actual protocol work is delegated to library modules; `main.rs` owns only
//! process setup (logging, argument parsing, validation).

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use udp_file_transfer::{client, server, ClientConfig, FaultRates, ServerConfig, DEFAULT_PORT};

/// Stop-and-wait file transfer over UDP with simulated loss and corruption.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand)]
enum Mode {
    /// Receive one file, then exit.
    Server {
        /// File to write the received bytes into.
        #[arg(short, long)]
        output: PathBuf,
        /// Probability that an inbound frame is treated as corrupt.
        #[arg(short, long)]
        corruption_rate: f64,
        /// Probability that an outbound ack is dropped.
        #[arg(short, long)]
        loss_rate: f64,
        /// Local address to bind.
        #[arg(short, long, default_value_t = SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)))]
        bind: SocketAddr,
        /// Seed for the fault injector (random if omitted).
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Send one file to a server.
    Client {
        /// Server hostname or IP address.
        #[arg(long)]
        host: String,
        /// File to send.
        #[arg(short, long)]
        file: PathBuf,
        /// Bytes per frame (1-1000).
        #[arg(short, long)]
        bytes: usize,
        /// Probability that an inbound ack is treated as corrupt.
        #[arg(short, long)]
        corruption_rate: f64,
        /// Probability that an outbound frame is dropped.
        #[arg(short, long)]
        loss_rate: f64,
        /// Server port.
        #[arg(short, long, default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Seed for the fault injector (random if omitted).
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Per-packet events are logged at info; RUST_LOG overrides.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("ERROR: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.mode {
        Mode::Server {
            output,
            corruption_rate,
            loss_rate,
            bind,
            seed,
        } => {
            let rates = FaultRates::new(loss_rate, corruption_rate)?;
            let config = ServerConfig::new(bind, output, rates).with_seed(seed);
            let report = server::run(&config).await?;
            println!("\n{report}\n");
        }
        Mode::Client {
            host,
            file,
            bytes,
            corruption_rate,
            loss_rate,
            port,
            seed,
        } => {
            let rates = FaultRates::new(loss_rate, corruption_rate)?;
            let config = ClientConfig::new(&host, port, file, bytes, rates)
                .await?
                .with_seed(seed);
            let stats = client::run(&config).await?;
            println!("\n{stats}\n");
        }
    }
    Ok(())
}
