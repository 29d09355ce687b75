//! Upload Intake - multipart upload service
//!
//! Stores validated uploads in a local directory and answers with JSON.

use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;
use upload_intake::{config::Config, server::Server};

/// Upload Intake - store multipart uploads in a local directory
#[derive(Parser, Debug)]
#[command(name = "upload-intake")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Override server.address
    #[arg(long)]
    address: Option<String>,

    /// Override storage.destination_dir
    #[arg(long)]
    destination_dir: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(args.log_level.to_lowercase()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .init();

    info!("Starting Upload Intake v{}", upload_intake::VERSION);

    let mut config = match &args.config {
        Some(path) => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => {
            info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    if let Some(address) = args.address {
        config.server.address = address;
    }
    if let Some(dir) = args.destination_dir {
        config.storage.destination_dir = dir;
    }

    let server = Server::new(config).await?;
    server.run().await?;

    Ok(())
}
