// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "barcode-scanner")]
#[command(about = "Live barcode scanning over an external decoder")]
#[command(version = barcode_scanner::constants::app_info::version())]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a still image and print detections
    Scan {
        /// Image file to scan
        image: PathBuf,

        /// Print detections as JSON
        #[arg(long)]
        json: bool,
    },

    /// Scan live from a capture device until interrupted
    Live {
        /// Capture device path (default: prefer a rear-facing device)
        #[arg(short, long)]
        device: Option<String>,

        /// Milliseconds between scan ticks
        #[arg(short, long)]
        interval: Option<u64>,

        /// Stop after the first detection
        #[arg(long)]
        once: bool,
    },

    /// List available capture devices
    Devices,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=barcode_scanner=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Scan { image, json } => cli::scan_image(image, json),
        Commands::Live {
            device,
            interval,
            once,
        } => cli::live(device, interval, once),
        Commands::Devices => cli::list_devices(),
    }
}
