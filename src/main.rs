// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "hdr-camera")]
#[command(about = "Headless HDR camera preview pipeline")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the preview pipeline (default when no command is given)
    Run {
        /// Run duration in seconds
        #[arg(short, long, default_value = "10")]
        duration: u64,

        #[command(flatten)]
        overrides: cli::ConfigOverrides,
    },

    /// Render a few frames and save the display as PNG
    Snapshot {
        /// Frames to render before capturing
        #[arg(short, long, default_value = "10")]
        frames: u64,

        /// Output file path (default: ~/Pictures/HDR Camera/snapshot_TIMESTAMP.png)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        overrides: cli::ConfigOverrides,
    },

    /// Print the effective configuration as JSON
    Config {
        #[command(flatten)]
        overrides: cli::ConfigOverrides,
    },

    /// Show the GPU adapter that would be used
    Gpu,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=hdr_camera=trace, RUST_LOG=info
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
        Some(Commands::Run {
            duration,
            overrides,
        }) => cli::run_preview(overrides, duration),
        Some(Commands::Snapshot {
            frames,
            output,
            overrides,
        }) => cli::take_snapshot(overrides, frames, output),
        Some(Commands::Config { overrides }) => cli::print_config(overrides),
        Some(Commands::Gpu) => cli::print_gpu_info(),
        None => cli::run_preview(cli::ConfigOverrides::default(), 10),
    }
}
