//! CLI Command Definitions
//!
//! Argument parsing for the tradepost scheduler binary.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Tradepost - Market Board Synchronization Scheduler
#[derive(Parser, Debug)]
#[command(
    name = "tradepost",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Market board synchronization scheduler",
    long_about = "Tradepost polls per-server market boards in priority-tiered batches, \
                  deduplicates listings and sale history by content hash, and keeps each \
                  tracked item/server pair's tier in step with its observed sale cadence."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one bounded update pass over a priority tier
    Update(UpdateCmd),

    /// Reclassify every tracked pair from its sale history
    Reclassify(ReclassifyCmd),

    /// Request a manual (patreon) update for an item
    Request(RequestCmd),

    /// Show tracked pair counts per state and tier
    Status(StatusCmd),
}

/// Run one update pass
#[derive(Parser, Debug)]
pub struct UpdateCmd {
    /// Priority tier to poll
    #[arg(short, long, value_name = "TIER")]
    pub tier: u8,

    /// Maximum pairs to process this pass
    #[arg(short, long, value_name = "COUNT")]
    pub batch: Option<usize>,

    /// Wall-clock budget in seconds
    #[arg(short, long, value_name = "SECS")]
    pub deadline: Option<u64>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/tradepost.toml")]
    pub config: PathBuf,
}

/// Reclassify tracked pairs
#[derive(Parser, Debug)]
pub struct ReclassifyCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/tradepost.toml")]
    pub config: PathBuf,
}

/// Request a manual update
#[derive(Parser, Debug)]
pub struct RequestCmd {
    /// Item to update
    #[arg(short, long, value_name = "ITEM")]
    pub item: u32,

    /// Server whose data center receives the override
    #[arg(short, long, value_name = "SERVER")]
    pub server: u32,

    /// Override tier for the next poll
    #[arg(short, long, value_name = "TIER", default_value = "1")]
    pub tier: u8,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/tradepost.toml")]
    pub config: PathBuf,
}

/// Show scheduler status
#[derive(Parser, Debug)]
pub struct StatusCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/tradepost.toml")]
    pub config: PathBuf,
}
