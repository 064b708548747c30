//! CLI argument definitions using clap
//!
//! Commands:
//! - replset plan-psa --current <path> --proposed <path> --index <n>
//! - replset plan-add --current <path> --host <host> [--arbiter]
//! - replset plan-remove --current <path> --host <host>
//! - replset schedule [--settings <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// replset - offline planning for replica set reconfigurations
#[derive(Parser, Debug)]
#[command(name = "replset")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the reconfigs that would add a voting member to a PA set
    PlanPsa {
        /// Current replica set config (JSON)
        #[arg(long)]
        current: PathBuf,

        /// Proposed replica set config (JSON)
        #[arg(long)]
        proposed: PathBuf,

        /// Index of the new member in the proposed config
        #[arg(long)]
        index: usize,
    },

    /// Show the reconfig command that would add a member
    PlanAdd {
        /// Current replica set config (JSON)
        #[arg(long)]
        current: PathBuf,

        /// host:port of the new member
        #[arg(long)]
        host: String,

        /// Add the member as an arbiter
        #[arg(long, default_value_t = false)]
        arbiter: bool,
    },

    /// Show the reconfig command that would remove a member
    PlanRemove {
        /// Current replica set config (JSON)
        #[arg(long)]
        current: PathBuf,

        /// host:port of the member to remove
        #[arg(long)]
        host: String,
    },

    /// Print the retry backoff schedule
    Schedule {
        /// Orchestrator settings file (JSON)
        #[arg(long)]
        settings: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
