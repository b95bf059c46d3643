use clap::{Parser, Subcommand};

use std::path::PathBuf;

use splitroute_lib::state;

/// Split-tunnel route manager for dual-uplink hosts
#[derive(Debug, Parser)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Override the desired-state file location
    #[arg(long, env = state::ENV_VAR, global = true)]
    pub state_file: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List discovered interfaces and their gateways
    #[command()]
    List,

    /// Show the persisted desired state
    #[command()]
    Status,

    /// Pin metrics and install the campus routes
    #[command()]
    Apply {
        /// Interface carrying default (user) traffic
        #[arg(long, requires = "campus")]
        user: Option<String>,
        /// Interface carrying the campus address ranges
        #[arg(long, requires = "user")]
        campus: Option<String>,
        /// File with one IP-CIDR rule per line; defaults to the built-in list
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Restore automatic metrics and remove the applied routes
    #[command()]
    Reset,
}

pub fn parse() -> Cli {
    Cli::parse()
}
