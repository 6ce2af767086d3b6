pub mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bonusvarsler")]
#[command(about = "Find the best cashback offer for a shop", long_about = None)]
pub struct Cli {
    /// Database file (overrides the config file)
    #[arg(long, global = true)]
    pub db: Option<std::path::PathBuf>,

    /// Config file (default: ~/.config/bonusvarsler/config.toml)
    #[arg(long, global = true)]
    pub config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the best offer for a hostname or URL
    Resolve {
        /// Hostname or full URL of the page
        target: String,
    },
    /// Check a hostname against the cached host index only
    Check {
        /// Hostname or full URL of the page
        target: String,
    },
    /// Fetch the feed now and replace the cache
    Refresh,
    /// Remove the cached feed
    ClearCache,
    /// List services, or enable/disable one
    Services {
        #[command(subcommand)]
        action: Option<ServiceAction>,
    },
    /// Never notify on this site
    Hide {
        /// Hostname or full URL of the page
        target: String,
    },
    /// Notify on a previously hidden site again
    Unhide {
        /// Hostname or full URL of the page
        target: String,
    },
    /// Tell whether a URL is a service's own cashback activation page
    Activated {
        /// Full URL of the page
        url: String,
    },
    /// Check whether requests to a URL are blocked
    Probe {
        /// URL to request
        url: String,
    },
}

#[derive(Subcommand)]
pub enum ServiceAction {
    /// Enable offers from a service
    Enable {
        /// Service id, e.g. "remember"
        id: String,
    },
    /// Disable offers from a service
    Disable {
        /// Service id, e.g. "trumf"
        id: String,
    },
}
