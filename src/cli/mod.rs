//! Command-line interface for Swipecart.

mod commands;

use clap::{Parser, Subcommand};

/// Swipecart - swipe-to-shop feed and wishlist service
#[derive(Parser)]
#[command(name = "swipecart")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API together with the background job workers
    #[command(alias = "-d", alias = "--daemon")]
    Daemon,

    /// Re-check one user's stale saved items now
    Refresh {
        /// User id as asserted by the auth layer
        #[arg(long)]
        user: String,
    },

    /// Run one catalog-wide freshness pass inline
    Sweep,

    /// Reset search sessions idle longer than the retention window
    ResetSessions,

    /// Show job queue counts
    Queue,

    /// Create default config file
    #[command(alias = "--init")]
    Init,
}

pub use commands::*;
