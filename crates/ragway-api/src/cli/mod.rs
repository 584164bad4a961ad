//! CLI command definitions for the `ragway` binary.
//!
//! Uses clap derive macros for argument parsing.

pub mod key;
pub mod usage;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Retrieval-augmented chat gateway with token budgeting and usage quotas.
#[derive(Parser)]
#[command(name = "ragway", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans to stdout via OpenTelemetry.
    #[arg(long, global = true, env = "RAGWAY_OTEL")]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server.
    Serve {
        /// Port to listen on.
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Manage API keys.
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },

    /// Show a user's token usage for the current period.
    Usage {
        /// User id to report on.
        #[arg(long)]
        user: String,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum KeyAction {
    /// Create an API key for a user. The key is printed once.
    Create {
        #[arg(long)]
        user: String,
    },

    /// List a user's API keys (prefixes only).
    #[command(alias = "ls")]
    List {
        #[arg(long)]
        user: String,
    },
}
