use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `hostwarden` - local security auditor with human-approved host actions.
#[derive(Parser, Debug)]
#[command(name = "hostwarden")]
#[command(version)]
#[command(about = "Audit and maintain this machine with an AI agent you supervise.", long_about = None)]
pub struct Cli {
    /// Log at debug level regardless of `log_level` in config.toml
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chat with the agent in this terminal
    Chat {
        /// Send one message, settle its approvals, then exit
        #[arg(short, long)]
        message: Option<String>,

        /// Model to use instead of `[agent] model`
        #[arg(long)]
        model: Option<String>,
    },

    /// Start the HTTP gateway (REST, SSE, WebSocket)
    Serve {
        /// Port to listen on (use 0 for a random available port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
    },

    /// List registered tools and whether they need approval
    Tools {
        /// Print descriptors as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a transcript persisted as JSONL
    Replay {
        /// Path to a `<session>.jsonl` audit file
        path: PathBuf,
    },
}
