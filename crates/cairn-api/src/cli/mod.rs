//! Command-line interface definitions.

pub mod account;
pub mod chat;

use clap::{Parser, Subcommand};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(name = "cairn", version, about = "Coaching chat server and terminal client")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the API server.
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        #[arg(long, default_value_t = 8080)]
        port: u16,
        /// Also export spans via the OpenTelemetry stdout exporter.
        #[arg(long)]
        otel: bool,
    },
    /// Chat with a running server from the terminal.
    Chat {
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        server: String,
        /// Bearer token; printed by `cairn serve` on first run.
        #[arg(long, env = "CAIRN_API_TOKEN")]
        token: Option<String>,
        /// Continue an existing conversation instead of starting one.
        #[arg(long)]
        conversation: Option<Uuid>,
        /// Coaching domain for a new conversation (e.g. "career").
        #[arg(long)]
        domain: Option<String>,
        /// Start an unmetered discovery conversation.
        #[arg(long)]
        discovery: bool,
    },
}
