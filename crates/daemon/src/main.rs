//! Sigchat Daemon - Headless driver for chat sessions.
//!
//! This binary exposes the protocol core without any UI:
//! - Runs a scripted loopback session between two in-process peers
//! - Generates and inspects session identifiers
//! - Shows the effective configuration

use anyhow::Result;
use clap::{Parser, Subcommand};
use sigchat_core::Config;
use std::path::Path;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;

/// Sigchat Daemon - Headless chat session driver
#[derive(Parser)]
#[command(name = "sigchat-daemon")]
#[command(about = "Headless driver for sigchat sessions", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted loopback session between two in-process peers
    Demo {
        /// Network to host the session on (BTC or TEST)
        #[arg(short, long)]
        network: Option<String>,
    },

    /// Session identifier utilities
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },

    /// Show the effective configuration
    Config,
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Generate a fresh session identifier
    New {
        /// Network tag (BTC or TEST)
        #[arg(short, long)]
        network: Option<String>,
    },

    /// Parse an identifier and describe it
    Parse {
        /// The identifier to parse
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .init();

    let config = Config::load_with_env(cli.config.as_deref().map(Path::new))?;

    match cli.command {
        Commands::Demo { network } => commands::demo::execute(config, network).await,
        Commands::Session { command } => match command {
            SessionCommands::New { network } => {
                commands::session::execute_new(&config, network).await
            }
            SessionCommands::Parse { id } => commands::session::execute_parse(&id).await,
        },
        Commands::Config => commands::config::execute(&config).await,
    }
}
