//! Command-line interface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "sotto")]
#[command(version)]
#[command(about = "Live answer copilot for spoken questions")]
pub struct Cli {
    /// Path to the config file (default: $SOTTO_HOME/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Creates a default config file
    Init,
    /// Prints the effective configuration as TOML
    Config,
    /// Sets the completion model in the config file
    Model {
        /// Model identifier, e.g. "gpt-5.1"
        name: String,
    },
}
