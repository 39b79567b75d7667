//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `search`: searching, stream resolution and album listing
//! - `info`: configured backends, config file location and initialization

mod info;
mod search;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::runtime::Runtime;

use crate::config::{self, Config};

pub use info::{cmd_backends, cmd_config_init, cmd_config_path};
pub use search::{cmd_album, cmd_resolve, cmd_search};

/// Tidepool CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "TIDEPOOL_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Search the configured backends in priority order
    Search {
        /// Free-text query
        query: String,
    },
    /// Search, then resolve a playable stream URL for one result
    Resolve {
        /// Free-text query
        query: String,
        /// Result to resolve (0-based)
        #[arg(short, long, default_value_t = 0)]
        index: usize,
    },
    /// Search, then list the album of one result
    Album {
        /// Free-text query
        query: String,
        /// Result whose album to list (0-based)
        #[arg(short, long, default_value_t = 0)]
        index: usize,
    },
    /// Show configured backends in the order they are tried
    Backends,
    /// Print the config file location
    ConfigPath,
    /// Write the default configuration file
    ConfigInit {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    /// Configuration from `--config`, or the default location.
    pub fn load_config(&self) -> Config {
        match &self.config {
            Some(path) => config::load_from(path),
            None => config::load(),
        }
    }
}

/// Run the specified CLI command.
///
/// Returns `Ok(true)` if a command was run, `Ok(false)` if no command was specified.
pub fn run_command(cli: &Cli) -> anyhow::Result<bool> {
    let Some(command) = &cli.command else {
        return Ok(false);
    };

    match command {
        Commands::Search { query } => {
            let rt = Runtime::new()?;
            cmd_search(&rt, &cli.load_config(), query)?;
        }
        Commands::Resolve { query, index } => {
            let rt = Runtime::new()?;
            cmd_resolve(&rt, &cli.load_config(), query, *index)?;
        }
        Commands::Album { query, index } => {
            let rt = Runtime::new()?;
            cmd_album(&rt, &cli.load_config(), query, *index)?;
        }
        Commands::Backends => cmd_backends(&cli.load_config()),
        Commands::ConfigPath => cmd_config_path(cli.config.as_deref()),
        Commands::ConfigInit { force } => cmd_config_init(cli.config.as_deref(), *force)?,
    }
    Ok(true)
}
