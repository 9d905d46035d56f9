//! Command-line argument parsing for the Conduit client.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{Config, QueryConfig};

/// Output format for query results and metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON on stdout.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {s}. Expected: text or json")),
        }
    }
}

/// Client for the Conduit SQL query service.
#[derive(Parser, Debug)]
#[command(name = "conduit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Query service host (e.g. conduit.example.com)
    #[arg(long, value_name = "HOST", env = "CONDUIT_SERVER", global = true)]
    pub server: Option<String>,

    /// Bearer token for the query service
    #[arg(long, value_name = "TOKEN", env = "CONDUIT_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Config file path (defaults to ./ConduitClient.toml, then ~/ConduitClient.toml)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Output format: text or json
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// What to do once connected.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List databases (the default)
    Databases,

    /// List the tables of a database
    Tables {
        /// Database name
        database: String,
    },

    /// Describe the columns of a table
    Schema {
        /// Database name
        database: String,
        /// Table name
        table: String,
    },

    /// Execute a SQL query, following polls and pages until it completes
    Query {
        /// SQL text
        sql: String,

        /// Rows per page (at most 1000)
        #[arg(long, value_name = "ROWS")]
        page_size: Option<usize>,

        /// Timeout in seconds for the whole query (0 means 30)
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the command to run, defaulting to listing databases.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Databases)
    }

    /// Applies CLI (and clap-resolved environment) overrides onto a loaded config.
    pub fn apply_to(&self, config: &mut Config) {
        config.merge_overrides(self.server.as_deref(), self.token.as_deref());
    }

    /// Resolves the page size and timeout for a `query` command against config defaults.
    pub fn query_settings(
        defaults: &QueryConfig,
        page_size: Option<usize>,
        timeout: Option<u64>,
    ) -> (usize, u64) {
        (
            page_size.unwrap_or(defaults.page_size),
            timeout.unwrap_or(defaults.timeout_secs),
        )
    }
}
