//! Configuration management for the Conduit client.
//!
//! Handles loading configuration from `ConduitClient.toml` and environment
//! variables. Precedence is CLI flags, then environment, then the config file,
//! then built-in defaults.

use crate::error::{ConduitError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

/// File name searched for in the current and home directories.
pub const CONFIG_FILE_NAME: &str = "ConduitClient.toml";

/// Environment variable holding the server host.
pub const SERVER_ENV: &str = "CONDUIT_SERVER";

/// Environment variable holding the bearer token.
pub const TOKEN_ENV: &str = "CONDUIT_TOKEN";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Query service host, without scheme (e.g. `conduit.example.com`).
    pub server: Option<String>,

    /// Bearer token used on every request.
    pub token: Option<String>,

    /// Query execution defaults.
    #[serde(default)]
    pub query: QueryConfig,
}

/// Defaults applied to query sessions created by the CLI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryConfig {
    /// Rows requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Timeout budget for one logical query, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Delay between polls of a running query, in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_page_size() -> usize {
    1000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_poll_interval_secs() -> u64 {
    2
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

impl QueryConfig {
    /// Returns the poll interval as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Server address and token, both guaranteed non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub server: String,
    pub token: String,
}

impl Credentials {
    /// Returns a display-safe string (token redacted).
    pub fn display_string(&self) -> String {
        format!("server: {}, with Token: <redacted>", self.server)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("server", &self.server)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl Config {
    /// Returns the config file candidates in search order.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".").join(CONFIG_FILE_NAME)];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(CONFIG_FILE_NAME));
        }
        paths
    }

    /// Loads configuration from an explicit path, or the first search path that exists.
    ///
    /// An explicit path that does not exist is an error; a missing file in the
    /// search paths is not.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConduitError::config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            return Self::load_from_file(path);
        }

        match Self::search_paths().into_iter().find(|p| p.exists()) {
            Some(path) => Self::load_from_file(&path),
            None => {
                info!(
                    "No config file found in current directory or home directory ({}). \
                     Will use command-line args and envvars.",
                    CONFIG_FILE_NAME
                );
                Ok(Self::default())
            }
        }
    }

    /// Loads configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        info!("Loading config from: {}", path.display());
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConduitError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            ConduitError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Overrides server and token from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Overrides server and token from the given variable lookup.
    ///
    /// Empty values are ignored.
    pub fn apply_env_with<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(server) = lookup(SERVER_ENV).filter(|s| !s.is_empty()) {
            self.server = Some(server);
        }
        if let Some(token) = lookup(TOKEN_ENV).filter(|s| !s.is_empty()) {
            self.token = Some(token);
        }
    }

    /// Applies explicit overrides (from CLI flags). `None` leaves the value untouched.
    pub fn merge_overrides(&mut self, server: Option<&str>, token: Option<&str>) {
        if let Some(server) = server.filter(|s| !s.is_empty()) {
            self.server = Some(server.to_string());
        }
        if let Some(token) = token.filter(|s| !s.is_empty()) {
            self.token = Some(token.to_string());
        }
    }

    /// Returns the server and token, or a configuration error if either is missing.
    pub fn require_credentials(&self) -> Result<Credentials> {
        let server = self.server.as_deref().unwrap_or_default();
        let token = self.token.as_deref().unwrap_or_default();

        if server.is_empty() || token.is_empty() {
            return Err(ConduitError::config(format!(
                "You need to set {SERVER_ENV} and {TOKEN_ENV} somewhere"
            )));
        }

        Ok(Credentials {
            server: server.to_string(),
            token: token.to_string(),
        })
    }
}
