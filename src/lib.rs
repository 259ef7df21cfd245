//! Tabshell: tab and session orchestration core for a desktop browser shell.
//!
//! The crate owns everything a browser window needs besides page rendering:
//! the set of open tabs and their content surfaces, tab metadata kept in step
//! with what the pages report, browsing history, bookmarks and folders, user
//! settings, and restoring the previous session at startup.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  Driver (main.rs)                                   │
//! │  - JSON lines on stdin/stdout                       │
//! │  - Bridge requests, surface signals, engine cmds    │
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Application Layer (app/)                           │
//! │  - Shell event loop, tab registry                   │
//! │  - Metadata reconciler, session coordinator         │
//! │  - Window and overlay menu state                    │
//! └─────────────────────────────────────────────────────┘
//!            │                             │
//! ┌──────────────────────────┐ ┌────────────────────────┐
//! │  Worker (worker/)        │ │  Engine (engine/)      │
//! │  - Store thread, FIFO    │ │  - Surface contract    │
//! │  - Tickets, completions  │ │  - Headless bridge     │
//! └──────────────────────────┘ └────────────────────────┘
//!            │
//! ┌─────────────────────────────────────────────────────┐
//! │  Storage Layer (storage/)                           │
//! │  - SQLite: history, bookmarks, settings, snapshot   │
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Domain Layer (domain/)                             │
//! │  - Tab model, addresses, error types                │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`app`]: Shell event loop and everything it orchestrates
//! - [`domain`]: Core types (tabs, addresses, errors)
//! - [`engine`]: Content-surface contract and the bridged headless engine
//! - [`infrastructure`]: Data directory and file locations
//! - [`observability`]: Tracing subscriber and rotating log file
//! - [`storage`]: Persistence trait and the SQLite backend
//! - [`worker`]: Background store thread and its client handle
//!
//! # Configuration
//!
//! Configuration is read from an optional TOML file, then overridden by
//! `key=value` pairs from the command line:
//!
//! ```toml
//! data_dir = "/home/me/.local/share/tabshell"
//! log_level = "debug"
//! history_limit = 500
//! window_width = 1440
//! window_height = 900
//! ```
//!
//! # Example
//!
//! ```no_run
//! use tabshell::{open_shell, Config};
//!
//! let config = Config::default();
//! let mut shell = open_shell(&config)?;
//! shell.start();
//!
//! for output in shell.drain_outbox() {
//!     println!("{}", serde_json::to_string(&output)?);
//! }
//! shell.shutdown()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod app;
pub mod domain;
pub mod engine;
pub mod infrastructure;
pub mod observability;
pub mod storage;
pub mod worker;

pub use app::{BridgeReply, BridgeRequest, Shell, ShellEvent, ShellOutput};
pub use domain::{Result, ShellError, StoreError, Tab, TabId};
pub use engine::{BridgedEngine, SurfaceSignal};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::app::window::DEFAULT_CHROME_HEIGHT;
use crate::domain::address::NEW_TAB_URL;
use crate::storage::SqliteStorage;
use crate::worker::StoreClient;

/// Runtime configuration.
///
/// Every field has a default, so a TOML file only needs the keys it changes.
///
/// # Example
///
/// ```toml
/// database_file = "profile.db"
/// log_to_stderr = true
/// new_tab_url = "https://start.duckduckgo.com"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the database and log file.
    ///
    /// Defaults to the platform data directory joined with `tabshell`.
    pub data_dir: Option<PathBuf>,

    /// Database file name inside the data directory. Default: `browser.db`
    pub database_file: String,

    /// Log filter used when `RUST_LOG` is unset. Default: `"info"`
    pub log_level: String,

    /// Log to stderr instead of the rotating log file.
    pub log_to_stderr: bool,

    /// Default number of history entries returned by `history.get`. Default: 1000
    pub history_limit: usize,

    pub window_width: u32,
    pub window_height: u32,

    /// Height reserved for the tab bar and navigation bar. Default: 90
    pub chrome_height: u32,

    /// Target of tabs opened without a URL.
    pub new_tab_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            database_file: "browser.db".to_string(),
            log_level: "info".to_string(),
            log_to_stderr: false,
            history_limit: 1000,
            window_width: 1200,
            window_height: 800,
            chrome_height: DEFAULT_CHROME_HEIGHT,
            new_tab_url: NEW_TAB_URL.to_string(),
        }
    }
}

impl Config {
    /// Parses a TOML configuration file. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ShellError::Io`] if the file cannot be read and
    /// [`ShellError::Config`] if it is not valid TOML for this structure.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| ShellError::Config(format!("{}: {e}", path.display())))
    }

    /// Applies `key=value` overrides on top of `self`.
    ///
    /// Unknown keys and values that do not parse are ignored, keeping the
    /// current value.
    ///
    /// ```
    /// use std::collections::BTreeMap;
    /// use tabshell::Config;
    ///
    /// let mut map = BTreeMap::new();
    /// map.insert("history_limit".to_string(), "50".to_string());
    /// map.insert("window_width".to_string(), "wide".to_string());
    ///
    /// let config = Config::default().with_overrides(&map);
    /// assert_eq!(config.history_limit, 50);
    /// assert_eq!(config.window_width, 1200);
    /// ```
    #[must_use]
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, String>) -> Self {
        for (key, value) in overrides {
            let value = value.trim();
            match key.as_str() {
                "data_dir" => self.data_dir = Some(PathBuf::from(value)),
                "database_file" if !value.is_empty() => self.database_file = value.to_string(),
                "log_level" if !value.is_empty() => self.log_level = value.to_string(),
                "log_to_stderr" => parse_into(value, &mut self.log_to_stderr),
                "history_limit" => parse_into(value, &mut self.history_limit),
                "window_width" => parse_into(value, &mut self.window_width),
                "window_height" => parse_into(value, &mut self.window_height),
                "chrome_height" => parse_into(value, &mut self.chrome_height),
                "new_tab_url" if !value.is_empty() => self.new_tab_url = value.to_string(),
                _ => tracing::debug!(key = %key, value = %value, "ignoring configuration override"),
            }
        }
        self
    }

    /// Builds a configuration from `key=value` pairs over the defaults.
    #[must_use]
    pub fn from_map(config: &BTreeMap<String, String>) -> Self {
        Self::default().with_overrides(config)
    }
}

fn parse_into<T: std::str::FromStr>(value: &str, slot: &mut T) {
    if let Ok(parsed) = value.parse() {
        *slot = parsed;
    }
}

/// Spawns the store worker on the configured database and assembles a shell
/// driving a [`BridgedEngine`].
///
/// The shell still needs [`Shell::start`] to restore the previous session.
///
/// # Errors
///
/// Returns an error if the store thread cannot be spawned.
pub fn open_shell(config: &Config) -> Result<Shell<BridgedEngine>> {
    let database = infrastructure::database_path(config);
    tracing::info!(database = %database.display(), "opening shell");

    let store = StoreClient::spawn(Box::new(SqliteStorage::new(database)))?;
    Ok(Shell::new(BridgedEngine::new(), store, config))
}
