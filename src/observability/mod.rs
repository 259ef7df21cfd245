//! Structured logging for the shell.
//!
//! Components log through `tracing` macros with structured fields. This module
//! installs the subscriber that filters and writes them:
//!
//! ```text
//! tracing macros → EnvFilter → fmt layer → FileWriter (tabshell.log, rotated)
//!                                        ↘ stderr (log_to_stderr)
//! ```
//!
//! Stdout is never used; the driver speaks its protocol there.
//!
//! # Configuration
//!
//! The filter is taken from:
//! 1. `RUST_LOG` environment variable (highest priority)
//! 2. `log_level` in [`crate::Config`]
//! 3. Default: `"info"`
//!
//! # Usage
//!
//! ```no_run
//! use tabshell::observability::init_tracing;
//! use tabshell::Config;
//!
//! init_tracing(&Config::default());
//! tracing::info!("shell starting");
//! ```

mod file_writer;
mod init;

pub use file_writer::FileWriter;
pub use init::init_tracing;
