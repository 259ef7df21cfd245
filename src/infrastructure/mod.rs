//! Infrastructure layer for filesystem locations.
//!
//! Everything the shell writes to disk lives under one data directory: the
//! SQLite database and the rotating log file.

pub mod paths;

pub use paths::{data_dir, database_path, log_path};
