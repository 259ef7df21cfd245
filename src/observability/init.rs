//! Subscriber setup.

use std::sync::Arc;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::FileWriter;
use crate::infrastructure::paths;
use crate::Config;

/// Installs the global tracing subscriber.
///
/// Logs go to `<data_dir>/tabshell.log` (rotated at 10 MiB, 3 backups kept), or
/// to stderr when `config.log_to_stderr` is set or the data directory cannot be
/// created.
///
/// Idempotent: only the first call in a process takes effect, and failures never
/// reach the caller.
pub fn init_tracing(config: &Config) {
    let registry = tracing_subscriber::registry().with(filter(config));

    let log_file = if config.log_to_stderr {
        None
    } else {
        let dir = paths::data_dir(config);
        match std::fs::create_dir_all(&dir) {
            Ok(()) => Some(paths::log_path(config)),
            Err(e) => {
                eprintln!("tabshell: cannot create {}: {e}; logging to stderr", dir.display());
                None
            }
        }
    };

    let installed = match log_file {
        Some(path) => {
            let writer = Arc::new(FileWriter::new(path));
            registry
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()
        }
        None => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };

    if installed.is_ok() {
        tracing::debug!(level = %config.log_level, "tracing initialized");
    }
}

fn filter(config: &Config) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
