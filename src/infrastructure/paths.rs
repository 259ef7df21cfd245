//! Data directory resolution.
//!
//! The data directory is `Config.data_dir` when set, otherwise the platform data
//! directory (`~/.local/share` on Linux, `~/Library/Application Support` on
//! macOS, `%APPDATA%` on Windows) joined with `tabshell`. When the platform has
//! no data directory the current directory is used.

use std::path::PathBuf;

use crate::Config;

/// Application directory name under the platform data directory.
const APP_DIR: &str = "tabshell";

/// Log file name inside the data directory.
pub const LOG_FILE: &str = "tabshell.log";

/// Returns the directory holding the database and log file.
///
/// # Examples
///
/// ```
/// use std::path::PathBuf;
/// use tabshell::infrastructure::data_dir;
/// use tabshell::Config;
///
/// let config = Config {
///     data_dir: Some(PathBuf::from("/tmp/profile")),
///     ..Config::default()
/// };
/// assert_eq!(data_dir(&config), PathBuf::from("/tmp/profile"));
/// ```
#[must_use]
pub fn data_dir(config: &Config) -> PathBuf {
    config.data_dir.clone().unwrap_or_else(|| {
        dirs::data_dir().map_or_else(|| PathBuf::from("."), |base| base.join(APP_DIR))
    })
}

/// Location of the SQLite database.
#[must_use]
pub fn database_path(config: &Config) -> PathBuf {
    data_dir(config).join(&config.database_file)
}

/// Location of the active log file.
#[must_use]
pub fn log_path(config: &Config) -> PathBuf {
    data_dir(config).join(LOG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_live_under_configured_dir() {
        let config = Config {
            data_dir: Some(PathBuf::from("/srv/shell")),
            database_file: "profile.db".to_string(),
            ..Config::default()
        };

        assert_eq!(database_path(&config), PathBuf::from("/srv/shell/profile.db"));
        assert_eq!(log_path(&config), PathBuf::from("/srv/shell/tabshell.log"));
    }

    #[test]
    fn default_dir_ends_with_app_name() {
        let dir = data_dir(&Config::default());
        assert!(dir.ends_with(APP_DIR) || dir == PathBuf::from("."));
    }
}
