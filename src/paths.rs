//! Path resolution for sotto configuration and data directories.
//!
//! SOTTO_HOME resolution order:
//! 1. SOTTO_HOME environment variable (if set)
//! 2. ~/.config/sotto (default)

use std::path::PathBuf;

/// Returns the sotto home directory.
pub fn sotto_home() -> PathBuf {
    if let Ok(home) = std::env::var("SOTTO_HOME") {
        return PathBuf::from(home);
    }

    dirs::home_dir()
        .map(|h| h.join(".config").join("sotto"))
        .expect("Could not determine home directory")
}

/// Returns the path to the config.toml file.
pub fn config_path() -> PathBuf {
    sotto_home().join("config.toml")
}

/// Returns the directory for log files.
pub fn logs_dir() -> PathBuf {
    sotto_home().join("logs")
}
