//! Default paths for orgalert components
//!
//! Config: `$XDG_CONFIG_HOME/orgalert/config.toml` or `~/.config/orgalert/config.toml`

use std::path::{Path, PathBuf};

/// Environment variable for overriding the config file path
pub const ORGALERT_CONFIG_ENV: &str = "ORGALERT_CONFIG";

/// Config filename within the config directory
const CONFIG_FILENAME: &str = "config.toml";

/// Application subdirectory name
const APP_DIR: &str = "orgalert";

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$ORGALERT_CONFIG` environment variable (if set)
/// 2. `$XDG_CONFIG_HOME/orgalert/config.toml` (if XDG_CONFIG_HOME is set)
/// 3. `~/.config/orgalert/config.toml` (fallback)
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(ORGALERT_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    config_path_without_env()
}

/// Get the config path without checking the ORGALERT_CONFIG env var.
pub fn config_path_without_env() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".config").join(APP_DIR).join(CONFIG_FILENAME);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join(CONFIG_FILENAME)
}

/// Expand a leading `~/` to the current user's home directory.
///
/// Paths without the prefix, or when no home directory is known, are returned unchanged.
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
