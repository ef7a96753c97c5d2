//! Configuration file loading and data-directory resolution
//!
//! Services resolve their settings with CLI > environment > TOML file >
//! compiled default priority. This module owns the file-level pieces: finding
//! the config file, parsing it, and resolving the data directory that holds
//! the shared database.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::PathBuf;

/// Resolve the database path for a service.
///
/// Priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. Explicit path in the parsed config file (passed by the caller)
/// 4. OS-dependent default data directory (fallback)
pub fn resolve_database_path(
    cli_arg: Option<PathBuf>,
    env_var_name: &str,
    config_value: Option<PathBuf>,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path;
    }

    if let Ok(path) = std::env::var(env_var_name) {
        return PathBuf::from(path);
    }

    if let Some(path) = config_value {
        return path;
    }

    default_data_dir().join("improver.db")
}

/// Locate the default config file for a service, if one exists.
///
/// Looks for `~/.config/improver/<service>.toml` (per-user), then
/// `/etc/improver/<service>.toml` (system-wide, Unix only).
pub fn default_config_path(service: &str) -> Option<PathBuf> {
    let file_name = format!("{}.toml", service);

    if let Some(dir) = dirs::config_dir() {
        let path = dir.join("improver").join(&file_name);
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let path = PathBuf::from("/etc/improver").join(&file_name);
        if path.exists() {
            return Some(path);
        }
    }

    None
}

/// Parse a TOML config file into the service's config type.
///
/// A missing file is a hard error here; callers that treat the file as
/// optional check existence (or use [`default_config_path`]) first.
pub fn load_toml_file<T: DeserializeOwned>(path: &std::path::Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// OS-dependent default data directory for Improver services
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("improver"))
        .unwrap_or_else(|| PathBuf::from("./improver_data"))
}
