//! Configuration file loading.

use std::fs;
use std::path::Path;
use tracing::debug;

use super::schema::CacheConfig;
use crate::error::{PullCacheError, Result};

/// Load a config file and parse it into [`CacheConfig`].
///
/// # Errors
///
/// Returns `ConfigNotFound` if the file doesn't exist.
/// Returns `ConfigParseError` if the YAML is invalid or the recheck period
/// does not parse.
pub fn load_config_file(path: &Path) -> Result<CacheConfig> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            PullCacheError::ConfigNotFound {
                path: path.to_path_buf(),
            }
        } else {
            PullCacheError::io(path, e)
        }
    })?;

    parse_config(&content, path)
}

/// Parse YAML content into [`CacheConfig`].
///
/// `source_path` is only used for error reporting.
pub fn parse_config(content: &str, source_path: &Path) -> Result<CacheConfig> {
    let parse_error = |message: String| PullCacheError::ConfigParseError {
        path: source_path.to_path_buf(),
        message,
    };

    // An empty file is a valid config made of defaults.
    let config: CacheConfig = if content.trim().is_empty() {
        CacheConfig::default()
    } else {
        serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string()))?
    };

    config
        .recheck_policy()
        .map_err(|e| parse_error(e.to_string()))?;

    Ok(config)
}

/// Load `path` if given, otherwise fall back to defaults.
pub fn load_config(path: Option<&Path>) -> Result<CacheConfig> {
    match path {
        Some(path) => {
            debug!("Loading config from {}", path.display());
            load_config_file(path)
        }
        None => {
            debug!("No config file given, using defaults");
            Ok(CacheConfig::default())
        }
    }
}
