//! Error types for image pull cache operations.
//!
//! This module defines [`PullCacheError`], the error type returned by every
//! cache, configuration, and CLI operation, and a [`Result`] type alias.
//!
//! # Error Handling Strategy
//!
//! - A missing record file is never an error; reads report "no record"
//! - Every other filesystem failure carries the path it failed on
//! - Malformed records are surfaced, never repaired or dropped
//! - Use `anyhow::Error` (via `PullCacheError::Other`) for CLI plumbing

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for image pull cache operations.
#[derive(Debug, Error)]
pub enum PullCacheError {
    /// Filesystem failure other than "file does not exist".
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A record file on disk is not valid JSON for a pull record.
    #[error("Failed to decode pull record {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A pull record could not be serialized.
    #[error("Failed to encode pull record: {source}")]
    Encode {
        #[source]
        source: serde_json::Error,
    },

    /// Construction-time hydration failed for an image reference.
    #[error("Failed to load image manager cache for image ref {image_ref}: {source}")]
    Hydrate {
        image_ref: String,
        #[source]
        source: Box<PullCacheError>,
    },

    /// Configuration file not found at the given location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// A duration string such as a recheck period could not be parsed.
    #[error("Invalid duration '{value}': expected a number with an optional s, m, h or d suffix")]
    InvalidDuration { value: String },

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PullCacheError {
    /// Create an IO error for a path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this is an IO error caused by a missing file.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            Self::Hydrate { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

/// Result type alias for image pull cache operations.
pub type Result<T> = std::result::Result<T, PullCacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_displays_path() {
        let err = PullCacheError::io(
            "/var/lib/kubelet/image_state_manager/abc.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/var/lib/kubelet/image_state_manager/abc.json"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn hydrate_error_displays_image_ref() {
        let err = PullCacheError::Hydrate {
            image_ref: "docker.io/library/nginx:1.25".into(),
            source: Box::new(PullCacheError::io(
                "/tmp/x",
                std::io::Error::other("boom"),
            )),
        };
        assert!(err.to_string().contains("docker.io/library/nginx:1.25"));
    }

    #[test]
    fn invalid_duration_displays_value() {
        let err = PullCacheError::InvalidDuration {
            value: "soon".into(),
        };
        assert!(err.to_string().contains("soon"));
    }

    #[test]
    fn is_not_found_detects_missing_file() {
        let missing = PullCacheError::io(
            "/nope",
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        let denied = PullCacheError::io(
            "/nope",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(missing.is_not_found());
        assert!(!denied.is_not_found());
    }

    #[test]
    fn decode_error_converts_from_serde() {
        let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = PullCacheError::Decode {
            path: PathBuf::from("/cache/abc.json"),
            source,
        };
        assert!(err.to_string().contains("/cache/abc.json"));
    }

    #[test]
    fn result_type_alias_works() {
        fn returns_error() -> Result<()> {
            Err(PullCacheError::ConfigNotFound {
                path: PathBuf::from("/etc/pullcache.yml"),
            })
        }
        assert!(returns_error().is_err());
    }
}
