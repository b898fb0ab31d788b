//! image-pull-cache - Persistent cache of ensured image pull credentials.
//!
//! A node agent pulling the same image repeatedly should not re-verify the
//! same pull secret against the registry every time. This crate records,
//! per image reference, which credential hashes were already verified and
//! when, keeps that on disk across restarts, and expires entries once a
//! caller-supplied recheck period has passed.
//!
//! # Modules
//!
//! - [`cache`] - Records, persistence, the in-memory store, and sweeps
//! - [`cli`] - The `pullcache` operator command line
//! - [`config`] - Configuration loading and duration parsing
//! - [`error`] - Error types and result aliases
//!
//! # Example
//!
//! ```
//! use image_pull_cache::cache::{ImagePullCache, PullInfoReader, RecheckPolicy};
//! use chrono::{Duration, Utc};
//! use tempfile::TempDir;
//!
//! let root = TempDir::new().unwrap();
//! let cache = ImagePullCache::new(root.path(), ["docker.io/library/nginx:1.25"]).unwrap();
//!
//! let now = Utc::now();
//! cache.mark_ensured("docker.io/library/nginx:1.25", "secret-hash", now).unwrap();
//!
//! let policy = RecheckPolicy::every(Duration::hours(24));
//! assert!(cache.is_ensured("docker.io/library/nginx:1.25", "secret-hash", policy, now).unwrap());
//! assert!(cache.get_auth_info("docker.io/library/nginx:1.25", "other-hash").unwrap().is_none());
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;

pub use cache::{EnsuredEntry, ImagePullCache, ImagePullState, RecheckPolicy};
pub use error::{PullCacheError, Result};
