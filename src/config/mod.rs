//! Configuration loading and parsing.
//!
//! - Schema definitions in [`schema`]
//! - File loading in [`loader`]
//! - Duration strings in [`duration`]
//!
//! # Example
//!
//! ```
//! use image_pull_cache::config::parse_config;
//! use std::path::Path;
//!
//! let config = parse_config(
//!     "root_dir: /var/lib/kubelet\nrecheck:\n  enabled: true\n  period: 24h\n",
//!     Path::new("pullcache.yml"),
//! )
//! .unwrap();
//! assert_eq!(config.recheck_policy().unwrap().period.num_hours(), 24);
//! ```

pub mod duration;
pub mod loader;
pub mod schema;

pub use duration::{format_duration, parse_duration};
pub use loader::{load_config, load_config_file, parse_config};
pub use schema::{CacheConfig, RecheckSettings, DEFAULT_ROOT_DIR};
