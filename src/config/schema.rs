//! Configuration schema definitions.
//!
//! These structs map to the YAML configuration file read by `pullcache`
//! and by node agents embedding the cache.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::duration::parse_duration;
use crate::cache::RecheckPolicy;
use crate::error::Result;

/// Default node agent root directory.
pub const DEFAULT_ROOT_DIR: &str = "/var/lib/kubelet";

/// Root configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Node agent root directory; records live in `image_state_manager/` below it
    pub root_dir: PathBuf,

    /// Credential recheck settings
    pub recheck: RecheckSettings,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from(DEFAULT_ROOT_DIR),
            recheck: RecheckSettings::default(),
        }
    }
}

impl CacheConfig {
    /// The sweep policy these settings describe.
    pub fn recheck_policy(&self) -> Result<RecheckPolicy> {
        self.recheck.policy()
    }
}

/// When ensured pull credentials must be verified again
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct RecheckSettings {
    /// Expire ensured entries at all
    pub enabled: bool,

    /// Age after which an entry expires, e.g. "24h" or "7d"; "0" means never
    pub period: String,
}

impl Default for RecheckSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            period: "0".to_string(),
        }
    }
}

impl RecheckSettings {
    /// Parse the period into a policy.
    pub fn policy(&self) -> Result<RecheckPolicy> {
        Ok(RecheckPolicy {
            enabled: self.enabled,
            period: parse_duration(&self.period)?,
        })
    }
}
