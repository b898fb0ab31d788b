//! Reader and writer contracts for the image pull cache, and the cache
//! handle that implements them.
//!
//! The image-pull orchestrator owns one [`ImagePullCache`] (usually behind an
//! `Arc`) and talks to it only through these operations:
//!
//! - "has this image + credential hash been ensured?" ([`PullInfoReader`])
//! - "this image + credential hash is now ensured" ([`PullInfoWriter`])
//! - "forget this image" when the image is garbage collected
//! - "run an expiry sweep" from its own timer

use chrono::{DateTime, Duration, Utc};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::entry::{EnsuredEntry, PullRecord};
use super::persistence::RecordFiles;
use super::store::CacheStore;
use super::sweep::{RecheckPolicy, RefreshSweeper, SweepReport};
use crate::config::CacheConfig;
use crate::error::{PullCacheError, Result};

/// Directory under the node agent's root directory holding the records.
pub const STATE_DIR_NAME: &str = "image_state_manager";

/// Read access to ensured pull records.
pub trait PullInfoReader {
    /// Load the record for `image_ref` from disk if it is not held yet.
    fn load_image_manager_cache(&self, image_ref: &str) -> Result<()>;

    /// A copy of the record for `image_ref`.
    fn get_image_pull_info(&self, image_ref: &str) -> Result<Option<PullRecord>>;

    /// The entry for one credential hash of `image_ref`.
    fn get_auth_info(&self, image_ref: &str, hash: &str) -> Result<Option<EnsuredEntry>>;
}

/// Write access to ensured pull records.
pub trait PullInfoWriter {
    /// Persist the in-memory record for `image_ref`.
    fn store_image_manager_cache(&self, image_ref: &str) -> Result<()>;

    /// Expire entries older than `recheck_period` when `recheck` is set.
    fn refresh_image_manager_cache(
        &self,
        recheck: bool,
        recheck_period: Duration,
    ) -> Result<SweepReport>;

    /// Replace the record for `image_ref` with `{hash: entry}` and persist it.
    fn set_image_pull_info(&self, image_ref: &str, hash: &str, entry: EnsuredEntry) -> Result<()>;

    /// Add or update `hash` in the record for `image_ref`, keeping the other
    /// hashes, and persist it.
    fn merge_image_pull_info(
        &self,
        image_ref: &str,
        hash: &str,
        entry: EnsuredEntry,
    ) -> Result<()>;

    /// Forget `image_ref` in memory and on disk.
    fn delete_image_pull_info(&self, image_ref: &str) -> Result<()>;

    /// Replace the record for `image_ref` with `{hash: entry}` in memory only.
    fn set_auth_info(&self, image_ref: &str, hash: &str, entry: EnsuredEntry);

    /// Drop one credential hash of `image_ref` from memory.
    fn delete_auth_info(&self, image_ref: &str, hash: &str);
}

/// Full read/write access, shareable across threads.
pub trait ImagePullState: PullInfoReader + PullInfoWriter + Send + Sync {}

impl<T> ImagePullState for T where T: PullInfoReader + PullInfoWriter + Send + Sync {}

/// The persistent cache of ensured image pull credentials.
#[derive(Debug)]
pub struct ImagePullCache {
    store: CacheStore,
}

impl ImagePullCache {
    /// Open the cache under `root_dir` and hydrate `image_refs`.
    ///
    /// Fails on the first reference that cannot be loaded.
    pub fn new<I, S>(root_dir: impl AsRef<Path>, image_refs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let dir = state_dir(root_dir.as_ref());
        let files = RecordFiles::new(&dir);
        files.ensure_dir()?;

        let store = CacheStore::new(files);
        for image_ref in image_refs {
            let image_ref = image_ref.as_ref();
            if let Err(source) = store.hydrate(image_ref) {
                warn!(
                    "Failed to load image manager cache for image ref {}: {}",
                    image_ref, source
                );
                return Err(PullCacheError::Hydrate {
                    image_ref: image_ref.to_string(),
                    source: Box::new(source),
                });
            }
        }

        debug!(
            "Opened image pull cache at {} with {} records",
            dir.display(),
            store.len()
        );
        Ok(Self { store })
    }

    /// Open the cache rooted where `config` says.
    pub fn from_config<I, S>(config: &CacheConfig, image_refs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(&config.root_dir, image_refs)
    }

    /// Open the cache and hold every record found on disk.
    ///
    /// Files without an `image` field cannot be mapped back to a reference
    /// and are skipped with a warning.
    pub fn open_existing(root_dir: impl AsRef<Path>) -> Result<Self> {
        let cache = Self::new(root_dir, Vec::<String>::new())?;
        for stored in cache.store.files().list()? {
            match stored.image {
                Some(image_ref) => cache.store.insert_loaded(&image_ref, stored.record),
                None => warn!(
                    "Skipping pull record {} with no image reference",
                    stored.path.display()
                ),
            }
        }

        debug!(
            "Loaded {} records from {}",
            cache.store.len(),
            cache.dir().display()
        );
        Ok(cache)
    }

    /// The directory holding the record files.
    pub fn dir(&self) -> &Path {
        self.store.files().dir()
    }

    /// The underlying store.
    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Sweep with `policy` at time `now`.
    pub fn refresh_at(&self, policy: RecheckPolicy, now: DateTime<Utc>) -> Result<SweepReport> {
        RefreshSweeper::new(&self.store).sweep_at(policy, now)
    }

    /// Whether `hash` is ensured for `image_ref` and not stale under `policy`.
    pub fn is_ensured(
        &self,
        image_ref: &str,
        hash: &str,
        policy: RecheckPolicy,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let Some(entry) = self.store.get_entry(image_ref, hash)? else {
            return Ok(false);
        };
        let stale = policy.is_active() && entry.is_stale(policy.period, now);
        Ok(entry.ensured && !stale)
    }

    /// Record that `hash` was verified for `image_ref` at `now`.
    pub fn mark_ensured(&self, image_ref: &str, hash: &str, now: DateTime<Utc>) -> Result<()> {
        self.store
            .merge_entry(image_ref, hash, EnsuredEntry::ensured_at(now))
    }
}

impl PullInfoReader for ImagePullCache {
    fn load_image_manager_cache(&self, image_ref: &str) -> Result<()> {
        self.store.hydrate(image_ref)
    }

    fn get_image_pull_info(&self, image_ref: &str) -> Result<Option<PullRecord>> {
        Ok(self
            .store
            .get_record(image_ref)?
            .map(|record| record.snapshot()))
    }

    fn get_auth_info(&self, image_ref: &str, hash: &str) -> Result<Option<EnsuredEntry>> {
        self.store.get_entry(image_ref, hash)
    }
}

impl PullInfoWriter for ImagePullCache {
    fn store_image_manager_cache(&self, image_ref: &str) -> Result<()> {
        self.store.store_record(image_ref)
    }

    fn refresh_image_manager_cache(
        &self,
        recheck: bool,
        recheck_period: Duration,
    ) -> Result<SweepReport> {
        let policy = RecheckPolicy {
            enabled: recheck,
            period: recheck_period,
        };
        RefreshSweeper::new(&self.store).sweep(policy)
    }

    fn set_image_pull_info(&self, image_ref: &str, hash: &str, entry: EnsuredEntry) -> Result<()> {
        self.store.set_entry(image_ref, hash, entry)
    }

    fn merge_image_pull_info(
        &self,
        image_ref: &str,
        hash: &str,
        entry: EnsuredEntry,
    ) -> Result<()> {
        self.store.merge_entry(image_ref, hash, entry)
    }

    fn delete_image_pull_info(&self, image_ref: &str) -> Result<()> {
        self.store.delete_record(image_ref)
    }

    fn set_auth_info(&self, image_ref: &str, hash: &str, entry: EnsuredEntry) {
        self.store.set_entry_no_store(image_ref, hash, entry);
    }

    fn delete_auth_info(&self, image_ref: &str, hash: &str) {
        self.store.delete_entry(image_ref, hash);
    }
}

fn state_dir(root_dir: &Path) -> PathBuf {
    root_dir.join(STATE_DIR_NAME)
}
