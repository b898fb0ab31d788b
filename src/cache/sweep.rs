//! Time-based expiry of ensured credential entries.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use super::store::CacheStore;
use crate::error::Result;

/// When ensured entries must be verified again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecheckPolicy {
    /// Whether entries expire at all.
    pub enabled: bool,
    /// Age after which an entry is stale. Zero means never.
    pub period: Duration,
}

impl RecheckPolicy {
    /// A policy that never expires anything.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            period: Duration::zero(),
        }
    }

    /// Expire entries older than `period`.
    pub fn every(period: Duration) -> Self {
        Self {
            enabled: true,
            period,
        }
    }

    /// Whether a sweep under this policy can remove anything.
    pub fn is_active(&self) -> bool {
        self.enabled && self.period > Duration::zero()
    }
}

impl Default for RecheckPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Records examined.
    pub records_scanned: usize,
    /// Credential entries removed as stale.
    pub entries_expired: usize,
    /// Records written back to disk.
    pub records_persisted: usize,
}

/// Walks a [`CacheStore`] and drops stale entries.
pub struct RefreshSweeper<'a> {
    store: &'a CacheStore,
}

impl<'a> RefreshSweeper<'a> {
    /// Create a sweeper over `store`.
    pub fn new(store: &'a CacheStore) -> Self {
        Self { store }
    }

    /// Sweep using the current time.
    pub fn sweep(&self, policy: RecheckPolicy) -> Result<SweepReport> {
        self.sweep_at(policy, Utc::now())
    }

    /// Sweep as if the current time were `now`.
    ///
    /// Each record that loses entries is persisted before the next record
    /// is examined. The first write failure stops the sweep; removals made
    /// before it stay in memory.
    pub fn sweep_at(&self, policy: RecheckPolicy, now: DateTime<Utc>) -> Result<SweepReport> {
        let mut report = SweepReport::default();
        if !policy.is_active() {
            debug!("Recheck disabled, skipping sweep");
            return Ok(report);
        }

        for (image_ref, record) in self.store.entries() {
            let mut state = record.state.write();
            if state.detached {
                continue;
            }
            report.records_scanned += 1;

            let expired = state.record.remove_stale(policy.period, now);
            if expired.is_empty() {
                continue;
            }
            debug!(
                "Expired {} credential entries for {}",
                expired.len(),
                image_ref
            );
            report.entries_expired += expired.len();

            self.store.files().store(&image_ref, Some(&state.record))?;
            report.records_persisted += 1;
        }

        info!(
            "Swept {} records, expired {} entries",
            report.records_scanned, report.entries_expired
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::entry::EnsuredEntry;
    use crate::cache::persistence::RecordFiles;
    use tempfile::TempDir;

    fn store() -> (CacheStore, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(RecordFiles::new(temp.path()));
        (store, temp)
    }

    #[test]
    fn policy_activity() {
        assert!(!RecheckPolicy::disabled().is_active());
        assert!(!RecheckPolicy::every(Duration::zero()).is_active());
        assert!(RecheckPolicy::every(Duration::hours(1)).is_active());
        assert_eq!(RecheckPolicy::default(), RecheckPolicy::disabled());
    }

    #[test]
    fn removes_stale_and_keeps_fresh() {
        let (store, _temp) = store();
        let period = Duration::hours(1);
        let now = Utc::now();
        store
            .set_entry("old", "h", EnsuredEntry::ensured_at(now - period * 2))
            .unwrap();
        store
            .set_entry("new", "h", EnsuredEntry::ensured_at(now))
            .unwrap();

        let report = RefreshSweeper::new(&store)
            .sweep_at(RecheckPolicy::every(period), now)
            .unwrap();

        assert_eq!(report.records_scanned, 2);
        assert_eq!(report.entries_expired, 1);
        assert_eq!(report.records_persisted, 1);
        assert!(store.get_entry("old", "h").unwrap().is_none());
        assert!(store.get_entry("new", "h").unwrap().is_some());
    }

    #[test]
    fn persists_swept_record() {
        let (store, _temp) = store();
        let now = Utc::now();
        store.set_entry_no_store("img", "h1", EnsuredEntry::ensured_at(now - Duration::days(3)));

        RefreshSweeper::new(&store)
            .sweep_at(RecheckPolicy::every(Duration::days(1)), now)
            .unwrap();

        let on_disk = store.files().load("img").unwrap().unwrap();
        assert!(on_disk.is_empty());
    }

    #[test]
    fn zero_period_leaves_everything() {
        let (store, _temp) = store();
        let ancient = EnsuredEntry::ensured_at(Utc::now() - Duration::days(3650));
        store.set_entry("img", "h", ancient).unwrap();

        let report = RefreshSweeper::new(&store)
            .sweep(RecheckPolicy::every(Duration::zero()))
            .unwrap();

        assert_eq!(report, SweepReport::default());
        assert_eq!(store.get_entry("img", "h").unwrap(), Some(ancient));
    }

    #[test]
    fn disabled_recheck_leaves_everything() {
        let (store, _temp) = store();
        let ancient = EnsuredEntry::ensured_at(Utc::now() - Duration::days(3650));
        store.set_entry("img", "h", ancient).unwrap();

        let policy = RecheckPolicy {
            enabled: false,
            period: Duration::hours(1),
        };
        RefreshSweeper::new(&store).sweep(policy).unwrap();

        assert_eq!(store.get_entry("img", "h").unwrap(), Some(ancient));
    }

    #[test]
    fn emptied_record_is_retained() {
        let (store, _temp) = store();
        let now = Utc::now();
        store
            .set_entry("img", "h", EnsuredEntry::ensured_at(now - Duration::days(2)))
            .unwrap();

        RefreshSweeper::new(&store)
            .sweep_at(RecheckPolicy::every(Duration::days(1)), now)
            .unwrap();

        assert!(store.get_record("img").unwrap().unwrap().is_empty());
        assert!(store.files().path_for("img").exists());
    }

    #[cfg(unix)]
    #[test]
    fn write_failure_aborts_sweep() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("cache");
        let store = CacheStore::new(RecordFiles::new(&dir));
        let now = Utc::now();
        store.set_entry_no_store("a", "h", EnsuredEntry::ensured_at(now - Duration::days(2)));
        store.set_entry_no_store("b", "h", EnsuredEntry::ensured_at(now - Duration::days(2)));

        // A plain file where the directory should be makes every write fail,
        // even when the tests run as root.
        std::fs::write(&dir, "not a directory").unwrap();

        let result = RefreshSweeper::new(&store)
            .sweep_at(RecheckPolicy::every(Duration::days(1)), now);

        assert!(result.is_err());
        let remaining: usize = ["a", "b"]
            .iter()
            .map(|image| store.get_record(image).unwrap().unwrap().len())
            .sum();
        assert_eq!(remaining, 1, "sweep should stop after the first failure");
    }
}
