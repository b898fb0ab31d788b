//! Ensured entry and pull record types.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Verification state of one credential hash for one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnsuredEntry {
    /// True once the credential was verified against the registry.
    pub ensured: bool,
    /// When the credential was last verified.
    pub last_ensured_date: DateTime<Utc>,
}

impl EnsuredEntry {
    /// An entry verified at `at`.
    pub fn ensured_at(at: DateTime<Utc>) -> Self {
        Self {
            ensured: true,
            last_ensured_date: at,
        }
    }

    /// An entry verified now.
    pub fn ensured_now() -> Self {
        Self::ensured_at(Utc::now())
    }

    /// Whether `last_ensured_date + period` lies before `now`.
    ///
    /// A period so large that the due date overflows never goes stale.
    pub fn is_stale(&self, period: Duration, now: DateTime<Utc>) -> bool {
        self.last_ensured_date
            .checked_add_signed(period)
            .is_some_and(|due| due < now)
    }

    /// Time elapsed since the last verification.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.last_ensured_date)
    }
}

/// The credential hashes ensured for one image reference.
///
/// This is the serializable view of a record; [`CredentialRecord`] is the
/// lock-guarded in-memory form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRecord {
    /// Credential hash to its ensured entry.
    #[serde(default)]
    pub auths: HashMap<String, EnsuredEntry>,
}

impl PullRecord {
    /// A record holding a single credential hash.
    pub fn single(hash: impl Into<String>, entry: EnsuredEntry) -> Self {
        let mut auths = HashMap::with_capacity(1);
        auths.insert(hash.into(), entry);
        Self { auths }
    }

    /// Look up one credential hash.
    pub fn get(&self, hash: &str) -> Option<&EnsuredEntry> {
        self.auths.get(hash)
    }

    /// Number of credential hashes held.
    pub fn len(&self) -> usize {
        self.auths.len()
    }

    /// Whether no credential hash is held.
    pub fn is_empty(&self) -> bool {
        self.auths.is_empty()
    }

    /// Drop every entry that is stale under `period` at `now`.
    ///
    /// Returns the removed hashes.
    pub fn remove_stale(&mut self, period: Duration, now: DateTime<Utc>) -> Vec<String> {
        let stale: Vec<String> = self
            .auths
            .iter()
            .filter(|(_, entry)| entry.is_stale(period, now))
            .map(|(hash, _)| hash.clone())
            .collect();
        for hash in &stale {
            self.auths.remove(hash);
        }
        stale
    }
}

/// Lock-protected contents of a [`CredentialRecord`].
#[derive(Debug, Default)]
pub(crate) struct RecordState {
    pub(crate) record: PullRecord,
    /// Set once the record has been removed from the store. Writers holding
    /// a detached record must re-resolve it.
    pub(crate) detached: bool,
}

/// In-memory record for one image reference.
///
/// Each record carries its own lock, so mutations of different images do
/// not contend beyond the brief store-level map lookup.
#[derive(Debug, Default)]
pub struct CredentialRecord {
    pub(crate) state: RwLock<RecordState>,
}

impl CredentialRecord {
    pub(crate) fn new(record: PullRecord) -> Self {
        Self {
            state: RwLock::new(RecordState {
                record,
                detached: false,
            }),
        }
    }

    /// A copy of the current auths.
    pub fn snapshot(&self) -> PullRecord {
        self.state.read().record.clone()
    }

    /// Look up one credential hash.
    pub fn get(&self, hash: &str) -> Option<EnsuredEntry> {
        self.state.read().record.get(hash).copied()
    }

    /// Number of credential hashes held.
    pub fn len(&self) -> usize {
        self.state.read().record.len()
    }

    /// Whether no credential hash is held.
    pub fn is_empty(&self) -> bool {
        self.state.read().record.is_empty()
    }
}
