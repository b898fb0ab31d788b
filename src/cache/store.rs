//! In-memory record store, synchronized with disk.
//!
//! # Locking
//!
//! The map lock is always taken before a record lock and is never requested
//! while a record lock is held. A record's `Arc` lives as long as its key
//! is in the map; overwrites replace the record's contents under its own
//! lock, so every write to one image's file is serialized by that lock.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::entry::{CredentialRecord, EnsuredEntry, PullRecord, RecordState};
use super::persistence::RecordFiles;
use crate::error::Result;

/// Storage for image pull records.
#[derive(Debug)]
pub struct CacheStore {
    records: RwLock<HashMap<String, Arc<CredentialRecord>>>,
    files: RecordFiles,
}

impl CacheStore {
    /// Create an empty store backed by `files`.
    pub fn new(files: RecordFiles) -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            files,
        }
    }

    /// The persistence adapter.
    pub fn files(&self) -> &RecordFiles {
        &self.files
    }

    /// Load the record for `image_ref` from disk unless it is already held.
    pub fn hydrate(&self, image_ref: &str) -> Result<()> {
        if self.records.read().contains_key(image_ref) {
            return Ok(());
        }

        // The load runs under the map lock so a concurrent delete cannot
        // remove the file between our read and our insert.
        let mut records = self.records.write();
        if records.contains_key(image_ref) {
            return Ok(());
        }
        if let Some(record) = self.files.load(image_ref)? {
            records.insert(
                image_ref.to_string(),
                Arc::new(CredentialRecord::new(record)),
            );
        }
        Ok(())
    }

    /// Insert a record already read from disk unless one is held.
    pub(crate) fn insert_loaded(&self, image_ref: &str, record: PullRecord) {
        self.records
            .write()
            .entry(image_ref.to_string())
            .or_insert_with(|| Arc::new(CredentialRecord::new(record)));
    }

    /// The record for `image_ref`, hydrating from disk on a miss.
    pub fn get_record(&self, image_ref: &str) -> Result<Option<Arc<CredentialRecord>>> {
        self.hydrate(image_ref)?;
        Ok(self.cached(image_ref))
    }

    /// The entry for `hash` within the record for `image_ref`.
    pub fn get_entry(&self, image_ref: &str, hash: &str) -> Result<Option<EnsuredEntry>> {
        Ok(self
            .get_record(image_ref)?
            .and_then(|record| record.get(hash)))
    }

    /// Replace the whole record for `image_ref` with `{hash: entry}` and
    /// persist it. Sibling hashes are discarded.
    ///
    /// Memory is only updated once the write succeeds.
    pub fn set_entry(&self, image_ref: &str, hash: &str, entry: EnsuredEntry) -> Result<()> {
        self.with_record_mut(image_ref, |state| {
            let record = PullRecord::single(hash, entry);
            self.files.store(image_ref, Some(&record))?;
            state.record = record;
            Ok(())
        })
    }

    /// Same overwrite as [`set_entry`](Self::set_entry), in memory only.
    pub fn set_entry_no_store(&self, image_ref: &str, hash: &str, entry: EnsuredEntry) {
        // The closure cannot fail, so neither can the call.
        let _ = self.with_record_mut(image_ref, |state| {
            state.record = PullRecord::single(hash, entry);
            Ok(())
        });
    }

    /// Insert or replace `hash` in the record for `image_ref`, keeping the
    /// other hashes, and persist it.
    pub fn merge_entry(&self, image_ref: &str, hash: &str, entry: EnsuredEntry) -> Result<()> {
        self.hydrate(image_ref)?;
        self.with_record_mut(image_ref, |state| {
            let mut record = state.record.clone();
            record.auths.insert(hash.to_string(), entry);
            self.files.store(image_ref, Some(&record))?;
            state.record = record;
            Ok(())
        })
    }

    /// Remove `hash` from the in-memory record for `image_ref`.
    ///
    /// The record is kept even if no hashes remain. Returns whether an
    /// entry was removed.
    pub fn delete_entry(&self, image_ref: &str, hash: &str) -> bool {
        let Some(record) = self.cached(image_ref) else {
            return false;
        };
        let mut state = record.state.write();
        if state.detached {
            return false;
        }
        state.record.auths.remove(hash).is_some()
    }

    /// Remove the record for `image_ref` from memory and disk.
    pub fn delete_record(&self, image_ref: &str) -> Result<()> {
        let mut records = self.records.write();
        if let Some(record) = records.remove(image_ref) {
            let mut state = record.state.write();
            state.detached = true;
            debug!("Dropped pull record for {} from memory", image_ref);
        }
        self.files.remove(image_ref)
    }

    /// Persist the in-memory record for `image_ref`, if there is one.
    pub fn store_record(&self, image_ref: &str) -> Result<()> {
        let Some(record) = self.cached(image_ref) else {
            return Ok(());
        };
        let state = record.state.write();
        if state.detached {
            return Ok(());
        }
        self.files.store(image_ref, Some(&state.record))
    }

    /// Image references currently held in memory.
    pub fn image_refs(&self) -> Vec<String> {
        self.records.read().keys().cloned().collect()
    }

    /// A point-in-time list of the held records.
    pub(crate) fn entries(&self) -> Vec<(String, Arc<CredentialRecord>)> {
        self.records
            .read()
            .iter()
            .map(|(image_ref, record)| (image_ref.clone(), Arc::clone(record)))
            .collect()
    }

    /// Number of records held in memory.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether no records are held in memory.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn cached(&self, image_ref: &str) -> Option<Arc<CredentialRecord>> {
        self.records.read().get(image_ref).cloned()
    }

    /// Run `f` on the record for `image_ref` under its write lock, creating
    /// an empty record first if none is held.
    fn with_record_mut<F>(&self, image_ref: &str, mut f: F) -> Result<()>
    where
        F: FnMut(&mut RecordState) -> Result<()>,
    {
        loop {
            let record = Arc::clone(
                self.records
                    .write()
                    .entry(image_ref.to_string())
                    .or_default(),
            );
            let mut state = record.state.write();
            if state.detached {
                // Deleted after we resolved it; pick up the replacement.
                continue;
            }
            return f(&mut state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PullCacheError;
    use chrono::{Duration, Utc};
    use std::fs;
    use tempfile::TempDir;

    fn store() -> (CacheStore, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(RecordFiles::new(temp.path()));
        (store, temp)
    }

    #[test]
    fn set_and_get_entry() {
        let (store, _temp) = store();
        let entry = EnsuredEntry::ensured_now();

        store.set_entry("img-a", "hash1", entry).unwrap();

        assert_eq!(store.get_entry("img-a", "hash1").unwrap(), Some(entry));
        assert!(store.files().path_for("img-a").exists());
    }

    #[test]
    fn set_entry_overwrites_siblings() {
        let (store, _temp) = store();

        store
            .set_entry("img", "h1", EnsuredEntry::ensured_now())
            .unwrap();
        store
            .set_entry("img", "h2", EnsuredEntry::ensured_now())
            .unwrap();

        assert!(store.get_entry("img", "h1").unwrap().is_none());
        assert!(store.get_entry("img", "h2").unwrap().is_some());
        let on_disk = store.files().load("img").unwrap().unwrap();
        assert_eq!(on_disk.len(), 1);
    }

    #[test]
    fn merge_entry_keeps_siblings() {
        let (store, _temp) = store();

        store
            .merge_entry("img", "h1", EnsuredEntry::ensured_now())
            .unwrap();
        store
            .merge_entry("img", "h2", EnsuredEntry::ensured_now())
            .unwrap();

        assert!(store.get_entry("img", "h1").unwrap().is_some());
        assert!(store.get_entry("img", "h2").unwrap().is_some());
        assert_eq!(store.files().load("img").unwrap().unwrap().len(), 2);
    }

    #[test]
    fn merge_entry_hydrates_before_writing() {
        let temp = TempDir::new().unwrap();
        let files = RecordFiles::new(temp.path());
        files
            .store(
                "img",
                Some(&PullRecord::single("h1", EnsuredEntry::ensured_now())),
            )
            .unwrap();
        let store = CacheStore::new(files);

        store
            .merge_entry("img", "h2", EnsuredEntry::ensured_now())
            .unwrap();

        assert_eq!(store.files().load("img").unwrap().unwrap().len(), 2);
    }

    fn unwritable_store() -> (CacheStore, TempDir) {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("cache");
        fs::write(&dir, "not a directory").unwrap();
        (CacheStore::new(RecordFiles::new(dir)), temp)
    }

    #[test]
    fn failed_set_leaves_memory_unchanged() {
        let (store, _temp) = unwritable_store();

        let result = store.set_entry("img", "h", EnsuredEntry::ensured_now());

        assert!(matches!(result, Err(PullCacheError::Io { .. })));
        assert!(store.get_entry("img", "h").unwrap().is_none());
    }

    #[test]
    fn failed_set_keeps_previous_record() {
        let (store, _temp) = unwritable_store();
        let previous = EnsuredEntry::ensured_now();
        store.set_entry_no_store("img", "old", previous);

        assert!(store
            .set_entry("img", "new", EnsuredEntry::ensured_now())
            .is_err());

        assert_eq!(store.get_entry("img", "old").unwrap(), Some(previous));
        assert!(store.get_entry("img", "new").unwrap().is_none());
    }

    #[test]
    fn failed_merge_leaves_memory_unchanged() {
        let (store, _temp) = unwritable_store();
        store.set_entry_no_store("img", "h1", EnsuredEntry::ensured_now());

        let result = store.merge_entry("img", "h2", EnsuredEntry::ensured_now());

        assert!(matches!(result, Err(PullCacheError::Io { .. })));
        assert!(store.get_entry("img", "h1").unwrap().is_some());
        assert!(store.get_entry("img", "h2").unwrap().is_none());
    }

    #[test]
    fn set_entry_no_store_skips_disk() {
        let (store, _temp) = store();

        store.set_entry_no_store("img", "h1", EnsuredEntry::ensured_now());

        assert!(store.get_entry("img", "h1").unwrap().is_some());
        assert!(!store.files().path_for("img").exists());
    }

    #[test]
    fn hydrate_missing_leaves_memory_untouched() {
        let (store, _temp) = store();

        store.hydrate("img").unwrap();

        assert!(store.is_empty());
        assert!(store.get_record("img").unwrap().is_none());
    }

    #[test]
    fn hydrate_malformed_propagates() {
        let (store, _temp) = store();
        fs::write(store.files().path_for("img"), "{\"auths\": 42").unwrap();

        assert!(store.hydrate("img").is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn hydrate_does_not_replace_memory() {
        let (store, _temp) = store();
        store.set_entry_no_store("img", "mem", EnsuredEntry::ensured_now());
        store
            .files()
            .store(
                "img",
                Some(&PullRecord::single("disk", EnsuredEntry::ensured_now())),
            )
            .unwrap();

        store.hydrate("img").unwrap();

        assert!(store.get_entry("img", "mem").unwrap().is_some());
        assert!(store.get_entry("img", "disk").unwrap().is_none());
    }

    #[test]
    fn delete_entry_keeps_empty_record() {
        let (store, _temp) = store();
        store
            .set_entry("img", "h1", EnsuredEntry::ensured_now())
            .unwrap();

        assert!(store.delete_entry("img", "h1"));
        assert!(!store.delete_entry("img", "h1"));

        let record = store.get_record("img").unwrap().unwrap();
        assert!(record.is_empty());
    }

    #[test]
    fn delete_entry_unknown_record_is_noop() {
        let (store, _temp) = store();

        assert!(!store.delete_entry("img", "h1"));
        assert!(store.is_empty());
    }

    #[test]
    fn delete_record_removes_memory_and_file() {
        let (store, _temp) = store();
        store
            .set_entry("img", "h1", EnsuredEntry::ensured_now())
            .unwrap();

        store.delete_record("img").unwrap();

        assert!(store.get_record("img").unwrap().is_none());
        assert!(!store.files().path_for("img").exists());
    }

    #[test]
    fn delete_record_twice_succeeds() {
        let (store, _temp) = store();

        store.delete_record("img").unwrap();
        store.delete_record("img").unwrap();
    }

    #[test]
    fn detached_record_is_not_written() {
        let (store, _temp) = store();
        store
            .set_entry("img", "h1", EnsuredEntry::ensured_now())
            .unwrap();
        let stale = store.get_record("img").unwrap().unwrap();

        store.delete_record("img").unwrap();

        assert!(stale.state.read().detached);
        store.store_record("img").unwrap();
        assert!(!store.files().path_for("img").exists());
    }

    #[test]
    fn store_record_persists_memory_changes() {
        let (store, _temp) = store();
        let old = EnsuredEntry::ensured_at(Utc::now() - Duration::days(2));
        store.set_entry("img", "h1", old).unwrap();
        store.delete_entry("img", "h1");

        store.store_record("img").unwrap();

        assert!(store.files().load("img").unwrap().unwrap().is_empty());
    }

    #[test]
    fn empty_ref_never_creates_file() {
        let (store, temp) = store();

        store
            .set_entry("", "h1", EnsuredEntry::ensured_now())
            .unwrap();
        store.hydrate("").unwrap();

        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn image_refs_lists_held_records() {
        let (store, _temp) = store();
        store.set_entry_no_store("a", "h", EnsuredEntry::ensured_now());
        store.set_entry_no_store("b", "h", EnsuredEntry::ensured_now());

        let mut refs = store.image_refs();
        refs.sort();

        assert_eq!(refs, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(store.len(), 2);
    }
}
