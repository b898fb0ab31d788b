//! Ensured image pull credential cache.
//!
//! This module records, per image reference, which credential hashes have
//! been verified against the registry and when, keeps that state on disk
//! across restarts, and expires it after a caller-supplied recheck period.

pub mod entry;
pub mod persistence;
pub mod state;
pub mod store;
pub mod sweep;

pub use entry::{CredentialRecord, EnsuredEntry, PullRecord};
pub use persistence::{RecordFiles, StoredRecord};
pub use state::{ImagePullCache, ImagePullState, PullInfoReader, PullInfoWriter, STATE_DIR_NAME};
pub use store::CacheStore;
pub use sweep::{RecheckPolicy, RefreshSweeper, SweepReport};
