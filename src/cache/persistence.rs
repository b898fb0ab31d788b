//! On-disk storage of pull records, one JSON file per image reference.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::entry::{EnsuredEntry, PullRecord};
use crate::error::{PullCacheError, Result};

/// File layout as written.
#[derive(Serialize)]
struct RecordFileRef<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a str>,
    auths: &'a HashMap<String, EnsuredEntry>,
}

/// File layout as read. `image` is absent in files written without it.
#[derive(Deserialize)]
struct RecordFile {
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    auths: HashMap<String, EnsuredEntry>,
}

/// A record file found by [`RecordFiles::list`].
#[derive(Debug, Clone)]
pub struct StoredRecord {
    /// Path of the record file.
    pub path: PathBuf,
    /// Image reference recorded in the file, if it has one.
    pub image: Option<String>,
    /// The decoded record.
    pub record: PullRecord,
}

/// Maps image references to record files under a flat directory.
#[derive(Debug, Clone)]
pub struct RecordFiles {
    dir: PathBuf,
}

impl RecordFiles {
    /// Create an adapter rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory holding the record files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the directory, owner-only, if it does not exist.
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| PullCacheError::io(&self.dir, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o700);
            fs::set_permissions(&self.dir, perms).map_err(|e| PullCacheError::io(&self.dir, e))?;
        }

        Ok(())
    }

    /// Path of the record file for an image reference.
    ///
    /// Image references contain `/`, `:` and `@`, so the file name is the
    /// hex SHA-256 of the reference rather than the reference itself.
    pub fn path_for(&self, image_ref: &str) -> PathBuf {
        let digest = Sha256::digest(image_ref.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(&digest[..])))
    }

    /// Load the record for an image reference.
    ///
    /// Returns `Ok(None)` when no file exists or `image_ref` is empty.
    pub fn load(&self, image_ref: &str) -> Result<Option<PullRecord>> {
        if image_ref.is_empty() {
            return Ok(None);
        }

        let path = self.path_for(image_ref);
        match fs::metadata(&path) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No pull record on disk for {}", image_ref);
                return Ok(None);
            }
            Err(e) => return Err(PullCacheError::io(path, e)),
        }

        let file = read_record_file(&path)?;
        debug!(
            "Loaded pull record for {} with {} auths",
            image_ref,
            file.auths.len()
        );
        Ok(Some(PullRecord { auths: file.auths }))
    }

    /// Write the record for an image reference, replacing any existing file.
    ///
    /// A `None` record or an empty `image_ref` writes nothing.
    pub fn store(&self, image_ref: &str, record: Option<&PullRecord>) -> Result<()> {
        let Some(record) = record else {
            return Ok(());
        };
        if image_ref.is_empty() {
            return Ok(());
        }

        let path = self.path_for(image_ref);
        let body = RecordFileRef {
            image: Some(image_ref),
            auths: &record.auths,
        };
        let json =
            serde_json::to_vec_pretty(&body).map_err(|source| PullCacheError::Encode { source })?;

        // Write to a sibling temp file, then rename over the target so a
        // crash never leaves a truncated record behind.
        let temp_path = path.with_extension("json.tmp");
        write_owner_only(&temp_path, &json)?;
        fs::rename(&temp_path, &path).map_err(|e| PullCacheError::io(&path, e))?;

        debug!("Stored pull record for {} at {}", image_ref, path.display());
        Ok(())
    }

    /// Delete the record file for an image reference.
    ///
    /// A file that is already gone is not an error.
    pub fn remove(&self, image_ref: &str) -> Result<()> {
        if image_ref.is_empty() {
            return Ok(());
        }

        let path = self.path_for(image_ref);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed pull record for {}", image_ref);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PullCacheError::io(path, e)),
        }
    }

    /// Decode every record file in the directory.
    ///
    /// A missing directory lists as empty. Subdirectories and temp files
    /// are ignored.
    pub fn list(&self) -> Result<Vec<StoredRecord>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PullCacheError::io(&self.dir, e)),
        };

        let mut records = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| PullCacheError::io(&self.dir, e))?;
            let path = entry.path();

            if !path.is_file() || path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }

            let file = match read_record_file(&path) {
                Ok(file) => file,
                // Removed between the directory scan and the read.
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            };
            records.push(StoredRecord {
                path,
                image: file.image,
                record: PullRecord { auths: file.auths },
            });
        }

        records.sort_by(|a, b| a.image.cmp(&b.image).then_with(|| a.path.cmp(&b.path)));
        Ok(records)
    }
}

fn read_record_file(path: &Path) -> Result<RecordFile> {
    let bytes = fs::read(path).map_err(|e| PullCacheError::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|source| PullCacheError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

fn write_owner_only(path: &Path, contents: &[u8]) -> Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path).map_err(|e| PullCacheError::io(path, e))?;
    file.write_all(contents)
        .and_then(|()| file.sync_all())
        .map_err(|e| PullCacheError::io(path, e))?;

    // The mode above only applies when the file is created.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .map_err(|e| PullCacheError::io(path, e))?;
    }

    Ok(())
}
