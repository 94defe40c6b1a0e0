//! On-disk snapshot of the index.
//!
//! The snapshot is a pretty-printed JSON object mapping each path to its
//! record, ordered by path so successive snapshots diff cleanly. An empty
//! index is represented by the absence of the file.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{error, info, warn};

use dirindex_core::MetadataRecord;

use crate::error::SnapshotError;

/// Entries keyed by path, as held by the store.
pub type EntryMap = HashMap<PathBuf, MetadataRecord>;

/// Handle to the snapshot file location.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if a snapshot file is present.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load the snapshot, never failing.
    ///
    /// A missing file yields an empty map. A file that does not decode is
    /// logged, deleted, and yields an empty map. A file that cannot be read
    /// is logged and left in place.
    pub fn load(&self) -> EntryMap {
        match self.read() {
            Ok(Some(entries)) => {
                info!(
                    "Loaded snapshot with {} items from {}",
                    entries.len(),
                    self.path.display()
                );
                entries
            }
            Ok(None) => {
                info!(
                    "No snapshot found at {}. Starting with an empty index.",
                    self.path.display()
                );
                EntryMap::new()
            }
            Err(err) if err.is_corruption() => {
                error!("{err}. Deleting corrupted snapshot.");
                if let Err(err) = self.remove() {
                    error!("{err}");
                }
                EntryMap::new()
            }
            Err(err) => {
                error!("{err}. Starting with an empty index.");
                EntryMap::new()
            }
        }
    }

    /// Read and decode the snapshot. `Ok(None)` when the file is absent.
    pub fn read(&self) -> Result<Option<EntryMap>, SnapshotError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(SnapshotError::io(&self.path, err)),
        };

        let decoded: BTreeMap<PathBuf, MetadataRecord> =
            serde_json::from_slice(&bytes).map_err(|source| SnapshotError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        let mut entries = EntryMap::with_capacity(decoded.len());
        for (key, record) in decoded {
            if key != record.path {
                return Err(SnapshotError::KeyMismatch {
                    path: self.path.clone(),
                    key,
                    record: record.path,
                });
            }
            entries.insert(key, record);
        }
        Ok(Some(entries))
    }

    /// Persist `entries`, replacing any previous snapshot atomically.
    ///
    /// An empty map removes the file instead. On failure the previous
    /// snapshot is left untouched.
    pub fn save(&self, entries: &EntryMap) -> Result<(), SnapshotError> {
        if entries.is_empty() {
            if self.remove()? {
                info!("Deleted existing snapshot as current index is empty.");
            }
            return Ok(());
        }

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).map_err(|e| SnapshotError::io(dir, e))?;

        let ordered: BTreeMap<&PathBuf, &MetadataRecord> = entries.iter().collect();

        // The temp file lives next to the target so the rename stays on one
        // filesystem.
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| SnapshotError::io(dir, e))?;
        let tmp_path = tmp.path().to_path_buf();
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, &ordered)
                .map_err(|source| SnapshotError::Encode { source })?;
            writer.flush().map_err(|e| SnapshotError::io(&tmp_path, e))?;
        }
        tmp.as_file()
            .sync_all()
            .map_err(|e| SnapshotError::io(&tmp_path, e))?;
        tmp.persist(&self.path)
            .map_err(|e| SnapshotError::io(&self.path, e.error))?;

        info!(
            "Persisted snapshot with {} items to {}",
            entries.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Delete the snapshot. Returns whether a file was removed.
    pub fn remove(&self) -> Result<bool, SnapshotError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => {
                warn!("Failed to delete snapshot at {}: {err}", self.path.display());
                Err(SnapshotError::io(&self.path, err))
            }
        }
    }
}
