//! Snapshot persistence errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors reading, writing or removing the snapshot file.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The snapshot file could not be read, written or removed.
    #[error("Snapshot I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot file exists but does not decode.
    #[error("Corrupted snapshot at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A snapshot key disagrees with the record stored under it.
    #[error("Snapshot at {path} maps {key} to a record for {record}")]
    KeyMismatch {
        path: PathBuf,
        key: PathBuf,
        record: PathBuf,
    },

    /// The index could not be encoded.
    #[error("Failed to encode snapshot: {source}")]
    Encode {
        #[source]
        source: serde_json::Error,
    },
}

impl SnapshotError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Check if the file content, rather than the filesystem, is at fault.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::Corrupt { .. } | Self::KeyMismatch { .. })
    }
}
