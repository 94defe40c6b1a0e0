//! Per-entry metadata records.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::content::type_tag_for;

/// Type tag given to every directory record.
pub const DIRECTORY_TAG: &str = "directory";

/// Metadata for a single file or directory in the index.
///
/// Records are immutable values. Aggregation produces a new record through
/// [`MetadataRecord::with_size`] rather than mutating in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Absolute path, unique within an index.
    pub path: PathBuf,

    /// Last path component.
    pub name: CompactString,

    /// Whether this entry is a directory.
    pub is_directory: bool,

    /// Size in bytes (aggregate for directories).
    pub size: u64,

    /// Last content modification time.
    pub modification_time: DateTime<Utc>,

    /// Creation time.
    pub creation_time: DateTime<Utc>,

    /// Best-effort content type classification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_tag: Option<CompactString>,

    /// Path of the parent directory, absent for roots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_path: Option<PathBuf>,
}

impl MetadataRecord {
    /// Create a file record.
    pub fn file(
        path: impl Into<PathBuf>,
        size: u64,
        modification_time: DateTime<Utc>,
        creation_time: DateTime<Utc>,
    ) -> Self {
        let path = path.into();
        let type_tag = type_tag_for(&path);
        Self {
            name: name_of(&path),
            parent_path: path.parent().map(Path::to_path_buf),
            path,
            is_directory: false,
            size,
            modification_time,
            creation_time,
            type_tag,
        }
    }

    /// Create a directory record with a placeholder size of zero.
    pub fn directory(
        path: impl Into<PathBuf>,
        modification_time: DateTime<Utc>,
        creation_time: DateTime<Utc>,
    ) -> Self {
        let path = path.into();
        Self {
            name: name_of(&path),
            parent_path: path.parent().map(Path::to_path_buf),
            path,
            is_directory: true,
            size: 0,
            modification_time,
            creation_time,
            type_tag: Some(CompactString::new(DIRECTORY_TAG)),
        }
    }

    /// Return a copy of this record with a different size.
    pub fn with_size(&self, size: u64) -> Self {
        Self {
            size,
            ..self.clone()
        }
    }

    /// Return a copy of this record with a different parent.
    pub fn with_parent(&self, parent_path: Option<PathBuf>) -> Self {
        Self {
            parent_path,
            ..self.clone()
        }
    }

    /// Check if this record has no parent inside the index.
    pub fn is_root(&self) -> bool {
        self.parent_path.is_none()
    }
}

/// Last component of a path, or the whole path when it has none (e.g. `/`).
fn name_of(path: &Path) -> CompactString {
    path.file_name()
        .map(|n| CompactString::new(n.to_string_lossy()))
        .unwrap_or_else(|| CompactString::new(path.to_string_lossy()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn test_file_record() {
        let t = now();
        let record = MetadataRecord::file("/data/photos/cat.JPG", 2048, t, t);

        assert!(!record.is_directory);
        assert_eq!(record.name.as_str(), "cat.JPG");
        assert_eq!(record.size, 2048);
        assert_eq!(record.parent_path, Some(PathBuf::from("/data/photos")));
        assert_eq!(record.type_tag.as_deref(), Some("image/jpg"));
    }

    #[test]
    fn test_directory_record() {
        let t = now();
        let record = MetadataRecord::directory("/data/photos", t, t);

        assert!(record.is_directory);
        assert_eq!(record.size, 0);
        assert_eq!(record.type_tag.as_deref(), Some(DIRECTORY_TAG));
        assert!(!record.is_root());
    }

    #[test]
    fn test_filesystem_root_name() {
        let t = now();
        let record = MetadataRecord::directory("/", t, t);

        assert_eq!(record.name.as_str(), "/");
        assert!(record.is_root());
    }

    #[test]
    fn test_with_size_keeps_other_fields() {
        let t = now();
        let record = MetadataRecord::directory("/a", t, t);
        let sized = record.with_size(150);

        assert_eq!(sized.size, 150);
        assert_eq!(sized.path, record.path);
        assert_eq!(sized.modification_time, record.modification_time);
        assert_eq!(record.size, 0);
    }

    #[test]
    fn test_with_parent() {
        let t = now();
        let record = MetadataRecord::directory("/a", t, t).with_parent(None);
        assert!(record.is_root());
    }
}
