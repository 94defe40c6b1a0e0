//! JWalk-based per-root directory crawler.

use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(unix)]
use std::os::unix::fs::MetadataExt;

use chrono::{DateTime, Utc};
use jwalk::{Parallelism, WalkDir};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use dirindex_core::{IndexConfig, MetadataRecord, ScanError, ScanWarning, WarningKind};

use crate::progress::ProgressTracker;

/// Everything a single root crawl produced.
#[derive(Debug)]
pub struct CrawlOutput {
    /// Canonical root path that was crawled.
    pub root: PathBuf,
    /// Flat records for the root and all descendants. Directory sizes are
    /// placeholders until aggregation.
    pub records: Vec<MetadataRecord>,
    /// Entries skipped along the way.
    pub warnings: Vec<ScanWarning>,
}

/// Crawl one root, producing a flat list of records.
///
/// The walk runs serially on the calling thread; callers fan out one crawl
/// per root. Cancellation is checked before each directory is read and on
/// every entry, and surfaces as [`ScanError::Cancelled`].
///
/// Paths that are not valid UTF-8 cannot be persisted, so they are skipped
/// with a warning along with everything beneath them.
pub fn crawl_root(
    root: &Path,
    config: &IndexConfig,
    cancel: &CancellationToken,
    progress: Option<&ProgressTracker>,
) -> Result<CrawlOutput, ScanError> {
    if cancel.is_cancelled() {
        return Err(ScanError::Cancelled);
    }

    let root_path = root.canonicalize().map_err(|e| ScanError::io(root, e))?;
    let root_metadata = std::fs::metadata(&root_path).map_err(|e| ScanError::io(&root_path, e))?;
    if !root_metadata.is_dir() {
        return Err(ScanError::NotADirectory { path: root_path });
    }

    debug!(root = %root_path.display(), "Crawling root");

    if root_path.to_str().is_none() {
        let warning = ScanWarning::non_utf8(&root_path);
        warn!("{}. Root will be skipped.", warning.message);
        if let Some(progress) = progress {
            progress.record_warning();
        }
        return Ok(CrawlOutput {
            root: root_path,
            records: Vec::new(),
            warnings: vec![warning],
        });
    }

    let filter = Arc::new(config.clone());
    let hook_cancel = cancel.clone();

    // Hidden and package filtering happens here so excluded directories are
    // never descended into. The root arrives with `depth == None` and is
    // exempt. Non-UTF-8 directories are yielded (and skipped below) but not
    // read.
    let walker = WalkDir::new(&root_path)
        .parallelism(Parallelism::Serial)
        .skip_hidden(false)
        .follow_links(false)
        .sort(true)
        .process_read_dir(move |depth, _dir, _state, children| {
            if hook_cancel.is_cancelled() {
                children.clear();
                return;
            }
            if depth.is_some() {
                children.retain(|child| match child {
                    Ok(entry) => {
                        let name = entry.file_name().to_string_lossy();
                        if filter.should_skip_hidden(&name) {
                            return false;
                        }
                        !(entry.file_type().is_dir()
                            && filter.is_package(Path::new(entry.file_name())))
                    }
                    Err(_) => true,
                });
            }
            for entry in children.iter_mut().flatten() {
                if entry.file_name().to_str().is_none() {
                    entry.read_children_path = None;
                }
            }
        });

    let mut records = Vec::new();
    let mut warnings = Vec::new();

    for entry_result in walker {
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        let entry = match entry_result {
            Ok(e) => e,
            Err(err) => {
                let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root_path.clone());
                skip(&mut warnings, walk_warning(&path, &err), progress);
                continue;
            }
        };

        let path = entry.path();
        if path.to_str().is_none() {
            skip(&mut warnings, ScanWarning::non_utf8(&path), progress);
            continue;
        }

        // The directory itself is kept; only its contents are missing.
        if let Some(err) = &entry.read_children_error {
            let warning = walk_warning(&path, err);
            warn!(path = %path.display(), "{}. Contents will be skipped.", warning.message);
            if let Some(progress) = progress {
                progress.record_warning();
            }
            warnings.push(warning);
        }

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(err) => {
                skip(&mut warnings, ScanWarning::metadata(&path, err.to_string()), progress);
                continue;
            }
        };

        let Some((modified, created)) = timestamps(&metadata) else {
            skip(
                &mut warnings,
                ScanWarning::metadata(&path, "No modification or creation time available"),
                progress,
            );
            continue;
        };

        let record = if entry.file_type().is_dir() {
            MetadataRecord::directory(path, modified, created)
        } else {
            MetadataRecord::file(path, entry_size(&metadata, config.apparent_size), modified, created)
        };

        if let Some(progress) = progress {
            progress.record_entry();
        }
        records.push(record);
    }

    // A cancel landing inside the walk empties the remaining directory
    // listings instead of surfacing as an entry.
    if cancel.is_cancelled() {
        return Err(ScanError::Cancelled);
    }

    debug!(
        root = %root_path.display(),
        records = records.len(),
        warnings = warnings.len(),
        "Finished crawling root"
    );

    Ok(CrawlOutput {
        root: root_path,
        records,
        warnings,
    })
}

fn walk_warning(path: &Path, err: &jwalk::Error) -> ScanWarning {
    match err.io_error() {
        Some(io) => ScanWarning::read_error(path, io),
        None => ScanWarning::new(path, err.to_string(), WarningKind::ReadError),
    }
}

fn skip(warnings: &mut Vec<ScanWarning>, warning: ScanWarning, progress: Option<&ProgressTracker>) {
    warn!(path = %warning.path.display(), "{}. Item will be skipped.", warning.message);
    if let Some(progress) = progress {
        progress.record_warning();
    }
    warnings.push(warning);
}

/// Modification and creation time, each falling back to the other.
fn timestamps(metadata: &Metadata) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let created = metadata.created().ok();
    let modified = metadata.modified().ok().or(created)?;
    let created = created.unwrap_or(modified);
    Some((modified.into(), created.into()))
}

/// On-disk size of a non-directory entry.
fn entry_size(metadata: &Metadata, apparent_size: bool) -> u64 {
    if apparent_size {
        return metadata.len();
    }
    match allocated_size(metadata) {
        Some(allocated) => allocated,
        None => metadata.len(),
    }
}

/// Allocated size in bytes, from 512-byte blocks.
#[cfg(unix)]
fn allocated_size(metadata: &Metadata) -> Option<u64> {
    let blocks = metadata.blocks();
    if blocks == 0 && metadata.len() > 0 {
        // Some filesystems report no blocks for inline or remote data.
        return None;
    }
    Some(blocks.saturating_mul(512))
}

#[cfg(not(unix))]
fn allocated_size(_metadata: &Metadata) -> Option<u64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn apparent(state: &Path) -> IndexConfig {
        IndexConfig {
            apparent_size: true,
            ..IndexConfig::with_state_dir(state)
        }
    }

    fn create_test_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::create_dir(root.join("dir1")).unwrap();
        fs::create_dir(root.join("dir1/subdir")).unwrap();
        fs::write(root.join("file1.txt"), "hello").unwrap();
        fs::write(root.join("dir1/file2.txt"), "world world world").unwrap();
        fs::write(root.join("dir1/subdir/file3.txt"), "test").unwrap();

        temp
    }

    #[test]
    fn test_crawl_emits_flat_records() {
        let temp = create_test_tree();
        let config = apparent(temp.path());

        let output = crawl_root(temp.path(), &config, &CancellationToken::new(), None).unwrap();

        // root, dir1, subdir, 3 files
        assert_eq!(output.records.len(), 6);
        assert!(output.warnings.is_empty());

        let file2 = output
            .records
            .iter()
            .find(|r| r.name.as_str() == "file2.txt")
            .unwrap();
        assert_eq!(file2.size, 17);
        assert_eq!(file2.parent_path.as_deref(), Some(output.root.join("dir1").as_path()));
    }

    #[test]
    fn test_directories_have_placeholder_size() {
        let temp = create_test_tree();
        let config = apparent(temp.path());

        let output = crawl_root(temp.path(), &config, &CancellationToken::new(), None).unwrap();

        assert!(
            output
                .records
                .iter()
                .filter(|r| r.is_directory)
                .all(|r| r.size == 0)
        );
    }

    #[test]
    fn test_root_is_included_even_when_hidden() {
        // TempDir names start with a dot.
        let temp = create_test_tree();
        let config = apparent(temp.path());

        let output = crawl_root(temp.path(), &config, &CancellationToken::new(), None).unwrap();
        assert!(output.records.iter().any(|r| r.path == output.root));
    }

    #[test]
    fn test_hidden_root_keeps_contents() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join(".config");
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("settings.toml"), vec![0u8; 10]).unwrap();
        fs::write(root.join("nested/more.toml"), "x").unwrap();

        let output = crawl_root(&root, &apparent(temp.path()), &CancellationToken::new(), None).unwrap();

        // .config, nested, 2 files
        assert_eq!(output.records.len(), 4);
        assert!(output.records.iter().any(|r| r.path == output.root));
    }

    #[test]
    fn test_package_named_root_is_crawled() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("Tool.app");
        fs::create_dir_all(root.join("Contents")).unwrap();
        fs::write(root.join("Contents/Info.plist"), "<plist/>").unwrap();

        let output = crawl_root(&root, &apparent(temp.path()), &CancellationToken::new(), None).unwrap();

        assert_eq!(output.records.len(), 3);
    }

    #[test]
    fn test_hidden_entries_skipped() {
        let temp = create_test_tree();
        fs::create_dir(temp.path().join(".git")).unwrap();
        fs::write(temp.path().join(".git/HEAD"), "ref").unwrap();
        fs::write(temp.path().join(".env"), "X=1").unwrap();

        let config = apparent(temp.path());
        let output = crawl_root(temp.path(), &config, &CancellationToken::new(), None).unwrap();
        assert_eq!(output.records.len(), 6);

        let config = IndexConfig {
            include_hidden: true,
            ..apparent(temp.path())
        };
        let output = crawl_root(temp.path(), &config, &CancellationToken::new(), None).unwrap();
        assert_eq!(output.records.len(), 9);
    }

    #[test]
    fn test_package_directories_skipped() {
        let temp = create_test_tree();
        fs::create_dir_all(temp.path().join("Tool.app/Contents")).unwrap();
        fs::write(temp.path().join("Tool.app/Contents/Info.plist"), "<plist/>").unwrap();

        let config = apparent(temp.path());
        let output = crawl_root(temp.path(), &config, &CancellationToken::new(), None).unwrap();

        assert_eq!(output.records.len(), 6);
        assert!(!output.records.iter().any(|r| r.name.as_str() == "Tool.app"));
    }

    #[test]
    fn test_cancelled_before_start() {
        let temp = create_test_tree();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = crawl_root(temp.path(), &apparent(temp.path()), &cancel, None);
        assert!(matches!(result, Err(ScanError::Cancelled)));
    }

    #[test]
    fn test_missing_root() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");

        let result = crawl_root(&missing, &apparent(temp.path()), &CancellationToken::new(), None);
        assert!(matches!(result, Err(ScanError::NotFound { .. })));
    }

    #[test]
    fn test_file_root_rejected() {
        let temp = create_test_tree();
        let file = temp.path().join("file1.txt");

        let result = crawl_root(&file, &apparent(temp.path()), &CancellationToken::new(), None);
        assert!(matches!(result, Err(ScanError::NotADirectory { .. })));
    }

    #[test]
    fn test_progress_counts_records() {
        let temp = create_test_tree();
        let tracker = ProgressTracker::new(1);

        let output = crawl_root(
            temp.path(),
            &apparent(temp.path()),
            &CancellationToken::new(),
            Some(&tracker),
        )
        .unwrap();

        assert_eq!(tracker.snapshot().records_crawled, output.records.len() as u64);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_keeps_siblings() {
        use std::os::unix::fs::PermissionsExt;

        let temp = create_test_tree();
        let locked = temp.path().join("dir1/subdir");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not stop root.
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let output = crawl_root(
            temp.path(),
            &apparent(temp.path()),
            &CancellationToken::new(),
            None,
        );
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        let output = output.unwrap();

        // root, dir1, subdir, file1, file2; file3 is unreachable
        assert_eq!(output.records.len(), 5);
        assert!(output.records.iter().any(|r| r.name.as_str() == "file2.txt"));
        assert!(output.records.iter().any(|r| r.path.ends_with("dir1/subdir")));
        assert!(!output.records.iter().any(|r| r.name.as_str() == "file3.txt"));

        assert_eq!(output.warnings.len(), 1);
        assert!(output.warnings[0].path.ends_with("dir1/subdir"));
        assert!(matches!(
            output.warnings[0].kind,
            WarningKind::PermissionDenied | WarningKind::ReadError
        ));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_names_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = create_test_tree();
        let bad_file = temp.path().join(OsStr::from_bytes(b"bad\xff.txt"));
        let bad_dir = temp.path().join(OsStr::from_bytes(b"dir\xfe"));
        fs::write(&bad_file, "lost").unwrap();
        fs::create_dir(&bad_dir).unwrap();
        fs::write(bad_dir.join("inner.txt"), "also lost").unwrap();

        let output = crawl_root(
            temp.path(),
            &apparent(temp.path()),
            &CancellationToken::new(),
            None,
        )
        .unwrap();

        assert_eq!(output.records.len(), 6);
        assert!(output.records.iter().all(|r| r.path.to_str().is_some()));

        // One warning each; the directory was never read.
        assert_eq!(output.warnings.len(), 2);
        assert!(output.warnings.iter().all(|w| w.kind == WarningKind::NonUtf8Path));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_not_followed() {
        let temp = create_test_tree();
        std::os::unix::fs::symlink(temp.path().join("dir1"), temp.path().join("link")).unwrap();

        let output = crawl_root(
            temp.path(),
            &apparent(temp.path()),
            &CancellationToken::new(),
            None,
        )
        .unwrap();

        let link = output.records.iter().find(|r| r.name.as_str() == "link").unwrap();
        assert!(!link.is_directory);
        // Nothing beneath the link was indexed.
        assert_eq!(output.records.len(), 7);
    }
}
