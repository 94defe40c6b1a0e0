//! Fixed-point directory size aggregation.

use std::collections::HashMap;
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use dirindex_core::{MetadataRecord, ScanError};

/// Result of an aggregation run.
#[derive(Debug)]
pub struct Aggregation {
    /// Final path -> record map with resolved directory sizes.
    pub entries: HashMap<PathBuf, MetadataRecord>,
    /// Number of relaxation passes performed.
    pub passes: u32,
    /// Whether the last pass changed nothing.
    pub converged: bool,
}

/// Resolve directory sizes from a flat set of records.
///
/// Each pass recomputes every directory as the sum of its immediate
/// children's current sizes, deepest directories first, and passes repeat
/// until one changes nothing or `max_passes` is reached. A well-formed tree
/// settles in the first pass and is confirmed by the second; cyclic parent
/// links never settle and are cut off by the bound. Sizes from the final
/// pass are returned either way.
///
/// Records whose parent is not a directory in the set are detached and
/// become roots. Later duplicates of a path replace earlier ones.
pub fn aggregate(
    records: impl IntoIterator<Item = MetadataRecord>,
    max_passes: u32,
    cancel: &CancellationToken,
) -> Result<Aggregation, ScanError> {
    let mut entries: HashMap<PathBuf, MetadataRecord> = records
        .into_iter()
        .map(|record| (record.path.clone(), record))
        .collect();

    detach_orphans(&mut entries);

    let mut children: HashMap<PathBuf, Vec<PathBuf>> = HashMap::new();
    for record in entries.values() {
        if let Some(parent) = &record.parent_path {
            children
                .entry(parent.clone())
                .or_default()
                .push(record.path.clone());
        }
    }

    let mut directories: Vec<PathBuf> = entries
        .values()
        .filter(|r| r.is_directory)
        .map(|r| r.path.clone())
        .collect();
    directories.sort_by(|a, b| {
        let depth_a = a.components().count();
        let depth_b = b.components().count();
        depth_b.cmp(&depth_a).then_with(|| a.cmp(b))
    });

    let max_passes = max_passes.max(1);
    let mut passes = 0;
    let mut changed = true;

    while changed && passes < max_passes {
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }
        changed = false;
        passes += 1;

        for dir in &directories {
            let new_size = children.get(dir).map_or(0, |kids| {
                kids.iter()
                    .filter_map(|kid| entries.get(kid))
                    .fold(0u64, |acc, kid| acc.saturating_add(kid.size))
            });

            if let Some(record) = entries.get_mut(dir) {
                if record.size != new_size {
                    *record = record.with_size(new_size);
                    changed = true;
                }
            }
        }
    }

    let converged = !changed;
    if converged {
        debug!(passes, directories = directories.len(), "Directory sizes converged");
    } else {
        warn!(
            "Directory size aggregation may not have fully converged after {max_passes} passes"
        );
    }

    Ok(Aggregation {
        entries,
        passes,
        converged,
    })
}

/// Clear `parent_path` on records whose parent is not an indexed directory.
fn detach_orphans(entries: &mut HashMap<PathBuf, MetadataRecord>) {
    let orphans: Vec<PathBuf> = entries
        .values()
        .filter(|record| {
            record.parent_path.as_ref().is_some_and(|parent| {
                !entries.get(parent).is_some_and(|p| p.is_directory)
            })
        })
        .map(|record| record.path.clone())
        .collect();

    for path in orphans {
        if let Some(record) = entries.get_mut(&path) {
            record.parent_path = None;
        }
    }
}
