//! The authoritative in-memory index.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use dirindex_core::{IndexConfig, MetadataRecord};

use crate::snapshot::{EntryMap, SnapshotFile};

/// Summary counts over the current index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Total number of records.
    pub entries: usize,
    /// Number of non-directory records.
    pub files: usize,
    /// Number of directory records.
    pub directories: usize,
    /// Number of records without a parent in the index.
    pub roots: usize,
    /// Sum of root sizes, i.e. everything indexed.
    pub total_size: u64,
}

/// Proof of ownership of the single in-flight scan.
#[derive(Debug, Clone)]
pub struct ScanTicket {
    id: u64,
    cancel: CancellationToken,
}

impl ScanTicket {
    /// Token observed by this scan's crawl and aggregation.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Check if this scan has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

#[derive(Debug)]
struct StoreState {
    entries: Arc<EntryMap>,
    active_scan: Option<ScanTicket>,
}

/// Path-keyed index with scan lifecycle state and snapshot persistence.
///
/// Readers always see the last committed map. Snapshot file operations are
/// serialized by their own lock, which is always taken before the state
/// lock.
#[derive(Debug)]
pub struct IndexStore {
    state: RwLock<StoreState>,
    snapshot: Mutex<SnapshotFile>,
    next_scan_id: AtomicU64,
}

impl IndexStore {
    /// Open the store, restoring the snapshot named by `config`.
    pub fn open(config: &IndexConfig) -> Self {
        Self::with_snapshot(SnapshotFile::new(config.snapshot_path()))
    }

    /// Open the store backed by a specific snapshot file.
    pub fn with_snapshot(snapshot: SnapshotFile) -> Self {
        let entries = snapshot.load();
        Self {
            state: RwLock::new(StoreState {
                entries: Arc::new(entries),
                active_scan: None,
            }),
            snapshot: Mutex::new(snapshot),
            next_scan_id: AtomicU64::new(1),
        }
    }

    /// All records in the current index, in no particular order.
    pub fn get_all(&self) -> Vec<MetadataRecord> {
        self.entries().values().cloned().collect()
    }

    /// Look up a record by path. Absence is not an error.
    pub fn get_by_path(&self, path: impl AsRef<Path>) -> Option<MetadataRecord> {
        self.state.read().entries.get(path.as_ref()).cloned()
    }

    /// Number of indexed records.
    pub fn count(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Check if a scan is in flight.
    pub fn is_scanning(&self) -> bool {
        self.state.read().active_scan.is_some()
    }

    /// Shared handle to the current map. Cheap; later commits do not
    /// affect it.
    pub fn entries(&self) -> Arc<EntryMap> {
        Arc::clone(&self.state.read().entries)
    }

    /// Location of the snapshot file.
    pub fn snapshot_path(&self) -> std::path::PathBuf {
        self.snapshot.lock().path().to_path_buf()
    }

    /// Summary counts over the current index.
    pub fn stats(&self) -> IndexStats {
        let entries = self.entries();
        let mut stats = IndexStats {
            entries: entries.len(),
            ..IndexStats::default()
        };
        for record in entries.values() {
            if record.is_directory {
                stats.directories += 1;
            } else {
                stats.files += 1;
            }
            if record.is_root() {
                stats.roots += 1;
                stats.total_size = stats.total_size.saturating_add(record.size);
            }
        }
        stats
    }

    /// Empty the index and delete the snapshot. Idempotent.
    pub fn clear(&self) {
        let snapshot = self.snapshot.lock();
        self.state.write().entries = Arc::new(EntryMap::new());
        match snapshot.remove() {
            Ok(true) => info!("Deleted snapshot at {}", snapshot.path().display()),
            Ok(false) => {}
            Err(err) => error!("{err}"),
        }
        info!("File index and snapshot cleared.");
    }

    /// Replace the whole index and persist it.
    pub fn commit(&self, entries: EntryMap) {
        let snapshot = self.snapshot.lock();
        self.state.write().entries = Arc::new(entries);
        self.persist(&snapshot);
    }

    /// Claim the single scan slot. `None` if a scan is already in flight.
    pub fn begin_scan(&self) -> Option<ScanTicket> {
        let mut state = self.state.write();
        if state.active_scan.is_some() {
            return None;
        }
        let ticket = ScanTicket {
            id: self.next_scan_id.fetch_add(1, Ordering::Relaxed),
            cancel: CancellationToken::new(),
        };
        state.active_scan = Some(ticket.clone());
        Some(ticket)
    }

    /// Commit a finished scan's map.
    ///
    /// Refused, leaving the index and snapshot untouched, when the ticket
    /// is not the active scan or has been cancelled. Cancellation is
    /// decided under the same lock as the swap.
    pub fn commit_scan(&self, ticket: &ScanTicket, entries: EntryMap) -> bool {
        let snapshot = self.snapshot.lock();
        {
            let mut state = self.state.write();
            let active = state.active_scan.as_ref().is_some_and(|t| t.id == ticket.id);
            if !active || ticket.is_cancelled() {
                return false;
            }
            state.entries = Arc::new(entries);
        }
        self.persist(&snapshot);
        true
    }

    /// Release the scan slot held by `ticket`.
    pub fn end_scan(&self, ticket: &ScanTicket) {
        let mut state = self.state.write();
        if state.active_scan.as_ref().is_some_and(|t| t.id == ticket.id) {
            state.active_scan = None;
        }
    }

    /// Signal the active scan to stop. Returns `false` if none is active.
    pub fn cancel_active(&self) -> bool {
        let state = self.state.read();
        match &state.active_scan {
            Some(ticket) => {
                ticket.cancel.cancel();
                true
            }
            None => false,
        }
    }

    fn persist(&self, snapshot: &SnapshotFile) {
        let entries = self.entries();
        if let Err(err) = snapshot.save(&entries) {
            error!("Failed to persist snapshot: {err}");
        }
    }
}
