//! Scan orchestration: fan-out crawl, aggregation, commit.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use dirindex_core::{IndexConfig, MetadataRecord, ScanError, ScanWarning};
use dirindex_scan::{Aggregation, ProgressTracker, ScanProgress, aggregate, crawl_root};

use crate::store::{IndexStats, IndexStore, ScanTicket};

/// Front door of the indexing engine.
///
/// Owns the [`IndexStore`] and runs at most one scan at a time on the
/// ambient tokio runtime. Every failure during a scan is absorbed here:
/// callers only observe [`Indexer::is_scanning`] and the store contents.
#[derive(Debug, Clone)]
pub struct Indexer {
    store: Arc<IndexStore>,
    config: Arc<IndexConfig>,
    progress: Arc<Mutex<Option<Arc<ProgressTracker>>>>,
}

impl Indexer {
    /// Create an indexer, restoring the persisted snapshot.
    pub fn new(config: IndexConfig) -> Self {
        let store = Arc::new(IndexStore::open(&config));
        Self::with_store(store, config)
    }

    /// Create an indexer over an existing store.
    pub fn with_store(store: Arc<IndexStore>, config: IndexConfig) -> Self {
        Self {
            store,
            config: Arc::new(config),
            progress: Arc::new(Mutex::new(None)),
        }
    }

    /// Underlying store.
    pub fn store(&self) -> &Arc<IndexStore> {
        &self.store
    }

    /// Active configuration.
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Start scanning `roots` in the background.
    ///
    /// Returns `false` without doing anything when a scan is already in
    /// flight, `roots` is empty, or there is no tokio runtime to run on.
    pub fn start_scan<I, P>(&self, roots: I) -> bool
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        if self.store.is_scanning() {
            info!("Indexing already in progress. Ignoring new request.");
            return false;
        }

        let roots: Vec<PathBuf> = roots.into_iter().map(Into::into).collect();
        if roots.is_empty() {
            warn!("No roots provided for indexing. Scan will not start.");
            return false;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            error!("No tokio runtime available. Scan will not start.");
            return false;
        };

        let Some(ticket) = self.store.begin_scan() else {
            info!("Indexing already in progress. Ignoring new request.");
            return false;
        };

        let readable = resolve_roots(&roots);
        info!(
            "Starting file indexing for roots: {}",
            readable
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );

        let tracker = Arc::new(ProgressTracker::new(readable.len()));
        *self.progress.lock() = Some(Arc::clone(&tracker));

        let store = Arc::clone(&self.store);
        let config = Arc::clone(&self.config);
        runtime.spawn(run_scan(store, config, ticket, readable, tracker));
        true
    }

    /// Start a scan only when the caller's permission check passed.
    pub fn start_scan_if_permitted<I, P>(&self, permitted: bool, roots: I) -> bool
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        if !permitted {
            warn!("Scanning is not permitted. Scan will not start.");
            return false;
        }
        self.start_scan(roots)
    }

    /// Request cancellation of the active scan. Returns `false` if none.
    pub fn cancel_scan(&self) -> bool {
        let cancelled = self.store.cancel_active();
        if !cancelled {
            info!("No indexing in progress to cancel.");
        }
        cancelled
    }

    /// Poll until no scan is in flight.
    pub async fn wait_idle(&self) {
        let interval = self.config.poll_interval();
        while self.store.is_scanning() {
            tokio::time::sleep(interval).await;
        }
    }

    /// Scan `roots` and wait for the outcome. Returns whether a scan ran.
    pub async fn scan<I, P>(&self, roots: I) -> bool
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let started = self.start_scan(roots);
        if started {
            self.wait_idle().await;
        }
        started
    }

    /// Progress of the active scan, if any.
    pub fn progress(&self) -> Option<ScanProgress> {
        if !self.store.is_scanning() {
            return None;
        }
        self.progress.lock().as_ref().map(|t| t.snapshot())
    }

    pub fn get_all(&self) -> Vec<MetadataRecord> {
        self.store.get_all()
    }

    pub fn get_by_path(&self, path: impl AsRef<Path>) -> Option<MetadataRecord> {
        self.store.get_by_path(path)
    }

    pub fn count(&self) -> usize {
        self.store.count()
    }

    pub fn is_scanning(&self) -> bool {
        self.store.is_scanning()
    }

    pub fn stats(&self) -> IndexStats {
        self.store.stats()
    }

    pub fn clear(&self) {
        self.store.clear();
    }
}

/// Canonicalize and deduplicate roots, dropping the unreadable ones.
fn resolve_roots(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut readable: Vec<PathBuf> = Vec::with_capacity(roots.len());
    for root in roots {
        let resolved = match root
            .canonicalize()
            .and_then(|p| std::fs::read_dir(&p).map(|_| p))
        {
            Ok(p) => p,
            Err(err) => {
                let warning = ScanWarning::unreadable_root(root, &err);
                warn!("{}. Skipping this root.", warning.message);
                continue;
            }
        };
        if readable.contains(&resolved) {
            debug!(root = %resolved.display(), "Duplicate root ignored");
            continue;
        }
        readable.push(resolved);
    }
    readable
}

async fn run_scan(
    store: Arc<IndexStore>,
    config: Arc<IndexConfig>,
    ticket: ScanTicket,
    roots: Vec<PathBuf>,
    tracker: Arc<ProgressTracker>,
) {
    let outcome = crawl_all(&config, &ticket, roots, &tracker).await;

    let outcome = match outcome {
        Ok(records) => {
            let store = Arc::clone(&store);
            let ticket = ticket.clone();
            let max_passes = config.max_passes;
            tokio::task::spawn_blocking(move || {
                let Aggregation {
                    entries, passes, ..
                } = aggregate(records, max_passes, ticket.cancel_token())?;
                debug!(passes, "Aggregation finished");
                if store.commit_scan(&ticket, entries) {
                    Ok(())
                } else {
                    Err(ScanError::Cancelled)
                }
            })
            .await
            .unwrap_or_else(|e| {
                Err(ScanError::TaskFailed {
                    message: e.to_string(),
                })
            })
        }
        Err(err) => Err(err),
    };

    match outcome {
        Ok(()) => {
            let progress = tracker.snapshot();
            info!(
                "File indexing finished in {:.2}s. Total items indexed: {} ({} skipped)",
                progress.elapsed.as_secs_f64(),
                store.count(),
                progress.warnings
            );
        }
        Err(ScanError::Cancelled) => info!("File indexing explicitly cancelled."),
        Err(err) => error!("File indexing failed: {err}"),
    }

    store.end_scan(&ticket);
}

/// Crawl every root concurrently and merge the records.
async fn crawl_all(
    config: &Arc<IndexConfig>,
    ticket: &ScanTicket,
    roots: Vec<PathBuf>,
    tracker: &Arc<ProgressTracker>,
) -> Result<Vec<MetadataRecord>, ScanError> {
    // A failing root stops its siblings without marking the scan cancelled.
    let crawl_cancel = ticket.cancel_token().child_token();
    let mut crawls = JoinSet::new();

    for root in roots {
        let config = Arc::clone(config);
        let cancel = crawl_cancel.clone();
        let tracker = Arc::clone(tracker);
        crawls.spawn_blocking(move || {
            let result = crawl_root(&root, &config, &cancel, Some(&tracker));
            tracker.root_finished();
            (root, result)
        });
    }

    let mut records = Vec::new();
    while let Some(joined) = crawls.join_next().await {
        let (root, result) = match joined {
            Ok(done) => done,
            Err(err) => {
                crawl_cancel.cancel();
                return Err(ScanError::TaskFailed {
                    message: err.to_string(),
                });
            }
        };

        match result {
            Ok(output) => records.extend(output.records),
            Err(ScanError::PermissionDenied { path } | ScanError::NotFound { path }) => {
                warn!(
                    "Root {} became unreadable during the scan, skipping it ({})",
                    root.display(),
                    path.display()
                );
            }
            Err(err) => {
                crawl_cancel.cancel();
                return Err(err);
            }
        }
    }

    if ticket.is_cancelled() {
        return Err(ScanError::Cancelled);
    }
    Ok(records)
}
