//! Directory crawling and size aggregation for dirindex.
//!
//! # Overview
//!
//! `dirindex-scan` turns root directories into flat metadata records and
//! resolves directory sizes:
//!
//! - **Crawling** via jwalk, one serial walker per root
//! - **Cooperative cancellation** through a shared `CancellationToken`
//! - **Fixed-point aggregation** of directory sizes with a pass bound
//! - **Progress counters** that callers poll
//!
//! # Example
//!
//! ```rust,no_run
//! use dirindex_scan::{IndexConfig, aggregate, crawl_root};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = IndexConfig::default();
//! let cancel = CancellationToken::new();
//! let output = crawl_root("/path/to/scan".as_ref(), &config, &cancel, None).unwrap();
//! let sized = aggregate(output.records, config.max_passes, &cancel).unwrap();
//!
//! println!("Indexed {} entries", sized.entries.len());
//! ```

mod aggregate;
mod crawler;
mod progress;

pub use aggregate::{Aggregation, aggregate};
pub use crawler::{CrawlOutput, crawl_root};
pub use progress::{ProgressTracker, ScanProgress};

// Re-export core types for convenience
pub use dirindex_core::{IndexConfig, MetadataRecord, ScanError, ScanWarning, WarningKind};
