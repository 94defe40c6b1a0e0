//! Index store, snapshot persistence and scan orchestration for dirindex.
//!
//! # Example
//!
//! ```rust,no_run
//! use dirindex_index::{IndexConfig, Indexer};
//!
//! # async fn run() {
//! let indexer = Indexer::new(IndexConfig::default());
//! indexer.scan(["/home/user"]).await;
//!
//! println!("Indexed {} entries", indexer.count());
//! if let Some(home) = indexer.get_by_path("/home/user") {
//!     println!("{} bytes", home.size);
//! }
//! # }
//! ```

mod controller;
mod error;
mod snapshot;
mod store;

pub use controller::Indexer;
pub use error::SnapshotError;
pub use snapshot::{EntryMap, SnapshotFile};
pub use store::{IndexStats, IndexStore, ScanTicket};

// Re-export core types for convenience
pub use dirindex_core::{IndexConfig, MetadataRecord, ScanError, ScanWarning, WarningKind};
pub use dirindex_scan::ScanProgress;
