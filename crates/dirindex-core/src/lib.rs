//! Core types for dirindex.
//!
//! This crate provides the data structures shared by the crawler, the
//! aggregator and the index store: metadata records, content tagging,
//! configuration and error types.

mod config;
mod content;
mod error;
mod record;

pub use config::{
    DEFAULT_MAX_PASSES, DEFAULT_POLL_INTERVAL_MS, IndexConfig, IndexConfigBuilder,
    SNAPSHOT_FILE_NAME, default_state_dir,
};
pub use content::{ContentCategory, categorize_extension, type_tag_for};
pub use error::{ScanError, ScanWarning, WarningKind};
pub use record::{DIRECTORY_TAG, MetadataRecord};
