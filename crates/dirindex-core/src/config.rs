//! Index configuration types.

use std::path::{Path, PathBuf};
use std::time::Duration;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// Default number of aggregation passes before giving up on convergence.
pub const DEFAULT_MAX_PASSES: u32 = 10;

/// Default interval for the scan-completion polling loop.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// File name of the persisted snapshot inside the state directory.
pub const SNAPSHOT_FILE_NAME: &str = "snapshot.json";

/// Configuration for the indexing engine.
#[derive(Debug, Clone, PartialEq, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
#[serde(default)]
pub struct IndexConfig {
    /// Directory owning the persisted snapshot.
    #[builder(default = "default_state_dir()")]
    pub state_dir: PathBuf,

    /// Use logical file length instead of allocated disk usage.
    #[builder(default = "false")]
    pub apparent_size: bool,

    /// Include hidden entries (names starting with `.`).
    #[builder(default = "false")]
    pub include_hidden: bool,

    /// Exclude package-like directories and everything beneath them.
    #[builder(default = "true")]
    pub skip_packages: bool,

    /// Directory extensions treated as opaque packages.
    #[builder(default = "default_package_extensions()")]
    pub package_extensions: Vec<String>,

    /// Upper bound on aggregation passes.
    #[builder(default = "DEFAULT_MAX_PASSES")]
    pub max_passes: u32,

    /// Sleep between scan-completion polls, in milliseconds.
    #[builder(default = "DEFAULT_POLL_INTERVAL_MS")]
    pub poll_interval_ms: u64,
}

/// Platform data directory for dirindex, or `./.dirindex` when unknown.
pub fn default_state_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("dirindex"))
        .unwrap_or_else(|| PathBuf::from(".dirindex"))
}

fn default_package_extensions() -> Vec<String> {
    [
        "app",
        "bundle",
        "framework",
        "plugin",
        "kext",
        "pkg",
        "xcodeproj",
        "xcworkspace",
        "photoslibrary",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl IndexConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        check_fields(
            self.state_dir.as_deref(),
            self.max_passes,
            self.poll_interval_ms,
        )
    }
}

fn check_fields(
    state_dir: Option<&Path>,
    max_passes: Option<u32>,
    poll_interval_ms: Option<u64>,
) -> Result<(), String> {
    if state_dir.is_some_and(|dir| dir.as_os_str().is_empty()) {
        return Err("State directory cannot be empty".to_string());
    }
    if max_passes == Some(0) {
        return Err("max_passes must be at least 1".to_string());
    }
    if let Some(ms) = poll_interval_ms {
        if ms == 0 || ms >= 1000 {
            return Err(format!("poll_interval_ms must be in 1..1000, got {ms}"));
        }
    }
    Ok(())
}

impl IndexConfig {
    /// Create a new config builder.
    pub fn builder() -> IndexConfigBuilder {
        IndexConfigBuilder::default()
    }

    /// Create a default config that keeps its snapshot in `state_dir`.
    pub fn with_state_dir(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
            ..Self::default()
        }
    }

    /// Check a config that did not come through the builder, e.g. one
    /// deserialized from a file.
    pub fn validate(&self) -> Result<(), ScanError> {
        check_fields(
            Some(&self.state_dir),
            Some(self.max_passes),
            Some(self.poll_interval_ms),
        )
        .map_err(|message| ScanError::InvalidConfig { message })
    }

    /// Full path of the snapshot file.
    pub fn snapshot_path(&self) -> PathBuf {
        self.state_dir.join(SNAPSHOT_FILE_NAME)
    }

    /// Polling interval as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Check if hidden entries should be skipped.
    pub fn should_skip_hidden(&self, name: &str) -> bool {
        !self.include_hidden && name.starts_with('.')
    }

    /// Check if a directory is an opaque package that should be skipped.
    pub fn is_package(&self, path: &Path) -> bool {
        if !self.skip_packages {
            return false;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                self.package_extensions
                    .iter()
                    .any(|p| p.eq_ignore_ascii_case(ext))
            })
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            apparent_size: false,
            include_hidden: false,
            skip_packages: true,
            package_extensions: default_package_extensions(),
            max_passes: DEFAULT_MAX_PASSES,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = IndexConfig::builder()
            .state_dir("/var/lib/dirindex")
            .apparent_size(true)
            .max_passes(4u32)
            .build()
            .unwrap();

        assert_eq!(config.state_dir, PathBuf::from("/var/lib/dirindex"));
        assert!(config.apparent_size);
        assert_eq!(config.max_passes, 4);
        assert_eq!(config.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert!(config.skip_packages);
    }

    #[test]
    fn test_builder_rejects_zero_passes() {
        let result = IndexConfig::builder().max_passes(0u32).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_rejects_slow_polling() {
        let result = IndexConfig::builder().poll_interval_ms(1500u64).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_deserialized_config() {
        let mut config = IndexConfig::default();
        assert!(config.validate().is_ok());

        config.max_passes = 0;
        assert!(matches!(
            config.validate(),
            Err(ScanError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_snapshot_path() {
        let config = IndexConfig::with_state_dir("/state");
        assert_eq!(config.snapshot_path(), PathBuf::from("/state/snapshot.json"));
    }

    #[test]
    fn test_should_skip_hidden() {
        let mut config = IndexConfig::default();
        assert!(config.should_skip_hidden(".git"));
        assert!(!config.should_skip_hidden("src"));

        config.include_hidden = true;
        assert!(!config.should_skip_hidden(".git"));
    }

    #[test]
    fn test_is_package() {
        let mut config = IndexConfig::default();
        assert!(config.is_package(Path::new("/Applications/Safari.app")));
        assert!(config.is_package(Path::new("/Library/Foo.FRAMEWORK")));
        assert!(!config.is_package(Path::new("/home/user/src")));

        config.skip_packages = false;
        assert!(!config.is_package(Path::new("/Applications/Safari.app")));
    }
}
