// src/core/config.rs

use crate::core::common::OxidbError; // Changed
use serde::Deserialize;
use std::fs; // For reading file
use std::path::Path;
use std::path::PathBuf; // Import PathBuf for Default impl // For load_from_file argument

/// Represents the configuration for Oxidb.
///
/// This struct encapsulates various settings that can be tuned for the database.
/// It supports loading from a TOML file (e.g., `Oxidb.toml`) and provides
/// sensible default values.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)] // Optional: Be strict about unknown fields in TOML
pub struct Config {
    /// The path to the main database file.
    /// Default: "oxidb.db"
    #[serde(default = "default_database_file_path")]
    pub database_file_path: String,

    /// The base directory path for storing index files.
    /// Default: "oxidb_indexes/"
    #[serde(default = "default_index_base_path")]
    pub index_base_path: String,

    /// The path to the Write-Ahead Log (WAL) file.
    /// Default: "oxidb.wal"
    #[serde(default = "default_wal_file_path")]
    pub wal_file_path: String,

    // --- Future Configuration Options (with defaults) ---
    /// Enables or disables the Write-Ahead Log (WAL).
    /// Currently, WAL is always used if this feature is compiled. This is a placeholder.
    /// Default: true
    #[serde(default = "default_wal_enabled")]
    pub wal_enabled: bool,

    /// Approximate maximum size of the in-memory cache in megabytes (MB).
    /// This is a placeholder for future cache management enhancements.
    /// Default: 64
    #[serde(default = "default_cache_size_mb")]
    pub cache_size_mb: usize,

    /// Default transaction isolation level.
    /// This is a placeholder for future support of different isolation levels.
    /// Current behavior is typically Serializable or close to it.
    /// Default: "Serializable"
    #[serde(default = "default_isolation_level")]
    pub default_isolation_level: String,

    /// Capacity of the buffer pool, in pages.
    #[serde(default = "default_buffer_pool_pages")]
    pub buffer_pool_pages: usize,

    /// Fraction of the buffer pool's LRU reserved for the young region, used
    /// once the young/old split replaces the current FIFO replacer (see
    /// `DESIGN.md`). Must lie in `(0.0, 1.0)`.
    #[serde(default = "default_buffer_pool_young_ratio")]
    pub buffer_pool_young_ratio: f64,

    /// How long a lock request blocks on conflict before failing, in
    /// milliseconds. 0 means unbounded.
    #[serde(default = "default_lock_wait_timeout_ms")]
    pub lock_wait_timeout_ms: u64,

    /// Cadence of the deadlock detector's wait-for-graph scan, in
    /// milliseconds.
    #[serde(default = "default_deadlock_check_interval_ms")]
    pub deadlock_check_interval_ms: u64,

    /// Interval between automatic checkpoints, in seconds.
    #[serde(default = "default_checkpoint_interval_s")]
    pub checkpoint_interval_s: u64,

    /// Number of dirty pages that forces a checkpoint regardless of
    /// `checkpoint_interval_s`.
    #[serde(default = "default_checkpoint_max_dirty_pages")]
    pub checkpoint_max_dirty_pages: usize,

    /// Size of one WAL segment file, in bytes.
    #[serde(default = "default_wal_segment_size_bytes")]
    pub wal_segment_size_bytes: u64,

    /// Size of the in-memory WAL write buffer, in bytes.
    #[serde(default = "default_wal_buffer_bytes")]
    pub wal_buffer_bytes: usize,

    /// Whether commit fsyncs the WAL before returning, or trusts the OS
    /// to flush it eventually.
    #[serde(default = "default_wal_sync_after_write")]
    pub wal_sync_after_write: bool,

    /// Maximum depth of cascading foreign-key actions before the engine
    /// rejects the cascade as likely-cyclic.
    #[serde(default = "default_fk_cascade_depth_limit")]
    pub fk_cascade_depth_limit: usize,

    /// Threshold, in milliseconds, above which a statement is logged as
    /// slow. Observed by the executor, not the engine itself; kept here
    /// because it co-lives in the same config record.
    #[serde(default = "default_slow_query_threshold_ms")]
    pub slow_query_threshold_ms: u64,
}

// Default value functions for serde
fn default_database_file_path() -> String {
    "oxidb.db".to_string()
} // Added
fn default_index_base_path() -> String {
    "oxidb_indexes/".to_string()
} // Added
fn default_wal_file_path() -> String {
    "oxidb.wal".to_string()
}
fn default_wal_enabled() -> bool {
    true
}
fn default_cache_size_mb() -> usize {
    64
}
fn default_isolation_level() -> String {
    "Serializable".to_string()
}
fn default_buffer_pool_pages() -> usize {
    1024
}
fn default_buffer_pool_young_ratio() -> f64 {
    0.625 // matches InnoDB's historical innodb_old_blocks_pct-derived young/old split
}
fn default_lock_wait_timeout_ms() -> u64 {
    50_000 // matches LockManager's own InnoDB-derived default; see transaction/lock_manager.rs
}
fn default_deadlock_check_interval_ms() -> u64 {
    1_000
}
fn default_checkpoint_interval_s() -> u64 {
    300
}
fn default_checkpoint_max_dirty_pages() -> usize {
    1_000
}
fn default_wal_segment_size_bytes() -> u64 {
    16 * 1024 * 1024
}
fn default_wal_buffer_bytes() -> usize {
    1024 * 1024
}
fn default_wal_sync_after_write() -> bool {
    true
}
fn default_fk_cascade_depth_limit() -> usize {
    15 // matches MySQL's FOREIGN_KEY_MAX_DEPTH
}
fn default_slow_query_threshold_ms() -> u64 {
    1_000
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_file_path: default_database_file_path(),
            index_base_path: default_index_base_path(),
            wal_file_path: default_wal_file_path(),
            wal_enabled: default_wal_enabled(),
            cache_size_mb: default_cache_size_mb(),
            default_isolation_level: default_isolation_level(),
            buffer_pool_pages: default_buffer_pool_pages(),
            buffer_pool_young_ratio: default_buffer_pool_young_ratio(),
            lock_wait_timeout_ms: default_lock_wait_timeout_ms(),
            deadlock_check_interval_ms: default_deadlock_check_interval_ms(),
            checkpoint_interval_s: default_checkpoint_interval_s(),
            checkpoint_max_dirty_pages: default_checkpoint_max_dirty_pages(),
            wal_segment_size_bytes: default_wal_segment_size_bytes(),
            wal_buffer_bytes: default_wal_buffer_bytes(),
            wal_sync_after_write: default_wal_sync_after_write(),
            fk_cascade_depth_limit: default_fk_cascade_depth_limit(),
            slow_query_threshold_ms: default_slow_query_threshold_ms(),
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// If the specified file does not exist, default configuration values are returned.
    ///
    /// # Arguments
    ///
    /// * `path` - The path to the TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns `OxidbError::Configuration` if the file cannot be read or if parsing fails.
    pub fn load_from_file(path: &Path) -> Result<Self, OxidbError> {
        match fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).map_err(|e| {
                OxidbError::Configuration(format!( // Changed
                    "Failed to parse config file '{}': {}",
                    path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            Err(e) => Err(OxidbError::Io(e.to_string())),
        }
    }

    /// Loads configuration from an optional TOML file path.
    ///
    /// If `optional_path` is `Some(path)`, it attempts to load from that file.
    /// If the file doesn't exist at `path`, or if `optional_path` is `None`,
    /// it returns the default configuration.
    ///
    /// # Arguments
    ///
    /// * `optional_path` - An `Option<&Path>` to the configuration file.
    ///
    /// # Errors
    ///
    /// Returns `OxidbError::Configuration` if a file path is provided but the file
    /// cannot be read or parsed.
    pub fn load_or_default(optional_path: Option<&Path>) -> Result<Self, OxidbError> {
        match optional_path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Config::default()),
        }
    }

    // Helper to get database_file_path as PathBuf
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.database_file_path)
    }

    // Helper to get index_base_path as PathBuf
    pub fn index_path(&self) -> PathBuf {
        PathBuf::from(&self.index_base_path)
    }

    // Helper to get wal_file_path as PathBuf
    pub fn wal_path(&self) -> PathBuf {
        PathBuf::from(&self.wal_file_path)
    }

    /// Rejects out-of-range option values before any page I/O happens.
    ///
    /// Not yet called automatically — there is no top-level `Engine::open`
    /// in this tree to call it at (see `DESIGN.md`); callers that build an
    /// engine from a `Config` should call this first.
    ///
    /// # Errors
    /// Returns `OxidbError::Configuration` naming the first out-of-range
    /// option found.
    pub fn validate(&self) -> Result<(), OxidbError> {
        if self.buffer_pool_pages == 0 {
            return Err(OxidbError::Configuration(
                "buffer_pool_pages must be greater than 0".to_string(),
            ));
        }
        if !(self.buffer_pool_young_ratio > 0.0 && self.buffer_pool_young_ratio < 1.0) {
            return Err(OxidbError::Configuration(
                "buffer_pool_young_ratio must lie in (0.0, 1.0)".to_string(),
            ));
        }
        if self.checkpoint_max_dirty_pages == 0 {
            return Err(OxidbError::Configuration(
                "checkpoint_max_dirty_pages must be greater than 0".to_string(),
            ));
        }
        if self.wal_segment_size_bytes == 0 {
            return Err(OxidbError::Configuration(
                "wal_segment_size_bytes must be greater than 0".to_string(),
            ));
        }
        if self.wal_buffer_bytes == 0 {
            return Err(OxidbError::Configuration(
                "wal_buffer_bytes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

// Add this to src/core/mod.rs
// pub mod config;

// Add this to src/core/common/error.rs
// #[error("Configuration error: {0}")]
// ConfigError(String),
