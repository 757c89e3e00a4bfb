use bincode;
use std::fs::OpenOptions;
use std::io::{Error as IoError, ErrorKind as IoErrorKind, Write};
use std::path::PathBuf;
use std::time::Instant;

use crate::core::wal::log_record::LogRecord;

#[derive(Debug, Clone, Copy)]
pub struct WalWriterConfig {
    pub max_buffer_size: usize,
    pub flush_interval_ms: Option<u64>,
}

impl Default for WalWriterConfig {
    fn default() -> Self {
        Self {
            max_buffer_size: DEFAULT_MAX_BUFFER_SIZE, // Default max buffer size (number of records)
            flush_interval_ms: Some(1000),            // Default 1 second interval
        }
    }
}

/// Default maximum buffer size for the WAL writer.
/// This value was chosen to balance memory usage and I/O performance.
/// Users can override this value by modifying the `DEFAULT_MAX_BUFFER_SIZE` constant.
pub const DEFAULT_MAX_BUFFER_SIZE: usize = 100;
/// Write-Ahead Log writer for reliable durability guarantees.
///
/// The `WalWriter` buffers log records in memory and flushes them to disk
/// based on configurable policies including commit-based flushing,
/// buffer size limits, and periodic intervals.
#[derive(Debug)]
pub struct WalWriter {
    /// Buffer holding log records until flush
    buffer: Vec<LogRecord>,
    /// Path to the WAL file on disk
    wal_file_path: PathBuf,
    /// Configuration for flush behavior
    config: WalWriterConfig,
    /// Timestamp of the last flush operation
    last_flush_time: Option<Instant>,
}

impl WalWriter {
    /// Create a new WAL writer.
    ///
    /// # Arguments
    ///
    /// * `wal_file_path` - Path where the WAL file will be stored
    /// * `config` - Configuration for flush behavior
    #[must_use]
    pub fn new(wal_file_path: PathBuf, config: WalWriterConfig) -> Self {
        let last_flush_time =
            if config.flush_interval_ms.is_some() { Some(Instant::now()) } else { None };

        Self { buffer: Vec::new(), wal_file_path, config, last_flush_time }
    }

    /// Add a log record to the buffer and optionally trigger a flush.
    ///
    /// # Errors
    ///
    /// Returns `IoError` if:
    /// - Automatic flush is triggered and fails
    /// - File system errors occur during write operations
    pub fn add_record(&mut self, record: &LogRecord) -> Result<(), IoError> {
        self.buffer.push(record.clone());

        // Check if we need to flush based on various criteria
        let should_flush = match &record {
            LogRecord::CommitTransaction { .. } => true,
            _ => self.should_auto_flush(),
        };

        if should_flush {
            let flush_reason = if matches!(record, LogRecord::CommitTransaction { .. }) {
                "Commit transaction"
            } else if self.buffer.len() >= self.config.max_buffer_size {
                "Buffer size limit reached"
            } else if self.is_periodic_flush_due() {
                "Periodic flush interval"
            } else {
                "Unknown"
            };

            eprintln!(
                "[core::wal::writer::WalWriter::add_record] Triggering flush: {flush_reason}"
            );
            self.flush()?;
        }

        Ok(())
    }

    /// Flush all buffered records to disk.
    ///
    /// This operation ensures durability by writing all records to the WAL file
    /// and calling fsync to guarantee persistence.
    ///
    /// # Errors
    ///
    /// Returns `IoError` if:
    /// - File creation or opening fails
    /// - Serialization of records fails
    /// - Write operations fail
    /// - Fsync operation fails
    pub fn flush(&mut self) -> Result<(), IoError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let mut file = if self.wal_file_path.exists() {
            OpenOptions::new().create(true).append(true).open(&self.wal_file_path).map_err(|e| {
                let error_msg = format!("Failed to open existing WAL file: {e}");
                eprintln!("[core::wal::writer::WalWriter::flush] {error_msg}");
                IoError::new(IoErrorKind::Other, error_msg)
            })?
        } else {
            // Ensure parent directory exists
            if let Some(parent) = self.wal_file_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    let error_msg = format!("Failed to create WAL parent directory: {e}");
                    eprintln!("[core::wal::writer::WalWriter::flush] {error_msg}");
                    IoError::new(IoErrorKind::Other, error_msg)
                })?;
            }

            std::fs::File::create(&self.wal_file_path).map_err(|e| {
                let error_msg = format!("Failed to create WAL file: {e}");
                eprintln!("[core::wal::writer::WalWriter::flush] {error_msg}");
                IoError::new(IoErrorKind::Other, error_msg)
            })?
        };

        // Write all buffered records with length prefixes
        for record in &self.buffer {
            let serialized_record = bincode::serialize(record).map_err(|e| {
                IoError::new(
                    IoErrorKind::InvalidData,
                    format!("Log record serialization failed: {e}"),
                )
            })?;

            // Use safe conversion for length
            let len = u32::try_from(serialized_record.len()).map_err(|_| {
                let actual_size = serialized_record.len();
                let max_size = u32::MAX as usize;
                IoError::new(
                    IoErrorKind::InvalidData,
                    format!(
                        "Record too large: actual size is {actual_size} bytes, but the maximum allowed size is {max_size} bytes"
                    ),
                )
            })?;

            file.write_all(&len.to_be_bytes())?;
            file.write_all(&serialized_record)?;
        }

        // Ensure durability
        file.sync_all()?;

        // Clear buffer and update flush time
        self.buffer.clear();
        self.last_flush_time = Some(Instant::now());

        Ok(())
    }

    /// Check if automatic flush should be triggered based on buffer size or time.
    fn should_auto_flush(&self) -> bool {
        // Check buffer size limit
        if self.buffer.len() >= self.config.max_buffer_size {
            return true;
        }

        // Check periodic flush interval
        self.is_periodic_flush_due()
    }

    /// Check if periodic flush is due based on configuration.
    ///
    /// This method determines whether a periodic flush should be triggered
    /// based on the `flush_interval_ms` configuration and the time elapsed
    /// since the last flush (`last_flush_time`).
    ///
    /// # Behavior
    /// - If `flush_interval_ms` is `None`, periodic flushes are disabled, and this method returns `false`.
    /// - If `last_flush_time` is `None`, this method assumes no flush has occurred yet and returns `true`.
    /// - Otherwise, it calculates the time elapsed since the last flush and compares it to `flush_interval_ms`.
    ///
    /// # Returns
    /// - `true` if a periodic flush is due.
    /// - `false` otherwise.
    fn is_periodic_flush_due(&self) -> bool {
        self.config.flush_interval_ms.map_or(false, |interval_ms| {
            self.last_flush_time.map_or(true, |last_flush| {
                let elapsed_ms = last_flush.elapsed().as_millis();
                elapsed_ms >= u128::from(interval_ms)
            })
        })
    }
}
