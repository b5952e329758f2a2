//! Registry configuration.

use std::path::{Path, PathBuf};

use strand_core::limits::BYTES_PER_MB;
use strand_core::{PartitionId, TopicName};
use strand_log::{LogStreamConfig, SegmentConfig};

use crate::error::{LogStreamsError, LogStreamsResult};

/// Default segment size in megabytes.
const SEGMENT_SIZE_MB_DEFAULT: u32 = 512;

/// Default write buffer size in megabytes.
const WRITE_BUFFER_SIZE_MB_DEFAULT: u32 = 16;

/// Configuration for [`LogStreamsManager`](crate::LogStreamsManager).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogStreamsConfig {
    /// Candidate storage directories, in configuration order.
    pub directories: Vec<PathBuf>,
    /// Segment size of newly created logs, in megabytes.
    pub default_segment_size_mb: u32,
    /// Write buffer size of newly created logs, in megabytes.
    pub write_buffer_size_mb: u32,
}

impl Default for LogStreamsConfig {
    fn default() -> Self {
        Self {
            directories: Vec::new(),
            default_segment_size_mb: SEGMENT_SIZE_MB_DEFAULT,
            write_buffer_size_mb: WRITE_BUFFER_SIZE_MB_DEFAULT,
        }
    }
}

impl LogStreamsConfig {
    /// Creates a configuration with no directories and default sizes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a storage directory.
    #[must_use]
    pub fn with_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.directories.push(dir.into());
        self
    }

    /// Replaces the storage directories.
    #[must_use]
    pub fn with_directories<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.directories = dirs.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the segment size in megabytes.
    #[must_use]
    pub const fn with_segment_size_mb(mut self, mb: u32) -> Self {
        self.default_segment_size_mb = mb;
        self
    }

    /// Sets the write buffer size in megabytes.
    #[must_use]
    pub const fn with_write_buffer_size_mb(mut self, mb: u32) -> Self {
        self.write_buffer_size_mb = mb;
        self
    }

    /// Returns the segment size in bytes.
    #[must_use]
    pub const fn segment_size_bytes(&self) -> u64 {
        self.default_segment_size_mb as u64 * BYTES_PER_MB
    }

    /// Returns the write buffer size in bytes.
    #[must_use]
    pub const fn write_buffer_size_bytes(&self) -> u64 {
        self.write_buffer_size_mb as u64 * BYTES_PER_MB
    }

    /// Checks the size settings.
    ///
    /// An empty directory list is not rejected here; it only becomes an
    /// error when a partition is created without an explicit directory.
    ///
    /// # Errors
    /// Returns `Configuration` if the segment size is outside the supported
    /// range or the write buffer size is zero.
    pub fn validate(&self) -> LogStreamsResult<()> {
        if !SegmentConfig::is_valid_size(self.segment_size_bytes()) {
            return Err(LogStreamsError::Configuration {
                message: format!(
                    "segment size {} MB is outside the supported range",
                    self.default_segment_size_mb
                ),
            });
        }
        if self.write_buffer_size_mb == 0 {
            return Err(LogStreamsError::Configuration {
                message: "write buffer size must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Builds the configuration of one partition log stored in `directory`.
    ///
    /// # Errors
    /// Returns `Configuration` if the size settings are invalid.
    pub fn stream_config(
        &self,
        topic: TopicName,
        partition: PartitionId,
        directory: &Path,
    ) -> LogStreamsResult<LogStreamConfig> {
        self.validate()?;

        let write_buffer = usize::try_from(self.write_buffer_size_bytes()).map_err(|_| {
            LogStreamsError::Configuration {
                message: "write buffer size does not fit in memory".to_string(),
            }
        })?;

        Ok(LogStreamConfig::new(topic, partition, directory)
            .with_segment_config(SegmentConfig::new().with_max_size(self.segment_size_bytes()))
            .with_write_buffer_size(write_buffer))
    }
}
