//! The partition log registry.
//!
//! The registry maps `topic -> partition -> log`. It is mutated only through
//! `create`/`create_in`, which callers run from one administrative path;
//! lookups and enumeration take `&self` and may run concurrently with each
//! other.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::Rng;
use strand_core::{PartitionId, TopicName};
use strand_log::LogStream;
use tracing::{debug, info, warn};

use crate::config::LogStreamsConfig;
use crate::error::{LogStreamsError, LogStreamsResult};

/// Owner of every open partition log in the process.
#[derive(Debug)]
pub struct LogStreamsManager {
    config: LogStreamsConfig,
    streams: HashMap<TopicName, HashMap<PartitionId, Arc<LogStream>>>,
}

impl LogStreamsManager {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(config: LogStreamsConfig) -> Self {
        Self {
            config,
            streams: HashMap::new(),
        }
    }

    /// Returns the registry configuration.
    #[must_use]
    pub const fn config(&self) -> &LogStreamsConfig {
        &self.config
    }

    /// Returns the log for a partition, if one has been created.
    #[must_use]
    pub fn get(&self, topic: &TopicName, partition: PartitionId) -> Option<&Arc<LogStream>> {
        self.streams.get(topic)?.get(&partition)
    }

    /// Creates and opens the log for a partition in one of the configured
    /// directories.
    ///
    /// With a single directory that directory is used. With more than one,
    /// the directory is picked at random from all but the last configured
    /// entry. The log lives in `<directory>/<topic>.<partition>`.
    ///
    /// Creating a partition that already exists replaces the registered
    /// handle; the previous handle stays open for anyone still holding it.
    ///
    /// # Errors
    /// Returns `Configuration` if no directories are configured or the size
    /// settings are invalid, and `Storage` if the log cannot be opened. No
    /// disk I/O happens and the registry is unchanged when this fails with
    /// `Configuration`.
    pub async fn create(
        &mut self,
        topic: TopicName,
        partition: PartitionId,
    ) -> LogStreamsResult<Arc<LogStream>> {
        let log_name = LogStream::name_for(&topic, partition);
        let index = self.placement_index().ok_or_else(|| LogStreamsError::Configuration {
            message: format!("cannot start log {log_name}, no log directory provided"),
        })?;
        let directory = self.config.directories[index].join(&log_name);

        debug!(log = %log_name, index, directory = ?directory, "Placed partition log");

        self.open_and_register(topic, partition, directory).await
    }

    /// Creates and opens the log for a partition in an explicit directory.
    ///
    /// Used when the log's location is already known, for example when
    /// recovering an existing log. `directory` is the log's own directory;
    /// no placement happens and the configured directory list is not
    /// consulted.
    ///
    /// # Errors
    /// Returns `Configuration` if the size settings are invalid and `Storage`
    /// if the log cannot be opened.
    pub async fn create_in(
        &mut self,
        topic: TopicName,
        partition: PartitionId,
        directory: impl AsRef<Path>,
    ) -> LogStreamsResult<Arc<LogStream>> {
        self.open_and_register(topic, partition, directory.as_ref().to_path_buf())
            .await
    }

    /// Picks the index of the directory for a new log.
    fn placement_index(&self) -> Option<usize> {
        match self.config.directories.len() {
            0 => None,
            1 => Some(0),
            // The last directory is never chosen.
            n => Some(rand::thread_rng().gen_range(0..n - 1)),
        }
    }

    async fn open_and_register(
        &mut self,
        topic: TopicName,
        partition: PartitionId,
        directory: PathBuf,
    ) -> LogStreamsResult<Arc<LogStream>> {
        let config = self.config.stream_config(topic.clone(), partition, &directory)?;
        let stream = Arc::new(LogStream::open(config).await?);

        let previous = self
            .streams
            .entry(topic)
            .or_default()
            .insert(partition, Arc::clone(&stream));

        if previous.is_some() {
            warn!(log = %stream.log_name(), "Replaced existing partition log");
        }
        info!(
            log = %stream.log_name(),
            directory = ?stream.directory(),
            "Created partition log"
        );

        Ok(stream)
    }

    /// Visits every registered log, in no particular order.
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&Arc<LogStream>),
    {
        for partitions in self.streams.values() {
            for stream in partitions.values() {
                visitor(stream);
            }
        }
    }

    /// Returns the number of registered logs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.streams.values().map(HashMap::len).sum()
    }

    /// Returns true if no logs are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the topics that have at least one registered log.
    #[must_use]
    pub fn topics(&self) -> Vec<&TopicName> {
        self.streams.keys().collect()
    }

    /// Closes every registered log.
    ///
    /// Every log is closed even if some fail; the first error is returned.
    /// Handles stay registered so late readers see `Closed` rather than a
    /// missing partition.
    ///
    /// # Errors
    /// Returns the first storage error encountered.
    pub async fn close_all(&self) -> LogStreamsResult<()> {
        let mut streams = Vec::with_capacity(self.len());
        self.for_each(|stream| streams.push(Arc::clone(stream)));

        let mut first_error = None;
        for stream in streams {
            if let Err(e) = stream.close().await {
                warn!(log = %stream.log_name(), error = %e, "Failed to close partition log");
                first_error.get_or_insert(e);
            }
        }

        info!(count = self.len(), "Closed all partition logs");
        first_error.map_or(Ok(()), |e| Err(e.into()))
    }
}
