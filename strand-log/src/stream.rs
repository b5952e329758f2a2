//! Partition log streams.
//!
//! A [`LogStream`] owns the segment files of one (topic, partition) and an
//! in-memory copy of their entries. Appends go to the active segment file
//! first and become visible to readers once written; reads are served from
//! memory and never touch the disk.
//!
//! # Concurrency
//!
//! One append runs at a time (the writer sits behind an async mutex).
//! Reads take a short read lock on the segment index and may run from any
//! number of threads while an append is in flight.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use bytes::{Bytes, BytesMut};
use strand_core::{PartitionId, Position, TopicName};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::entry::Entry;
use crate::error::{LogError, LogResult};
use crate::reader::LogStreamReader;
use crate::record::EntryRecord;
use crate::segment::{Segment, SegmentConfig, SegmentHeader, SegmentId, SEGMENT_HEADER_SIZE};
use crate::storage::{Storage, StorageFile, TokioStorage};

const SEGMENT_FILE_EXTENSION: &str = "log";

/// Default write buffer size (16 MiB).
const WRITE_BUFFER_BYTES_DEFAULT: usize = 16 * 1024 * 1024;

/// Upper bound on the scratch buffer allocated up front.
const SCRATCH_INITIAL_CAPACITY_MAX: usize = 64 * 1024;

/// Configuration for a single log stream.
#[derive(Debug, Clone)]
pub struct LogStreamConfig {
    /// Topic the log belongs to.
    pub topic: TopicName,
    /// Partition the log belongs to.
    pub partition: PartitionId,
    /// Directory holding the segment files.
    pub directory: PathBuf,
    /// Segment size and entry limits.
    pub segment_config: SegmentConfig,
    /// Encoded bytes buffered by `append_batch` before they are written out.
    pub write_buffer_bytes: usize,
    /// Whether to fsync after every write.
    pub sync_on_write: bool,
}

impl LogStreamConfig {
    /// Creates a configuration with default segment and buffer sizes.
    #[must_use]
    pub fn new(topic: TopicName, partition: PartitionId, directory: impl Into<PathBuf>) -> Self {
        Self {
            topic,
            partition,
            directory: directory.into(),
            segment_config: SegmentConfig::new(),
            write_buffer_bytes: WRITE_BUFFER_BYTES_DEFAULT,
            sync_on_write: false,
        }
    }

    /// Sets the segment configuration.
    #[must_use]
    pub const fn with_segment_config(mut self, config: SegmentConfig) -> Self {
        self.segment_config = config;
        self
    }

    /// Sets the write buffer size in bytes.
    ///
    /// # Panics
    /// Panics if `bytes` is 0.
    #[must_use]
    pub const fn with_write_buffer_size(mut self, bytes: usize) -> Self {
        assert!(bytes > 0, "write buffer size must be positive");
        self.write_buffer_bytes = bytes;
        self
    }

    /// Enables fsync after every write.
    #[must_use]
    pub const fn with_sync_on_write(mut self, sync: bool) -> Self {
        self.sync_on_write = sync;
        self
    }
}

/// Segments held in memory, oldest first.
struct SegmentIndex {
    segments: Vec<Segment>,
    first_position: Position,
    tail_position: Position,
}

/// Write state for the active (last) segment.
struct SegmentWriter {
    file: Box<dyn StorageFile>,
    segment_id: SegmentId,
    /// Bytes of the active segment already written to the file.
    write_offset: u64,
    /// Entries of the active segment already written to the file.
    written_entries: u64,
    /// Encoded entries not yet written.
    scratch: BytesMut,
    /// Entries matching `scratch`, published to readers once written.
    pending: Vec<Entry>,
}

impl SegmentWriter {
    fn has_space_for(&self, entry: &Entry, config: &SegmentConfig) -> bool {
        let size = self.write_offset + self.scratch.len() as u64 + entry.total_size();
        let entries = self.written_entries + self.pending.len() as u64;
        size <= config.max_size_bytes && entries < config.max_entries
    }

    fn is_segment_empty(&self) -> bool {
        self.written_entries == 0 && self.pending.is_empty()
    }

    fn buffer(&mut self, entry: Entry) {
        entry.encode(&mut self.scratch);
        self.pending.push(entry);
    }

    fn discard_pending(&mut self) {
        self.scratch.clear();
        self.pending.clear();
    }
}

/// An append-only, position-addressable log for one partition.
pub struct LogStream {
    config: LogStreamConfig,
    log_name: String,
    storage: Arc<dyn Storage>,
    index: RwLock<SegmentIndex>,
    writer: Mutex<Option<SegmentWriter>>,
    open: AtomicBool,
}

impl LogStream {
    /// Returns the logical name of the log for a topic and partition.
    ///
    /// The name is deterministic and used as the log's directory name.
    /// Topic names are single path components and the partition follows the
    /// last `.`, so distinct partition keys never share a name.
    #[must_use]
    pub fn name_for(topic: &TopicName, partition: PartitionId) -> String {
        format!("{}.{}", topic.as_str(), partition.get())
    }

    /// Opens or creates a log on the local file system.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created or recovery fails.
    pub async fn open(config: LogStreamConfig) -> LogResult<Self> {
        Self::open_with_storage(Arc::new(TokioStorage::new()), config).await
    }

    /// Opens or creates a log using the given storage backend.
    ///
    /// Existing segments are recovered. A torn write at the end of a segment
    /// is cut off; any other corruption fails the open.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created or recovery fails.
    pub async fn open_with_storage(
        storage: Arc<dyn Storage>,
        config: LogStreamConfig,
    ) -> LogResult<Self> {
        let log_name = Self::name_for(&config.topic, config.partition);
        let dir = config.directory.clone();

        info!(log = %log_name, dir = ?dir, "Opening log stream");

        storage.create_dir_all(&dir).await?;
        let files = storage.list_files(&dir, SEGMENT_FILE_EXTENSION).await?;

        let mut segments: Vec<Segment> = Vec::with_capacity(files.len());
        let mut last_file: Option<Box<dyn StorageFile>> = None;

        for path in &files {
            let file = storage.open(path).await?;
            let data = file.read_all().await?;
            let file_len = data.len() as u64;

            if data.len() < SEGMENT_HEADER_SIZE {
                warn!(?path, "Skipping empty or incomplete segment file");
                continue;
            }

            let segment = Segment::decode(data, config.segment_config)?;

            if let Some(prev) = segments.last() {
                if segment.first_position() != prev.next_position() {
                    return Err(LogError::InvalidHeader {
                        offset: 0,
                        reason: "segment positions are not contiguous",
                    });
                }
            }

            if segment.size_bytes() < file_len {
                warn!(
                    ?path,
                    valid_bytes = segment.size_bytes(),
                    file_bytes = file_len,
                    "Truncating torn write"
                );
                file.truncate(segment.size_bytes()).await?;
            }

            debug!(
                segment_id = segment.id().get(),
                first_position = segment.first_position().get(),
                entries = segment.entry_count(),
                "Recovered segment"
            );

            segments.push(segment);
            last_file = Some(file);
        }

        let writer = match (segments.last(), last_file) {
            (Some(active), Some(file)) => SegmentWriter {
                file,
                segment_id: active.id(),
                write_offset: active.size_bytes(),
                written_entries: active.entry_count(),
                scratch: Self::scratch_buffer(&config),
                pending: Vec::new(),
            },
            _ => {
                let segment_id = SegmentId::new(1);
                let (file, segment) =
                    Self::create_segment(storage.as_ref(), &config, segment_id, Position::ZERO)
                        .await?;
                segments.push(segment);
                SegmentWriter {
                    file,
                    segment_id,
                    write_offset: SEGMENT_HEADER_SIZE as u64,
                    written_entries: 0,
                    scratch: Self::scratch_buffer(&config),
                    pending: Vec::new(),
                }
            }
        };

        let first_position = segments
            .first()
            .map_or(Position::ZERO, Segment::first_position);
        let tail_position = segments
            .last()
            .map_or(Position::ZERO, Segment::next_position);

        info!(
            log = %log_name,
            segments = segments.len(),
            first_position = first_position.get(),
            tail_position = tail_position.get(),
            "Log stream open"
        );

        Ok(Self {
            config,
            log_name,
            storage,
            index: RwLock::new(SegmentIndex {
                segments,
                first_position,
                tail_position,
            }),
            writer: Mutex::new(Some(writer)),
            open: AtomicBool::new(true),
        })
    }

    fn scratch_buffer(config: &LogStreamConfig) -> BytesMut {
        BytesMut::with_capacity(config.write_buffer_bytes.min(SCRATCH_INITIAL_CAPACITY_MAX))
    }

    async fn create_segment(
        storage: &dyn Storage,
        config: &LogStreamConfig,
        segment_id: SegmentId,
        first_position: Position,
    ) -> LogResult<(Box<dyn StorageFile>, Segment)> {
        let path = config.directory.join(segment_id.file_name());
        let file = storage.open(&path).await?;
        file.truncate(0).await?;

        let mut header = BytesMut::with_capacity(SEGMENT_HEADER_SIZE);
        SegmentHeader::new(segment_id, first_position).encode(&mut header);
        file.write_at(0, &header).await?;
        if config.sync_on_write {
            file.sync().await?;
        }

        debug!(
            segment_id = segment_id.get(),
            first_position = first_position.get(),
            "Created segment"
        );

        Ok((
            file,
            Segment::new(segment_id, first_position, config.segment_config),
        ))
    }

    /// Returns the topic this log belongs to.
    #[must_use]
    pub const fn topic_name(&self) -> &TopicName {
        &self.config.topic
    }

    /// Returns the partition this log belongs to.
    #[must_use]
    pub const fn partition_id(&self) -> PartitionId {
        self.config.partition
    }

    /// Returns the logical name of this log.
    #[must_use]
    pub fn log_name(&self) -> &str {
        &self.log_name
    }

    /// Returns the directory holding this log's segments.
    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.config.directory
    }

    /// Returns the configuration this log was opened with.
    #[must_use]
    pub const fn config(&self) -> &LogStreamConfig {
        &self.config
    }

    /// Returns true until [`LogStream::close`] is called.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Returns the position of the first entry held by the log.
    #[must_use]
    pub fn first_position(&self) -> Position {
        self.index_read().first_position
    }

    /// Returns the position the next appended entry will receive.
    #[must_use]
    pub fn tail_position(&self) -> Position {
        self.index_read().tail_position
    }

    /// Returns the number of segments.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.index_read().segments.len()
    }

    /// Returns a reader positioned at the first entry.
    #[must_use]
    pub fn reader(self: &Arc<Self>) -> LogStreamReader {
        LogStreamReader::new(Arc::clone(self), self.first_position())
    }

    /// Returns a reader positioned at `position`.
    #[must_use]
    pub fn reader_at(self: &Arc<Self>, position: Position) -> LogStreamReader {
        LogStreamReader::new(Arc::clone(self), position)
    }

    /// Appends one entry and returns its position.
    ///
    /// # Errors
    /// Returns an error if the log is closed or the write fails.
    pub async fn append(&self, payload: Bytes) -> LogResult<Position> {
        self.append_batch(std::iter::once(payload)).await
    }

    /// Appends entries in order and returns the position of the first one.
    ///
    /// Encoded entries are buffered up to the configured write buffer size
    /// and written out whenever the buffer fills. Returns the current tail
    /// when `payloads` is empty.
    ///
    /// On error, entries already written out by this call remain in the log;
    /// buffered entries are dropped.
    ///
    /// # Errors
    /// Returns an error if the log is closed, an entry is too large, or a
    /// write fails.
    #[allow(clippy::significant_drop_tightening)]
    pub async fn append_batch<I>(&self, payloads: I) -> LogResult<Position>
    where
        I: IntoIterator<Item = Bytes>,
    {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or_else(|| self.closed_error())?;

        let result = self.append_locked(writer, payloads).await;
        if result.is_err() {
            writer.discard_pending();
        }
        result
    }

    async fn append_locked<I>(&self, writer: &mut SegmentWriter, payloads: I) -> LogResult<Position>
    where
        I: IntoIterator<Item = Bytes>,
    {
        let first = self.tail_position();
        let mut position = first;

        for payload in payloads {
            let entry = Entry::new(position, payload)?;

            if !writer.has_space_for(&entry, &self.config.segment_config) {
                if writer.is_segment_empty() {
                    return Err(LogError::SegmentFull {
                        reason: "entry larger than an empty segment",
                    });
                }
                self.flush(writer).await?;
                self.roll(writer, position).await?;
            }

            writer.buffer(entry);
            if writer.scratch.len() >= self.config.write_buffer_bytes {
                self.flush(writer).await?;
            }
            position = position.next();
        }

        self.flush(writer).await?;
        Ok(first)
    }

    /// Writes buffered entries to the active segment file and publishes them.
    async fn flush(&self, writer: &mut SegmentWriter) -> LogResult<()> {
        if writer.pending.is_empty() {
            return Ok(());
        }

        writer.file.write_at(writer.write_offset, &writer.scratch).await?;
        if self.config.sync_on_write {
            writer.file.sync().await?;
        }

        let bytes = writer.scratch.len() as u64;
        writer.write_offset += bytes;
        writer.written_entries += writer.pending.len() as u64;
        writer.scratch.clear();

        let entries = std::mem::take(&mut writer.pending);
        let count = entries.len();
        let mut index = self.index_write();
        let Some(active) = index.segments.last_mut() else {
            return Err(LogError::SegmentFull {
                reason: "no active segment",
            });
        };
        let mut tail = active.next_position();
        for entry in entries {
            tail = entry.position().next();
            active.append(entry)?;
        }
        index.tail_position = tail;
        drop(index);

        debug!(log = %self.log_name, entries = count, bytes, "Appended entries");
        Ok(())
    }

    /// Seals the active segment and starts a new one at `first_position`.
    async fn roll(&self, writer: &mut SegmentWriter, first_position: Position) -> LogResult<()> {
        writer.file.sync().await?;

        let segment_id = writer.segment_id.next();
        let (file, segment) =
            Self::create_segment(self.storage.as_ref(), &self.config, segment_id, first_position)
                .await?;

        writer.file = file;
        writer.segment_id = segment_id;
        writer.write_offset = SEGMENT_HEADER_SIZE as u64;
        writer.written_entries = 0;
        self.index_write().segments.push(segment);

        info!(
            log = %self.log_name,
            segment_id = segment_id.get(),
            first_position = first_position.get(),
            "Rolled segment"
        );
        Ok(())
    }

    /// Syncs written entries to disk.
    ///
    /// # Errors
    /// Returns an error if the log is closed or the sync fails.
    pub async fn sync(&self) -> LogResult<()> {
        let guard = self.writer.lock().await;
        let writer = guard.as_ref().ok_or_else(|| self.closed_error())?;
        writer.file.sync().await
    }

    /// Closes the log. Later reads and appends fail with [`LogError::Closed`].
    ///
    /// Closing twice is a no-op.
    ///
    /// # Errors
    /// Returns an error if the final sync fails. The log is closed regardless.
    pub async fn close(&self) -> LogResult<()> {
        let writer = self.writer.lock().await.take();
        self.open.store(false, Ordering::Release);

        if let Some(writer) = writer {
            writer.file.sync().await?;
            info!(log = %self.log_name, tail_position = self.tail_position().get(), "Closed log stream");
        }
        Ok(())
    }

    /// Decodes the entry at `position` into `record`.
    ///
    /// Returns `Ok(false)` when `position` is at or beyond the tail.
    ///
    /// # Errors
    /// Returns an error if the log is closed, the position precedes the first
    /// retained entry, or the record fails to decode.
    pub fn read_entry_at<R: EntryRecord>(&self, position: Position, record: &mut R) -> LogResult<bool> {
        if !self.is_open() {
            return Err(self.closed_error());
        }

        let payload = {
            let index = self.index_read();
            if position >= index.tail_position {
                return Ok(false);
            }
            if position < index.first_position {
                return Err(LogError::PositionOutOfRange {
                    position,
                    first: index.first_position,
                });
            }

            let idx = index
                .segments
                .partition_point(|s| s.first_position() <= position)
                .saturating_sub(1);
            index.segments[idx].read(position)?.payload.clone()
        };

        record.decode(position, &payload)?;
        Ok(true)
    }

    fn closed_error(&self) -> LogError {
        LogError::Closed {
            log_name: self.log_name.clone(),
        }
    }

    fn index_read(&self) -> RwLockReadGuard<'_, SegmentIndex> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn index_write(&self) -> RwLockWriteGuard<'_, SegmentIndex> {
        self.index.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for LogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStream")
            .field("log_name", &self.log_name)
            .field("directory", &self.config.directory)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}
