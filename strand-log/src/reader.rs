//! Log read cursors.

use std::sync::Arc;

use strand_core::Position;

use crate::error::LogResult;
use crate::record::EntryRecord;
use crate::stream::LogStream;

/// A cursor over one partition log.
///
/// `read` decodes the entry at the cursor and advances past it. When no
/// entry exists at the cursor yet, `read` returns `Ok(false)` and leaves the
/// cursor where it was.
pub trait LogReader {
    /// Returns the position the next `read` will decode.
    fn position(&self) -> Position;

    /// Moves the cursor to `position`.
    fn set_position(&mut self, position: Position);

    /// Decodes the entry at the cursor into `record`.
    ///
    /// # Errors
    /// Returns an error if the entry cannot be read or decoded. The cursor
    /// does not move on error.
    fn read<R: EntryRecord>(&mut self, record: &mut R) -> LogResult<bool>;
}

/// A [`LogReader`] over a shared [`LogStream`].
pub struct LogStreamReader {
    stream: Arc<LogStream>,
    position: Position,
}

impl LogStreamReader {
    /// Creates a reader positioned at `position`.
    #[must_use]
    pub const fn new(stream: Arc<LogStream>, position: Position) -> Self {
        Self { stream, position }
    }

    /// Returns the underlying log.
    #[must_use]
    pub const fn stream(&self) -> &Arc<LogStream> {
        &self.stream
    }
}

impl LogReader for LogStreamReader {
    fn position(&self) -> Position {
        self.position
    }

    fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    fn read<R: EntryRecord>(&mut self, record: &mut R) -> LogResult<bool> {
        let found = self.stream.read_entry_at(self.position, record)?;
        if found {
            self.position = self.position.next();
        }
        Ok(found)
    }
}

impl std::fmt::Debug for LogStreamReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStreamReader")
            .field("log", &self.stream.log_name())
            .field("position", &self.position)
            .finish()
    }
}
