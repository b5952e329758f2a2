//! Deterministic entry processing.
//!
//! A [`LogEntryProcessor`] reads entries from one partition log, in position
//! order, and hands each to an [`EntryHandler`]. The handler answers with a
//! [`HandleResult`]:
//!
//! - `Consume`: the entry is done. The cursor stays past it.
//! - `Defer`: the cursor is put back to the entry's position and the current
//!   call ends. The next call delivers the same entry again.
//!
//! Deferring is ordinary control flow, for example when an outbound buffer
//! is full. Read and decode failures are errors and are returned unchanged.

use strand_core::Position;
use strand_log::{EntryRecord, LogError, LogReader, LogResult};
use strand_runtime::Actor;
use tracing::trace;

/// A handler's decision about one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleResult {
    /// The entry was handled; advance past it.
    Consume,
    /// The entry was not handled; deliver it again on the next call.
    Defer,
}

/// Handles decoded entries for a [`LogEntryProcessor`].
///
/// The record is borrowed for the duration of one call only. Handlers that
/// need the data later must copy it.
pub trait EntryHandler<R> {
    /// Handles the entry at `position`.
    fn handle(&mut self, position: Position, record: &R) -> HandleResult;
}

impl<R, F> EntryHandler<R> for F
where
    F: FnMut(Position, &R) -> HandleResult,
{
    fn handle(&mut self, position: Position, record: &R) -> HandleResult {
        self(position, record)
    }
}

/// Drains one partition log into a handler.
///
/// The processor exclusively owns the record entries are decoded into and
/// reuses it for every read.
pub struct LogEntryProcessor<L, R, H> {
    reader: L,
    record: R,
    handler: H,
}

impl<L, R, H> LogEntryProcessor<L, R, H>
where
    L: LogReader,
    R: EntryRecord,
    H: EntryHandler<R>,
{
    /// Creates a processor starting at the reader's current position.
    pub const fn new(reader: L, record: R, handler: H) -> Self {
        Self {
            reader,
            record,
            handler,
        }
    }

    /// Processes at most one entry.
    ///
    /// # Errors
    /// Returns an error if the entry cannot be read or decoded.
    pub fn process_one(&mut self) -> LogResult<u32> {
        self.process(1)
    }

    /// Processes up to `max_cycles` entries and returns how many were
    /// consumed.
    ///
    /// Stops early when no entry is available at the cursor or when the
    /// handler defers. A deferred entry does not count and the cursor is
    /// restored to its position.
    ///
    /// # Errors
    /// Returns an error if an entry cannot be read or decoded. Entries
    /// consumed earlier in the same call stay consumed.
    pub fn process(&mut self, max_cycles: u32) -> LogResult<u32> {
        let mut work = 0;

        while work < max_cycles {
            let position = self.reader.position();
            if !self.reader.read(&mut self.record)? {
                break;
            }

            match self.handler.handle(position, &self.record) {
                HandleResult::Consume => work += 1,
                HandleResult::Defer => {
                    self.reader.set_position(position);
                    trace!(position = position.get(), "Entry deferred");
                    break;
                }
            }
        }

        Ok(work)
    }

    /// Replaces the reader and returns the previous one.
    ///
    /// The new reader's cursor is used as is; keeping it consistent with
    /// the old one is the caller's job.
    pub fn rebind(&mut self, reader: L) -> L {
        std::mem::replace(&mut self.reader, reader)
    }

    /// Returns the reader.
    pub const fn reader(&self) -> &L {
        &self.reader
    }

    /// Returns the handler.
    pub const fn handler(&self) -> &H {
        &self.handler
    }

    /// Returns the handler mutably.
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Returns the position the next entry will be read from.
    pub fn position(&self) -> Position {
        self.reader.position()
    }
}

impl<L, R, H> Actor for LogEntryProcessor<L, R, H>
where
    L: LogReader + Send + 'static,
    R: EntryRecord + Send + 'static,
    H: EntryHandler<R> + Send + 'static,
{
    type Error = LogError;

    fn do_work(&mut self, max_cycles: u32) -> Result<u32, LogError> {
        self.process(max_cycles)
    }
}

impl<L, R, H> std::fmt::Debug for LogEntryProcessor<L, R, H>
where
    L: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogEntryProcessor")
            .field("reader", &self.reader)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strand_log::RawRecord;

    /// In-memory reader over a fixed list of payloads.
    #[derive(Debug, Default)]
    struct VecReader {
        entries: Vec<&'static [u8]>,
        position: Position,
        reads: usize,
        fail_at: Option<Position>,
    }

    impl VecReader {
        fn new(entries: &[&'static str]) -> Self {
            Self {
                entries: entries.iter().copied().map(str::as_bytes).collect(),
                ..Self::default()
            }
        }
    }

    impl LogReader for VecReader {
        fn position(&self) -> Position {
            self.position
        }

        fn set_position(&mut self, position: Position) {
            self.position = position;
        }

        fn read<R: EntryRecord>(&mut self, record: &mut R) -> LogResult<bool> {
            self.reads += 1;
            if self.fail_at == Some(self.position) {
                return Err(LogError::Decode {
                    position: self.position,
                    reason: "corrupt".to_string(),
                });
            }
            let Some(payload) = usize::try_from(self.position.get())
                .ok()
                .and_then(|idx| self.entries.get(idx))
            else {
                return Ok(false);
            };
            record.decode(self.position, payload)?;
            self.position = self.position.next();
            Ok(true)
        }
    }

    type Seen = Vec<(u64, Vec<u8>)>;

    fn recording(seen: &mut Seen) -> impl FnMut(Position, &RawRecord) -> HandleResult + '_ {
        move |position: Position, record: &RawRecord| {
            seen.push((position.get(), record.payload().to_vec()));
            HandleResult::Consume
        }
    }

    #[test]
    fn test_consumes_in_order() {
        let mut seen = Seen::new();
        let reader = VecReader::new(&["A", "B", "C"]);
        let mut processor = LogEntryProcessor::new(reader, RawRecord::new(), recording(&mut seen));

        assert_eq!(processor.process(3).unwrap(), 3);
        assert_eq!(processor.position(), Position::new(3));
        drop(processor);

        assert_eq!(
            seen,
            vec![(0, b"A".to_vec()), (1, b"B".to_vec()), (2, b"C".to_vec())]
        );
    }

    #[test]
    fn test_process_is_bounded_by_max_cycles() {
        let reader = VecReader::new(&["A", "B", "C"]);
        let handler = |_: Position, _: &RawRecord| HandleResult::Consume;
        let mut processor = LogEntryProcessor::new(reader, RawRecord::new(), handler);

        assert_eq!(processor.process(2).unwrap(), 2);
        assert_eq!(processor.position(), Position::new(2));
        assert_eq!(processor.process_one().unwrap(), 1);
        assert_eq!(processor.process(5).unwrap(), 0);
    }

    #[test]
    fn test_process_zero_does_not_read() {
        let reader = VecReader::new(&["A"]);
        let handler = |_: Position, _: &RawRecord| HandleResult::Consume;
        let mut processor = LogEntryProcessor::new(reader, RawRecord::new(), handler);

        assert_eq!(processor.process(0).unwrap(), 0);
        assert_eq!(processor.reader().reads, 0);
    }

    #[test]
    fn test_empty_log_returns_zero() {
        let handler = |_: Position, _: &RawRecord| HandleResult::Consume;
        let mut processor = LogEntryProcessor::new(VecReader::default(), RawRecord::new(), handler);

        assert_eq!(processor.process(10).unwrap(), 0);
        assert_eq!(processor.position(), Position::ZERO);
    }

    #[test]
    fn test_defer_redelivers_same_entry() {
        let mut seen = Seen::new();
        let mut defer_b = true;
        let handler = |position: Position, record: &RawRecord| {
            seen.push((position.get(), record.payload().to_vec()));
            if record.payload() == b"B" && defer_b {
                defer_b = false;
                HandleResult::Defer
            } else {
                HandleResult::Consume
            }
        };
        let reader = VecReader::new(&["A", "B", "C"]);
        let mut processor = LogEntryProcessor::new(reader, RawRecord::new(), handler);

        assert_eq!(processor.process(3).unwrap(), 1);
        assert_eq!(processor.position(), Position::new(1));

        assert_eq!(processor.process(3).unwrap(), 2);
        drop(processor);

        assert_eq!(
            seen,
            vec![
                (0, b"A".to_vec()),
                (1, b"B".to_vec()),
                (1, b"B".to_vec()),
                (2, b"C".to_vec()),
            ]
        );
    }

    #[test]
    fn test_defer_first_entry_counts_nothing() {
        let handler = |_: Position, _: &RawRecord| HandleResult::Defer;
        let reader = VecReader::new(&["A", "B"]);
        let mut processor = LogEntryProcessor::new(reader, RawRecord::new(), handler);

        for _ in 0..3 {
            assert_eq!(processor.process(10).unwrap(), 0);
            assert_eq!(processor.position(), Position::ZERO);
        }
        // One read per call: a defer ends the batch.
        assert_eq!(processor.reader().reads, 3);
    }

    #[test]
    fn test_read_error_propagates() {
        let mut reader = VecReader::new(&["A", "B", "C"]);
        reader.fail_at = Some(Position::new(1));
        let handler = |_: Position, _: &RawRecord| HandleResult::Consume;
        let mut processor = LogEntryProcessor::new(reader, RawRecord::new(), handler);

        let err = processor.process(3).unwrap_err();
        assert!(err.is_corruption());
        assert_eq!(processor.position(), Position::new(1));
    }

    #[test]
    fn test_rebind_swaps_reader() {
        let handler = |_: Position, _: &RawRecord| HandleResult::Consume;
        let mut processor =
            LogEntryProcessor::new(VecReader::new(&["A"]), RawRecord::new(), handler);
        assert_eq!(processor.process(5).unwrap(), 1);

        let mut replacement = VecReader::new(&["X", "Y", "Z"]);
        replacement.set_position(Position::new(1));
        let old = processor.rebind(replacement);

        assert_eq!(old.position(), Position::new(1));
        assert_eq!(processor.position(), Position::new(1));
        assert_eq!(processor.process(5).unwrap(), 2);
    }

    #[test]
    fn test_actor_do_work_processes_entries() {
        let handler = |_: Position, _: &RawRecord| HandleResult::Consume;
        let reader = VecReader::new(&["A", "B", "C"]);
        let mut processor = LogEntryProcessor::new(reader, RawRecord::new(), handler);

        assert_eq!(Actor::do_work(&mut processor, 2).unwrap(), 2);
        assert_eq!(Actor::do_work(&mut processor, 2).unwrap(), 1);
    }

    #[test]
    fn test_struct_handler() {
        #[derive(Default)]
        struct Counter {
            consumed: usize,
        }

        impl EntryHandler<RawRecord> for Counter {
            fn handle(&mut self, _position: Position, _record: &RawRecord) -> HandleResult {
                self.consumed += 1;
                HandleResult::Consume
            }
        }

        let reader = VecReader::new(&["A", "B"]);
        let mut processor = LogEntryProcessor::new(reader, RawRecord::new(), Counter::default());
        processor.process(10).unwrap();
        assert_eq!(processor.handler().consumed, 2);

        processor.handler_mut().consumed = 0;
        assert_eq!(processor.handler().consumed, 0);
    }
}
