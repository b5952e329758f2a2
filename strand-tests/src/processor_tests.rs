//! Entry processing over real partition logs.
//!
//! # Test Categories
//!
//! 1. **Delivery Order**: entries reach the handler in position order
//! 2. **Deferral**: a deferred entry is delivered again at the same position
//! 3. **Bounded Runs**: a call never consumes more than it was allowed
//! 4. **Tailing**: entries appended later are picked up by the same processor

use strand_core::{PartitionId, Position, TopicName};
use strand_log::{LogReader, RawRecord};
use strand_logstreams::{HandleResult, LogEntryProcessor};

use crate::scenarios::{append_all, open_log, RecordingHandler};

fn orders() -> (TopicName, PartitionId) {
    (
        TopicName::try_from("orders").unwrap(),
        PartitionId::new(0).unwrap(),
    )
}

// ============================================================================
// Delivery Order
// ============================================================================

#[tokio::test]
async fn test_processor_consumes_all_entries_in_order() {
    let temp_dir = tempfile::tempdir().unwrap();
    let (topic, partition) = orders();
    let stream = open_log(temp_dir.path(), topic, partition).await.unwrap();
    append_all(&stream, &["A", "B", "C"]).await.unwrap();

    let mut processor =
        LogEntryProcessor::new(stream.reader(), RawRecord::new(), RecordingHandler::new());

    let work = processor.process(10).unwrap();

    assert_eq!(work, 3);
    assert_eq!(processor.handler().consumed_payloads(), vec!["A", "B", "C"]);
    let positions: Vec<_> = processor
        .handler()
        .consumed()
        .iter()
        .map(|(p, _)| *p)
        .collect();
    assert_eq!(positions, vec![Position::new(0), Position::new(1), Position::new(2)]);
    assert_eq!(processor.position(), Position::new(3));
}

#[tokio::test]
async fn test_processor_empty_log_does_no_work() {
    let temp_dir = tempfile::tempdir().unwrap();
    let (topic, partition) = orders();
    let stream = open_log(temp_dir.path(), topic, partition).await.unwrap();

    let mut processor =
        LogEntryProcessor::new(stream.reader(), RawRecord::new(), RecordingHandler::new());

    assert_eq!(processor.process(10).unwrap(), 0);
    assert!(processor.handler().deliveries().is_empty());
    assert_eq!(processor.position(), Position::ZERO);
}

#[tokio::test]
async fn test_processor_starts_at_reader_position() {
    let temp_dir = tempfile::tempdir().unwrap();
    let (topic, partition) = orders();
    let stream = open_log(temp_dir.path(), topic, partition).await.unwrap();
    append_all(&stream, &["A", "B", "C", "D"]).await.unwrap();

    let mut processor = LogEntryProcessor::new(
        stream.reader_at(Position::new(2)),
        RawRecord::new(),
        RecordingHandler::new(),
    );

    assert_eq!(processor.process(10).unwrap(), 2);
    assert_eq!(processor.handler().consumed_payloads(), vec!["C", "D"]);
}

// ============================================================================
// Deferral
// ============================================================================

#[tokio::test]
async fn test_processor_defer_redelivers_same_entry() {
    let temp_dir = tempfile::tempdir().unwrap();
    let (topic, partition) = orders();
    let stream = open_log(temp_dir.path(), topic, partition).await.unwrap();
    append_all(&stream, &["A", "B", "C"]).await.unwrap();

    // Consume A, defer B once.
    let mut calls = 0;
    let mut seen = Vec::new();
    let handler = |position: Position, record: &RawRecord| {
        calls += 1;
        seen.push((position, record.payload().to_vec()));
        if calls == 2 {
            HandleResult::Defer
        } else {
            HandleResult::Consume
        }
    };
    let mut processor = LogEntryProcessor::new(stream.reader(), RawRecord::new(), handler);

    assert_eq!(processor.process(10).unwrap(), 1);
    assert_eq!(processor.position(), Position::new(1));

    assert_eq!(processor.process(10).unwrap(), 2);
    assert_eq!(processor.position(), Position::new(3));

    drop(processor);
    let delivered: Vec<_> = seen
        .iter()
        .map(|(p, d)| (p.get(), String::from_utf8_lossy(d).into_owned()))
        .collect();
    assert_eq!(
        delivered,
        vec![
            (0, "A".to_string()),
            (1, "B".to_string()),
            (1, "B".to_string()),
            (2, "C".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_processor_repeated_defer_never_skips() {
    let temp_dir = tempfile::tempdir().unwrap();
    let (topic, partition) = orders();
    let stream = open_log(temp_dir.path(), topic, partition).await.unwrap();
    append_all(&stream, &["A", "B"]).await.unwrap();

    let mut handler = RecordingHandler::new();
    handler.defer_next(5);
    let mut processor = LogEntryProcessor::new(stream.reader(), RawRecord::new(), handler);

    for _ in 0..5 {
        assert_eq!(processor.process(10).unwrap(), 0);
        assert_eq!(processor.position(), Position::ZERO);
    }
    assert_eq!(processor.process(10).unwrap(), 2);

    let handler = processor.handler();
    assert_eq!(handler.deliveries().len(), 7);
    assert!(handler.deliveries()[..6]
        .iter()
        .all(|(p, d)| *p == Position::ZERO && d == b"A"));
    assert_eq!(handler.consumed_payloads(), vec!["A", "B"]);
}

// ============================================================================
// Bounded Runs
// ============================================================================

#[tokio::test]
async fn test_processor_respects_max_cycles() {
    let temp_dir = tempfile::tempdir().unwrap();
    let (topic, partition) = orders();
    let stream = open_log(temp_dir.path(), topic, partition).await.unwrap();
    let payloads: Vec<String> = (0..10).map(|i| format!("entry-{i}")).collect();
    let refs: Vec<&str> = payloads.iter().map(String::as_str).collect();
    append_all(&stream, &refs).await.unwrap();

    let mut processor =
        LogEntryProcessor::new(stream.reader(), RawRecord::new(), RecordingHandler::new());

    assert_eq!(processor.process(4).unwrap(), 4);
    assert_eq!(processor.process(4).unwrap(), 4);
    assert_eq!(processor.process(4).unwrap(), 2);
    assert_eq!(processor.process(4).unwrap(), 0);
    assert_eq!(processor.handler().consumed_payloads(), payloads);
}

#[tokio::test]
async fn test_processor_zero_cycles_reads_nothing() {
    let temp_dir = tempfile::tempdir().unwrap();
    let (topic, partition) = orders();
    let stream = open_log(temp_dir.path(), topic, partition).await.unwrap();
    append_all(&stream, &["A"]).await.unwrap();

    let mut processor =
        LogEntryProcessor::new(stream.reader(), RawRecord::new(), RecordingHandler::new());

    assert_eq!(processor.process(0).unwrap(), 0);
    assert!(processor.handler().deliveries().is_empty());
    assert_eq!(processor.process_one().unwrap(), 1);
}

// ============================================================================
// Tailing
// ============================================================================

#[tokio::test]
async fn test_processor_picks_up_later_appends() {
    let temp_dir = tempfile::tempdir().unwrap();
    let (topic, partition) = orders();
    let stream = open_log(temp_dir.path(), topic, partition).await.unwrap();
    append_all(&stream, &["A"]).await.unwrap();

    let mut processor =
        LogEntryProcessor::new(stream.reader(), RawRecord::new(), RecordingHandler::new());
    assert_eq!(processor.process(10).unwrap(), 1);
    assert_eq!(processor.process(10).unwrap(), 0);

    append_all(&stream, &["B", "C"]).await.unwrap();
    assert_eq!(processor.process(10).unwrap(), 2);
    assert_eq!(processor.handler().consumed_payloads(), vec!["A", "B", "C"]);
}

#[tokio::test]
async fn test_processor_rebind_continues_from_new_reader() {
    let temp_dir = tempfile::tempdir().unwrap();
    let (topic, partition) = orders();
    let stream = open_log(temp_dir.path(), topic, partition).await.unwrap();
    append_all(&stream, &["A", "B", "C"]).await.unwrap();

    let mut processor =
        LogEntryProcessor::new(stream.reader(), RawRecord::new(), RecordingHandler::new());
    assert_eq!(processor.process_one().unwrap(), 1);

    let previous = processor.rebind(stream.reader_at(Position::new(2)));
    assert_eq!(previous.position(), Position::new(1));

    assert_eq!(processor.process(10).unwrap(), 1);
    assert_eq!(processor.handler().consumed_payloads(), vec!["A", "C"]);
}
