//! Partition log registry tests.
//!
//! Exercises `LogStreamsManager` together with the logs it opens: where logs
//! land on disk, what a failed creation leaves behind, and recovery of a
//! known log through an explicit directory.

use bytes::Bytes;
use strand_core::{PartitionId, Position, TopicName};
use strand_log::RawRecord;
use strand_logstreams::{LogEntryProcessor, LogStreamsConfig, LogStreamsError, LogStreamsManager};

use crate::scenarios::{append_all, RecordingHandler};

fn topic(name: &str) -> TopicName {
    TopicName::try_from(name).unwrap()
}

fn partition(id: i64) -> PartitionId {
    PartitionId::new(id).unwrap()
}

#[tokio::test]
async fn test_registry_two_directories_always_uses_first() {
    let temp_dir = tempfile::tempdir().unwrap();
    let first = temp_dir.path().join("first");
    let second = temp_dir.path().join("second");
    let config = LogStreamsConfig::new().with_directories([&first, &second]);
    let mut manager = LogStreamsManager::new(config);

    for id in 0..16 {
        let stream = manager.create(topic("orders"), partition(id)).await.unwrap();
        assert_eq!(stream.directory(), first.join(format!("orders.{id}")));
    }

    assert_eq!(manager.len(), 16);
    assert!(!second.exists());
}

#[tokio::test]
async fn test_registry_placement_spreads_over_all_but_last() {
    let temp_dir = tempfile::tempdir().unwrap();
    let dirs: Vec<_> = (0..3).map(|i| temp_dir.path().join(format!("d{i}"))).collect();
    let config = LogStreamsConfig::new().with_directories(&dirs);
    let mut manager = LogStreamsManager::new(config);

    for id in 0..64 {
        let stream = manager.create(topic("events"), partition(id)).await.unwrap();
        let parent = stream.directory().parent().unwrap();
        assert!(parent == dirs[0] || parent == dirs[1], "placed in {parent:?}");
    }

    assert!(!dirs[2].exists());
}

#[tokio::test]
async fn test_registry_invalid_segment_size_leaves_no_trace() {
    let temp_dir = tempfile::tempdir().unwrap();
    let data_dir = temp_dir.path().join("data");
    let config = LogStreamsConfig::new()
        .with_directory(&data_dir)
        .with_segment_size_mb(0);
    let mut manager = LogStreamsManager::new(config);

    let err = manager.create(topic("orders"), partition(0)).await.unwrap_err();

    assert!(err.is_configuration());
    assert!(manager.is_empty());
    assert!(manager.get(&topic("orders"), partition(0)).is_none());
    assert!(!data_dir.exists());
}

#[tokio::test]
async fn test_registry_no_directories_message_names_log() {
    let mut manager = LogStreamsManager::new(LogStreamsConfig::new());

    let err = manager.create(topic("orders"), partition(7)).await.unwrap_err();

    assert!(err.is_configuration());
    assert!(err.to_string().contains("cannot start log orders.7"));
    assert!(manager.is_empty());
}

#[tokio::test]
async fn test_registry_create_in_recovers_existing_log() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config = LogStreamsConfig::new().with_directory(temp_dir.path());

    let log_dir = {
        let mut manager = LogStreamsManager::new(config.clone());
        let stream = manager.create(topic("orders"), partition(3)).await.unwrap();
        append_all(&stream, &["A", "B", "C"]).await.unwrap();
        manager.close_all().await.unwrap();
        stream.directory().to_path_buf()
    };

    let mut manager = LogStreamsManager::new(config);
    let stream = manager
        .create_in(topic("orders"), partition(3), &log_dir)
        .await
        .unwrap();
    assert_eq!(stream.tail_position(), Position::new(3));

    let mut processor =
        LogEntryProcessor::new(stream.reader(), RawRecord::new(), RecordingHandler::new());
    assert_eq!(processor.process(10).unwrap(), 3);
    assert_eq!(processor.handler().consumed_payloads(), vec!["A", "B", "C"]);
}

#[tokio::test]
async fn test_registry_replacement_keeps_old_handle_usable() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut manager =
        LogStreamsManager::new(LogStreamsConfig::new().with_directory(temp_dir.path()));

    let old = manager.create(topic("orders"), partition(0)).await.unwrap();
    let other_dir = temp_dir.path().join("elsewhere");
    let new = manager
        .create_in(topic("orders"), partition(0), &other_dir)
        .await
        .unwrap();

    assert_eq!(manager.len(), 1);
    let registered = manager.get(&topic("orders"), partition(0)).unwrap();
    assert_eq!(registered.directory(), other_dir);
    assert_eq!(new.directory(), other_dir);

    assert!(old.is_open());
    old.append(Bytes::from("still writable")).await.unwrap();
    assert_eq!(old.tail_position(), Position::new(1));
    assert_eq!(new.tail_position(), Position::ZERO);
}

#[tokio::test]
async fn test_registry_topics_are_independent() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut manager =
        LogStreamsManager::new(LogStreamsConfig::new().with_directory(temp_dir.path()));

    let orders = manager.create(topic("orders"), partition(0)).await.unwrap();
    let payments = manager.create(topic("payments"), partition(0)).await.unwrap();
    append_all(&orders, &["o1", "o2"]).await.unwrap();
    append_all(&payments, &["p1"]).await.unwrap();

    assert_ne!(orders.directory(), payments.directory());
    assert_eq!(orders.tail_position(), Position::new(2));
    assert_eq!(payments.tail_position(), Position::new(1));

    let mut names: Vec<String> = manager.topics().iter().map(ToString::to_string).collect();
    names.sort();
    assert_eq!(names, vec!["orders", "payments"]);
}

#[tokio::test]
async fn test_registry_rejects_topics_that_escape_directory() {
    let temp_dir = tempfile::tempdir().unwrap();
    let data_dir = temp_dir.path().join("data");
    let mut manager = LogStreamsManager::new(LogStreamsConfig::new().with_directory(&data_dir));

    for name in ["../../escaped", "nested/topic", "..", "."] {
        let err: LogStreamsError = TopicName::try_from(name).unwrap_err().into();
        assert!(err.is_configuration(), "{name:?} not rejected as configuration");
    }

    assert!(manager.is_empty());
    assert!(!temp_dir.path().join("escaped.0").exists());

    // Dots inside a name stay within the configured directory.
    let stream = manager.create(topic("..dots"), partition(0)).await.unwrap();
    assert_eq!(stream.directory(), data_dir.join("..dots.0"));
    assert_eq!(stream.directory().parent().unwrap(), data_dir);
}

#[test]
fn test_registry_non_utf8_topics_cannot_share_a_log() {
    for raw in [vec![0xFF], vec![0xFE], vec![b'a', 0xC3]] {
        let err: LogStreamsError = TopicName::new(raw).unwrap_err().into();
        assert!(err.is_configuration());
    }
}

#[tokio::test]
async fn test_registry_distinct_keys_get_distinct_directories() {
    let temp_dir = tempfile::tempdir().unwrap();
    let data_dir = temp_dir.path().join("data");
    let mut manager = LogStreamsManager::new(LogStreamsConfig::new().with_directory(&data_dir));

    // Keys whose names look alike once joined with the partition.
    let keys = [("a.1", 2), ("a", 12), ("a.12", 0), ("a.1.2", 0), ("é", 0), ("e", 0)];
    let mut streams = Vec::new();
    for (name, id) in keys {
        let stream = manager.create(topic(name), partition(id)).await.unwrap();
        assert_eq!(stream.directory().parent().unwrap(), data_dir);
        streams.push(stream);
    }

    let mut dirs: Vec<_> = streams.iter().map(|s| s.directory().to_path_buf()).collect();
    dirs.sort();
    dirs.dedup();
    assert_eq!(dirs.len(), keys.len());
    assert_eq!(manager.len(), keys.len());

    // Each log only holds its own entries.
    for (i, stream) in streams.iter().enumerate() {
        stream.append(Bytes::from(format!("key-{i}"))).await.unwrap();
    }
    for (i, stream) in streams.iter().enumerate() {
        assert_eq!(stream.tail_position(), Position::new(1));
        let mut processor =
            LogEntryProcessor::new(stream.reader(), RawRecord::new(), RecordingHandler::new());
        assert_eq!(processor.process(10).unwrap(), 1);
        assert_eq!(processor.handler().consumed_payloads(), vec![format!("key-{i}")]);
    }
}
