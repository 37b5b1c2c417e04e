//! Unit tests for slurmd-exchange

use std::fs;

use slurmd_types::{AppName, PartitionName, PeerRecord, RelationId, UnitName};

use crate::{Exchange, ExchangeError, FileExchange, MemoryExchange};

// ============================================================================
// Test Helpers
// ============================================================================

fn rel() -> RelationId {
    RelationId::new(4)
}

fn controller() -> AppName {
    AppName::new("slurmctld")
}

fn unit() -> UnitName {
    UnitName::new("slurmd/0")
}

fn record() -> PeerRecord {
    PeerRecord {
        unit: unit(),
        hostname: "node-0.cluster".to_string(),
        inventory: r#"{"cpus": 8}"#.to_string(),
        partition: PartitionName::new("batch"),
        default_partition: false,
    }
}

// ============================================================================
// MemoryExchange Tests
// ============================================================================

#[test]
fn memory_unknown_relation_reads_as_none() {
    let exchange = MemoryExchange::new();
    let view = exchange.remote_app_view(rel(), &controller()).expect("read");
    assert!(view.is_none());
}

#[test]
fn memory_live_relation_without_writes_reads_as_empty_view() {
    let mut exchange = MemoryExchange::new();
    exchange.add_relation(rel());

    let view = exchange
        .remote_app_view(rel(), &controller())
        .expect("read")
        .expect("relation exists");
    assert!(view.is_empty());
}

#[test]
fn memory_reads_observe_completed_writes() {
    let mut exchange = MemoryExchange::new();
    exchange.set_remote(rel(), &controller(), "slurm_config", "{}");

    let view = exchange
        .remote_app_view(rel(), &controller())
        .expect("read")
        .expect("relation exists");
    assert_eq!(view.get("slurm_config"), Some("{}"));
}

#[test]
fn memory_last_write_wins() {
    let mut exchange = MemoryExchange::new();
    exchange.set_remote(rel(), &controller(), "slurm_config", "old");
    exchange.set_remote(rel(), &controller(), "slurm_config", "new");

    let view = exchange
        .remote_app_view(rel(), &controller())
        .expect("read")
        .expect("relation exists");
    assert_eq!(view.get("slurm_config"), Some("new"));
}

#[test]
fn memory_publish_is_read_own_write() {
    let mut exchange = MemoryExchange::new();
    exchange
        .publish_unit_record(rel(), &unit(), &record())
        .expect("publish");

    let bag = exchange.unit_bag(rel(), &unit()).expect("bag exists");
    assert_eq!(bag["hostname"], "node-0.cluster");
    assert_eq!(bag["default"], "false");
}

#[test]
fn memory_publish_log_counts_every_write() {
    let mut exchange = MemoryExchange::new();
    exchange
        .publish_unit_record(rel(), &unit(), &record())
        .expect("publish");
    exchange
        .publish_unit_record(rel(), &unit(), &record())
        .expect("publish");

    assert_eq!(exchange.publish_log(), &[(rel(), unit()), (rel(), unit())]);
}

#[test]
fn memory_removed_relation_reads_as_none() {
    let mut exchange = MemoryExchange::new();
    exchange.set_remote(rel(), &controller(), "slurm_config", "{}");
    exchange.remove_relation(rel());

    let view = exchange.remote_app_view(rel(), &controller()).expect("read");
    assert!(view.is_none());
}

// ============================================================================
// FileExchange Tests
// ============================================================================

#[test]
fn file_absent_bag_reads_as_none() {
    let dir = tempfile::tempdir().expect("tempdir");
    let exchange = FileExchange::new(dir.path());

    let view = exchange.remote_app_view(rel(), &controller()).expect("read");
    assert!(view.is_none());
}

#[test]
fn file_publish_then_read_backing_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut exchange = FileExchange::new(dir.path());

    exchange
        .publish_unit_record(rel(), &unit(), &record())
        .expect("publish");

    // The slash in the unit name is encoded in the filename.
    let path = dir.path().join("4").join("unit-slurmd-0.json");
    let contents = fs::read_to_string(&path).expect("bag file exists");
    let bag: std::collections::BTreeMap<String, String> =
        serde_json::from_str(&contents).expect("bag parses");

    assert_eq!(bag["hostname"], "node-0.cluster");
    assert_eq!(bag["partition"], "batch");
    assert_eq!(bag["default"], "false");
    assert!(!bag.contains_key("unit"));
}

#[test]
fn file_seed_then_snapshot_roundtrip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let exchange = FileExchange::new(dir.path());

    exchange
        .seed_remote_app(rel(), &controller(), "slurm_config", r#"{"a": 1}"#)
        .expect("seed");
    exchange
        .seed_remote_app(rel(), &controller(), "munge_key", "aGVsbG8=")
        .expect("seed");

    let view = exchange
        .remote_app_view(rel(), &controller())
        .expect("read")
        .expect("bag exists");
    assert_eq!(view.get("slurm_config"), Some(r#"{"a": 1}"#));
    assert_eq!(view.get("munge_key"), Some("aGVsbG8="));
}

#[test]
fn file_seed_preserves_other_keys() {
    let dir = tempfile::tempdir().expect("tempdir");
    let exchange = FileExchange::new(dir.path());

    exchange
        .seed_remote_app(rel(), &controller(), "slurm_config", "old")
        .expect("seed");
    exchange
        .seed_remote_app(rel(), &controller(), "munge_key", "key")
        .expect("seed");
    exchange
        .seed_remote_app(rel(), &controller(), "slurm_config", "new")
        .expect("seed");

    let view = exchange
        .remote_app_view(rel(), &controller())
        .expect("read")
        .expect("bag exists");
    assert_eq!(view.get("slurm_config"), Some("new"));
    assert_eq!(view.get("munge_key"), Some("key"));
}

#[test]
fn file_corrupt_bag_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let exchange = FileExchange::new(dir.path());

    let bag_dir = dir.path().join("4");
    fs::create_dir_all(&bag_dir).expect("mkdir");
    fs::write(bag_dir.join("app-slurmctld.json"), "{truncated").expect("write");

    let result = exchange.remote_app_view(rel(), &controller());
    assert!(matches!(result, Err(ExchangeError::MalformedBag { .. })));
}

#[test]
fn file_no_temp_files_left_behind() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut exchange = FileExchange::new(dir.path());

    exchange
        .publish_unit_record(rel(), &unit(), &record())
        .expect("publish");

    let leftovers: Vec<_> = fs::read_dir(dir.path().join("4"))
        .expect("dir exists")
        .filter_map(Result::ok)
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "tmp"))
        .collect();
    assert!(leftovers.is_empty());
}
