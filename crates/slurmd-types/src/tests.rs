//! Unit tests for slurmd-types

use std::collections::BTreeMap;

use crate::{
    AppName, PartitionName, PeerRecord, RelationId, RemoteView, SecretMaterial, SlurmConfig,
    UnitName, UnitStatus,
};

// ============================================================================
// ID Type Tests
// ============================================================================

#[test]
fn relation_id_from_u64_roundtrip() {
    let id = RelationId::new(7);
    let raw: u64 = id.into();
    assert_eq!(raw, 7);
}

#[test]
fn relation_id_display() {
    assert_eq!(RelationId::new(42).to_string(), "42");
}

#[test]
fn unit_name_from_str() {
    let name = UnitName::new("slurmd/0");
    assert_eq!(name.as_str(), "slurmd/0");
}

// ============================================================================
// UnitStatus Tests
// ============================================================================

#[test]
fn status_messages_are_verbatim() {
    assert_eq!(
        UnitStatus::slurm_installed(),
        UnitStatus::active("Slurm Installed")
    );
    assert_eq!(
        UnitStatus::config_available(),
        UnitStatus::active("config available")
    );
    assert_eq!(
        UnitStatus::munge_key_written(),
        UnitStatus::active("munge key written")
    );
    assert_eq!(
        UnitStatus::json_decode_error(),
        UnitStatus::blocked("Error decoding JSON, please debug.")
    );
    assert_eq!(
        UnitStatus::waiting_on_install(),
        UnitStatus::waiting("Waiting on install to complete...")
    );
}

#[test]
fn need_controller_names_the_application() {
    let status = UnitStatus::need_controller(&AppName::new("slurmctld"));
    assert_eq!(
        status,
        UnitStatus::blocked("Blocked need relation to slurmctld.")
    );
}

#[test]
fn status_display_includes_kind_and_message() {
    assert_eq!(
        UnitStatus::waiting_on_install().to_string(),
        "waiting: Waiting on install to complete..."
    );
    assert_eq!(UnitStatus::slurm_installed().kind(), "active");
    assert_eq!(UnitStatus::slurm_installed().message(), "Slurm Installed");
}

#[test]
fn status_serde_roundtrip() {
    let status = UnitStatus::json_decode_error();
    let json = serde_json::to_string(&status).expect("serialize");
    let decoded: UnitStatus = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded, status);
}

// ============================================================================
// PeerRecord Tests
// ============================================================================

fn sample_record(default_partition: bool) -> PeerRecord {
    PeerRecord {
        unit: UnitName::new("slurmd/3"),
        hostname: "node-3.cluster".to_string(),
        inventory: r#"{"cpus": 16, "real_memory": 64000}"#.to_string(),
        partition: PartitionName::new("batch"),
        default_partition,
    }
}

#[test]
fn peer_record_bag_has_exactly_the_wire_keys() {
    let bag = sample_record(true).to_bag();
    let keys: Vec<&str> = bag.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["default", "hostname", "inventory", "partition"]);
}

#[test]
fn peer_record_bag_values() {
    let bag = sample_record(true).to_bag();
    assert_eq!(bag["hostname"], "node-3.cluster");
    assert_eq!(bag["partition"], "batch");
    assert_eq!(bag["default"], "true");

    let bag = sample_record(false).to_bag();
    assert_eq!(bag["default"], "false");
}

#[test]
fn peer_record_unit_is_not_a_wire_key() {
    let bag = sample_record(true).to_bag();
    assert!(!bag.contains_key("unit"));
}

// ============================================================================
// SlurmConfig Tests
// ============================================================================

#[test]
fn config_parses_valid_json() {
    let config = SlurmConfig::parse(br#"{"cluster_name": "osd", "nodes": []}"#).expect("parse");
    assert_eq!(config.as_value()["cluster_name"], "osd");
}

#[test]
fn config_accepts_any_json_value() {
    assert!(SlurmConfig::parse(b"[1, 2, 3]").is_ok());
    assert!(SlurmConfig::parse(b"\"just a string\"").is_ok());
}

#[test]
fn config_rejects_malformed_payload() {
    assert!(SlurmConfig::parse(b"{not json").is_err());
    assert!(SlurmConfig::parse(b"").is_err());
}

// ============================================================================
// SecretMaterial Tests
// ============================================================================

#[test]
fn secret_debug_never_prints_bytes() {
    let secret = SecretMaterial::new(b"supersecretmungekey".to_vec());
    let rendered = format!("{secret:?}");
    assert!(!rendered.contains("supersecret"));
    assert!(rendered.contains("19 bytes"));
}

#[test]
fn secret_serde_roundtrip() {
    let secret = SecretMaterial::new(vec![1u8, 2, 3]);
    let json = serde_json::to_string(&secret).expect("serialize");
    let decoded: SecretMaterial = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded, secret);
}

// ============================================================================
// RemoteView Tests
// ============================================================================

#[test]
fn remote_view_from_btreemap() {
    let mut bag = BTreeMap::new();
    bag.insert("k".to_string(), "v".to_string());
    let view = RemoteView::from(bag);
    assert_eq!(view.get("k"), Some("v"));
}

#[test]
fn remote_view_empty_value_reads_as_missing() {
    let view: RemoteView = [
        ("slurm_config".to_string(), String::new()),
        ("munge_key".to_string(), "abc".to_string()),
    ]
    .into_iter()
    .collect();

    assert_eq!(view.get("slurm_config"), Some(""));
    assert_eq!(view.non_empty("slurm_config"), None);
    assert_eq!(view.non_empty("munge_key"), Some("abc"));
    assert_eq!(view.non_empty("absent"), None);
}

// ============================================================================
// Property-Based Tests
// ============================================================================

mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn relation_id_roundtrip(id in any::<u64>()) {
            let relation = RelationId::new(id);
            let raw: u64 = relation.into();
            prop_assert_eq!(raw, id);
        }

        #[test]
        fn peer_record_bag_shape_is_stable(
            hostname in "[a-z0-9.-]{1,32}",
            inventory in ".{0,64}",
            partition in "[a-z]{1,16}",
            default_partition in any::<bool>(),
        ) {
            let record = PeerRecord {
                unit: UnitName::new("slurmd/0"),
                hostname,
                inventory,
                partition: PartitionName::new(partition),
                default_partition,
            };
            let bag = record.to_bag();
            prop_assert_eq!(bag.len(), 4);
            prop_assert!(bag["default"] == "true" || bag["default"] == "false");
        }

        #[test]
        fn peer_record_serde_roundtrip(default_partition in any::<bool>()) {
            let record = PeerRecord {
                unit: UnitName::new("slurmd/1"),
                hostname: "host".to_string(),
                inventory: "{}".to_string(),
                partition: PartitionName::new("debug"),
                default_partition,
            };
            let json = serde_json::to_string(&record).expect("serialize");
            let decoded: PeerRecord = serde_json::from_str(&json).expect("deserialize");
            prop_assert_eq!(decoded, record);
        }
    }
}
