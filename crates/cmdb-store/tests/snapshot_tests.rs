//! Snapshot persistence tests
//!
//! A store written to disk and read back must answer the same queries.

use cmdb_store::{fields, MemoryStore, Query, RecordStore, Snapshot, SysId, Value};
use proptest::prelude::*;

fn sample_store() -> MemoryStore {
    let mut store = MemoryStore::new();
    store.seed(
        "sys_ui_section",
        SysId::new("s1"),
        fields([("name", Value::from("alm_asset")), ("view", Value::from(""))]),
    );
    store.seed(
        "sys_ui_element",
        SysId::new("e1"),
        fields([
            ("sys_ui_section", Value::from("s1")),
            ("element", Value::from("install_status")),
            ("position", Value::Int(3)),
        ]),
    );
    store
}

#[test]
fn json_file_roundtrip_preserves_queries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.json");

    sample_store().to_snapshot().save(&path).unwrap();
    let restored = MemoryStore::from_snapshot(Snapshot::load(&path).unwrap());

    let hits = restored
        .query(&Query::table("sys_ui_element").eq("sys_ui_section", "s1"))
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].int_lenient("position"), 3);
}

#[test]
fn yaml_file_roundtrip_preserves_queries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.yaml");

    sample_store().to_snapshot().save(&path).unwrap();
    let restored = MemoryStore::from_snapshot(Snapshot::load(&path).unwrap());

    assert!(restored
        .exists(&Query::table("sys_ui_section").eq("name", "alm_asset").eq("view", ""))
        .unwrap());
}

proptest! {
    #[test]
    fn prop_ordered_query_is_sorted(positions in proptest::collection::vec(-50i64..50, 0..30)) {
        let mut store = MemoryStore::new();
        for (i, p) in positions.iter().enumerate() {
            store.seed(
                "sys_ui_element",
                SysId::new(format!("e{i:03}")),
                fields([("position", Value::from(p.to_string()))]),
            );
        }

        let rows = store
            .query(&Query::table("sys_ui_element").order_by("position"))
            .unwrap();
        let seen: Vec<i64> = rows.iter().map(|r| r.int_lenient("position")).collect();
        let mut expected = positions.clone();
        expected.sort_unstable();
        prop_assert_eq!(seen, expected);
    }
}
