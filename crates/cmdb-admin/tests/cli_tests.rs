use cmdb_admin::cli::{build_cli, invocation};
use cmdb_admin::commands::{attach_report, AttachArgs};
use cmdb_admin::execute;
use cmdb_store::{fields, MemoryStore, RecordStore, Snapshot, SysId, Value};
use cmdb_test_utils::{section_names, FormFixture};
use pretty_assertions::assert_eq;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_store(dir: &TempDir, store: &MemoryStore) -> PathBuf {
    let path = dir.path().join("store.json");
    store.to_snapshot().save(&path).unwrap();
    path
}

fn read_store(path: &Path) -> MemoryStore {
    MemoryStore::from_snapshot(Snapshot::load(path).unwrap())
}

fn run(args: &[&str]) -> anyhow::Result<String> {
    let matches = build_cli().try_get_matches_from(args)?;
    execute(&invocation(&matches)?)
}

fn asset_fixture() -> (FormFixture, SysId) {
    let mut fx = FormFixture::new();
    let section = fx.layout(
        "alm_asset",
        "",
        &[("install_status", 2), ("model", 3), ("substatus", 5)],
    );
    (fx, section)
}

#[test]
fn adapt_forms_dry_run_leaves_snapshot_untouched() {
    let dir = TempDir::new().unwrap();
    let (fx, section) = asset_fixture();
    let store_path = write_store(&dir, fx.store());
    let store = store_path.to_str().unwrap();

    let out = run(&["cmdb-admin", "adapt-forms", "--store", store, "--preset", "asset-forms"]).unwrap();

    assert!(out.starts_with("Table,View,Action,SectionSysId,Element,OldPos,NewPos,Note\n"));
    assert!(out.contains("alm_asset,Default,insert-dryrun"));
    assert!(out.ends_with("Mode: DRY-RUN\n"));
    assert_eq!(
        section_names(&read_store(&store_path), &section),
        vec!["install_status", "model", "substatus"]
    );
}

#[test]
fn adapt_forms_apply_writes_to_out_and_csv() {
    let dir = TempDir::new().unwrap();
    let (fx, section) = asset_fixture();
    let store_path = write_store(&dir, fx.store());
    let out_path = dir.path().join("after.yaml");
    let csv_path = dir.path().join("report.csv");

    let out = run(&[
        "cmdb-admin",
        "adapt-forms",
        "--store",
        store_path.to_str().unwrap(),
        "--preset",
        "asset-forms",
        "--apply",
        "--out",
        out_path.to_str().unwrap(),
        "--csv",
        csv_path.to_str().unwrap(),
    ])
    .unwrap();

    assert!(out.ends_with("Mode: APPLY\n"));
    assert_eq!(
        section_names(&read_store(&out_path), &section),
        vec![
            "life_cycle_stage",
            "install_status",
            "model",
            "life_cycle_stage_status",
            "substatus"
        ]
    );
    // source snapshot is left alone when --out is given
    assert_eq!(section_names(&read_store(&store_path), &section).len(), 3);

    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert!(csv.starts_with("Table;View;Action;SectionSysId;Element;OldPos;NewPos;Note\r\n"));
    assert!(csv.ends_with("Mode: APPLY\r\n"));
}

#[test]
fn adapt_forms_mode_override_switches_strategy() {
    let dir = TempDir::new().unwrap();
    let (fx, _) = asset_fixture();
    let store_path = write_store(&dir, fx.store());

    let out = run(&[
        "cmdb-admin",
        "adapt-forms",
        "--store",
        store_path.to_str().unwrap(),
        "--preset",
        "asset-forms",
        "--mode",
        "per-view",
    ])
    .unwrap();

    assert!(out.contains("view-anchor"));
    assert!(!out.contains("section-done"));
}

#[test]
fn legacy_usage_prints_sorted_rows() {
    let dir = TempDir::new().unwrap();
    let mut fx = FormFixture::new();
    fx.layout("cmdb_ci_server", "", &[("operational_status", 1), ("name", 0)]);
    fx.layout("alm_asset", "", &[("substatus", 4), ("install_status", 2)]);
    let store_path = write_store(&dir, fx.store());

    let out = run(&[
        "cmdb-admin",
        "legacy-usage",
        "--store",
        store_path.to_str().unwrap(),
    ])
    .unwrap();

    assert_eq!(
        out,
        "Table,View,Field\n\
         alm_asset,Default,install_status\n\
         alm_asset,Default,substatus\n\
         cmdb_ci_server,Default,operational_status\n\
         ---\nRows: 3\n"
    );
}

#[test]
fn dictionary_lock_applies_and_saves() {
    let dir = TempDir::new().unwrap();
    let mut fx = FormFixture::new();
    fx.catalog(&["alm_asset"]);
    fx.store_mut().seed(
        "sys_dictionary",
        SysId::new("d1"),
        fields([
            ("name", Value::from("alm_asset")),
            ("element", Value::from("install_status")),
            ("read_only", Value::from("false")),
        ]),
    );
    let store_path = write_store(&dir, fx.store());

    let out = run(&[
        "cmdb-admin",
        "dictionary-lock",
        "--store",
        store_path.to_str().unwrap(),
        "--apply",
    ])
    .unwrap();

    assert!(out.contains("alm_asset.install_status -> set-true (sys_id=d1)"));
    assert!(out.contains("alm_asset.substatus -> not-found"));
    assert!(out.ends_with("Mode: APPLY\n"));
    let saved = read_store(&store_path);
    let row = saved.get("sys_dictionary", &SysId::new("d1")).unwrap().unwrap();
    assert!(row.flag("read_only"));
}

#[test]
fn attach_to_missing_record_fails_without_writing() {
    let dir = TempDir::new().unwrap();
    let store_path = write_store(&dir, &MemoryStore::new());
    let csv_path = dir.path().join("report.csv");
    std::fs::write(&csv_path, "Table;View\r\nalm_asset;Default\r\n").unwrap();

    let err = attach_report(&AttachArgs {
        store: store_path.clone(),
        table: "sys_script_fix".into(),
        id: "missing".into(),
        basename: "Update_forms".into(),
        csv: csv_path,
        out: None,
    })
    .unwrap_err();

    assert!(format!("{err:#}").contains("attachment target not found"));
    assert!(read_store(&store_path).is_empty());
}

#[test]
fn attach_stores_payload_on_target() {
    let dir = TempDir::new().unwrap();
    let mut store = MemoryStore::new();
    store.seed(
        "sys_script_fix",
        SysId::new("fix1"),
        fields([("name", Value::from("Adapt forms"))]),
    );
    let store_path = write_store(&dir, &store);
    let csv_path = dir.path().join("report.csv");
    std::fs::write(&csv_path, "Table;View\nalm_asset;Default\n").unwrap();

    let out = run(&[
        "cmdb-admin",
        "attach",
        "--store",
        store_path.to_str().unwrap(),
        "--table",
        "sys_script_fix",
        "--id",
        "fix1",
        "--basename",
        "Update_forms",
        "--csv",
        csv_path.to_str().unwrap(),
    ])
    .unwrap();

    assert!(out.starts_with("Attached Update_forms_"));
    let saved = read_store(&store_path);
    assert_eq!(saved.len("sys_attachment"), 1);
}
