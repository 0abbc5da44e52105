use cmdb_lifecycle::{AdaptConfig, AnchorMode, FormAdapter, TableScope};
use cmdb_report::{Action, Report, ReportRow};
use cmdb_store::{MemoryStore, RecordStore};
use cmdb_test_utils::{assert_unique_positions, count_named, section_layout, section_names, FormFixture};
use pretty_assertions::assert_eq;

fn per_section(apply: bool) -> AdaptConfig {
    AdaptConfig::asset_forms()
        .with_scope(TableScope::explicit(["alm_asset"]))
        .with_apply(apply)
}

fn per_view(apply: bool) -> AdaptConfig {
    AdaptConfig::ci_forms()
        .with_scope(TableScope::explicit(["cmdb_ci_server"]))
        .with_apply(apply)
}

fn run(config: AdaptConfig, store: &mut MemoryStore) -> Report {
    let mut report = Report::new();
    FormAdapter::new(config)
        .unwrap()
        .run(store, &mut report)
        .unwrap();
    report
}

/// Planned steps without the write/dry-run distinction
fn steps(report: &Report) -> Vec<(String, String, Option<i64>, Option<i64>)> {
    report
        .rows()
        .iter()
        .filter_map(|r| {
            let kind = match r.action {
                Action::ShiftApplied | Action::ShiftDryrun => "shift",
                Action::InsertApplied | Action::InsertDryrun => "insert",
                _ => return None,
            };
            Some((kind.to_string(), r.element.clone(), r.old_pos, r.new_pos))
        })
        .collect()
}

#[test]
fn scenario_a_dual_anchor_section() {
    let mut fx = FormFixture::new();
    let section = fx.layout(
        "alm_asset",
        "",
        &[("install_status", 2), ("substatus", 5), ("other", 3)],
    );

    let report = run(per_section(true), fx.store_mut());

    assert_eq!(
        section_layout(fx.store(), &section),
        vec![
            ("life_cycle_stage".to_string(), 2),
            ("install_status".to_string(), 3),
            ("other".to_string(), 4),
            ("life_cycle_stage_status".to_string(), 5),
            ("substatus".to_string(), 7),
        ]
    );
    assert_eq!(report.count(Action::SectionDone), 1);
    assert_unique_positions(fx.store(), &section);
}

#[test]
fn scenario_b_view_with_stage_is_skipped_without_writes() {
    let mut fx = FormFixture::new();
    fx.layout("alm_asset", "", &[("install_status", 1), ("substatus", 2)]);
    fx.layout("alm_asset", "", &[("life_cycle_stage", 0)]);

    let report = run(per_section(true), fx.store_mut());

    assert_eq!(fx.store().write_count(), 0);
    let skip: Vec<&ReportRow> = report.with_action(Action::ViewSkip).collect();
    assert_eq!(skip.len(), 1);
    assert_eq!(skip[0].view, "Default");
    assert_eq!(report.write_count(), 0);
}

#[test]
fn scenario_c_single_anchor_picks_lowest_position() {
    let mut fx = FormFixture::new();
    let upper = fx.layout(
        "cmdb_ci_server",
        "",
        &[("name", 1), ("install_status", 4), ("ip_address", 5), ("os", 9)],
    );
    let lower = fx.layout("cmdb_ci_server", "", &[("operational_status", 7), ("notes", 8)]);

    let report = run(per_view(true), fx.store_mut());

    assert_eq!(
        section_layout(fx.store(), &upper),
        vec![
            ("name".to_string(), 1),
            ("life_cycle_stage".to_string(), 4),
            ("life_cycle_stage_status".to_string(), 5),
            ("install_status".to_string(), 6),
            ("ip_address".to_string(), 7),
            ("os".to_string(), 11),
        ]
    );
    assert_eq!(
        section_layout(fx.store(), &lower),
        vec![("operational_status".to_string(), 7), ("notes".to_string(), 8)]
    );
    let anchor = report.with_action(Action::ViewAnchor).next().unwrap();
    assert_eq!(anchor.element, "install_status");
    assert_eq!(anchor.new_pos, Some(4));
}

#[test]
fn scenario_d_existing_field_skips_insert_but_still_shifts() {
    let mut fx = FormFixture::new();
    let section = fx.layout(
        "alm_asset",
        "",
        &[
            ("install_status", 2),
            ("substatus", 5),
            ("life_cycle_stage_status", 9),
        ],
    );

    let report = run(per_section(true), fx.store_mut());

    assert_eq!(report.count(Action::InsertSkipExists), 1);
    assert_eq!(report.count(Action::InsertApplied), 1);
    assert_eq!(report.count(Action::ShiftApplied), 3);
    assert_eq!(count_named(fx.store(), &section, "life_cycle_stage_status"), 1);
    assert_eq!(
        section_names(fx.store(), &section),
        vec![
            "life_cycle_stage",
            "install_status",
            "substatus",
            "life_cycle_stage_status"
        ]
    );
}

#[test]
fn second_apply_run_writes_nothing() {
    for config in [per_section(true), per_view(true)] {
        let mut fx = FormFixture::new();
        fx.layout("alm_asset", "", &[("install_status", 2), ("substatus", 5)]);
        fx.layout("cmdb_ci_server", "", &[("install_status", 3), ("operational_status", 4)]);

        run(config.clone(), fx.store_mut());
        let first = fx.store().write_count();
        assert!(first > 0);

        let again = run(config, fx.store_mut());
        assert_eq!(fx.store().write_count(), first);
        assert_eq!(again.write_count(), 0);
        assert!(again.count(Action::ViewSkip) >= 1);
    }
}

#[test]
fn dry_run_plans_exactly_what_apply_writes() {
    for (dry, wet) in [
        (per_section(false), per_section(true)),
        (per_view(false), per_view(true)),
    ] {
        let mut fx = FormFixture::new();
        fx.layout(
            "alm_asset",
            "",
            &[("name", 0), ("install_status", 2), ("model", 3), ("substatus", 5)],
        );
        fx.layout("alm_asset", "itil", &[("install_status", 1), ("substatus", 2)]);
        fx.layout(
            "cmdb_ci_server",
            "",
            &[("operational_status", 3), ("install_status", 6)],
        );
        let mut wet_store = fx.store().clone();

        let planned = run(dry, fx.store_mut());
        assert_eq!(fx.store().write_count(), 0);
        let applied = run(wet, &mut wet_store);

        assert_eq!(steps(&planned), steps(&applied));
        assert_eq!(applied.write_count(), wet_store.write_count());
    }
}

#[test]
fn adjacent_anchors_are_skipped_not_collided() {
    let mut fx = FormFixture::new();
    let section = fx.layout("alm_asset", "", &[("install_status", 2), ("substatus", 3)]);

    let report = run(per_section(true), fx.store_mut());

    assert_eq!(fx.store().write_count(), 0);
    let skip = report.with_action(Action::SectionSkip).next().unwrap();
    assert_eq!(skip.section, section.as_str());
    assert!(skip.note.contains("position 3"));
    assert_unique_positions(fx.store(), &section);
}

#[test]
fn write_failure_abandons_only_its_unit() {
    let mut fx = FormFixture::new();
    let first = fx.layout("alm_asset", "", &[("install_status", 2), ("substatus", 5)]);
    let second = fx.layout("alm_asset", "itil", &[("install_status", 2), ("substatus", 5)]);
    // first unit: 2 shifts succeed, first insert is rejected
    fx.store_mut().set_write_budget(Some(2));

    let mut report = Report::new();
    let adapter = FormAdapter::new(per_section(true)).unwrap();
    let summary = adapter.run(fx.store_mut(), &mut report).unwrap();

    assert_eq!(summary.units_failed, 2);
    let failed: Vec<&ReportRow> = report.with_action(Action::WriteFailed).collect();
    assert_eq!(failed.len(), 2);
    assert_eq!(failed[0].view, "Default");
    assert_eq!(failed[1].view, "itil");
    assert!(failed[0].note.contains("inserting life_cycle_stage"));
    assert_eq!(count_named(fx.store(), &first, "life_cycle_stage"), 0);
    assert_eq!(count_named(fx.store(), &second, "life_cycle_stage"), 0);

    // with the budget lifted the next run completes both units
    fx.store_mut().set_write_budget(None);
    let rerun = run(per_section(true), fx.store_mut());
    assert_eq!(rerun.count(Action::SectionDone), 2);
    assert_eq!(rerun.count(Action::WriteFailed), 0);
}

#[test]
fn mode_is_switchable_on_the_same_data() {
    let mut fx = FormFixture::new();
    fx.layout("alm_asset", "", &[("install_status", 2), ("substatus", 5)]);
    let config = per_section(false).with_mode(AnchorMode::per_view_default());

    let report = run(config, fx.store_mut());

    assert_eq!(report.count(Action::ViewAnchor), 1);
    assert_eq!(report.count(Action::SectionDone), 0);
    assert_eq!(report.count(Action::InsertDryrun), 2);
}

#[test]
fn tables_without_candidate_views_are_reported() {
    let mut fx = FormFixture::new();
    fx.catalog(&["cmdb_ci_server", "cmdb_ci_linux"]);
    fx.layout("cmdb_ci_server", "", &[("install_status", 1)]);
    let config = AdaptConfig::ci_forms().with_scope(TableScope::default().with_prefix("cmdb_ci"));

    let report = run(config, fx.store_mut());

    let no_views: Vec<&str> = report
        .with_action(Action::TableNoViews)
        .map(|r| r.table.as_str())
        .collect();
    assert_eq!(no_views, vec!["cmdb_ci_linux"]);
    assert!(report.rows()[0].note.starts_with("Target tables=2"));
}

#[test]
fn store_trait_object_runs() {
    let mut fx = FormFixture::new();
    fx.layout("alm_asset", "", &[("install_status", 2), ("substatus", 5)]);
    let store: &mut dyn RecordStore = fx.store_mut();
    let mut report = Report::new();
    let summary = FormAdapter::new(per_section(true))
        .unwrap()
        .run(store, &mut report)
        .unwrap();
    assert_eq!(summary.sections_adapted, 1);
}
