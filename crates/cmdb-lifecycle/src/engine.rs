//! Form adapter
//!
//! Walks the target tables and their candidate views in sorted order and
//! processes each (table, view) as one unit of work:
//!
//! 1. Guard: skip the view if the stage field is already on it
//! 2. Locate anchors (one per view, or two per section)
//! 3. Plan positions
//! 4. Mutate the section and report every step
//!
//! A rejected write ends its unit with a `write-failed` row; the run then
//! moves on to the next unit. Read failures end the run.

use crate::config::{AdaptConfig, AnchorMode, ConfigError};
use crate::discovery::{
    discover_views, eligible_sections, find_view_anchor, section_elements, target_tables,
    view_has_field,
};
use crate::error::EngineError;
use crate::layout::ViewId;
use crate::mutator::{MutationStats, SectionMutator, UnitContext};
use crate::planner::{plan_anchored, plan_flat, AnchorSlot};
use crate::views::ViewLabels;
use cmdb_report::{Action, ReportRow, ReportSink, RunMode};
use cmdb_store::RecordStore;

/// What a run did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Tables in scope
    pub tables: usize,
    /// (table, view) units visited
    pub units: usize,
    /// Units that completed with at least one section adapted
    pub units_adapted: usize,
    /// Units skipped: already adapted, no anchor, no eligible section
    pub units_skipped: usize,
    /// Units abandoned after a rejected write
    pub units_failed: usize,
    /// Sections adapted
    pub sections_adapted: usize,
    /// Sections skipped
    pub sections_skipped: usize,
    /// Element-level counts, planned or written
    pub elements: MutationStats,
}

enum UnitOutcome {
    Skipped,
    Adapted { sections: usize, skipped: usize },
    NothingAdapted { skipped: usize },
}

/// Adds new lifecycle fields to classic forms
#[derive(Debug, Clone)]
pub struct FormAdapter {
    config: AdaptConfig,
    mutator: SectionMutator,
}

impl FormAdapter {
    /// Create adapter
    ///
    /// # Errors
    /// Returns error if the configuration does not validate
    pub fn new(config: AdaptConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mutator = SectionMutator::new(RunMode::from_apply(config.apply));
        Ok(Self { config, mutator })
    }

    /// Configuration in use
    #[inline]
    #[must_use]
    pub fn config(&self) -> &AdaptConfig {
        &self.config
    }

    /// Run mode
    #[inline]
    #[must_use]
    pub fn mode(&self) -> RunMode {
        self.mutator.mode()
    }

    /// Run the migration
    ///
    /// # Errors
    /// Returns [`EngineError::Store`] if a read fails; write failures are
    /// reported per unit and do not end the run
    pub fn run<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        sink: &mut dyn ReportSink,
    ) -> Result<RunSummary, EngineError> {
        let legacy = self.config.mode.legacy_fields();
        let tables = target_tables(&*store, &self.config.scope)?;
        sink.record(ReportRow::info(format!(
            "Target tables={} ({}) mode={} legacy={}",
            tables.len(),
            self.config.scope.describe(),
            self.config.mode.tag(),
            legacy.join("|"),
        )));
        tracing::info!(
            tables = tables.len(),
            mode = self.config.mode.tag(),
            run_mode = self.mode().label(),
            "form adaptation started"
        );

        let views = discover_views(&*store, &tables, &legacy)?;
        let mut labels = ViewLabels::new();
        let mut summary = RunSummary {
            tables: tables.len(),
            ..RunSummary::default()
        };

        for (table, table_views) in &views {
            if table_views.is_empty() {
                sink.record(
                    ReportRow::new(Action::TableNoViews, table.as_str(), "")
                        .with_note("no view holds a legacy field"),
                );
                continue;
            }

            for view in table_views {
                let label = labels.label(&*store, view)?;
                let unit = UnitContext {
                    table: table.as_str(),
                    view: label.as_str(),
                };
                summary.units += 1;

                match self.run_unit(store, unit, view, sink, &mut summary.elements) {
                    Ok(UnitOutcome::Skipped) => summary.units_skipped += 1,
                    Ok(UnitOutcome::NothingAdapted { skipped }) => {
                        summary.units_skipped += 1;
                        summary.sections_skipped += skipped;
                    }
                    Ok(UnitOutcome::Adapted { sections, skipped }) => {
                        summary.units_adapted += 1;
                        summary.sections_adapted += sections;
                        summary.sections_skipped += skipped;
                    }
                    Err(e) if e.is_unit_local() => {
                        tracing::error!(table = %table, view = %label, error = %e, "unit abandoned");
                        sink.record(unit.row(Action::WriteFailed).with_note(e.to_string()));
                        summary.units_failed += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        tracing::info!(
            units = summary.units,
            adapted = summary.units_adapted,
            skipped = summary.units_skipped,
            failed = summary.units_failed,
            shifted = summary.elements.shifted,
            inserted = summary.elements.inserted,
            "form adaptation finished"
        );
        Ok(summary)
    }

    fn run_unit<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        unit: UnitContext<'_>,
        view: &ViewId,
        sink: &mut dyn ReportSink,
        totals: &mut MutationStats,
    ) -> Result<UnitOutcome, EngineError> {
        let stage = self.config.new_fields.stage.as_str();
        if view_has_field(&*store, unit.table, view, stage)? {
            sink.record(
                unit.row(Action::ViewSkip)
                    .with_element(stage)
                    .with_note(format!("{stage} already present on view")),
            );
            return Ok(UnitOutcome::Skipped);
        }

        match &self.config.mode {
            AnchorMode::PerView { legacy_fields } => {
                self.adapt_view(store, unit, view, legacy_fields, sink, totals)
            }
            AnchorMode::PerSection { primary, secondary } => {
                self.adapt_sections(store, unit, view, primary, secondary, sink, totals)
            }
        }
    }

    fn adapt_view<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        unit: UnitContext<'_>,
        view: &ViewId,
        legacy_fields: &[String],
        sink: &mut dyn ReportSink,
        totals: &mut MutationStats,
    ) -> Result<UnitOutcome, EngineError> {
        let Some(anchor) = find_view_anchor(&*store, unit.table, view, legacy_fields)? else {
            sink.record(
                unit.row(Action::ViewNoAnchor)
                    .with_note(format!("none of {} on view", legacy_fields.join("|"))),
            );
            return Ok(UnitOutcome::Skipped);
        };
        sink.record(
            unit.row(Action::ViewAnchor)
                .with_section(anchor.section.as_str())
                .with_element(anchor.name.as_str())
                .with_new_pos(anchor.position)
                .with_note(format!("sys_ui_element={}", anchor.element)),
        );

        let elements = section_elements(&*store, &anchor.section)?;
        let plan = match plan_flat(&elements, anchor.position, &self.config.new_fields.names()) {
            Ok(plan) => plan,
            Err(e) => {
                sink.record(
                    unit.row(Action::SectionSkip)
                        .with_section(anchor.section.as_str())
                        .with_note(e.to_string()),
                );
                return Ok(UnitOutcome::NothingAdapted { skipped: 1 });
            }
        };

        let stats = self
            .mutator
            .apply(store, unit, &anchor.section, &plan, sink)?;
        totals.absorb(stats);

        let verb = if self.mode().writes() { "inserted" } else { "planned" };
        sink.record(
            unit.row(Action::ViewDone)
                .with_section(anchor.section.as_str())
                .with_new_pos(anchor.position)
                .with_note(format!(
                    "lifecycle fields {verb} at pos {} (shifted={})",
                    anchor.position, stats.shifted
                )),
        );
        tracing::info!(table = unit.table, view = unit.view, anchor = anchor.position, "view adapted");
        Ok(UnitOutcome::Adapted {
            sections: 1,
            skipped: 0,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn adapt_sections<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        unit: UnitContext<'_>,
        view: &ViewId,
        primary: &str,
        secondary: &str,
        sink: &mut dyn ReportSink,
        totals: &mut MutationStats,
    ) -> Result<UnitOutcome, EngineError> {
        let scan = eligible_sections(&*store, unit.table, view, primary, secondary)?;
        for partial in &scan.partial {
            sink.record(
                unit.row(Action::SectionSkip)
                    .with_section(partial.section.sys_id.as_str())
                    .with_note(format!("{} not in section", partial.missing)),
            );
        }
        let mut skipped = scan.partial.len();

        if scan.eligible.is_empty() {
            sink.record(
                unit.row(Action::ViewNoSections)
                    .with_note(format!("no section holds both {primary} and {secondary}")),
            );
            return Ok(UnitOutcome::NothingAdapted { skipped });
        }
        sink.record(
            unit.row(Action::ViewProcess)
                .with_note(format!("sections={}", scan.eligible.len())),
        );

        let fields = &self.config.new_fields;
        let mut adapted = 0usize;
        for eligible in &scan.eligible {
            let section = &eligible.section.sys_id;
            let slots = [
                AnchorSlot::new(eligible.primary, fields.stage.as_str()),
                AnchorSlot::new(eligible.secondary, fields.status.as_str()),
            ];
            let plan = match plan_anchored(&eligible.elements, &slots) {
                Ok(plan) => plan,
                Err(e) => {
                    tracing::warn!(table = unit.table, section = %section, error = %e, "section plan rejected");
                    sink.record(
                        unit.row(Action::SectionSkip)
                            .with_section(section.as_str())
                            .with_note(e.to_string()),
                    );
                    skipped += 1;
                    continue;
                }
            };

            let stats = self.mutator.apply(store, unit, section, &plan, sink)?;
            totals.absorb(stats);
            adapted += 1;
            sink.record(
                unit.row(Action::SectionDone)
                    .with_section(section.as_str())
                    .with_note(format!(
                        "{}@{}, {}@{} (shifted={})",
                        fields.stage, eligible.primary, fields.status, eligible.secondary, stats.shifted
                    )),
            );
        }

        let verb = if self.mode().writes() { "adapted" } else { "planned" };
        sink.record(
            unit.row(Action::ViewDone)
                .with_note(format!("sections {verb}={adapted} skipped={skipped}")),
        );
        tracing::info!(table = unit.table, view = unit.view, sections = adapted, "view adapted");

        if adapted == 0 {
            Ok(UnitOutcome::NothingAdapted { skipped })
        } else {
            Ok(UnitOutcome::Adapted {
                sections: adapted,
                skipped,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableScope;
    use cmdb_report::Report;
    use cmdb_test_utils::FormFixture;

    fn asset_config(apply: bool) -> AdaptConfig {
        AdaptConfig::asset_forms()
            .with_scope(TableScope::explicit(["alm_asset"]))
            .with_apply(apply)
    }

    #[test]
    fn summary_counts_adapted_and_skipped_units() {
        let mut fx = FormFixture::new();
        let adapted = fx.section("alm_asset", "");
        fx.element(&adapted, "install_status", 1);
        fx.element(&adapted, "substatus", 4);
        let done = fx.section("alm_asset", "itil");
        fx.element(&done, "install_status", 1);
        fx.element(&done, "life_cycle_stage", 0);

        let adapter = FormAdapter::new(asset_config(true)).unwrap();
        let mut report = Report::new();
        let summary = adapter.run(fx.store_mut(), &mut report).unwrap();

        assert_eq!(summary.units, 2);
        assert_eq!(summary.units_adapted, 1);
        assert_eq!(summary.units_skipped, 1);
        assert_eq!(summary.elements.inserted, 2);
        assert_eq!(report.count(Action::ViewSkip), 1);
        assert_eq!(report.count(Action::SectionDone), 1);
    }

    #[test]
    fn partial_sections_are_reported_before_no_sections() {
        let mut fx = FormFixture::new();
        let half = fx.section("alm_asset", "");
        fx.element(&half, "install_status", 1);

        let adapter = FormAdapter::new(asset_config(false)).unwrap();
        let mut report = Report::new();
        let summary = adapter.run(fx.store_mut(), &mut report).unwrap();

        assert_eq!(summary.units_skipped, 1);
        assert_eq!(summary.sections_skipped, 1);
        let actions: Vec<Action> = report.rows().iter().map(|r| r.action).collect();
        assert_eq!(
            actions,
            vec![Action::Info, Action::SectionSkip, Action::ViewNoSections]
        );
    }

    #[test]
    fn invalid_config_is_refused() {
        let mut config = AdaptConfig::ci_forms();
        config.new_fields.status = config.new_fields.stage.clone();
        assert!(FormAdapter::new(config).is_err());
    }
}
