//! Section mutation
//!
//! Applies a [`PositionPlan`] to one section: every position update first, in
//! ascending original position, then every insertion in plan order. Each
//! write is immediate. In dry-run mode the same rows are produced with the
//! `-dryrun` actions and nothing is written.

use crate::error::EngineError;
use crate::layout::tables;
use crate::planner::PositionPlan;
use cmdb_report::{Action, ReportRow, ReportSink, RunMode};
use cmdb_store::{fields, Query, RecordStore, SysId, Value};

/// Counts of what a mutation did (or would do in dry-run)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationStats {
    /// Elements moved
    pub shifted: usize,
    /// Elements inserted
    pub inserted: usize,
    /// Insertions skipped because the field was already in the section
    pub skipped_existing: usize,
}

impl MutationStats {
    /// Accumulate another section's counts
    pub fn absorb(&mut self, other: Self) {
        self.shifted += other.shifted;
        self.inserted += other.inserted;
        self.skipped_existing += other.skipped_existing;
    }
}

/// Table and view label that rows are attributed to
#[derive(Debug, Clone, Copy)]
pub struct UnitContext<'a> {
    /// Table name
    pub table: &'a str,
    /// View display label
    pub view: &'a str,
}

impl UnitContext<'_> {
    /// Row for this unit
    #[must_use]
    pub fn row(&self, action: Action) -> ReportRow {
        ReportRow::new(action, self.table, self.view)
    }
}

/// Applies plans to sections
#[derive(Debug, Clone, Copy)]
pub struct SectionMutator {
    mode: RunMode,
}

impl SectionMutator {
    /// Create mutator
    #[inline]
    #[must_use]
    pub fn new(mode: RunMode) -> Self {
        Self { mode }
    }

    /// Run mode
    #[inline]
    #[must_use]
    pub fn mode(&self) -> RunMode {
        self.mode
    }

    /// Apply `plan` to `section`, recording one row per step
    ///
    /// # Errors
    /// Returns [`EngineError::Write`] on the first rejected write; earlier
    /// writes are kept. Returns [`EngineError::Store`] if the existence check
    /// cannot be read.
    pub fn apply<S: RecordStore + ?Sized>(
        &self,
        store: &mut S,
        unit: UnitContext<'_>,
        section: &SysId,
        plan: &PositionPlan,
        sink: &mut dyn ReportSink,
    ) -> Result<MutationStats, EngineError> {
        let mut stats = MutationStats::default();
        let writes = self.mode.writes();

        for shift in &plan.shifts {
            if writes {
                store
                    .update(
                        tables::ELEMENT,
                        &shift.element,
                        fields([(tables::ELEMENT_POSITION, Value::Int(shift.to))]),
                    )
                    .map_err(|e| EngineError::write(format!("shifting {}", shift.name), e))?;
            }
            tracing::debug!(
                section = %section,
                element = %shift.name,
                from = shift.from,
                to = shift.to,
                applied = writes,
                "shift"
            );
            sink.record(
                unit.row(if writes {
                    Action::ShiftApplied
                } else {
                    Action::ShiftDryrun
                })
                .with_section(section.as_str())
                .with_element(shift.name.as_str())
                .with_old_pos(shift.from)
                .with_new_pos(shift.to)
                .with_note(format!("sys_ui_element={}", shift.element)),
            );
            stats.shifted += 1;
        }

        for insert in &plan.inserts {
            let present = store.exists(
                &Query::table(tables::ELEMENT)
                    .eq(tables::ELEMENT_SECTION, section)
                    .eq(tables::ELEMENT_NAME, insert.field.as_str())
                    .limit(1),
            )?;
            let row = unit
                .row(Action::InsertSkipExists)
                .with_section(section.as_str())
                .with_element(insert.field.as_str())
                .with_new_pos(insert.position);

            if present {
                sink.record(row.with_note("element already in section"));
                stats.skipped_existing += 1;
                continue;
            }

            if writes {
                let created = store
                    .insert(
                        tables::ELEMENT,
                        fields([
                            (tables::ELEMENT_SECTION, Value::from(section)),
                            (tables::ELEMENT_NAME, Value::from(insert.field.as_str())),
                            (tables::ELEMENT_POSITION, Value::Int(insert.position)),
                        ]),
                    )
                    .map_err(|e| EngineError::write(format!("inserting {}", insert.field), e))?;
                sink.record(ReportRow {
                    action: Action::InsertApplied,
                    ..row.with_note(format!("sys_ui_element={created}"))
                });
            } else {
                sink.record(ReportRow {
                    action: Action::InsertDryrun,
                    ..row
                });
            }
            tracing::debug!(
                section = %section,
                element = %insert.field,
                position = insert.position,
                applied = writes,
                "insert"
            );
            stats.inserted += 1;
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::section_elements;
    use crate::planner::{plan_anchored, AnchorSlot};
    use cmdb_report::Report;
    use cmdb_test_utils::{section_layout, FormFixture};
    use pretty_assertions::assert_eq;

    fn unit() -> UnitContext<'static> {
        UnitContext {
            table: "alm_asset",
            view: "Default",
        }
    }

    fn slots() -> Vec<AnchorSlot> {
        vec![
            AnchorSlot::new(2, "life_cycle_stage"),
            AnchorSlot::new(5, "life_cycle_stage_status"),
        ]
    }

    fn seeded() -> (FormFixture, SysId) {
        let mut fx = FormFixture::new();
        let section = fx.section("alm_asset", "");
        fx.element(&section, "install_status", 2);
        fx.element(&section, "model", 3);
        fx.element(&section, "substatus", 5);
        (fx, section)
    }

    #[test]
    fn apply_shifts_then_inserts() {
        let (mut fx, section) = seeded();
        let elements = section_elements(fx.store(), &section).unwrap();
        let plan = plan_anchored(&elements, &slots()).unwrap();
        let mut report = Report::new();

        let stats = SectionMutator::new(RunMode::Apply)
            .apply(fx.store_mut(), unit(), &section, &plan, &mut report)
            .unwrap();

        assert_eq!(
            stats,
            MutationStats {
                shifted: 3,
                inserted: 2,
                skipped_existing: 0
            }
        );
        let actions: Vec<Action> = report.rows().iter().map(|r| r.action).collect();
        assert_eq!(
            actions,
            vec![
                Action::ShiftApplied,
                Action::ShiftApplied,
                Action::ShiftApplied,
                Action::InsertApplied,
                Action::InsertApplied
            ]
        );
        assert_eq!(
            section_layout(fx.store(), &section),
            vec![
                ("life_cycle_stage".to_string(), 2),
                ("install_status".to_string(), 3),
                ("model".to_string(), 4),
                ("life_cycle_stage_status".to_string(), 5),
                ("substatus".to_string(), 7),
            ]
        );
    }

    #[test]
    fn dry_run_reports_same_steps_without_writing() {
        let (mut fx, section) = seeded();
        let elements = section_elements(fx.store(), &section).unwrap();
        let plan = plan_anchored(&elements, &slots()).unwrap();
        let mut report = Report::new();

        let stats = SectionMutator::new(RunMode::DryRun)
            .apply(fx.store_mut(), unit(), &section, &plan, &mut report)
            .unwrap();

        assert_eq!(stats.shifted, 3);
        assert_eq!(stats.inserted, 2);
        assert_eq!(fx.store().write_count(), 0);
        assert_eq!(report.count(Action::ShiftDryrun), 3);
        assert_eq!(report.count(Action::InsertDryrun), 2);
    }

    #[test]
    fn existing_field_is_not_inserted_again() {
        let (mut fx, section) = seeded();
        fx.element(&section, "life_cycle_stage_status", 9);
        let elements = section_elements(fx.store(), &section).unwrap();
        let plan = plan_anchored(&elements, &slots()).unwrap();
        let mut report = Report::new();

        let stats = SectionMutator::new(RunMode::Apply)
            .apply(fx.store_mut(), unit(), &section, &plan, &mut report)
            .unwrap();

        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.skipped_existing, 1);
        let skip = report.with_action(Action::InsertSkipExists).next().unwrap();
        assert_eq!(skip.element, "life_cycle_stage_status");
        assert_eq!(fx.count_named(&section, "life_cycle_stage_status"), 1);
    }

    #[test]
    fn rejected_write_stops_the_section() {
        let (mut fx, section) = seeded();
        let elements = section_elements(fx.store(), &section).unwrap();
        let plan = plan_anchored(&elements, &slots()).unwrap();
        fx.store_mut().set_write_budget(Some(1));
        let mut report = Report::new();

        let err = SectionMutator::new(RunMode::Apply)
            .apply(fx.store_mut(), unit(), &section, &plan, &mut report)
            .unwrap_err();

        assert!(err.is_unit_local());
        assert_eq!(fx.store().write_count(), 1);
        assert_eq!(report.count(Action::ShiftApplied), 1);
        assert_eq!(report.count(Action::InsertApplied), 0);
    }
}
