//! Dictionary read-only enforcement
//!
//! Marks legacy status fields read-only in the field dictionary of every
//! target table, so they stop being edited once the lifecycle fields are live.

use crate::config::DictionaryConfig;
use crate::discovery::target_tables;
use crate::error::EngineError;
use crate::layout::tables;
use cmdb_report::RunMode;
use cmdb_store::{fields, Query, RecordStore, SysId, Value};
use serde::Serialize;
use std::fmt::{self, Display, Formatter};

/// Outcome for one dictionary row (or its absence)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LockStatus {
    /// No dictionary row for the table and field
    NotFound,
    /// Row was already read-only
    AlreadyTrue,
    /// Row was set read-only
    SetTrue,
    /// Row would be set read-only (dry-run)
    WouldSet,
    /// Update rejected by the store
    WriteFailed,
}

impl LockStatus {
    /// Stable tag
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not-found",
            Self::AlreadyTrue => "already-true",
            Self::SetTrue => "set-true",
            Self::WouldSet => "would-set",
            Self::WriteFailed => "write-failed",
        }
    }
}

impl Display for LockStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One enforcement decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockOutcome {
    /// Table name
    pub table: String,
    /// Field name
    pub field: String,
    /// Dictionary row, absent for `not-found`
    pub sys_id: Option<SysId>,
    /// Decision
    pub status: LockStatus,
}

impl LockOutcome {
    /// `table.field -> status (sys_id=...)`
    #[must_use]
    pub fn to_line(&self) -> String {
        match &self.sys_id {
            Some(id) => format!("{}.{} -> {} (sys_id={id})", self.table, self.field, self.status),
            None => format!("{}.{} -> {}", self.table, self.field, self.status),
        }
    }
}

/// Result of an enforcement run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockReport {
    /// Tables in scope
    pub tables: Vec<String>,
    /// Decisions, by table then configured field order
    pub outcomes: Vec<LockOutcome>,
}

impl LockReport {
    /// Count of outcomes with `status`
    #[must_use]
    pub fn count(&self, status: LockStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Header line plus one line per outcome
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        std::iter::once(format!("Target tables: {}", self.tables.len()))
            .chain(self.outcomes.iter().map(LockOutcome::to_line))
            .collect()
    }
}

/// Set `read_only = true` on every dictionary row of the configured fields
///
/// Every matching row is visited, overrides included. A rejected update is
/// recorded as [`LockStatus::WriteFailed`] and the loop continues.
///
/// # Errors
/// Returns error if a read fails
pub fn enforce_read_only<S: RecordStore + ?Sized>(
    store: &mut S,
    config: &DictionaryConfig,
) -> Result<LockReport, EngineError> {
    config.validate()?;
    let mode = RunMode::from_apply(config.apply);
    let tables = target_tables(&*store, &config.scope)?;
    tracing::info!(tables = tables.len(), run_mode = mode.label(), "dictionary lock started");

    let mut outcomes = Vec::new();
    for table in &tables {
        for field in &config.fields {
            let rows = store.query(
                &Query::table(tables::DICTIONARY)
                    .eq(tables::DICTIONARY_TABLE, table.as_str())
                    .eq(tables::DICTIONARY_FIELD, field.as_str())
                    .order_by("sys_id"),
            )?;
            if rows.is_empty() {
                outcomes.push(LockOutcome {
                    table: table.clone(),
                    field: field.clone(),
                    sys_id: None,
                    status: LockStatus::NotFound,
                });
                continue;
            }

            for row in rows {
                let status = if row.flag(tables::DICTIONARY_READ_ONLY) {
                    LockStatus::AlreadyTrue
                } else if !mode.writes() {
                    LockStatus::WouldSet
                } else {
                    match store.update(
                        tables::DICTIONARY,
                        row.sys_id(),
                        fields([(tables::DICTIONARY_READ_ONLY, Value::Bool(true))]),
                    ) {
                        Ok(()) => LockStatus::SetTrue,
                        Err(e) => {
                            tracing::error!(table = %table, field = %field, error = %e, "dictionary update rejected");
                            LockStatus::WriteFailed
                        }
                    }
                };
                outcomes.push(LockOutcome {
                    table: table.clone(),
                    field: field.clone(),
                    sys_id: Some(row.sys_id().clone()),
                    status,
                });
            }
        }
    }

    let report = LockReport { tables, outcomes };
    tracing::info!(
        set = report.count(LockStatus::SetTrue),
        already = report.count(LockStatus::AlreadyTrue),
        missing = report.count(LockStatus::NotFound),
        failed = report.count(LockStatus::WriteFailed),
        "dictionary lock finished"
    );
    Ok(report)
}
