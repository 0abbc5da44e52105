//! Legacy field usage report
//!
//! Lists every form placement of a set of legacy fields as
//! `Table,View,Field`, sorted, one row per element.

use crate::layout::{convert_all, tables, Element, Section};
use crate::views::ViewLabels;
use cmdb_report::{render_table, CsvOptions, ReportError};
use cmdb_store::{Query, RecordStore, StoreError, SysId};
use serde::Serialize;
use std::collections::BTreeMap;

/// Usage report header
pub const USAGE_HEADER: [&str; 3] = ["Table", "View", "Field"];

/// One placement of a legacy field
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct UsageRow {
    /// Table whose form holds the field
    pub table: String,
    /// View display label
    pub view: String,
    /// Field name
    pub field: String,
}

/// Every placement of `fields` on any form
///
/// Elements whose section does not exist, or whose section names no table,
/// are left out.
///
/// # Errors
/// Returns error if a query fails
pub fn legacy_usage<S: RecordStore + ?Sized>(
    store: &S,
    fields: &[String],
    labels: &mut ViewLabels,
) -> Result<Vec<UsageRow>, StoreError> {
    if fields.is_empty() {
        return Ok(Vec::new());
    }
    let records = store.query(
        &Query::table(tables::ELEMENT)
            .is_in(tables::ELEMENT_NAME, fields.iter().map(String::as_str))
            .not_null(tables::ELEMENT_SECTION),
    )?;
    let elements: Vec<Element> = convert_all(&records);

    let mut sections: BTreeMap<SysId, Option<Section>> = BTreeMap::new();
    let mut rows = Vec::with_capacity(elements.len());
    for element in elements {
        if !sections.contains_key(&element.section) {
            let section = store
                .get(tables::SECTION, &element.section)?
                .and_then(|r| Section::try_from(&r).ok());
            sections.insert(element.section.clone(), section);
        }
        let Some(Some(section)) = sections.get(&element.section) else {
            tracing::debug!(element = %element.sys_id, "section reference does not resolve");
            continue;
        };
        rows.push(UsageRow {
            table: section.table.clone(),
            view: labels.label(store, &section.view)?,
            field: element.name,
        });
    }

    rows.sort();
    tracing::info!(rows = rows.len(), "legacy usage collected");
    Ok(rows)
}

/// Render usage rows as CSV
///
/// # Errors
/// Returns error if rendering fails
pub fn render_usage(rows: &[UsageRow], options: &CsvOptions) -> Result<String, ReportError> {
    render_table(
        &USAGE_HEADER,
        rows.iter().map(|r| [r.table.as_str(), r.view.as_str(), r.field.as_str()]),
        options,
    )
}
