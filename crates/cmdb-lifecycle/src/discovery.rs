//! Table, view and section discovery
//!
//! Read-only queries that decide what the engine works on. Discovery is
//! deliberately conservative: elements pointing at sections outside the
//! working set are ignored, and sections that hold only part of what a plan
//! needs are returned as partial so the caller can skip them explicitly.

use crate::config::TableScope;
use crate::layout::{convert_all, tables, Element, Section, ViewId};
use crate::planner::{select_anchor, AnchorCandidate};
use cmdb_store::{Query, RecordStore, StoreError, SysId};
use std::collections::{BTreeMap, BTreeSet};

/// Tables in scope: explicit, prefix-matched and extra; de-duplicated, sorted
///
/// # Errors
/// Returns error if the catalog query fails
pub fn target_tables<S: RecordStore + ?Sized>(
    store: &S,
    scope: &TableScope,
) -> Result<Vec<String>, StoreError> {
    let mut tables: BTreeSet<String> = scope
        .tables
        .iter()
        .map(|t| t.trim().to_string())
        .collect();

    for prefix in &scope.prefixes {
        let query = Query::table(tables::TABLE_CATALOG)
            .starts_with(tables::TABLE_CATALOG_NAME, prefix.as_str());
        let matched = store.query(&query)?;
        tracing::debug!(prefix = %prefix, count = matched.len(), "catalog prefix scan");
        tables.extend(matched.iter().map(|r| r.text(tables::TABLE_CATALOG_NAME)));
    }

    tables.extend(scope.extra_tables.iter().map(|t| t.trim().to_string()));
    tables.retain(|t| !t.is_empty());
    Ok(tables.into_iter().collect())
}

/// Views holding at least one of `legacy_fields`, per table
///
/// Every table in `tables` gets an entry, empty when none of its views
/// qualify.
///
/// # Errors
/// Returns error if a query fails
pub fn discover_views<S: RecordStore + ?Sized>(
    store: &S,
    tables: &[String],
    legacy_fields: &[String],
) -> Result<BTreeMap<String, BTreeSet<ViewId>>, StoreError> {
    let mut views: BTreeMap<String, BTreeSet<ViewId>> =
        tables.iter().map(|t| (t.clone(), BTreeSet::new())).collect();
    if tables.is_empty() || legacy_fields.is_empty() {
        return Ok(views);
    }

    let section_records = store.query(
        &Query::table(tables::SECTION)
            .is_in(tables::SECTION_TABLE, tables.iter().map(String::as_str)),
    )?;
    let sections: BTreeMap<SysId, Section> = convert_all::<Section>(&section_records)
        .into_iter()
        .map(|s| (s.sys_id.clone(), s))
        .collect();

    let element_records = store.query(
        &Query::table(tables::ELEMENT)
            .is_in(tables::ELEMENT_NAME, legacy_fields.iter().map(String::as_str))
            .not_null(tables::ELEMENT_SECTION),
    )?;

    let mut unresolved = 0usize;
    for element in convert_all::<Element>(&element_records) {
        let Some(section) = sections.get(&element.section) else {
            unresolved += 1;
            continue;
        };
        if let Some(set) = views.get_mut(&section.table) {
            set.insert(section.view.clone());
        }
    }
    if unresolved > 0 {
        tracing::debug!(unresolved, "legacy elements outside the working set ignored");
    }
    Ok(views)
}

/// Sections of one (table, view), in identifier order
///
/// # Errors
/// Returns error if the query fails
pub fn sections_in_view<S: RecordStore + ?Sized>(
    store: &S,
    table: &str,
    view: &ViewId,
) -> Result<Vec<Section>, StoreError> {
    let records = store.query(
        &Query::table(tables::SECTION)
            .eq(tables::SECTION_TABLE, table)
            .eq(tables::SECTION_VIEW, view.as_str())
            .order_by("sys_id"),
    )?;
    Ok(convert_all(&records))
}

/// Elements of one section, in position order
///
/// # Errors
/// Returns error if the query fails
pub fn section_elements<S: RecordStore + ?Sized>(
    store: &S,
    section: &SysId,
) -> Result<Vec<Element>, StoreError> {
    let records = store.query(
        &Query::table(tables::ELEMENT)
            .eq(tables::ELEMENT_SECTION, section)
            .order_by(tables::ELEMENT_POSITION),
    )?;
    Ok(convert_all(&records))
}

/// True if any section of (table, view) already holds `field`
///
/// # Errors
/// Returns error if a query fails
pub fn view_has_field<S: RecordStore + ?Sized>(
    store: &S,
    table: &str,
    view: &ViewId,
    field: &str,
) -> Result<bool, StoreError> {
    let sections = sections_in_view(store, table, view)?;
    if sections.is_empty() {
        return Ok(false);
    }
    store.exists(
        &Query::table(tables::ELEMENT)
            .is_in(tables::ELEMENT_SECTION, sections.iter().map(|s| &s.sys_id))
            .eq(tables::ELEMENT_NAME, field),
    )
}

/// Section holding both legacy anchors of a per-section migration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibleSection {
    /// The section
    pub section: Section,
    /// Every element of the section, in position order
    pub elements: Vec<Element>,
    /// Position of the primary legacy field
    pub primary: i64,
    /// Position of the secondary legacy field
    pub secondary: i64,
}

/// Section holding some but not all legacy anchors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialSection {
    /// The section
    pub section: Section,
    /// Legacy field that was not found
    pub missing: String,
}

/// Sections of a view, split by per-section eligibility
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionScan {
    /// Sections holding both anchors
    pub eligible: Vec<EligibleSection>,
    /// Sections holding exactly one anchor
    pub partial: Vec<PartialSection>,
}

/// Classify the sections of (table, view) for a per-section migration
///
/// A section with both `primary` and `secondary` is eligible; one with only
/// one of them is partial; one with neither is left out. When a legacy field
/// appears more than once in a section, its first (position, identifier)
/// occurrence anchors.
///
/// # Errors
/// Returns error if a query fails
pub fn eligible_sections<S: RecordStore + ?Sized>(
    store: &S,
    table: &str,
    view: &ViewId,
    primary: &str,
    secondary: &str,
) -> Result<SectionScan, StoreError> {
    let mut scan = SectionScan::default();
    for section in sections_in_view(store, table, view)? {
        let elements = section_elements(store, &section.sys_id)?;
        let first = |name: &str| {
            select_anchor(
                elements
                    .iter()
                    .filter(|e| e.name == name)
                    .map(AnchorCandidate::from),
            )
            .map(|c| c.position)
        };
        match (first(primary), first(secondary)) {
            (Some(p), Some(s)) => scan.eligible.push(EligibleSection {
                section,
                elements,
                primary: p,
                secondary: s,
            }),
            (Some(_), None) => scan.partial.push(PartialSection {
                section,
                missing: secondary.to_string(),
            }),
            (None, Some(_)) => scan.partial.push(PartialSection {
                section,
                missing: primary.to_string(),
            }),
            (None, None) => {}
        }
    }
    Ok(scan)
}

/// First legacy element on (table, view) by (position, identifier)
///
/// # Errors
/// Returns error if a query fails
pub fn find_view_anchor<S: RecordStore + ?Sized>(
    store: &S,
    table: &str,
    view: &ViewId,
    legacy_fields: &[String],
) -> Result<Option<AnchorCandidate>, StoreError> {
    let sections = sections_in_view(store, table, view)?;
    if sections.is_empty() || legacy_fields.is_empty() {
        return Ok(None);
    }
    let records = store.query(
        &Query::table(tables::ELEMENT)
            .is_in(tables::ELEMENT_SECTION, sections.iter().map(|s| &s.sys_id))
            .is_in(tables::ELEMENT_NAME, legacy_fields.iter().map(String::as_str)),
    )?;
    let elements: Vec<Element> = convert_all(&records);
    Ok(select_anchor(elements.iter().map(AnchorCandidate::from)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdb_test_utils::FormFixture;
    use pretty_assertions::assert_eq;

    fn legacy() -> Vec<String> {
        vec!["install_status".into(), "operational_status".into()]
    }

    #[test]
    fn target_tables_merge_prefix_and_extras() {
        let mut fx = FormFixture::new();
        fx.catalog(&["cmdb_ci_server", "cmdb_ci", "alm_asset", "cmdb_ci_server"]);
        let scope = TableScope::explicit(["alm_asset"])
            .with_prefix("cmdb_ci")
            .with_extra("service_offering");
        let tables = target_tables(fx.store(), &scope).unwrap();
        assert_eq!(
            tables,
            vec!["alm_asset", "cmdb_ci", "cmdb_ci_server", "service_offering"]
        );
    }

    #[test]
    fn discover_views_lists_every_table() {
        let mut fx = FormFixture::new();
        let default = fx.section("cmdb_ci_server", "");
        fx.element(&default, "operational_status", 3);
        let ess = fx.section("cmdb_ci_server", "ess");
        fx.element(&ess, "name", 0);
        let orphan = SysId::new("missing");
        fx.element(&orphan, "install_status", 1);

        let tables = vec!["cmdb_ci_server".to_string(), "cmdb_ci_linux".to_string()];
        let views = discover_views(fx.store(), &tables, &legacy()).unwrap();
        assert_eq!(
            views["cmdb_ci_server"].iter().collect::<Vec<_>>(),
            vec![&ViewId::default_view()]
        );
        assert!(views["cmdb_ci_linux"].is_empty());
    }

    #[test]
    fn guard_sees_field_in_any_section_of_view() {
        let mut fx = FormFixture::new();
        let first = fx.section("alm_asset", "");
        fx.element(&first, "install_status", 1);
        let second = fx.section("alm_asset", "");
        fx.element(&second, "life_cycle_stage", 4);
        let other_view = fx.section("alm_asset", "itil");
        fx.element(&other_view, "name", 0);

        let store = fx.store();
        assert!(view_has_field(store, "alm_asset", &ViewId::default_view(), "life_cycle_stage").unwrap());
        assert!(!view_has_field(store, "alm_asset", &ViewId::new("itil"), "life_cycle_stage").unwrap());
        assert!(!view_has_field(store, "alm_asset", &ViewId::new("none"), "life_cycle_stage").unwrap());
    }

    #[test]
    fn sections_are_classified_by_anchor_presence() {
        let mut fx = FormFixture::new();
        let both = fx.section("alm_asset", "");
        fx.element(&both, "install_status", 2);
        fx.element(&both, "substatus", 5);
        let half = fx.section("alm_asset", "");
        fx.element(&half, "install_status", 1);
        let none = fx.section("alm_asset", "");
        fx.element(&none, "name", 1);

        let scan = eligible_sections(
            fx.store(),
            "alm_asset",
            &ViewId::default_view(),
            "install_status",
            "substatus",
        )
        .unwrap();
        assert_eq!(scan.eligible.len(), 1);
        assert_eq!(scan.eligible[0].section.sys_id, both);
        assert_eq!((scan.eligible[0].primary, scan.eligible[0].secondary), (2, 5));
        assert_eq!(scan.partial.len(), 1);
        assert_eq!(scan.partial[0].missing, "substatus");
    }

    #[test]
    fn view_anchor_is_lowest_position_across_sections() {
        let mut fx = FormFixture::new();
        let top = fx.section("cmdb_ci_server", "");
        fx.element(&top, "operational_status", 6);
        let bottom = fx.section("cmdb_ci_server", "");
        fx.element(&bottom, "install_status", 2);

        let anchor = find_view_anchor(fx.store(), "cmdb_ci_server", &ViewId::default_view(), &legacy())
            .unwrap()
            .unwrap();
        assert_eq!(anchor.section, bottom);
        assert_eq!(anchor.position, 2);
        assert_eq!(anchor.name, "install_status");
    }
}
