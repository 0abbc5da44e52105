//! Testing utilities for the CMDB workspace
//!
//! Shared form-layout fixtures and assertions.

#![allow(missing_docs)]

use cmdb_store::{fields, MemoryStore, Query, RecordStore, SysId, Value};
use std::collections::BTreeMap;

pub const SECTION: &str = "sys_ui_section";
pub const ELEMENT: &str = "sys_ui_element";
pub const VIEW: &str = "sys_ui_view";
pub const TABLE_CATALOG: &str = "sys_db_object";

/// Seeds layout records with deterministic 32-hex identifiers
///
/// Identifiers increase in creation order, so tie-breaks on identifier follow
/// the order a test builds things in.
#[derive(Debug, Default)]
pub struct FormFixture {
    store: MemoryStore,
    next: u64,
}

impl FormFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> SysId {
        self.next += 1;
        SysId::new(format!("{:032x}", self.next))
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut MemoryStore {
        &mut self.store
    }

    pub fn catalog(&mut self, names: &[&str]) -> &mut Self {
        for name in names {
            let id = self.next_id();
            self.store
                .seed(TABLE_CATALOG, id, fields([("name", Value::from(*name))]));
        }
        self
    }

    pub fn view(&mut self, title: &str) -> SysId {
        let id = self.next_id();
        self.store
            .seed(VIEW, id, fields([("title", Value::from(title))]))
    }

    pub fn section(&mut self, table: &str, view: &str) -> SysId {
        let id = self.next_id();
        self.store.seed(
            SECTION,
            id,
            fields([("name", Value::from(table)), ("view", Value::from(view))]),
        )
    }

    pub fn element(&mut self, section: &SysId, name: &str, position: i64) -> SysId {
        let id = self.next_id();
        self.element_with_id(id, section, name, position)
    }

    pub fn element_with_id(
        &mut self,
        id: SysId,
        section: &SysId,
        name: &str,
        position: i64,
    ) -> SysId {
        self.store.seed(
            ELEMENT,
            id,
            fields([
                ("sys_ui_section", Value::from(section)),
                ("element", Value::from(name)),
                ("position", Value::Int(position)),
            ]),
        )
    }

    /// Section with `(name, position)` elements, in the given order
    pub fn layout(&mut self, table: &str, view: &str, elements: &[(&str, i64)]) -> SysId {
        let section = self.section(table, view);
        for (name, position) in elements {
            self.element(&section, name, *position);
        }
        section
    }

    pub fn count_named(&self, section: &SysId, name: &str) -> usize {
        count_named(&self.store, section, name)
    }
}

/// `(name, position)` of every element in `section`, by position then name
pub fn section_layout<S: RecordStore + ?Sized>(store: &S, section: &SysId) -> Vec<(String, i64)> {
    let mut layout: Vec<(String, i64)> = store
        .query(&Query::table(ELEMENT).eq("sys_ui_section", section))
        .unwrap()
        .iter()
        .map(|r| (r.text("element"), r.int_lenient("position")))
        .collect();
    layout.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    layout
}

/// Element names of `section` in display order
pub fn section_names<S: RecordStore + ?Sized>(store: &S, section: &SysId) -> Vec<String> {
    section_layout(store, section)
        .into_iter()
        .map(|(name, _)| name)
        .collect()
}

pub fn count_named<S: RecordStore + ?Sized>(store: &S, section: &SysId, name: &str) -> usize {
    store
        .query(
            &Query::table(ELEMENT)
                .eq("sys_ui_section", section)
                .eq("element", name),
        )
        .unwrap()
        .len()
}

/// Panics if any two elements of `section` share a position
pub fn assert_unique_positions<S: RecordStore + ?Sized>(store: &S, section: &SysId) {
    let mut seen: BTreeMap<i64, String> = BTreeMap::new();
    for (name, position) in section_layout(store, section) {
        if let Some(other) = seen.insert(position, name.clone()) {
            panic!("{name} and {other} share position {position} in section {section}");
        }
    }
}
