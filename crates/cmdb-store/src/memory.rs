//! In-memory record store
//!
//! Backs tests and snapshot-driven CLI runs. Rows are kept per table keyed by
//! identifier; query results without an explicit ordering come back in
//! identifier order, which callers must not rely on.

use crate::query::Query;
use crate::record::{Fields, Record, SysId};
use crate::snapshot::{Snapshot, SnapshotRecord};
use crate::store::{RecordStore, StoreError};
use std::collections::BTreeMap;

/// In-memory [`RecordStore`]
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: BTreeMap<String, BTreeMap<SysId, Record>>,
    writes: usize,
    write_budget: Option<usize>,
}

impl MemoryStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every write after the first `budget` successful ones
    #[inline]
    #[must_use]
    pub fn with_write_budget(mut self, budget: usize) -> Self {
        self.write_budget = Some(budget);
        self
    }

    /// Change the write budget of an existing store
    #[inline]
    pub fn set_write_budget(&mut self, budget: Option<usize>) {
        self.write_budget = budget;
    }

    /// Place a record without counting it as a write
    pub fn seed(&mut self, table: &str, sys_id: SysId, fields: Fields) -> SysId {
        let record = Record::new(table, sys_id.clone(), fields);
        self.tables
            .entry(table.to_string())
            .or_default()
            .insert(sys_id.clone(), record);
        sys_id
    }

    /// Successful writes since creation
    #[inline]
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes
    }

    /// Reset the write counter
    #[inline]
    pub fn reset_write_count(&mut self) {
        self.writes = 0;
    }

    /// Number of records in `table`
    #[must_use]
    pub fn len(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, BTreeMap::len)
    }

    /// True when no table holds any record
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.values().all(BTreeMap::is_empty)
    }

    /// Build from a snapshot
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut store = Self::new();
        for (table, rows) in snapshot.tables {
            for row in rows {
                store.seed(&table, row.sys_id, row.fields);
            }
        }
        store
    }

    /// Capture current contents
    #[must_use]
    pub fn to_snapshot(&self) -> Snapshot {
        let tables = self
            .tables
            .iter()
            .map(|(table, rows)| {
                let rows = rows
                    .values()
                    .map(|r| SnapshotRecord {
                        sys_id: r.sys_id().clone(),
                        fields: r.fields().clone(),
                    })
                    .collect();
                (table.clone(), rows)
            })
            .collect();
        Snapshot { tables }
    }

    fn charge_write(&mut self, table: &str) -> Result<(), StoreError> {
        if let Some(budget) = self.write_budget {
            if self.writes >= budget {
                tracing::debug!(table, budget, "write budget exhausted");
                return Err(StoreError::WriteRejected {
                    table: table.to_string(),
                    reason: format!("write budget of {budget} exhausted"),
                });
            }
        }
        self.writes += 1;
        Ok(())
    }
}

impl RecordStore for MemoryStore {
    fn query(&self, query: &Query) -> Result<Vec<Record>, StoreError> {
        let Some(rows) = self.tables.get(query.table_name()) else {
            return Ok(Vec::new());
        };
        let mut results: Vec<Record> = rows
            .values()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        query.finish(&mut results);
        Ok(results)
    }

    fn get(&self, table: &str, id: &SysId) -> Result<Option<Record>, StoreError> {
        Ok(self.tables.get(table).and_then(|rows| rows.get(id)).cloned())
    }

    fn insert(&mut self, table: &str, fields: Fields) -> Result<SysId, StoreError> {
        self.charge_write(table)?;
        let id = SysId::generate();
        Ok(self.seed(table, id, fields))
    }

    fn update(&mut self, table: &str, id: &SysId, fields: Fields) -> Result<(), StoreError> {
        if self.get(table, id)?.is_none() {
            return Err(StoreError::NotFound {
                table: table.to_string(),
                id: id.clone(),
            });
        }
        self.charge_write(table)?;
        if let Some(record) = self.tables.get_mut(table).and_then(|rows| rows.get_mut(id)) {
            record.apply(fields);
        }
        Ok(())
    }

    fn delete(&mut self, table: &str, id: &SysId) -> Result<(), StoreError> {
        if self.get(table, id)?.is_none() {
            return Err(StoreError::NotFound {
                table: table.to_string(),
                id: id.clone(),
            });
        }
        self.charge_write(table)?;
        if let Some(rows) = self.tables.get_mut(table) {
            rows.remove(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{fields, Value};

    #[test]
    fn insert_update_delete_roundtrip() {
        let mut store = MemoryStore::new();
        let id = store
            .insert("incident", fields([("number", Value::from("INC0001"))]))
            .unwrap();

        store
            .update("incident", &id, fields([("state", Value::Int(2))]))
            .unwrap();
        let rec = store.get("incident", &id).unwrap().unwrap();
        assert_eq!(rec.text("number"), "INC0001");
        assert_eq!(rec.int_lenient("state"), 2);

        store.delete("incident", &id).unwrap();
        assert!(store.get("incident", &id).unwrap().is_none());
        assert_eq!(store.write_count(), 3);
    }

    #[test]
    fn seeding_is_not_a_write() {
        let mut store = MemoryStore::new();
        store.seed("incident", SysId::new("a"), Fields::new());
        assert_eq!(store.write_count(), 0);
        assert_eq!(store.len("incident"), 1);
    }

    #[test]
    fn update_missing_record_is_not_found() {
        let mut store = MemoryStore::new();
        let err = store
            .update("incident", &SysId::new("nope"), Fields::new())
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert!(err.is_write_failure());
    }

    #[test]
    fn write_budget_rejects_overflow() {
        let mut store = MemoryStore::new().with_write_budget(1);
        store.insert("incident", Fields::new()).unwrap();
        let err = store.insert("incident", Fields::new()).unwrap_err();
        assert!(matches!(err, StoreError::WriteRejected { .. }));
        assert_eq!(store.len("incident"), 1);
    }

    #[test]
    fn exists_uses_filters() {
        let mut store = MemoryStore::new();
        store.seed(
            "sys_ui_element",
            SysId::new("e1"),
            fields([("element", Value::from("substatus"))]),
        );
        let hit = Query::table("sys_ui_element").eq("element", "substatus");
        let miss = Query::table("sys_ui_element").eq("element", "install_status");
        assert!(store.exists(&hit).unwrap());
        assert!(!store.exists(&miss).unwrap());
    }
}
