//! Record store trait and errors

use crate::query::Query;
use crate::record::{Fields, Record, SysId};

/// Record store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Record does not exist
    #[error("record not found: {table}/{id}")]
    NotFound {
        /// Table searched
        table: String,
        /// Missing identifier
        id: SysId,
    },

    /// Store refused a write
    #[error("write rejected on {table}: {reason}")]
    WriteRejected {
        /// Table written to
        table: String,
        /// Store-supplied reason
        reason: String,
    },

    /// Snapshot file could not be read or written
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot JSON is malformed
    #[error("snapshot json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Snapshot YAML is malformed
    #[error("snapshot yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Snapshot file extension not recognised
    #[error("unsupported snapshot format: {0}")]
    UnsupportedFormat(String),
}

impl StoreError {
    /// True for failures raised by update / insert / delete
    #[inline]
    #[must_use]
    pub fn is_write_failure(&self) -> bool {
        matches!(self, Self::WriteRejected { .. } | Self::NotFound { .. })
    }
}

/// Generic record access
///
/// Reads borrow the store shared, writes exclusively. Every write is
/// immediate; there are no transactions.
pub trait RecordStore {
    /// Records of `query.table_name()` accepted by every filter
    ///
    /// # Errors
    /// Returns error if the store cannot be read
    fn query(&self, query: &Query) -> Result<Vec<Record>, StoreError>;

    /// Record by identifier
    ///
    /// # Errors
    /// Returns error if the store cannot be read
    fn get(&self, table: &str, id: &SysId) -> Result<Option<Record>, StoreError>;

    /// Insert a new record, returning its identifier
    ///
    /// # Errors
    /// Returns error if the store rejects the write
    fn insert(&mut self, table: &str, fields: Fields) -> Result<SysId, StoreError>;

    /// Merge field values into an existing record
    ///
    /// # Errors
    /// Returns error if the record is missing or the write is rejected
    fn update(&mut self, table: &str, id: &SysId, fields: Fields) -> Result<(), StoreError>;

    /// Remove a record
    ///
    /// # Errors
    /// Returns error if the record is missing or the write is rejected
    fn delete(&mut self, table: &str, id: &SysId) -> Result<(), StoreError>;

    /// True when at least one record matches
    ///
    /// # Errors
    /// Returns error if the store cannot be read
    fn exists(&self, query: &Query) -> Result<bool, StoreError> {
        Ok(!self.query(&query.clone().limit(1))?.is_empty())
    }
}

impl<S: RecordStore + ?Sized> RecordStore for &mut S {
    fn query(&self, query: &Query) -> Result<Vec<Record>, StoreError> {
        (**self).query(query)
    }

    fn get(&self, table: &str, id: &SysId) -> Result<Option<Record>, StoreError> {
        (**self).get(table, id)
    }

    fn insert(&mut self, table: &str, fields: Fields) -> Result<SysId, StoreError> {
        (**self).insert(table, fields)
    }

    fn update(&mut self, table: &str, id: &SysId, fields: Fields) -> Result<(), StoreError> {
        (**self).update(table, id, fields)
    }

    fn delete(&mut self, table: &str, id: &SysId) -> Result<(), StoreError> {
        (**self).delete(table, id)
    }
}
