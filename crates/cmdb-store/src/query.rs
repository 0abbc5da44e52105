//! Query construction and filter evaluation

use crate::record::{Record, Value};
use std::cmp::Ordering;

/// Single field condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `field = value`
    Eq {
        /// Field name
        field: String,
        /// Expected value
        value: Value,
    },
    /// `field IN (values)`
    In {
        /// Field name
        field: String,
        /// Accepted values
        values: Vec<Value>,
    },
    /// `field` is set and non-empty
    NotNull {
        /// Field name
        field: String,
    },
    /// `field STARTSWITH prefix`
    StartsWith {
        /// Field name
        field: String,
        /// Required prefix
        prefix: String,
    },
    /// `field >= bound`, comparing the field as an integer
    Gte {
        /// Field name
        field: String,
        /// Inclusive lower bound
        bound: i64,
    },
}

impl Filter {
    /// Evaluate against a record
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::Eq { field, value } => record.lookup(field).loosely_eq(value),
            Self::In { field, values } => {
                let actual = record.lookup(field);
                values.iter().any(|v| actual.loosely_eq(v))
            }
            Self::NotNull { field } => !record.lookup(field).is_empty(),
            Self::StartsWith { field, prefix } => {
                record.lookup(field).display().starts_with(prefix.as_str())
            }
            Self::Gte { field, bound } => {
                let actual = record.lookup(field);
                !actual.is_empty() && actual.int_lenient() >= *bound
            }
        }
    }
}

/// Query against one table
///
/// Results come back in unspecified order unless [`Query::order_by`] is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    table: String,
    filters: Vec<Filter>,
    order_by: Option<String>,
    limit: Option<usize>,
}

impl Query {
    /// Start a query on `table`
    #[inline]
    #[must_use]
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    /// Add an arbitrary filter
    #[inline]
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Equality filter
    #[inline]
    #[must_use]
    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(Filter::Eq {
            field: field.into(),
            value: value.into(),
        })
    }

    /// Set-membership filter
    #[must_use]
    pub fn is_in<V, I>(self, field: impl Into<String>, values: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        self.filter(Filter::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    /// Not-null filter
    #[inline]
    #[must_use]
    pub fn not_null(self, field: impl Into<String>) -> Self {
        self.filter(Filter::NotNull {
            field: field.into(),
        })
    }

    /// Prefix filter
    #[inline]
    #[must_use]
    pub fn starts_with(self, field: impl Into<String>, prefix: impl Into<String>) -> Self {
        self.filter(Filter::StartsWith {
            field: field.into(),
            prefix: prefix.into(),
        })
    }

    /// Integer lower-bound filter
    #[inline]
    #[must_use]
    pub fn gte(self, field: impl Into<String>, bound: i64) -> Self {
        self.filter(Filter::Gte {
            field: field.into(),
            bound,
        })
    }

    /// Request ascending order on `field`
    #[inline]
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(field.into());
        self
    }

    /// Cap the number of results
    #[inline]
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Target table
    #[inline]
    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Filters in insertion order
    #[inline]
    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Requested ordering field
    #[inline]
    #[must_use]
    pub fn ordering(&self) -> Option<&str> {
        self.order_by.as_deref()
    }

    /// Requested result cap
    #[inline]
    #[must_use]
    pub fn max_results(&self) -> Option<usize> {
        self.limit
    }

    /// True when every filter accepts the record
    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        record.table() == self.table && self.filters.iter().all(|f| f.matches(record))
    }

    /// Sort and truncate a matched result set in place
    pub fn finish(&self, results: &mut Vec<Record>) {
        if let Some(field) = &self.order_by {
            results.sort_by(|a, b| compare_on(a, b, field));
        }
        if let Some(limit) = self.limit {
            results.truncate(limit);
        }
    }
}

fn compare_on(a: &Record, b: &Record, field: &str) -> Ordering {
    a.lookup(field)
        .order_cmp(&b.lookup(field))
        .then_with(|| a.sys_id().cmp(b.sys_id()))
}
