//! Typed form-layout model
//!
//! Sections and elements are read from the platform's layout tables and
//! converted here, so the planner and mutator only ever see typed values.

use cmdb_store::{Record, SysId};
use std::fmt::{self, Display, Formatter};

/// Platform table and column names
pub mod tables {
    /// Form sections: one per (table, view, caption)
    pub const SECTION: &str = "sys_ui_section";
    /// Section column naming the form's table
    pub const SECTION_TABLE: &str = "name";
    /// Section column holding the view identifier
    pub const SECTION_VIEW: &str = "view";

    /// Form elements: one field placed in one section
    pub const ELEMENT: &str = "sys_ui_element";
    /// Element reference to its section
    pub const ELEMENT_SECTION: &str = "sys_ui_section";
    /// Element field name
    pub const ELEMENT_NAME: &str = "element";
    /// Element display position
    pub const ELEMENT_POSITION: &str = "position";

    /// Form views
    pub const VIEW: &str = "sys_ui_view";
    /// View display title
    pub const VIEW_TITLE: &str = "title";
    /// View internal name
    pub const VIEW_NAME: &str = "name";

    /// Table catalog
    pub const TABLE_CATALOG: &str = "sys_db_object";
    /// Catalog column holding the table name
    pub const TABLE_CATALOG_NAME: &str = "name";

    /// Field dictionary
    pub const DICTIONARY: &str = "sys_dictionary";
    /// Dictionary column naming the table
    pub const DICTIONARY_TABLE: &str = "name";
    /// Dictionary column naming the field
    pub const DICTIONARY_FIELD: &str = "element";
    /// Dictionary read-only flag
    pub const DICTIONARY_READ_ONLY: &str = "read_only";
}

/// Layout record conversion errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// Record came from a different table
    #[error("expected a {expected} record, found {found}")]
    WrongTable {
        /// Expected table
        expected: &'static str,
        /// Actual table
        found: String,
    },

    /// Required column empty
    #[error("{table}/{id} has no {field}")]
    MissingField {
        /// Table
        table: &'static str,
        /// Record identifier
        id: SysId,
        /// Empty column
        field: &'static str,
    },
}

/// View identifier; empty means the default view
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewId(String);

impl ViewId {
    /// The default view
    #[inline]
    #[must_use]
    pub fn default_view() -> Self {
        Self(String::new())
    }

    /// Wrap an identifier, trimming whitespace
    #[inline]
    #[must_use]
    pub fn new(value: impl AsRef<str>) -> Self {
        Self(value.as_ref().trim().to_string())
    }

    /// Identifier text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the default view
    #[inline]
    #[must_use]
    pub fn is_default(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for ViewId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_default() {
            f.write_str("Default")
        } else {
            f.write_str(&self.0)
        }
    }
}

/// Form section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    /// Section identifier
    pub sys_id: SysId,
    /// Table whose form this section belongs to
    pub table: String,
    /// View the section belongs to
    pub view: ViewId,
}

impl TryFrom<&Record> for Section {
    type Error = LayoutError;

    fn try_from(record: &Record) -> Result<Self, Self::Error> {
        if record.table() != tables::SECTION {
            return Err(LayoutError::WrongTable {
                expected: tables::SECTION,
                found: record.table().to_string(),
            });
        }
        let table = record.text(tables::SECTION_TABLE);
        if table.is_empty() {
            return Err(LayoutError::MissingField {
                table: tables::SECTION,
                id: record.sys_id().clone(),
                field: tables::SECTION_TABLE,
            });
        }
        Ok(Self {
            sys_id: record.sys_id().clone(),
            table,
            view: ViewId::new(record.text(tables::SECTION_VIEW)),
        })
    }
}

/// Field placed in a section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Element identifier
    pub sys_id: SysId,
    /// Owning section
    pub section: SysId,
    /// Field name
    pub name: String,
    /// Display position
    pub position: i64,
}

impl Element {
    /// Create element
    #[must_use]
    pub fn new(sys_id: SysId, section: SysId, name: impl Into<String>, position: i64) -> Self {
        Self {
            sys_id,
            section,
            name: name.into(),
            position,
        }
    }
}

impl TryFrom<&Record> for Element {
    type Error = LayoutError;

    fn try_from(record: &Record) -> Result<Self, Self::Error> {
        if record.table() != tables::ELEMENT {
            return Err(LayoutError::WrongTable {
                expected: tables::ELEMENT,
                found: record.table().to_string(),
            });
        }
        let section =
            record
                .reference(tables::ELEMENT_SECTION)
                .ok_or_else(|| LayoutError::MissingField {
                    table: tables::ELEMENT,
                    id: record.sys_id().clone(),
                    field: tables::ELEMENT_SECTION,
                })?;
        Ok(Self {
            sys_id: record.sys_id().clone(),
            section,
            name: record.text(tables::ELEMENT_NAME),
            position: record.int_lenient(tables::ELEMENT_POSITION),
        })
    }
}

/// Convert records, dropping malformed ones with a warning
pub(crate) fn convert_all<'a, T>(records: impl IntoIterator<Item = &'a Record>) -> Vec<T>
where
    T: TryFrom<&'a Record, Error = LayoutError>,
{
    records
        .into_iter()
        .filter_map(|r| match T::try_from(r) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed layout record");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdb_store::{fields, Value};

    #[test]
    fn element_from_record_reads_lenient_position() {
        let record = Record::new(
            tables::ELEMENT,
            SysId::new("e1"),
            fields([
                (tables::ELEMENT_SECTION, Value::from("s1")),
                (tables::ELEMENT_NAME, Value::from("install_status")),
                (tables::ELEMENT_POSITION, Value::from("x")),
            ]),
        );
        let element = Element::try_from(&record).unwrap();
        assert_eq!(element.section, SysId::new("s1"));
        assert_eq!(element.position, 0);
    }

    #[test]
    fn element_without_section_is_rejected() {
        let record = Record::new(tables::ELEMENT, SysId::new("e1"), fields([]));
        assert!(matches!(
            Element::try_from(&record),
            Err(LayoutError::MissingField { field: "sys_ui_section", .. })
        ));
    }

    #[test]
    fn section_view_defaults_to_blank() {
        let record = Record::new(
            tables::SECTION,
            SysId::new("s1"),
            fields([(tables::SECTION_TABLE, Value::from("alm_asset"))]),
        );
        let section = Section::try_from(&record).unwrap();
        assert!(section.view.is_default());
        assert_eq!(section.view.to_string(), "Default");
    }

    #[test]
    fn wrong_table_is_rejected() {
        let record = Record::new("incident", SysId::new("x"), fields([]));
        assert!(matches!(
            Section::try_from(&record),
            Err(LayoutError::WrongTable { .. })
        ));
    }
}
