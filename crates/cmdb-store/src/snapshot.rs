//! Snapshot persistence
//!
//! A snapshot is a table-keyed list of rows, each row an identifier plus its
//! flattened fields:
//!
//! ```yaml
//! tables:
//!   sys_ui_element:
//!     - sys_id: 0a1b...
//!       sys_ui_section: 9f8e...
//!       element: install_status
//!       position: 2
//! ```

use crate::record::{Fields, SysId};
use crate::store::StoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One persisted row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Row identifier
    pub sys_id: SysId,
    /// Field values
    #[serde(flatten)]
    pub fields: Fields,
}

/// Serialized store contents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Rows per table
    #[serde(default)]
    pub tables: BTreeMap<String, Vec<SnapshotRecord>>,
}

/// On-disk encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    /// `.json`
    Json,
    /// `.yaml` / `.yml`
    Yaml,
}

impl SnapshotFormat {
    /// Pick the encoding from a file extension
    ///
    /// # Errors
    /// Returns error for unrecognised extensions
    pub fn from_path(path: &Path) -> Result<Self, StoreError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("yaml" | "yml") => Ok(Self::Yaml),
            other => Err(StoreError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

impl Snapshot {
    /// Parse from text
    ///
    /// # Errors
    /// Returns error if the text is malformed
    pub fn parse(text: &str, format: SnapshotFormat) -> Result<Self, StoreError> {
        Ok(match format {
            SnapshotFormat::Json => serde_json::from_str(text)?,
            SnapshotFormat::Yaml => serde_yaml::from_str(text)?,
        })
    }

    /// Render to text
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn render(&self, format: SnapshotFormat) -> Result<String, StoreError> {
        Ok(match format {
            SnapshotFormat::Json => serde_json::to_string_pretty(self)?,
            SnapshotFormat::Yaml => serde_yaml::to_string(self)?,
        })
    }

    /// Load from a `.json` / `.yaml` file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let format = SnapshotFormat::from_path(path)?;
        let text = std::fs::read_to_string(path)?;
        let snapshot = Self::parse(&text, format)?;
        tracing::debug!(path = %path.display(), tables = snapshot.tables.len(), "snapshot loaded");
        Ok(snapshot)
    }

    /// Write to a `.json` / `.yaml` file
    ///
    /// # Errors
    /// Returns error if the file cannot be written
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let format = SnapshotFormat::from_path(path)?;
        std::fs::write(path, self.render(format)?)?;
        Ok(())
    }

    /// Total row count across tables
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }
}
