//! View display labels

use crate::layout::{tables, ViewId};
use cmdb_store::{RecordStore, StoreError, SysId};
use std::collections::HashMap;

/// Label shown for the default view
pub const DEFAULT_VIEW_LABEL: &str = "Default";

/// Resolves view identifiers to display labels, caching per run
///
/// Blank identifiers read as [`DEFAULT_VIEW_LABEL`]. Identifiers shaped like a
/// record identifier are looked up in the view table (`title`, then `name`);
/// anything else, and any lookup miss, is shown as-is.
#[derive(Debug, Clone, Default)]
pub struct ViewLabels {
    cache: HashMap<String, String>,
}

impl ViewLabels {
    /// Create empty cache
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Display label for `view`
    ///
    /// # Errors
    /// Returns error if the view lookup fails
    pub fn label<S: RecordStore + ?Sized>(
        &mut self,
        store: &S,
        view: &ViewId,
    ) -> Result<String, StoreError> {
        if view.is_default() {
            return Ok(DEFAULT_VIEW_LABEL.to_string());
        }
        let raw = view.as_str();
        if !SysId::looks_like(raw) {
            return Ok(raw.to_string());
        }
        if let Some(hit) = self.cache.get(raw) {
            return Ok(hit.clone());
        }

        let resolved = store
            .get(tables::VIEW, &SysId::new(raw))?
            .map(|rec| {
                let title = rec.text(tables::VIEW_TITLE);
                if title.is_empty() {
                    rec.text(tables::VIEW_NAME)
                } else {
                    title
                }
            })
            .filter(|label| !label.is_empty())
            .unwrap_or_else(|| raw.to_string());

        tracing::debug!(view = raw, label = %resolved, "resolved view label");
        self.cache.insert(raw.to_string(), resolved.clone());
        Ok(resolved)
    }

    /// Number of cached lookups
    #[inline]
    #[must_use]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
