//! Migration errors

use crate::config::ConfigError;
use cmdb_store::StoreError;

/// Migration errors
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Read failure; the run cannot continue
    #[error("store read failed: {0}")]
    Store(#[from] StoreError),

    /// Write failure; only the current (table, view) unit is abandoned
    #[error("write failed while {context}: {source}")]
    Write {
        /// What was being written
        context: String,
        /// Underlying failure
        #[source]
        source: StoreError,
    },

    /// Configuration rejected
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Wrap a write failure
    pub(crate) fn write(context: impl Into<String>, source: StoreError) -> Self {
        Self::Write {
            context: context.into(),
            source,
        }
    }

    /// True if the error only ends the current unit of work
    #[must_use]
    pub fn is_unit_local(&self) -> bool {
        matches!(self, Self::Write { .. })
    }

    /// True if the error ends the run
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !self.is_unit_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmdb_store::SysId;

    #[test]
    fn write_failures_are_unit_local() {
        let err = EngineError::write(
            "shifting substatus",
            StoreError::NotFound {
                table: "sys_ui_element".into(),
                id: SysId::new("x"),
            },
        );
        assert!(err.is_unit_local());
        assert!(err.to_string().starts_with("write failed while shifting substatus"));
    }

    #[test]
    fn config_errors_are_fatal() {
        let err = EngineError::from(ConfigError::Invalid("no new fields".into()));
        assert!(err.is_fatal());
    }
}
