//! Migration configuration
//!
//! Configurations are plain data, loadable from JSON, YAML or TOML by file
//! extension. Defaults reproduce the two form migrations this crate was built
//! for: per-view placement on the CI forms and per-section placement on the
//! asset forms.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file unreadable
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parse error
    #[error("invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    /// YAML parse error
    #[error("invalid YAML: {0}")]
    InvalidYaml(serde_yaml::Error),

    /// TOML parse error
    #[error("invalid TOML: {0}")]
    InvalidToml(toml::de::Error),

    /// Extension not recognised
    #[error("unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    /// Values parse but make no sense together
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Load any configuration type from a `.json`, `.yaml`/`.yml` or `.toml` file
///
/// # Errors
/// Returns error if the file cannot be read, its extension is unknown, or it
/// does not parse as `T`
pub fn load_config<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "json" => serde_json::from_str(&text).map_err(ConfigError::InvalidJson),
        "yaml" | "yml" => serde_yaml::from_str(&text).map_err(ConfigError::InvalidYaml),
        "toml" => toml::from_str(&text).map_err(ConfigError::InvalidToml),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

/// Which tables a migration touches
///
/// The working set is the union of `tables`, every catalog table whose name
/// starts with one of `prefixes`, and `extra_tables`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableScope {
    /// Explicit table names
    pub tables: Vec<String>,
    /// Catalog name prefixes
    pub prefixes: Vec<String>,
    /// Added regardless of the prefix scan
    pub extra_tables: Vec<String>,
}

impl TableScope {
    /// Scope over an explicit list
    #[must_use]
    pub fn explicit<I, S>(tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tables: tables.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// With a catalog prefix
    #[inline]
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    /// With an extra table
    #[inline]
    #[must_use]
    pub fn with_extra(mut self, table: impl Into<String>) -> Self {
        self.extra_tables.push(table.into());
        self
    }

    /// True when nothing could ever be selected
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty() && self.prefixes.is_empty() && self.extra_tables.is_empty()
    }

    /// Short description for the run header
    #[must_use]
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if !self.tables.is_empty() {
            parts.push(format!("tables={}", self.tables.join("|")));
        }
        if !self.prefixes.is_empty() {
            parts.push(format!("prefix={}", self.prefixes.join("|")));
        }
        if !self.extra_tables.is_empty() {
            parts.push(format!("extras={}", self.extra_tables.join("|")));
        }
        parts.join(", ")
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.is_empty() {
            return Err(ConfigError::Invalid("table scope selects nothing".into()));
        }
        let blank = self
            .tables
            .iter()
            .chain(&self.prefixes)
            .chain(&self.extra_tables)
            .any(|t| t.trim().is_empty());
        if blank {
            return Err(ConfigError::Invalid("table scope has a blank entry".into()));
        }
        Ok(())
    }
}

/// Where new fields are placed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AnchorMode {
    /// In every section holding both legacy fields, each new field takes the
    /// position of its legacy counterpart
    PerSection {
        /// Legacy field the stage replaces
        primary: String,
        /// Legacy field the status replaces
        secondary: String,
    },
    /// Once per view, both new fields go contiguously at the first legacy
    /// field found on the view
    PerView {
        /// Legacy fields eligible as anchor
        legacy_fields: Vec<String>,
    },
}

impl AnchorMode {
    /// Asset-form defaults: `install_status` and `substatus`
    #[must_use]
    pub fn per_section_default() -> Self {
        Self::PerSection {
            primary: "install_status".into(),
            secondary: "substatus".into(),
        }
    }

    /// CI-form defaults: `install_status` or `operational_status`
    #[must_use]
    pub fn per_view_default() -> Self {
        Self::PerView {
            legacy_fields: vec!["install_status".into(), "operational_status".into()],
        }
    }

    /// Legacy field names this mode looks for
    #[must_use]
    pub fn legacy_fields(&self) -> Vec<String> {
        match self {
            Self::PerSection { primary, secondary } => vec![primary.clone(), secondary.clone()],
            Self::PerView { legacy_fields } => legacy_fields.clone(),
        }
    }

    /// Short tag
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::PerSection { .. } => "per-section",
            Self::PerView { .. } => "per-view",
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let fields = self.legacy_fields();
        if fields.is_empty() {
            return Err(ConfigError::Invalid("no legacy fields configured".into()));
        }
        if fields.iter().any(|f| f.trim().is_empty()) {
            return Err(ConfigError::Invalid("blank legacy field".into()));
        }
        if let Self::PerSection { primary, secondary } = self {
            if primary == secondary {
                return Err(ConfigError::Invalid(format!(
                    "primary and secondary legacy fields are both {primary}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for AnchorMode {
    fn default() -> Self {
        Self::per_view_default()
    }
}

/// Fields being introduced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewFields {
    /// Stage field; also the view-level presence guard
    pub stage: String,
    /// Status field, placed after the stage
    pub status: String,
}

impl Default for NewFields {
    fn default() -> Self {
        Self {
            stage: "life_cycle_stage".into(),
            status: "life_cycle_stage_status".into(),
        }
    }
}

impl NewFields {
    /// Names in insertion order
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        vec![self.stage.clone(), self.status.clone()]
    }
}

/// Form migration configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptConfig {
    /// Write to the store; `false` plans and reports only
    pub apply: bool,
    /// Tables in scope
    pub scope: TableScope,
    /// Placement strategy
    pub mode: AnchorMode,
    /// Fields to introduce
    pub new_fields: NewFields,
}

impl Default for AdaptConfig {
    fn default() -> Self {
        Self::ci_forms()
    }
}

impl AdaptConfig {
    /// Every `cmdb_ci*` table plus `service_offering`, one anchor per view
    #[must_use]
    pub fn ci_forms() -> Self {
        Self {
            apply: false,
            scope: TableScope::default()
                .with_prefix("cmdb_ci")
                .with_extra("service_offering"),
            mode: AnchorMode::per_view_default(),
            new_fields: NewFields::default(),
        }
    }

    /// `alm_asset` and `alm_hardware`, every section holding both legacy fields
    #[must_use]
    pub fn asset_forms() -> Self {
        Self {
            apply: false,
            scope: TableScope::explicit(["alm_asset", "alm_hardware"]),
            mode: AnchorMode::per_section_default(),
            new_fields: NewFields::default(),
        }
    }

    /// With apply flag
    #[inline]
    #[must_use]
    pub fn with_apply(mut self, apply: bool) -> Self {
        self.apply = apply;
        self
    }

    /// With placement strategy
    #[inline]
    #[must_use]
    pub fn with_mode(mut self, mode: AnchorMode) -> Self {
        self.mode = mode;
        self
    }

    /// With table scope
    #[inline]
    #[must_use]
    pub fn with_scope(mut self, scope: TableScope) -> Self {
        self.scope = scope;
        self
    }

    /// Load and validate
    ///
    /// # Errors
    /// Returns error if loading fails or [`AdaptConfig::validate`] rejects it
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let config: Self = load_config(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration is usable
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] describing the first problem found
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scope.validate()?;
        self.mode.validate()?;

        let NewFields { stage, status } = &self.new_fields;
        if stage.trim().is_empty() || status.trim().is_empty() {
            return Err(ConfigError::Invalid("new field names must not be blank".into()));
        }
        if stage == status {
            return Err(ConfigError::Invalid(format!(
                "stage and status are both {stage}"
            )));
        }
        let legacy: BTreeSet<String> = self.mode.legacy_fields().into_iter().collect();
        if let Some(clash) = [stage, status].into_iter().find(|f| legacy.contains(*f)) {
            return Err(ConfigError::Invalid(format!(
                "{clash} is both a legacy and a new field"
            )));
        }
        Ok(())
    }
}

/// Read-only enforcement configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DictionaryConfig {
    /// Write to the store; `false` reports what would change
    pub apply: bool,
    /// Tables in scope
    pub scope: TableScope,
    /// Fields to lock
    pub fields: Vec<String>,
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            apply: false,
            scope: TableScope::default()
                .with_prefix("alm_")
                .with_prefix("cmdb_ci")
                .with_extra("service_offering"),
            fields: vec![
                "install_status".into(),
                "substatus".into(),
                "operational_status".into(),
            ],
        }
    }
}

impl DictionaryConfig {
    /// Load and validate
    ///
    /// # Errors
    /// Returns error if loading fails or the configuration is unusable
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let config: Self = load_config(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration is usable
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] if no fields are listed
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scope.validate()?;
        if self.fields.is_empty() || self.fields.iter().any(|f| f.trim().is_empty()) {
            return Err(ConfigError::Invalid("dictionary field list is empty or blank".into()));
        }
        Ok(())
    }
}

/// Fields audited by the legacy usage report
#[must_use]
pub fn default_usage_fields() -> Vec<String> {
    [
        "hardware_ci_status",
        "hardware_ci_substatus",
        "hardware_status",
        "hardware_substatus",
        "installation_status",
        "install_status",
        "operational_status",
        "substatus",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
