//! CMDB Lifecycle Form Migration
//!
//! Introduces the lifecycle stage and status fields on classic form layouts,
//! next to the legacy status fields they replace.
//!
//! # Core Concepts
//!
//! - [`planner`]: pure position arithmetic. Opens gaps at anchor positions
//!   and refuses any plan that would put two elements on one position
//! - [`SectionMutator`]: writes a plan (shifts first, then inserts), skipping
//!   fields the section already holds
//! - [`discovery`]: tables in scope, candidate views, the per-view presence
//!   guard, eligible sections and view anchors
//! - [`FormAdapter`]: runs the whole migration unit by unit, per view or per
//!   section, in dry-run or apply mode
//! - Companion operations: [`legacy_usage`] and [`enforce_read_only`]
//!
//! # Example
//!
//! ```
//! use cmdb_lifecycle::{AdaptConfig, FormAdapter, TableScope};
//! use cmdb_report::{Action, Report};
//! use cmdb_store::{fields, MemoryStore, SysId, Value};
//!
//! let mut store = MemoryStore::new();
//! store.seed("sys_ui_section", SysId::new("s1"), fields([("name", Value::from("alm_asset"))]));
//! for (id, name, pos) in [("e1", "install_status", 2), ("e2", "substatus", 5)] {
//!     store.seed(
//!         "sys_ui_element",
//!         SysId::new(id),
//!         fields([
//!             ("sys_ui_section", Value::from("s1")),
//!             ("element", Value::from(name)),
//!             ("position", Value::Int(pos)),
//!         ]),
//!     );
//! }
//!
//! let config = AdaptConfig::asset_forms()
//!     .with_scope(TableScope::explicit(["alm_asset"]))
//!     .with_apply(true);
//! let mut report = Report::new();
//! let summary = FormAdapter::new(config)
//!     .unwrap()
//!     .run(&mut store, &mut report)
//!     .unwrap();
//!
//! assert_eq!(summary.elements.inserted, 2);
//! assert_eq!(report.count(Action::InsertApplied), 2);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod config;
mod dictionary;
mod engine;
mod error;
mod mutator;
mod usage;
mod views;

pub mod discovery;
pub mod layout;
pub mod planner;

pub use config::{
    default_usage_fields, load_config, AdaptConfig, AnchorMode, ConfigError, DictionaryConfig,
    NewFields, TableScope,
};
pub use dictionary::{enforce_read_only, LockOutcome, LockReport, LockStatus};
pub use engine::{FormAdapter, RunSummary};
pub use error::EngineError;
pub use layout::{Element, LayoutError, Section, ViewId};
pub use mutator::{MutationStats, SectionMutator, UnitContext};
pub use planner::{PlanError, PositionPlan};
pub use usage::{legacy_usage, render_usage, UsageRow, USAGE_HEADER};
pub use views::{ViewLabels, DEFAULT_VIEW_LABEL};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
