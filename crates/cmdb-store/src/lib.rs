//! CMDB Record Store
//!
//! Typed boundary over the platform's generic record-access API.
//!
//! # Core Concepts
//!
//! - [`Record`]: a table row with a strict [`SysId`] and typed [`Value`] fields
//! - [`Query`] / [`Filter`]: equality, set-membership, not-null, prefix and
//!   `>=` filters with an optional explicit ordering
//! - [`RecordStore`]: query / get / insert / update / delete
//! - [`MemoryStore`]: in-memory implementation with write accounting and
//!   fault injection
//! - [`Snapshot`]: JSON/YAML persistence for [`MemoryStore`]
//!
//! # Example
//!
//! ```
//! use cmdb_store::{fields, MemoryStore, Query, RecordStore, Value};
//!
//! let mut store = MemoryStore::new();
//! let id = store
//!     .insert("sys_ui_element", fields([("element", Value::from("install_status"))]))
//!     .unwrap();
//!
//! let found = store
//!     .query(&Query::table("sys_ui_element").eq("element", "install_status"))
//!     .unwrap();
//! assert_eq!(found[0].sys_id(), &id);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod memory;
mod query;
mod record;
mod snapshot;
mod store;

pub use memory::MemoryStore;
pub use query::{Filter, Query};
pub use record::{fields, Fields, Record, SysId, Value};
pub use snapshot::{Snapshot, SnapshotFormat, SnapshotRecord};
pub use store::{RecordStore, StoreError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
