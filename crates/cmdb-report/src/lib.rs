//! CMDB Migration Reports
//!
//! Every decision a migration makes becomes one [`ReportRow`]. Rows flow into
//! a [`ReportSink`]: the [`Report`] accumulator renders them as delimited text,
//! [`LineLog`] turns them into plain log lines, and a `(A, B)` pair feeds both.
//!
//! # Example
//!
//! ```
//! use cmdb_report::{Action, CsvOptions, Report, ReportRow, ReportSink};
//!
//! let mut report = Report::new();
//! report.record(
//!     ReportRow::new(Action::ViewSkip, "alm_asset", "Default")
//!         .with_element("life_cycle_stage")
//!         .with_note("life_cycle_stage already present on view"),
//! );
//!
//! let csv = report.render_csv(&CsvOptions::default()).unwrap();
//! assert!(csv.starts_with("Table,View,Action,SectionSysId,Element,OldPos,NewPos,Note\n"));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod attachment;
mod csv_out;
mod row;
mod sink;

pub use attachment::{attach, Attached, AttachmentSpec, ATTACHMENT_TABLE};
pub use csv_out::{render_table, CsvOptions, LineEnding};
pub use row::{Action, ReportRow, RunMode, REPORT_HEADER};
pub use sink::{LineLog, Report, ReportSink};

use cmdb_store::{StoreError, SysId};

/// Report errors
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// CSV writer failed
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// CSV buffer could not be flushed
    #[error("csv flush failed: {0}")]
    Flush(String),

    /// Rendered bytes were not UTF-8
    #[error("report is not valid utf-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// Attachment target does not exist
    #[error("attachment target not found: {table}/{id}")]
    TargetNotFound {
        /// Target table
        table: String,
        /// Target identifier
        id: SysId,
    },

    /// Record store failure while attaching
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
