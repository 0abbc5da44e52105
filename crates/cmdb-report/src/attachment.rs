//! Report attachments
//!
//! Stores rendered report lines as an attachment record bound to an existing
//! record, so the output of a run travels with the script that produced it.

use crate::ReportError;
use chrono::NaiveDateTime;
use cmdb_store::{fields, RecordStore, SysId, Value};

/// Table holding attachment records
pub const ATTACHMENT_TABLE: &str = "sys_attachment";

/// Attachment naming and type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentSpec {
    /// File name stem; a timestamp and `.csv` are appended
    pub basename: String,
    /// MIME type
    pub content_type: String,
}

impl AttachmentSpec {
    /// CSV attachment with the given stem
    #[must_use]
    pub fn csv(basename: impl Into<String>) -> Self {
        Self {
            basename: basename.into(),
            content_type: "text/csv".to_string(),
        }
    }

    /// `<basename>_<YYYY-MM-DD_HH_mm_ss>.csv`
    #[must_use]
    pub fn file_name(&self, at: NaiveDateTime) -> String {
        format!("{}_{}.csv", self.basename, at.format("%Y-%m-%d_%H_%M_%S"))
    }
}

/// Result of a successful attach
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attached {
    /// Attachment record identifier
    pub sys_id: SysId,
    /// Generated file name
    pub file_name: String,
    /// Payload size in bytes
    pub size_bytes: usize,
}

/// Attach `lines`, joined with CRLF, to `target_table`/`target_id`
///
/// The target is resolved before anything is written; a missing target aborts
/// with [`ReportError::TargetNotFound`].
///
/// # Errors
/// Returns error if the target does not exist or the insert fails
pub fn attach<S: RecordStore + ?Sized>(
    store: &mut S,
    target_table: &str,
    target_id: &SysId,
    spec: &AttachmentSpec,
    lines: &[String],
    at: NaiveDateTime,
) -> Result<Attached, ReportError> {
    let Some(target) = store.get(target_table, target_id)? else {
        tracing::error!(table = target_table, id = %target_id, "attachment target not found");
        return Err(ReportError::TargetNotFound {
            table: target_table.to_string(),
            id: target_id.clone(),
        });
    };

    let file_name = spec.file_name(at);
    let payload = lines.join("\r\n");
    let size_bytes = payload.len();

    let sys_id = store.insert(
        ATTACHMENT_TABLE,
        fields([
            ("table_name", Value::from(target_table)),
            ("table_sys_id", Value::from(target.sys_id())),
            ("file_name", Value::from(file_name.as_str())),
            ("content_type", Value::from(spec.content_type.as_str())),
            ("size_bytes", Value::Int(i64::try_from(size_bytes).unwrap_or(i64::MAX))),
            ("payload", Value::from(payload)),
        ]),
    )?;

    tracing::info!(
        table = target_table,
        target = %target_id,
        file = %file_name,
        attachment = %sys_id,
        "report attached"
    );

    Ok(Attached {
        sys_id,
        file_name,
        size_bytes,
    })
}
