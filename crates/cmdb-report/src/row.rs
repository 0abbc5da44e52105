//! Report rows and the action vocabulary

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Column header of the decision report
pub const REPORT_HEADER: [&str; 8] = [
    "Table",
    "View",
    "Action",
    "SectionSysId",
    "Element",
    "OldPos",
    "NewPos",
    "Note",
];

/// Plan-only versus apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Compute and report, never write
    #[default]
    DryRun,
    /// Compute, write and report
    Apply,
}

impl RunMode {
    /// Build from an apply flag
    #[inline]
    #[must_use]
    pub fn from_apply(apply: bool) -> Self {
        if apply {
            Self::Apply
        } else {
            Self::DryRun
        }
    }

    /// True when writes are allowed
    #[inline]
    #[must_use]
    pub fn writes(self) -> bool {
        matches!(self, Self::Apply)
    }

    /// Footer label
    #[inline]
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::DryRun => "DRY-RUN",
            Self::Apply => "APPLY",
        }
    }
}

/// Decision recorded by a migration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    /// Run-level information
    Info,
    /// Table in scope had no candidate views
    TableNoViews,
    /// View already carries the target field
    ViewSkip,
    /// No legacy anchor found on the view
    ViewNoAnchor,
    /// No section on the view holds every required legacy field
    ViewNoSections,
    /// View has eligible sections and is being processed
    ViewProcess,
    /// Anchor selected for the view
    ViewAnchor,
    /// View finished
    ViewDone,
    /// Section not eligible or its plan was rejected
    SectionSkip,
    /// Section finished
    SectionDone,
    /// Planned position change, not written
    ShiftDryrun,
    /// Position change written
    ShiftApplied,
    /// Planned insertion, not written
    InsertDryrun,
    /// Insertion written
    InsertApplied,
    /// Insertion skipped because the element already exists in the section
    InsertSkipExists,
    /// A store write failed and the unit of work was abandoned
    WriteFailed,
}

impl Action {
    /// Stable kebab-case tag
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::TableNoViews => "table-no-views",
            Self::ViewSkip => "view-skip",
            Self::ViewNoAnchor => "view-no-anchor",
            Self::ViewNoSections => "view-no-sections",
            Self::ViewProcess => "view-process",
            Self::ViewAnchor => "view-anchor",
            Self::ViewDone => "view-done",
            Self::SectionSkip => "section-skip",
            Self::SectionDone => "section-done",
            Self::ShiftDryrun => "shift-dryrun",
            Self::ShiftApplied => "shift-applied",
            Self::InsertDryrun => "insert-dryrun",
            Self::InsertApplied => "insert-applied",
            Self::InsertSkipExists => "insert-skip-exists",
            Self::WriteFailed => "write-failed",
        }
    }

    /// True for actions that correspond to a store write
    #[inline]
    #[must_use]
    pub fn is_write(self) -> bool {
        matches!(self, Self::ShiftApplied | Self::InsertApplied)
    }

    /// True for skip outcomes (not eligible / already present)
    #[inline]
    #[must_use]
    pub fn is_skip(self) -> bool {
        matches!(
            self,
            Self::ViewSkip
                | Self::ViewNoAnchor
                | Self::ViewNoSections
                | Self::SectionSkip
                | Self::InsertSkipExists
                | Self::TableNoViews
        )
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRow {
    /// Table identifier
    pub table: String,
    /// View display label
    pub view: String,
    /// Decision
    pub action: Action,
    /// Section identifier
    pub section: String,
    /// Element name
    pub element: String,
    /// Position before the change
    pub old_pos: Option<i64>,
    /// Position after the change
    pub new_pos: Option<i64>,
    /// Free text
    pub note: String,
}

impl ReportRow {
    /// Create row for a table and view label
    #[must_use]
    pub fn new(action: Action, table: impl Into<String>, view: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            view: view.into(),
            action,
            section: String::new(),
            element: String::new(),
            old_pos: None,
            new_pos: None,
            note: String::new(),
        }
    }

    /// Run-level row with no table or view
    #[must_use]
    pub fn info(note: impl Into<String>) -> Self {
        Self::new(Action::Info, "", "").with_note(note)
    }

    /// With section identifier
    #[inline]
    #[must_use]
    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = section.into();
        self
    }

    /// With element name
    #[inline]
    #[must_use]
    pub fn with_element(mut self, element: impl Into<String>) -> Self {
        self.element = element.into();
        self
    }

    /// With old position
    #[inline]
    #[must_use]
    pub fn with_old_pos(mut self, pos: i64) -> Self {
        self.old_pos = Some(pos);
        self
    }

    /// With new position
    #[inline]
    #[must_use]
    pub fn with_new_pos(mut self, pos: i64) -> Self {
        self.new_pos = Some(pos);
        self
    }

    /// With note
    #[inline]
    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    /// Cells in header order
    #[must_use]
    pub fn cells(&self) -> [String; 8] {
        [
            self.table.clone(),
            self.view.clone(),
            self.action.as_str().to_string(),
            self.section.clone(),
            self.element.clone(),
            self.old_pos.map(|p| p.to_string()).unwrap_or_default(),
            self.new_pos.map(|p| p.to_string()).unwrap_or_default(),
            self.note.clone(),
        ]
    }

    /// Plain log line, `action key=value ...`, omitting empty keys
    #[must_use]
    pub fn to_log_line(&self) -> String {
        let mut line = self.action.as_str().to_string();
        for (key, value) in [
            ("table", self.table.as_str()),
            ("view", self.view.as_str()),
            ("section", self.section.as_str()),
            ("element", self.element.as_str()),
        ] {
            if !value.is_empty() {
                line.push_str(&format!(" {key}={value}"));
            }
        }
        match (self.old_pos, self.new_pos) {
            (Some(old), Some(new)) => line.push_str(&format!(" {old}->{new}")),
            (None, Some(new)) => line.push_str(&format!(" pos={new}")),
            (Some(old), None) => line.push_str(&format!(" was={old}")),
            (None, None) => {}
        }
        if !self.note.is_empty() {
            line.push_str(&format!(" ({})", self.note));
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_kebab_case() {
        assert_eq!(Action::InsertSkipExists.as_str(), "insert-skip-exists");
        assert_eq!(Action::ShiftDryrun.to_string(), "shift-dryrun");
        assert_eq!(
            serde_json::to_string(&Action::ViewNoAnchor).unwrap(),
            "\"view-no-anchor\""
        );
    }

    #[test]
    fn log_line_shows_shift() {
        let row = ReportRow::new(Action::ShiftApplied, "alm_asset", "Default")
            .with_section("s1")
            .with_element("substatus")
            .with_old_pos(5)
            .with_new_pos(7);
        assert_eq!(
            row.to_log_line(),
            "shift-applied table=alm_asset view=Default section=s1 element=substatus 5->7"
        );
    }

    #[test]
    fn cells_leave_missing_positions_blank() {
        let row = ReportRow::info("Target tables=2");
        let cells = row.cells();
        assert_eq!(cells[2], "info");
        assert_eq!(cells[5], "");
        assert_eq!(cells[7], "Target tables=2");
    }

    #[test]
    fn run_mode_labels() {
        assert_eq!(RunMode::from_apply(true).label(), "APPLY");
        assert_eq!(RunMode::from_apply(false).label(), "DRY-RUN");
        assert!(!RunMode::DryRun.writes());
    }
}
