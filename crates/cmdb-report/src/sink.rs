//! Report sinks

use crate::csv_out::{render_table, CsvOptions};
use crate::row::{Action, ReportRow, RunMode, REPORT_HEADER};
use crate::ReportError;

/// Destination for decision rows
pub trait ReportSink {
    /// Record one decision
    fn record(&mut self, row: ReportRow);
}

impl<S: ReportSink + ?Sized> ReportSink for &mut S {
    fn record(&mut self, row: ReportRow) {
        (**self).record(row);
    }
}

impl<A: ReportSink, B: ReportSink> ReportSink for (A, B) {
    fn record(&mut self, row: ReportRow) {
        self.0.record(row.clone());
        self.1.record(row);
    }
}

/// Row accumulator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    rows: Vec<ReportRow>,
}

impl Report {
    /// Create empty report
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows in recording order
    #[inline]
    #[must_use]
    pub fn rows(&self) -> &[ReportRow] {
        &self.rows
    }

    /// Number of rows
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when nothing was recorded
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows carrying `action`
    pub fn with_action(&self, action: Action) -> impl Iterator<Item = &ReportRow> {
        self.rows.iter().filter(move |r| r.action == action)
    }

    /// Count of rows carrying `action`
    #[must_use]
    pub fn count(&self, action: Action) -> usize {
        self.with_action(action).count()
    }

    /// Count of rows that correspond to a store write
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.rows.iter().filter(|r| r.action.is_write()).count()
    }

    /// Rows ordered by (table, view, action tag); recording order within ties
    #[must_use]
    pub fn sorted_rows(&self) -> Vec<&ReportRow> {
        let mut rows: Vec<&ReportRow> = self.rows.iter().collect();
        rows.sort_by(|a, b| {
            a.table
                .cmp(&b.table)
                .then_with(|| a.view.cmp(&b.view))
                .then_with(|| a.action.as_str().cmp(b.action.as_str()))
        });
        rows
    }

    /// Sorted rows as delimited text with the fixed header
    ///
    /// # Errors
    /// Returns error if rendering fails
    pub fn render_csv(&self, options: &CsvOptions) -> Result<String, ReportError> {
        render_table(
            &REPORT_HEADER,
            self.sorted_rows().into_iter().map(ReportRow::cells),
            options,
        )
    }

    /// CSV followed by the `---` / `Rows:` / `Mode:` footer
    ///
    /// # Errors
    /// Returns error if rendering fails
    pub fn render_with_footer(
        &self,
        options: &CsvOptions,
        mode: RunMode,
    ) -> Result<String, ReportError> {
        let mut out = self.render_csv(options)?;
        let eol = options.line_ending.as_str();
        out.push_str("---");
        out.push_str(eol);
        out.push_str(&format!("Rows: {}{eol}", self.len()));
        out.push_str(&format!("Mode: {}{eol}", mode.label()));
        Ok(out)
    }

    /// CSV lines without terminators, for attachment writers
    ///
    /// # Errors
    /// Returns error if rendering fails
    pub fn csv_lines(&self, options: &CsvOptions) -> Result<Vec<String>, ReportError> {
        let text = self.render_csv(options)?;
        let eol = options.line_ending.as_str();
        Ok(text
            .strip_suffix(eol)
            .unwrap_or(&text)
            .split(eol)
            .map(str::to_string)
            .collect())
    }
}

impl ReportSink for Report {
    fn record(&mut self, row: ReportRow) {
        self.rows.push(row);
    }
}

/// Plain line stream mirrored to `tracing`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineLog {
    lines: Vec<String>,
}

impl LineLog {
    /// Create empty log
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines in recording order
    #[inline]
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl ReportSink for LineLog {
    fn record(&mut self, row: ReportRow) {
        let line = row.to_log_line();
        match row.action {
            Action::WriteFailed => tracing::error!(target: "cmdb_report", "{line}"),
            Action::SectionSkip | Action::ViewNoAnchor | Action::ViewNoSections => {
                tracing::warn!(target: "cmdb_report", "{line}");
            }
            _ => tracing::info!(target: "cmdb_report", "{line}"),
        }
        self.lines.push(line);
    }
}
