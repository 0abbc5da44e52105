//! Delimited text rendering
//!
//! Fields holding the delimiter, a quote, CR or LF are quoted and inner quotes
//! doubled; everything else is written bare.

use crate::ReportError;
use csv::{QuoteStyle, Terminator, WriterBuilder};

/// Record terminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`, for spreadsheet consumers on Windows
    CrLf,
}

impl LineEnding {
    /// Terminator text
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }

    fn terminator(self) -> Terminator {
        match self {
            Self::Lf => Terminator::Any(b'\n'),
            Self::CrLf => Terminator::CRLF,
        }
    }
}

/// Rendering options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvOptions {
    /// Column delimiter
    pub delimiter: u8,
    /// Record terminator
    pub line_ending: LineEnding,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            line_ending: LineEnding::Lf,
        }
    }
}

impl CsvOptions {
    /// Semicolon-delimited CRLF output for attachments
    #[inline]
    #[must_use]
    pub fn attachment() -> Self {
        Self {
            delimiter: b';',
            line_ending: LineEnding::CrLf,
        }
    }

    /// With delimiter
    #[inline]
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// With line ending
    #[inline]
    #[must_use]
    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }
}

/// Render a header and rows
///
/// # Errors
/// Returns error if the writer fails or produces non-UTF-8 output
pub fn render_table<I, R, S>(
    header: &[&str],
    rows: I,
    options: &CsvOptions,
) -> Result<String, ReportError>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = S>,
    S: AsRef<[u8]>,
{
    let mut writer = WriterBuilder::new()
        .delimiter(options.delimiter)
        .terminator(options.line_ending.terminator())
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::new());

    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ReportError::Flush(e.error().to_string()))?;
    Ok(String::from_utf8(bytes)?)
}
