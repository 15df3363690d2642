//! Diagnostic - Rust-style error message system
//!
//! Generates detailed messages with:
//! - Error code (ER001, EC001, etc.)
//! - Precise location (file:line:column, when the front end supplied one)
//! - Source code snippet, when the original source is available
//! - Additional notes

use crate::loc::{FileId, SourceLoc};
use std::fmt;

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Fatal error - aborts compilation of the unit
    Error,
    /// Warning - does not prevent compilation
    Warning,
    /// Note - additional information
    Note,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Note => "note",
        }
    }

    /// Returns the ANSI code for coloring (if terminal supports it)
    pub fn color_code(&self) -> &'static str {
        match self {
            Level::Error => "\x1b[1;31m",   // Bold Red
            Level::Warning => "\x1b[1;33m", // Bold Yellow
            Level::Note => "\x1b[1;36m",    // Bold Cyan
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A label pointing at a source position
#[derive(Debug, Clone)]
pub struct Label {
    pub loc: SourceLoc,
    pub message: String,
    /// Whether this is the primary or a secondary label
    pub primary: bool,
}

impl Label {
    pub fn primary(loc: SourceLoc, message: impl Into<String>) -> Self {
        Self { loc, message: message.into(), primary: true }
    }

    pub fn secondary(loc: SourceLoc, message: impl Into<String>) -> Self {
        Self { loc, message: message.into(), primary: false }
    }
}

/// Structured error code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCode {
    /// Category (R = representation/type layer, C = conversion checks, X = internal)
    pub category: char,
    /// Error number
    pub number: u16,
}

impl ErrorCode {
    pub const fn new(category: char, number: u16) -> Self {
        Self { category, number }
    }

    // Representation / type-layer conditions
    pub const SIZE_TOO_SMALL: Self = Self::new('R', 1);
    pub const UNSUPPORTED_REP: Self = Self::new('R', 2);

    // Conversion-check conditions
    pub const RANGE_CHECK_FAILS: Self = Self::new('C', 1);

    // Internal-consistency failures surfaced to the user
    pub const INTERNAL: Self = Self::new('X', 1);
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}{:03}", self.category, self.number)
    }
}

/// A complete diagnostic
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Severity level
    pub level: Level,
    /// Error code (optional)
    pub code: Option<ErrorCode>,
    /// Main message
    pub message: String,
    /// Labels pointing into the source
    pub labels: Vec<Label>,
    /// Additional notes
    pub notes: Vec<String>,
}

impl Diagnostic {
    /// Creates a new error
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            code: None,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Creates a new warning
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: Level::Warning,
            code: None,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    /// Creates an internal-error diagnostic from a consistency failure.
    pub fn internal(detail: impl fmt::Display) -> Self {
        Self::error(format!("internal error: {}", detail)).with_code(ErrorCode::INTERNAL)
    }

    /// Sets the error code
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Adds a primary label
    pub fn with_label(mut self, loc: SourceLoc, message: impl Into<String>) -> Self {
        self.labels.push(Label::primary(loc, message));
        self
    }

    /// Adds a secondary label
    pub fn with_secondary_label(mut self, loc: SourceLoc, message: impl Into<String>) -> Self {
        self.labels.push(Label::secondary(loc, message));
        self
    }

    /// Adds a note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// The primary location, if any label carries one.
    pub fn primary_loc(&self) -> Option<SourceLoc> {
        self.labels
            .iter()
            .find(|l| l.primary && l.loc.is_known())
            .map(|l| l.loc)
    }
}

/// Maps file IDs to names (and, when available, source text for snippets)
#[derive(Debug, Default)]
pub struct SourceMap {
    files: Vec<SourceEntry>,
}

#[derive(Debug)]
struct SourceEntry {
    name: String,
    /// Original source text, if the driver was given it
    source: Option<String>,
    /// Offset of each line (empty when `source` is absent)
    line_starts: Vec<usize>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a file by name only; snippets will not be rendered for it.
    pub fn add(&mut self, name: impl Into<String>) -> FileId {
        let id = self.files.len() as FileId;
        self.files.push(SourceEntry {
            name: name.into(),
            source: None,
            line_starts: Vec::new(),
        });
        id
    }

    /// Registers a file together with its source text.
    pub fn add_with_source(&mut self, name: impl Into<String>, source: impl Into<String>) -> FileId {
        let source = source.into();
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        let id = self.files.len() as FileId;
        self.files.push(SourceEntry {
            name: name.into(),
            source: Some(source),
            line_starts,
        });
        id
    }

    pub fn name(&self, id: FileId) -> Option<&str> {
        self.files.get(id as usize).map(|f| f.name.as_str())
    }

    /// Returns the text of a 1-indexed line, when source text is available.
    pub fn line_text(&self, id: FileId, line: u32) -> Option<&str> {
        let entry = self.files.get(id as usize)?;
        let source = entry.source.as_deref()?;
        let line_idx = line.checked_sub(1)? as usize;
        let start = *entry.line_starts.get(line_idx)?;
        let end = entry
            .line_starts
            .get(line_idx + 1)
            .map(|&e| e.saturating_sub(1))
            .unwrap_or(source.len());
        Some(&source[start..end])
    }
}

/// Renders a diagnostic for display
pub struct DiagnosticRenderer<'a> {
    map: &'a SourceMap,
    use_colors: bool,
}

impl<'a> DiagnosticRenderer<'a> {
    pub fn new(map: &'a SourceMap) -> Self {
        Self { map, use_colors: true }
    }

    pub fn without_colors(mut self) -> Self {
        self.use_colors = false;
        self
    }

    /// Renders the diagnostic as a string
    pub fn render(&self, diagnostic: &Diagnostic) -> String {
        let mut output = String::new();

        let reset = if self.use_colors { "\x1b[0m" } else { "" };
        let color = if self.use_colors {
            diagnostic.level.color_code()
        } else {
            ""
        };
        let bold = if self.use_colors { "\x1b[1m" } else { "" };
        let blue = if self.use_colors { "\x1b[1;34m" } else { "" };

        // Line 1: error[ER001]: message
        output.push_str(color);
        output.push_str(diagnostic.level.as_str());
        if let Some(code) = &diagnostic.code {
            output.push('[');
            output.push_str(&code.to_string());
            output.push(']');
        }
        output.push_str(reset);
        output.push_str(bold);
        output.push_str(": ");
        output.push_str(&diagnostic.message);
        output.push_str(reset);
        output.push('\n');

        // Labels: location line plus a snippet when source text is on hand
        for label in &diagnostic.labels {
            if !label.loc.is_known() {
                continue;
            }
            let name = self.map.name(label.loc.file).unwrap_or("<unknown>");
            if label.loc.column != 0 {
                output.push_str(&format!(
                    " {}-->{} {}:{}:{}\n",
                    blue, reset, name, label.loc.line, label.loc.column
                ));
            } else {
                output.push_str(&format!(
                    " {}-->{} {}:{}\n",
                    blue, reset, name, label.loc.line
                ));
            }

            if let Some(line_content) = self.map.line_text(label.loc.file, label.loc.line) {
                let line_num = label.loc.line;
                let line_num_width = line_num.to_string().len();
                let padding = " ".repeat(line_num_width);

                output.push_str(&format!(" {} {}|{}\n", padding, blue, reset));
                output.push_str(&format!(
                    " {}{}{} |{} {}\n",
                    blue, line_num, reset, reset, line_content
                ));

                let col = label.loc.column.max(1) as usize;
                let spaces = " ".repeat(col.saturating_sub(1));
                let marker = if label.primary { '^' } else { '-' };
                let label_color = if label.primary { color } else { blue };
                output.push_str(&format!(
                    " {} {}|{} {}{}{} {}\n",
                    padding, blue, reset, spaces, label_color, marker, label.message
                ));
                output.push_str(reset);
            } else if !label.message.is_empty() {
                output.push_str(&format!("     {}\n", label.message));
            }
        }

        // Notes
        for note in &diagnostic.notes {
            output.push_str(&format!("   = {}note{}: {}\n", bold, reset, note));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_rendering_with_source() {
        let mut map = SourceMap::new();
        let file_id = map.add_with_source("unit.vl", "type Small is range 0 .. 7;\nx : Small := 9;");

        let diagnostic = Diagnostic::warning("value out of range of type `Small`")
            .with_code(ErrorCode::RANGE_CHECK_FAILS)
            .with_label(SourceLoc::new(file_id, 2, 14), "this check will always fail")
            .with_note("the value 9 exceeds the upper bound 7");

        let renderer = DiagnosticRenderer::new(&map).without_colors();
        let output = renderer.render(&diagnostic);

        assert!(output.contains("warning[EC001]"));
        assert!(output.contains("unit.vl:2:14"));
        assert!(output.contains("x : Small := 9;"));
        assert!(output.contains("always fail"));
    }

    #[test]
    fn test_diagnostic_rendering_without_source() {
        let mut map = SourceMap::new();
        let file_id = map.add("unit.vl");

        let diagnostic = Diagnostic::error("something went wrong")
            .with_label(SourceLoc::line_only(file_id, 40), "here");

        let output = DiagnosticRenderer::new(&map).without_colors().render(&diagnostic);
        assert!(output.contains("unit.vl:40"));
        assert!(!output.contains("|")); // no snippet without source text
    }

    #[test]
    fn test_internal_code() {
        let d = Diagnostic::internal("block 3 has no terminator");
        assert_eq!(d.code, Some(ErrorCode::INTERNAL));
        assert!(d.message.starts_with("internal error:"));
    }
}
