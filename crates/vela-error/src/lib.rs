//! vela-error - Diagnostics system for the Vela backend
//!
//! This crate provides structures for reporting backend conditions
//! in a clear and detailed way, similar to the Rust compiler style.
//!
//! # Example
//!
//! ```rust
//! use vela_error::{Diagnostic, DiagnosticRenderer, ErrorCode, SourceLoc, SourceMap};
//!
//! let mut map = SourceMap::new();
//! let file_id = map.add_with_source("pkg.vl", "x : Small := 200;");
//!
//! let diagnostic = Diagnostic::warning("value out of range of type `Small`")
//!     .with_code(ErrorCode::RANGE_CHECK_FAILS)
//!     .with_label(SourceLoc::new(file_id, 1, 14), "this check will always fail");
//!
//! let renderer = DiagnosticRenderer::new(&map);
//! println!("{}", renderer.render(&diagnostic));
//! ```

pub mod diagnostic;
pub mod internal;
pub mod loc;

pub use diagnostic::{Diagnostic, DiagnosticRenderer, ErrorCode, Label, Level, SourceMap};
pub use internal::{IResult, InternalError};
pub use loc::{FileId, Located, SourceLoc};

/// Default Result type for operations that may fail with diagnostics
pub type Result<T> = std::result::Result<T, Diagnostic>;

/// Collection of diagnostics accumulated during compilation
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.items.push(Diagnostic::error(message));
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.items.push(Diagnostic::warning(message));
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.level == Level::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Renders all diagnostics
    pub fn render(&self, map: &SourceMap) -> String {
        let renderer = DiagnosticRenderer::new(map);
        self.items
            .iter()
            .map(|d| renderer.render(d))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_accumulate() {
        let mut diags = Diagnostics::new();
        assert!(diags.is_empty());

        diags.warning("suspicious representation clause");
        assert!(!diags.has_errors());

        diags.error("size too small");
        assert!(diags.has_errors());
        assert_eq!(diags.len(), 2);
    }

    #[test]
    fn test_internal_becomes_diagnostic() {
        let err = InternalError::MissingIrType { type_name: "T".into() };
        let diag = Diagnostic::internal(err);
        assert_eq!(diag.level, Level::Error);
        assert_eq!(diag.code, Some(ErrorCode::INTERNAL));
    }
}
