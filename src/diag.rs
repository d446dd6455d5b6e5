//! Diagnostic sink
//!
//! Diagnostics are collected in source order. Errors never abort analysis
//! of unrelated expressions: the analyzer decorates the offending node with
//! the error type and moves on. Fatal situations are not represented here;
//! they surface as [`crate::Error`] values.

use crate::ast::SrcLoc;
use crate::error::Error;

/// Severity of a collected diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Type or constraint violation; the expression gets the error type
    Error,
    /// Advisory; never changes a type
    Warning,
}

/// A single diagnostic with its source location
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Error or warning
    pub severity: Severity,
    /// Where in the source the diagnostic points
    pub loc: SrcLoc,
    /// Human-readable description
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}: {}", self.loc, tag, self.message)
    }
}

/// Collects diagnostics for a translation unit
#[derive(Debug, Default)]
pub struct Diagnostics {
    collected: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
}

impl Diagnostics {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a (non-fatal) error at `loc`
    pub fn error(&mut self, loc: &SrcLoc, message: impl Into<String>) {
        let d = Diagnostic {
            severity: Severity::Error,
            loc: loc.clone(),
            message: message.into(),
        };
        tracing::debug!("{}", d);
        self.error_count += 1;
        self.collected.push(d);
    }

    /// Record a warning at `loc`
    pub fn warning(&mut self, loc: &SrcLoc, message: impl Into<String>) {
        let d = Diagnostic {
            severity: Severity::Warning,
            loc: loc.clone(),
            message: message.into(),
        };
        tracing::debug!("{}", d);
        self.warning_count += 1;
        self.collected.push(d);
    }

    /// Build the fatal error that aborts the translation unit
    pub fn fatal(&self, loc: &SrcLoc, message: impl Into<String>) -> Error {
        Error::Fatal {
            file: loc.file.to_string(),
            line: loc.line,
            col: loc.col,
            message: message.into(),
        }
    }

    /// Number of errors collected so far
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Number of warnings collected so far
    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    /// True when no error has been recorded
    pub fn is_clean(&self) -> bool {
        self.error_count == 0
    }

    /// All diagnostics in emission (source) order
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.collected.iter()
    }

    /// Drop collected diagnostics and reset the counters
    pub fn clear(&mut self) {
        self.collected.clear();
        self.error_count = 0;
        self.warning_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let mut diags = Diagnostics::new();
        let loc = SrcLoc::new("t.c", 3, 7);
        diags.warning(&loc, "implicit conversion changes signedness");
        diags.error(&loc, "expression is not assignable");
        assert_eq!(diags.warning_count(), 1);
        assert_eq!(diags.error_count(), 1);
        assert!(!diags.is_clean());

        diags.clear();
        assert!(diags.is_clean());
        assert_eq!(diags.iter().count(), 0);
    }

    #[test]
    fn test_display() {
        let mut diags = Diagnostics::new();
        let loc = SrcLoc::new("f.c", 12, 1);
        diags.error(&loc, "called object is not a function");
        let rendered = diags.iter().next().unwrap().to_string();
        assert_eq!(rendered, "f.c:12:1: error: called object is not a function");
    }
}
