//! Error types for the quadc compiler core

use thiserror::Error;

/// Compiler-core errors
///
/// Ordinary type errors and warnings are *diagnostics*: they are routed to
/// the [`crate::diag::Diagnostics`] sink and decorate the offending
/// expression with the error type. The variants below are the situations
/// the core cannot analyze or lower past.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Expression used where a constant expression is required but cannot
    /// be evaluated at compile time
    ///
    /// **Triggered by:** non-constant operands in case labels, enum
    /// initializers, array bounds, or static initializers
    /// **Example:** `case x:` where `x` is an automatic variable
    #[error("{file}:{line}:{col}: invalid constant expression")]
    ConstExpr {
        /// Source file of the offending expression
        file: String,
        /// Line number (1-based)
        line: u32,
        /// Column number (1-based)
        col: u32,
    },

    /// Fatal diagnostic emitted by the analyzer
    ///
    /// The diagnostic sink terminates the translation unit; no recovery is
    /// attempted past this point.
    #[error("{file}:{line}:{col}: {message}")]
    Fatal {
        /// Source file
        file: String,
        /// Line number (1-based)
        line: u32,
        /// Column number (1-based)
        col: u32,
        /// Error description
        message: String,
    },

    /// IR generation requested for a function that still carries type errors
    ///
    /// The IR generator must only run on functions the analyzer accepted.
    #[error("cannot lower function with {count} unresolved type error(s)")]
    UnresolvedTypeErrors {
        /// Number of errors the analyzer reported
        count: usize,
    },

    /// Internal invariant violation
    ///
    /// **Triggered by:** states the core considers unreachable (a member
    /// the analyzer resolved vanishing from the symbol table, a branch to
    /// an unknown label)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Fatal error that aborts the translation unit
    Fatal,
    /// Error that is reported but analysis of sibling expressions continues
    Recoverable,
    /// Warning that doesn't change any type
    Warning,
}

impl Error {
    /// Create an internal-invariant error with a message
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// Classify error severity
    pub fn classify(&self) -> ErrorSeverity {
        match self {
            Error::ConstExpr { .. } => ErrorSeverity::Fatal,
            Error::Fatal { .. } => ErrorSeverity::Fatal,
            Error::Internal(_) => ErrorSeverity::Fatal,
            Error::UnresolvedTypeErrors { .. } => ErrorSeverity::Recoverable,
        }
    }
}

/// Result type for quadc operations
pub type Result<T> = std::result::Result<T, Error>;
