//! Syntax diagnostics derived from a tree.
//!
//! Recovery never fails a parse; it leaves ERROR nodes, unrecognized-input
//! leaves and zero-width missing leaves in the tree. This module turns those
//! markers into categorized diagnostics.
//!
//! Error codes follow a naming convention: E{category}{number}
//! - E01xx: Lexical errors (unrecognized input)
//! - E02xx: Missing tokens
//! - E03xx: Unexpected input

use std::fmt;

use rowan::{TextRange, TextSize};

/// Error codes for syntax diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Characters no lexical rule recognizes
    E0101,
    /// A token the grammar requires is absent
    E0201,
    /// Input the grammar does not allow at this point
    E0301,
}

impl ErrorCode {
    /// Get the string representation of the error code (e.g., "E0201")
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::E0101 => "E0101",
            Self::E0201 => "E0201",
            Self::E0301 => "E0301",
        }
    }

    pub fn category_description(&self) -> &'static str {
        match self {
            Self::E0101 => "lexical error",
            Self::E0201 => "missing token",
            Self::E0301 => "unexpected input",
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            Self::E0101 => "unrecognized input",
            Self::E0201 => "missing token",
            Self::E0301 => "unexpected input",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity level for diagnostics
///
/// Recovery only ever reports [`Severity::Error`]. `Warning` is for hosts
/// that downgrade some diagnostics with [`SyntaxError::with_severity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Severity {
    #[default]
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

/// A syntax problem recorded in a tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    /// Zero-width for missing tokens.
    pub range: TextRange,
    pub code: ErrorCode,
    pub severity: Severity,
    /// Optional suggestion for fixing the error
    pub hint: Option<String>,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, range: TextRange, code: ErrorCode) -> Self {
        Self {
            message: message.into(),
            range,
            code,
            severity: Severity::Error,
            hint: None,
        }
    }

    /// Create an error at a specific offset with zero-width range
    pub fn at_offset(message: impl Into<String>, offset: TextSize, code: ErrorCode) -> Self {
        Self::new(message, TextRange::empty(offset), code)
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Format the error for display
    pub fn format(&self) -> String {
        let mut result = format!("{}: {}", self.code, self.message);
        if let Some(hint) = &self.hint {
            result.push_str(&format!("\n  hint: {hint}"));
        }
        result
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {} at {:?}",
            self.severity.as_str(),
            self.code,
            self.message,
            self.range
        )
    }
}
