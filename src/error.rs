//! Error types reported as call failures.
//!
//! Syntax problems are never errors at this level: they are recovered inside
//! the parse and recorded as ERROR and missing nodes in the tree. Only a
//! rejected grammar table, an exhausted budget, cancellation and malformed
//! host input fail a call.

use smol_str::SmolStr;
use thiserror::Error;

/// A grammar table that the engine refuses to load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LanguageError {
    /// The artifact was produced for a table format this engine cannot read.
    #[error("incompatible grammar table version {found} (supported {min}..={max})")]
    IncompatibleVersion { found: u32, min: u32, max: u32 },

    /// The artifact is internally inconsistent.
    #[error("invalid grammar table: {0}")]
    InvalidTable(String),
}

impl LanguageError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidTable(message.into())
    }
}

/// Failure of a `parse` or `reparse` call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The language handle or its table is unusable.
    #[error(transparent)]
    Language(#[from] LanguageError),

    /// The configured operation budget ran out before the parse finished.
    #[error("operation budget exceeded after {tokens} tokens and {bytes} bytes")]
    BudgetExceeded { tokens: u64, bytes: u64 },

    /// The host raised the cancellation flag.
    #[error("parse cancelled")]
    Cancelled,

    /// The edit descriptor does not describe the given source change.
    #[error("invalid edit: {0}")]
    InvalidEdit(String),

    /// Byte offsets are 32-bit.
    #[error("source of {len} bytes exceeds the 4 GiB limit")]
    SourceTooLarge { len: usize },
}

/// A grammar description that cannot be compiled into a table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("unknown symbol `{0}`")]
    UnknownSymbol(SmolStr),

    #[error("symbol `{0}` is declared twice")]
    DuplicateSymbol(SmolStr),

    #[error("terminal `{0}` cannot appear on a rule left-hand side")]
    TerminalRule(SmolStr),

    #[error("extra `{0}` cannot appear inside a rule")]
    ExtraInRule(SmolStr),

    #[error("grammar has no rules")]
    NoRules,

    #[error("grammar declares {0} symbols, more than the table format allows")]
    TooManySymbols(usize),
}
