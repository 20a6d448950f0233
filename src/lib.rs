//! # somnium-parse
//!
//! Incremental, table-driven LR parsing engine with error recovery.
//!
//! A grammar arrives as a compiled [`ParseTable`]; the engine lexes and
//! parses source text against it into a lossless concrete syntax tree, keeps
//! going through syntax errors, and reparses edited text reusing every
//! subtree the edit left intact.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! registry  → Host-owned name → Language lookup
//!   ↓
//! parser    → Shift-reduce driver, recovery, incremental reparse
//!   ↓
//! syntax    → Rowan-backed Tree, Edit, SyntaxError
//!   ↓
//! lexer     → State-aware lexer, external scanners
//!   ↓
//! table     → ParseTable artifact, Language, GrammarBuilder
//!   ↓
//! base      → Primitives (Symbol, StateId, TextRange)
//! ```
//!
//! ## Example
//!
//! ```
//! use somnium_parse::{Parser, somnium};
//!
//! let parser = Parser::new(somnium::language().unwrap());
//! let tree = parser.parse("hello").unwrap();
//! assert!(!tree.has_error());
//! assert_eq!(tree.to_sexp(), "(source_file)");
//! ```

// ============================================================================
// MODULES (dependency order: base → table → lexer → syntax → parser → registry)
// ============================================================================

/// Foundation types: Symbol, StateId, RuleId, TextRange
pub mod base;

/// Grammar tables: artifact format, validation, SLR(1) construction
pub mod table;

/// Lexer: longest match over the table's lexical rules
pub mod lexer;

/// Syntax: concrete syntax trees, edits, diagnostics
pub mod syntax;

/// Parser: LR driver, error recovery, incremental reparsing
pub mod parser;

/// Parser configuration: budgets, recovery bounds, cancellation
pub mod config;

/// Call-level errors
pub mod error;

/// Host-owned language registry
pub mod registry;

/// The bundled somnium grammar
pub mod somnium;

// Re-export foundation types
pub use base::{RuleId, StateId, Symbol, TextRange, TextSize};

// Re-export the parsing surface
pub use config::{Budget, ParserConfig, RecoveryConfig};
pub use error::{GrammarError, LanguageError, ParseError};
pub use lexer::{ExternalScanner, Lexer, ScanCursor, Token};
pub use parser::{Parser, parse_many};
pub use registry::LanguageRegistry;
pub use syntax::{Edit, SyntaxElementExt, SyntaxError, Tree};
pub use table::{Action, GrammarBuilder, Language, ParseTable, Pattern};
