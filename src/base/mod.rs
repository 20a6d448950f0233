//! Foundation types for the parsing engine.
//!
//! This module provides the identifiers every other layer speaks in:
//! - [`Symbol`] - Terminal and nonterminal ids, with reserved END/ERROR
//! - [`StateId`], [`RuleId`] - Automaton state and production ids
//! - [`TextRange`], [`TextSize`] - Half-open byte spans (re-exported from text-size)
//!
//! This module has NO dependencies on other modules of the crate.

mod symbol;

pub use symbol::{RuleId, StateId, Symbol};
pub use text_size::{TextRange, TextSize};

// Re-export text-size for hosts that need the rest of its API
pub use text_size;
