//! Grammar symbol and automaton identifiers.

use std::fmt;

/// A grammar symbol id (terminal or nonterminal).
///
/// Ids `0` and `1` are reserved for the end-of-input marker and the error
/// symbol. Grammar symbols start at [`Symbol::FIRST_GRAMMAR`]; within a table
/// all terminals are numbered before all nonterminals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Symbol(pub u16);

impl Symbol {
    /// End of input. Never appears in a tree.
    pub const END: Symbol = Symbol(0);
    /// Error nodes and unrecognized-input leaves.
    pub const ERROR: Symbol = Symbol(1);
    /// First id available to grammar symbols.
    pub const FIRST_GRAMMAR: Symbol = Symbol(2);

    /// Largest number of symbols a table may declare (11 bits of the node kind).
    pub const MAX_COUNT: usize = 1 << 11;

    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_end(self) -> bool {
        self == Self::END
    }

    pub fn is_error(self) -> bool {
        self == Self::ERROR
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An automaton state id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StateId(pub u32);

impl StateId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A grammar rule (production) id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuleId(pub u32);

impl RuleId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}
