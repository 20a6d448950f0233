//! The compiled grammar artifact.
//!
//! A [`ParseTable`] is the immutable output of grammar compilation: the
//! symbol inventory, the production lengths, a dense `(state, symbol)` action
//! matrix and the lexical rule of every terminal. The engine never interprets
//! grammar rules directly; it only indexes this table.
//!
//! Tables are validated once when wrapped in a [`Language`], which is the
//! shared, cheaply clonable handle every parse works against.

mod builder;
mod language;
mod pattern;

pub use builder::{Assoc, GrammarBuilder};
pub use language::Language;
pub use pattern::{CharClass, Pattern};

use smol_str::SmolStr;

use crate::base::{RuleId, StateId, Symbol};

/// Table format version produced by this crate's [`GrammarBuilder`].
pub const ABI_VERSION: u32 = 3;

/// Oldest table format version the engine still reads.
pub const MIN_COMPATIBLE_ABI_VERSION: u32 = 2;

/// What a `(state, symbol)` cell tells the automaton to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    /// No valid move: a syntax error.
    #[default]
    Error,
    /// Consume the terminal and enter the state.
    Shift(StateId),
    /// Reduce by the rule.
    Reduce(RuleId),
    /// Parsing is complete (only on [`Symbol::END`]).
    Accept,
    /// State entered after reducing to this nonterminal.
    Goto(StateId),
}

impl Action {
    pub fn is_error(self) -> bool {
        matches!(self, Self::Error)
    }
}

/// Role of a symbol in the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// The end-of-input marker.
    End,
    /// The error symbol.
    Error,
    /// A token matched by a lexical rule.
    Terminal,
    /// A token recognized by the language's external scanner.
    External,
    /// A token allowed anywhere between other tokens (whitespace, comments).
    Extra,
    /// A rule left-hand side.
    NonTerminal,
}

impl SymbolKind {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::End | Self::Terminal | Self::External | Self::Extra)
    }
}

/// Name and role of one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInfo {
    pub name: SmolStr,
    pub kind: SymbolKind,
    /// Named symbols appear in S-expression dumps; anonymous ones (literal
    /// punctuation, whitespace) do not.
    pub named: bool,
}

impl SymbolInfo {
    pub fn new(name: impl Into<SmolStr>, kind: SymbolKind, named: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            named,
        }
    }
}

/// A production, reduced to what the automaton needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub lhs: Symbol,
    /// Number of grammar symbols on the right-hand side.
    pub len: u16,
}

/// How a terminal is recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexRule {
    pub pattern: Pattern,
    /// Higher wins when two rules match the same length.
    pub precedence: i32,
}

impl LexRule {
    pub fn new(pattern: Pattern) -> Self {
        Self {
            pattern,
            precedence: 0,
        }
    }

    pub fn with_precedence(mut self, precedence: i32) -> Self {
        self.precedence = precedence;
        self
    }
}

/// The compiled automaton for one grammar revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTable {
    /// Format version of this artifact.
    pub abi_version: u32,
    /// Grammar revision identifier; trees remember it.
    pub revision: SmolStr,
    /// Indexed by [`Symbol`]. Entries 0 and 1 are END and ERROR.
    pub symbols: Vec<SymbolInfo>,
    /// Indexed by [`RuleId`].
    pub rules: Vec<Rule>,
    pub state_count: u32,
    /// Dense matrix, `state * symbols.len() + symbol`.
    pub actions: Vec<Action>,
    /// Indexed by [`Symbol`]; `Some` for every lexed terminal and extra.
    pub lex_rules: Vec<Option<LexRule>>,
    /// Terminals error recovery resynchronizes on.
    pub sync_symbols: Vec<Symbol>,
    pub start_state: StateId,
}

impl ParseTable {
    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn action(&self, state: StateId, symbol: Symbol) -> Action {
        self.actions
            .get(state.index() * self.symbols.len() + symbol.index())
            .copied()
            .unwrap_or_default()
    }

    pub fn goto(&self, state: StateId, symbol: Symbol) -> Option<StateId> {
        match self.action(state, symbol) {
            Action::Goto(next) => Some(next),
            _ => None,
        }
    }

    pub fn rule(&self, rule: RuleId) -> Option<Rule> {
        self.rules.get(rule.index()).copied()
    }

    pub fn symbol_info(&self, symbol: Symbol) -> Option<&SymbolInfo> {
        self.symbols.get(symbol.index())
    }

    pub fn symbol_kind(&self, symbol: Symbol) -> Option<SymbolKind> {
        self.symbol_info(symbol).map(|info| info.kind)
    }

    pub fn lex_rule(&self, symbol: Symbol) -> Option<&LexRule> {
        self.lex_rules.get(symbol.index()).and_then(Option::as_ref)
    }

    pub fn is_sync(&self, symbol: Symbol) -> bool {
        self.sync_symbols.contains(&symbol)
    }

    pub(crate) fn symbols_of_kind(&self, kind: SymbolKind) -> impl Iterator<Item = Symbol> + '_ {
        self.symbols
            .iter()
            .enumerate()
            .filter(move |(_, info)| info.kind == kind)
            .map(|(i, _)| Symbol(i as u16))
    }
}
