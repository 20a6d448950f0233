//! The bundled somnium grammar.
//!
//! ```text
//! source_file := "hello"
//! ```
//!
//! with whitespace allowed around the keyword. The table is written out by
//! hand in the compiled artifact format, exactly as an external grammar
//! compiler would hand it over.

use once_cell::sync::Lazy;

use crate::base::{RuleId, StateId, Symbol};
use crate::error::LanguageError;
use crate::table::{
    ABI_VERSION, Action, Language, LexRule, ParseTable, Pattern, Rule, SymbolInfo, SymbolKind,
};

/// Grammar revision recorded in every tree parsed with this language.
pub const REVISION: &str = "somnium-0.1.0";

/// Registry name of the bundled language.
pub const NAME: &str = "somnium";

const HELLO: Symbol = Symbol(2);
const WHITESPACE: Symbol = Symbol(3);
const SOURCE_FILE: Symbol = Symbol(4);

static TABLE: Lazy<ParseTable> = Lazy::new(|| {
    use Action::{Accept, Error, Goto, Reduce, Shift};

    ParseTable {
        abi_version: ABI_VERSION,
        revision: REVISION.into(),
        symbols: vec![
            SymbolInfo::new("end", SymbolKind::End, false),
            SymbolInfo::new("ERROR", SymbolKind::Error, true),
            SymbolInfo::new("hello", SymbolKind::Terminal, false),
            SymbolInfo::new("whitespace", SymbolKind::Extra, false),
            SymbolInfo::new("source_file", SymbolKind::NonTerminal, true),
        ],
        rules: vec![Rule {
            lhs: SOURCE_FILE,
            len: 1,
        }],
        state_count: 3,
        // columns: end, ERROR, hello, whitespace, source_file
        actions: [
            [Error, Error, Shift(StateId(2)), Error, Goto(StateId(1))],
            [Accept, Error, Error, Error, Error],
            [Reduce(RuleId(0)), Error, Error, Error, Error],
        ]
        .concat(),
        lex_rules: vec![
            None,
            None,
            Some(LexRule::new(Pattern::literal("hello"))),
            Some(LexRule::new(Pattern::whitespace())),
            None,
        ],
        sync_symbols: vec![HELLO],
        start_state: StateId(0),
    }
});

static LANGUAGE: Lazy<Result<Language, LanguageError>> =
    Lazy::new(|| Language::new(TABLE.clone()));

/// The compiled table, as shipped.
pub fn table() -> &'static ParseTable {
    &TABLE
}

/// Shared handle to the somnium language. Every call returns the same handle.
pub fn language() -> Result<Language, LanguageError> {
    LANGUAGE.clone()
}
