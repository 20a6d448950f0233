//! Validated, shareable grammar handle.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::{ABI_VERSION, Action, MIN_COMPATIBLE_ABI_VERSION, ParseTable, SymbolInfo, SymbolKind};
use crate::base::{StateId, Symbol};
use crate::error::LanguageError;
use crate::lexer::ExternalScanner;

/// A grammar table that passed validation, plus lookups derived from it.
///
/// Cloning is an `Arc` increment. The handle is `Send + Sync`, so any number
/// of parses on any number of threads may share one language.
#[derive(Clone)]
pub struct Language {
    inner: Arc<LanguageData>,
}

struct LanguageData {
    table: ParseTable,
    /// Per state: terminals (END included) with a non-error action.
    expected: Vec<Box<[Symbol]>>,
    extras: Box<[Symbol]>,
    lexed_terminals: Box<[Symbol]>,
    scanner: Option<Arc<dyn ExternalScanner>>,
    by_name: FxHashMap<SmolStr, Symbol>,
}

impl Language {
    /// Load a table, rejecting unknown format versions and inconsistent data.
    pub fn new(table: ParseTable) -> Result<Self, LanguageError> {
        Self::build(table, None)
    }

    /// Load a table whose external tokens are recognized by `scanner`.
    pub fn with_external_scanner(
        table: ParseTable,
        scanner: Arc<dyn ExternalScanner>,
    ) -> Result<Self, LanguageError> {
        Self::build(table, Some(scanner))
    }

    fn build(
        table: ParseTable,
        scanner: Option<Arc<dyn ExternalScanner>>,
    ) -> Result<Self, LanguageError> {
        validate(&table, scanner.is_some())?;

        let symbol_count = table.symbol_count();
        let expected = (0..table.state_count)
            .map(|state| {
                (0..symbol_count)
                    .map(|i| Symbol(i as u16))
                    .filter(|&symbol| {
                        table.symbols[symbol.index()].kind.is_terminal()
                            && table.symbols[symbol.index()].kind != SymbolKind::Extra
                            && !table.action(StateId(state), symbol).is_error()
                    })
                    .collect()
            })
            .collect();

        let by_name = table
            .symbols
            .iter()
            .enumerate()
            .rev()
            .map(|(i, info)| (info.name.clone(), Symbol(i as u16)))
            .collect();

        let data = LanguageData {
            extras: table.symbols_of_kind(SymbolKind::Extra).collect(),
            lexed_terminals: table.symbols_of_kind(SymbolKind::Terminal).collect(),
            expected,
            scanner,
            by_name,
            table,
        };
        tracing::debug!(
            revision = %data.table.revision,
            states = data.table.state_count,
            symbols = symbol_count,
            "loaded grammar table"
        );
        Ok(Self {
            inner: Arc::new(data),
        })
    }

    pub fn table(&self) -> &ParseTable {
        &self.inner.table
    }

    pub fn revision(&self) -> &str {
        &self.inner.table.revision
    }

    pub fn abi_version(&self) -> u32 {
        self.inner.table.abi_version
    }

    pub fn symbol_count(&self) -> usize {
        self.inner.table.symbol_count()
    }

    pub fn state_count(&self) -> u32 {
        self.inner.table.state_count
    }

    pub fn symbol_name(&self, symbol: Symbol) -> &str {
        self.inner
            .table
            .symbol_info(symbol)
            .map(|info| info.name.as_str())
            .unwrap_or("<unknown>")
    }

    /// Lowest symbol id carrying this name.
    pub fn symbol_for_name(&self, name: &str) -> Option<Symbol> {
        self.inner.by_name.get(name).copied()
    }

    pub fn symbol_info(&self, symbol: Symbol) -> Option<&SymbolInfo> {
        self.inner.table.symbol_info(symbol)
    }

    pub fn is_named(&self, symbol: Symbol) -> bool {
        symbol == Symbol::ERROR || self.symbol_info(symbol).is_some_and(|info| info.named)
    }

    pub fn is_extra(&self, symbol: Symbol) -> bool {
        self.inner.table.symbol_kind(symbol) == Some(SymbolKind::Extra)
    }

    pub fn is_terminal(&self, symbol: Symbol) -> bool {
        self.inner
            .table
            .symbol_kind(symbol)
            .is_some_and(SymbolKind::is_terminal)
    }

    pub fn action(&self, state: StateId, symbol: Symbol) -> Action {
        self.inner.table.action(state, symbol)
    }

    /// Terminals with a valid action in `state`, END included, extras excluded.
    pub fn expected_symbols(&self, state: StateId) -> &[Symbol] {
        self.inner
            .expected
            .get(state.index())
            .map(|symbols| &**symbols)
            .unwrap_or(&[])
    }

    pub fn extras(&self) -> &[Symbol] {
        &self.inner.extras
    }

    /// Every terminal with a lexical rule (extras and externals excluded).
    pub fn lexed_terminals(&self) -> &[Symbol] {
        &self.inner.lexed_terminals
    }

    pub fn external_scanner(&self) -> Option<&dyn ExternalScanner> {
        self.inner.scanner.as_deref()
    }

    /// Whether both handles point at the same loaded table.
    pub fn ptr_eq(&self, other: &Language) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Language")
            .field("revision", &self.inner.table.revision)
            .field("abi_version", &self.inner.table.abi_version)
            .field("states", &self.inner.table.state_count)
            .field("symbols", &self.inner.table.symbol_count())
            .field("external_scanner", &self.inner.scanner.is_some())
            .finish()
    }
}

fn validate(table: &ParseTable, has_scanner: bool) -> Result<(), LanguageError> {
    if !(MIN_COMPATIBLE_ABI_VERSION..=ABI_VERSION).contains(&table.abi_version) {
        return Err(LanguageError::IncompatibleVersion {
            found: table.abi_version,
            min: MIN_COMPATIBLE_ABI_VERSION,
            max: ABI_VERSION,
        });
    }

    let symbol_count = table.symbol_count();
    if symbol_count < 2 || symbol_count > Symbol::MAX_COUNT {
        return Err(LanguageError::invalid(format!(
            "symbol count {symbol_count} out of range"
        )));
    }
    if table.symbols[Symbol::END.index()].kind != SymbolKind::End
        || table.symbols[Symbol::ERROR.index()].kind != SymbolKind::Error
    {
        return Err(LanguageError::invalid("symbols 0 and 1 must be END and ERROR"));
    }
    if table.state_count == 0 || table.start_state.0 >= table.state_count {
        return Err(LanguageError::invalid("start state out of range"));
    }
    if table.actions.len() != table.state_count as usize * symbol_count {
        return Err(LanguageError::invalid(format!(
            "action matrix has {} cells, expected {}",
            table.actions.len(),
            table.state_count as usize * symbol_count
        )));
    }
    if table.lex_rules.len() != symbol_count {
        return Err(LanguageError::invalid("lexical rule count differs from symbol count"));
    }

    for (i, info) in table.symbols.iter().enumerate() {
        let lexed = table.lex_rules[i].is_some();
        let needs_rule = matches!(info.kind, SymbolKind::Terminal | SymbolKind::Extra);
        if needs_rule != lexed {
            return Err(LanguageError::invalid(format!(
                "symbol `{}` has {} lexical rule",
                info.name,
                if lexed { "an unexpected" } else { "no" }
            )));
        }
        if info.kind == SymbolKind::External && !has_scanner {
            return Err(LanguageError::invalid(format!(
                "external symbol `{}` requires an external scanner",
                info.name
            )));
        }
    }

    for rule in &table.rules {
        if table.symbol_kind(rule.lhs) != Some(SymbolKind::NonTerminal) {
            return Err(LanguageError::invalid(format!(
                "rule left-hand side {} is not a nonterminal",
                rule.lhs
            )));
        }
    }

    for (cell, action) in table.actions.iter().enumerate() {
        let symbol = Symbol((cell % symbol_count) as u16);
        let kind = table.symbols[symbol.index()].kind;
        let ok = match action {
            Action::Error => true,
            Action::Shift(state) => kind.is_terminal() && state.0 < table.state_count,
            Action::Goto(state) => kind == SymbolKind::NonTerminal && state.0 < table.state_count,
            Action::Reduce(rule) => kind.is_terminal() && rule.index() < table.rules.len(),
            Action::Accept => symbol == Symbol::END,
        };
        if !ok {
            return Err(LanguageError::invalid(format!(
                "state {} has an invalid action {action:?} on `{}`",
                cell / symbol_count,
                table.symbols[symbol.index()].name
            )));
        }
    }

    for &symbol in &table.sync_symbols {
        if !table.symbol_kind(symbol).is_some_and(SymbolKind::is_terminal) {
            return Err(LanguageError::invalid(format!(
                "synchronizing symbol {symbol} is not a terminal"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::somnium;

    #[test]
    fn test_bundled_table_loads() {
        let language = Language::new(somnium::table().clone()).unwrap();
        assert_eq!(language.revision(), somnium::REVISION);
        assert_eq!(language.symbol_name(Symbol::ERROR), "ERROR");
        assert!(language.symbol_for_name("source_file").is_some());
    }

    #[test]
    fn test_rejects_future_version() {
        let mut table = somnium::table().clone();
        table.abi_version = ABI_VERSION + 1;
        assert_eq!(
            Language::new(table).unwrap_err(),
            LanguageError::IncompatibleVersion {
                found: ABI_VERSION + 1,
                min: MIN_COMPATIBLE_ABI_VERSION,
                max: ABI_VERSION,
            }
        );
    }

    #[test]
    fn test_rejects_truncated_action_matrix() {
        let mut table = somnium::table().clone();
        table.actions.pop();
        assert!(matches!(
            Language::new(table),
            Err(LanguageError::InvalidTable(_))
        ));
    }

    #[test]
    fn test_rejects_shift_on_nonterminal() {
        let mut table = somnium::table().clone();
        let source_file = table
            .symbols
            .iter()
            .position(|info| info.kind == SymbolKind::NonTerminal)
            .unwrap();
        table.actions[source_file] = Action::Shift(StateId(0));
        assert!(matches!(
            Language::new(table),
            Err(LanguageError::InvalidTable(_))
        ));
    }

    #[test]
    fn test_expected_symbols_exclude_extras() {
        let language = somnium::language().unwrap();
        let expected = language.expected_symbols(language.table().start_state);
        assert_eq!(expected.len(), 1);
        assert_eq!(language.symbol_name(expected[0]), "hello");
    }
}
