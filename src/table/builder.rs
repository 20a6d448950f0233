//! SLR(1) table construction.
//!
//! Grammars are normally compiled ahead of time and shipped as a
//! [`ParseTable`]. The builder produces the same artifact in-process for
//! small embedded grammars such as the bundled somnium grammar and for
//! tests.
//!
//! ```ignore
//! let mut g = GrammarBuilder::new("assign-1");
//! g.token("identifier", Pattern::identifier())
//!     .token("number", Pattern::integer())
//!     .literal("=")
//!     .literal(";")
//!     .extra("whitespace", Pattern::whitespace())
//!     .rule("stmt", &["identifier", "=", "number", ";"])
//!     .sync(";");
//! let table = g.build()?;
//! ```

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use super::{ABI_VERSION, Action, LexRule, ParseTable, Pattern, Rule, SymbolInfo, SymbolKind};
use crate::base::{RuleId, StateId, Symbol};
use crate::error::GrammarError;

/// Associativity of a precedence level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Left,
    Right,
    NonAssoc,
}

#[derive(Debug, Clone)]
struct TerminalDecl {
    kind: SymbolKind,
    named: bool,
    lex: Option<LexRule>,
}

#[derive(Debug, Clone)]
struct RuleDecl {
    lhs: SmolStr,
    rhs: Vec<SmolStr>,
}

/// Collects a BNF grammar and compiles it into a [`ParseTable`].
#[derive(Debug, Clone)]
pub struct GrammarBuilder {
    revision: SmolStr,
    terminals: IndexMap<SmolStr, TerminalDecl>,
    rules: Vec<RuleDecl>,
    start: Option<SmolStr>,
    sync: Vec<SmolStr>,
    precedence: FxHashMap<SmolStr, (u32, Assoc)>,
    levels: u32,
    pending_error: Option<GrammarError>,
}

impl GrammarBuilder {
    pub fn new(revision: impl Into<SmolStr>) -> Self {
        Self {
            revision: revision.into(),
            terminals: IndexMap::new(),
            rules: Vec::new(),
            start: None,
            sync: Vec::new(),
            precedence: FxHashMap::default(),
            levels: 0,
            pending_error: None,
        }
    }

    /// A named token matched by `pattern`.
    pub fn token(&mut self, name: impl Into<SmolStr>, pattern: Pattern) -> &mut Self {
        self.declare(name.into(), SymbolKind::Terminal, true, Some(LexRule::new(pattern)))
    }

    /// A named token with an explicit lexical precedence.
    pub fn token_with_precedence(
        &mut self,
        name: impl Into<SmolStr>,
        pattern: Pattern,
        precedence: i32,
    ) -> &mut Self {
        let rule = LexRule::new(pattern).with_precedence(precedence);
        self.declare(name.into(), SymbolKind::Terminal, true, Some(rule))
    }

    /// An anonymous token spelled exactly `text`; rules refer to it by its text.
    pub fn literal(&mut self, text: impl Into<SmolStr>) -> &mut Self {
        let text = text.into();
        let rule = LexRule::new(Pattern::Literal(text.clone()));
        self.declare(text, SymbolKind::Terminal, false, Some(rule))
    }

    /// Anonymous trivia allowed between any two tokens.
    pub fn extra(&mut self, name: impl Into<SmolStr>, pattern: Pattern) -> &mut Self {
        self.declare(name.into(), SymbolKind::Extra, false, Some(LexRule::new(pattern)))
    }

    /// Trivia that shows up in S-expression dumps (comments, usually).
    pub fn named_extra(&mut self, name: impl Into<SmolStr>, pattern: Pattern) -> &mut Self {
        self.declare(name.into(), SymbolKind::Extra, true, Some(LexRule::new(pattern)))
    }

    /// A token recognized by the language's external scanner.
    pub fn external(&mut self, name: impl Into<SmolStr>) -> &mut Self {
        self.declare(name.into(), SymbolKind::External, true, None)
    }

    pub fn rule(&mut self, lhs: impl Into<SmolStr>, rhs: &[&str]) -> &mut Self {
        self.rules.push(RuleDecl {
            lhs: lhs.into(),
            rhs: rhs.iter().map(|s| SmolStr::new(*s)).collect(),
        });
        self
    }

    /// Declare the next (tighter-binding) precedence level.
    pub fn precedence(&mut self, assoc: Assoc, tokens: &[&str]) -> &mut Self {
        self.levels += 1;
        for token in tokens {
            self.precedence.insert(SmolStr::new(*token), (self.levels, assoc));
        }
        self
    }

    /// Defaults to the left-hand side of the first rule.
    pub fn start(&mut self, symbol: impl Into<SmolStr>) -> &mut Self {
        self.start = Some(symbol.into());
        self
    }

    /// Mark a terminal as a synchronizing symbol for error recovery.
    pub fn sync(&mut self, token: impl Into<SmolStr>) -> &mut Self {
        self.sync.push(token.into());
        self
    }

    fn declare(
        &mut self,
        name: SmolStr,
        kind: SymbolKind,
        named: bool,
        lex: Option<LexRule>,
    ) -> &mut Self {
        if self.terminals.contains_key(&name) {
            self.pending_error.get_or_insert(GrammarError::DuplicateSymbol(name));
        } else {
            self.terminals.insert(name, TerminalDecl { kind, named, lex });
        }
        self
    }

    pub fn build(&self) -> Result<ParseTable, GrammarError> {
        if let Some(err) = &self.pending_error {
            return Err(err.clone());
        }
        if self.rules.is_empty() {
            return Err(GrammarError::NoRules);
        }

        let mut symbols = vec![
            SymbolInfo::new("end", SymbolKind::End, false),
            SymbolInfo::new("ERROR", SymbolKind::Error, true),
        ];
        let mut lex_rules = vec![None, None];
        let mut ids: FxHashMap<SmolStr, Symbol> = FxHashMap::default();

        for (name, decl) in &self.terminals {
            ids.insert(name.clone(), Symbol(symbols.len() as u16));
            symbols.push(SymbolInfo::new(name.clone(), decl.kind, decl.named));
            lex_rules.push(decl.lex.clone());
        }
        for rule in &self.rules {
            if self.terminals.contains_key(&rule.lhs) {
                return Err(GrammarError::TerminalRule(rule.lhs.clone()));
            }
            if !ids.contains_key(&rule.lhs) {
                ids.insert(rule.lhs.clone(), Symbol(symbols.len() as u16));
                symbols.push(SymbolInfo::new(rule.lhs.clone(), SymbolKind::NonTerminal, true));
                lex_rules.push(None);
            }
        }
        if symbols.len() > Symbol::MAX_COUNT {
            return Err(GrammarError::TooManySymbols(symbols.len()));
        }

        let lookup = |name: &SmolStr| -> Result<Symbol, GrammarError> {
            let symbol = *ids
                .get(name)
                .ok_or_else(|| GrammarError::UnknownSymbol(name.clone()))?;
            if symbols[symbol.index()].kind == SymbolKind::Extra {
                return Err(GrammarError::ExtraInRule(name.clone()));
            }
            Ok(symbol)
        };

        let mut productions = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            let lhs = ids[&rule.lhs];
            let rhs = rule.rhs.iter().map(lookup).collect::<Result<Vec<_>, _>>()?;
            let precedence = rule
                .rhs
                .iter()
                .rev()
                .find_map(|name| self.precedence.get(name).copied());
            productions.push(Production {
                lhs,
                rhs,
                precedence,
            });
        }

        let start = match &self.start {
            Some(name) => lookup(name)?,
            None => productions[0].lhs,
        };
        let sync_symbols = self.sync.iter().map(lookup).collect::<Result<Vec<_>, _>>()?;
        let token_precedence: FxHashMap<Symbol, (u32, Assoc)> = self
            .precedence
            .iter()
            .filter_map(|(name, prec)| ids.get(name).map(|&symbol| (symbol, *prec)))
            .collect();

        let automaton = Automaton::new(&symbols, &productions, start);
        let actions = automaton.actions(&symbols, &productions, &token_precedence);

        Ok(ParseTable {
            abi_version: ABI_VERSION,
            revision: self.revision.clone(),
            rules: productions
                .iter()
                .map(|p| Rule {
                    lhs: p.lhs,
                    len: p.rhs.len() as u16,
                })
                .collect(),
            state_count: automaton.states.len() as u32,
            actions,
            symbols,
            lex_rules,
            sync_symbols,
            start_state: StateId(0),
        })
    }
}

#[derive(Debug)]
struct Production {
    lhs: Symbol,
    rhs: Vec<Symbol>,
    precedence: Option<(u32, Assoc)>,
}

/// An LR(0) item. `rule == productions.len()` is the augmented start rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct Item {
    rule: usize,
    dot: usize,
}

struct Automaton {
    start: Symbol,
    states: Vec<Vec<Item>>,
    /// Per state: (symbol, target) in ascending symbol order.
    transitions: Vec<Vec<(Symbol, StateId)>>,
    follow: Vec<Vec<bool>>,
}

impl Automaton {
    fn new(symbols: &[SymbolInfo], productions: &[Production], start: Symbol) -> Self {
        let augmented = [start];
        let rhs = |rule: usize| {
            if rule == productions.len() {
                &augmented[..]
            } else {
                &productions[rule].rhs[..]
            }
        };
        let is_nonterminal = |s: Symbol| symbols[s.index()].kind == SymbolKind::NonTerminal;

        let closure = |kernel: Vec<Item>| -> Vec<Item> {
            let mut items = kernel;
            let mut i = 0;
            while i < items.len() {
                let item = items[i];
                if let Some(&next) = rhs(item.rule).get(item.dot) {
                    if is_nonterminal(next) {
                        for (rule, production) in productions.iter().enumerate() {
                            let candidate = Item { rule, dot: 0 };
                            if production.lhs == next && !items.contains(&candidate) {
                                items.push(candidate);
                            }
                        }
                    }
                }
                i += 1;
            }
            items.sort();
            items
        };

        let initial = vec![Item {
            rule: productions.len(),
            dot: 0,
        }];
        let mut index: FxHashMap<Vec<Item>, StateId> = FxHashMap::default();
        index.insert(initial.clone(), StateId(0));
        let mut states = vec![closure(initial)];
        let mut transitions = Vec::new();

        let mut current = 0;
        while current < states.len() {
            let mut next_symbols: Vec<Symbol> = states[current]
                .iter()
                .filter_map(|item| rhs(item.rule).get(item.dot).copied())
                .collect();
            next_symbols.sort();
            next_symbols.dedup();

            let mut edges = Vec::with_capacity(next_symbols.len());
            for symbol in next_symbols {
                let mut kernel: Vec<Item> = states[current]
                    .iter()
                    .filter(|item| rhs(item.rule).get(item.dot) == Some(&symbol))
                    .map(|item| Item {
                        rule: item.rule,
                        dot: item.dot + 1,
                    })
                    .collect();
                kernel.sort();
                let target = match index.get(&kernel) {
                    Some(&target) => target,
                    None => {
                        let target = StateId(states.len() as u32);
                        index.insert(kernel.clone(), target);
                        states.push(closure(kernel));
                        target
                    }
                };
                edges.push((symbol, target));
            }
            transitions.push(edges);
            current += 1;
        }

        let follow = follow_sets(symbols.len(), productions, start, &is_nonterminal);
        Self {
            start,
            states,
            transitions,
            follow,
        }
    }

    fn actions(
        &self,
        symbols: &[SymbolInfo],
        productions: &[Production],
        token_precedence: &FxHashMap<Symbol, (u32, Assoc)>,
    ) -> Vec<Action> {
        let width = symbols.len();
        let mut actions = vec![Action::Error; self.states.len() * width];

        for (state, edges) in self.transitions.iter().enumerate() {
            for &(symbol, target) in edges {
                actions[state * width + symbol.index()] =
                    if symbols[symbol.index()].kind == SymbolKind::NonTerminal {
                        Action::Goto(target)
                    } else {
                        Action::Shift(target)
                    };
            }
        }

        for (state, items) in self.states.iter().enumerate() {
            for item in items {
                if item.rule == productions.len() {
                    if item.dot == 1 {
                        actions[state * width + Symbol::END.index()] = Action::Accept;
                    }
                    continue;
                }
                let production = &productions[item.rule];
                if item.dot != production.rhs.len() {
                    continue;
                }
                for lookahead in (0..width).filter(|&s| self.follow[production.lhs.index()][s]) {
                    let cell = &mut actions[state * width + lookahead];
                    let reduce = Action::Reduce(RuleId(item.rule as u32));
                    *cell = match *cell {
                        Action::Error => reduce,
                        Action::Accept => Action::Accept,
                        Action::Reduce(existing) => {
                            tracing::debug!(
                                state,
                                lookahead = %symbols[lookahead].name,
                                kept = existing.0,
                                dropped = item.rule,
                                "reduce/reduce conflict resolved for the earlier rule"
                            );
                            Action::Reduce(existing)
                        }
                        Action::Shift(target) => resolve_shift_reduce(
                            target,
                            RuleId(item.rule as u32),
                            production.precedence,
                            token_precedence.get(&Symbol(lookahead as u16)).copied(),
                        )
                        .unwrap_or_else(|| {
                            tracing::debug!(
                                state,
                                lookahead = %symbols[lookahead].name,
                                rule = item.rule,
                                "shift/reduce conflict resolved as shift"
                            );
                            Action::Shift(target)
                        }),
                        Action::Goto(target) => Action::Goto(target),
                    };
                }
            }
        }
        tracing::trace!(start = %self.start, states = self.states.len(), "built SLR(1) automaton");
        actions
    }
}

/// `None` when precedence does not decide the conflict.
fn resolve_shift_reduce(
    target: StateId,
    rule: RuleId,
    rule_precedence: Option<(u32, Assoc)>,
    token_precedence: Option<(u32, Assoc)>,
) -> Option<Action> {
    let (rule_level, _) = rule_precedence?;
    let (token_level, assoc) = token_precedence?;
    Some(if rule_level > token_level {
        Action::Reduce(rule)
    } else if rule_level < token_level {
        Action::Shift(target)
    } else {
        match assoc {
            Assoc::Left => Action::Reduce(rule),
            Assoc::Right => Action::Shift(target),
            Assoc::NonAssoc => Action::Error,
        }
    })
}

fn follow_sets(
    width: usize,
    productions: &[Production],
    start: Symbol,
    is_nonterminal: &dyn Fn(Symbol) -> bool,
) -> Vec<Vec<bool>> {
    let mut nullable = vec![false; width];
    let mut first = vec![vec![false; width]; width];
    for s in (0..width).map(|i| Symbol(i as u16)) {
        if !is_nonterminal(s) {
            first[s.index()][s.index()] = true;
        }
    }

    let mut changed = true;
    while changed {
        changed = false;
        for production in productions {
            let lhs = production.lhs.index();
            let mut all_nullable = true;
            for &symbol in &production.rhs {
                for t in 0..width {
                    if first[symbol.index()][t] && !first[lhs][t] {
                        first[lhs][t] = true;
                        changed = true;
                    }
                }
                if !nullable[symbol.index()] {
                    all_nullable = false;
                    break;
                }
            }
            if all_nullable && !nullable[lhs] {
                nullable[lhs] = true;
                changed = true;
            }
        }
    }

    let mut follow = vec![vec![false; width]; width];
    follow[start.index()][Symbol::END.index()] = true;
    changed = true;
    while changed {
        changed = false;
        for production in productions {
            for (i, &symbol) in production.rhs.iter().enumerate() {
                if !is_nonterminal(symbol) {
                    continue;
                }
                let mut rest_nullable = true;
                for &next in &production.rhs[i + 1..] {
                    for t in 0..width {
                        if first[next.index()][t] && !follow[symbol.index()][t] {
                            follow[symbol.index()][t] = true;
                            changed = true;
                        }
                    }
                    if !nullable[next.index()] {
                        rest_nullable = false;
                        break;
                    }
                }
                if rest_nullable {
                    for t in 0..width {
                        if follow[production.lhs.index()][t] && !follow[symbol.index()][t] {
                            follow[symbol.index()][t] = true;
                            changed = true;
                        }
                    }
                }
            }
        }
    }
    follow
}
