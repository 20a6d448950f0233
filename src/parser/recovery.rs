//! Error recovery.
//!
//! When the table has no action for the lookahead, the parser tries, in
//! order:
//!
//! 1. deleting the lookahead, if the next few tokens then parse;
//! 2. inserting a zero-width missing token, if the lookahead and the tokens
//!    after it then parse (at end of input, a short run of insertions that
//!    completes the tree);
//! 3. popping back to a state that accepts the lookahead, or skipping input
//!    through the next synchronizing token, wrapping what was popped and
//!    skipped in an ERROR node.
//!
//! Every decision is a function of automaton states and lexed tokens alone,
//! never of the subtrees on the stack. That keeps recovery identical between
//! a full parse and an incremental one that reuses subtrees.
//!
//! Each step either consumes a token, provably lets the lookahead shift, or
//! pops the stack at a token position for the first time, so recovery always
//! terminates.

use std::collections::VecDeque;

use rowan::{NodeOrToken, TextSize};
use tracing::debug;

use super::driver::{Lookahead, ParseRun, Recovered};
use crate::base::{StateId, Symbol};
use crate::error::{LanguageError, ParseError};
use crate::lexer::Token;
use crate::syntax::green::{self, GreenElement};
use crate::table::Action;

/// Bound on automaton configurations explored when completing a tree at end
/// of input.
const MAX_EOF_SEARCH: usize = 4096;

/// Result of feeding one symbol to a simulated automaton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Shifted,
    Accepted,
    Failed,
}

impl ParseRun<'_> {
    pub(super) fn recover(&mut self, lookahead: Lookahead) -> Result<Recovered, ParseError> {
        let state = self.stack.state();
        debug!(
            state = state.0,
            symbol = self.language.symbol_name(lookahead.token.symbol),
            offset = u32::from(lookahead.token.range.start()),
            "syntax error"
        );

        if self.deletion_succeeds(&lookahead) {
            debug!(offset = u32::from(lookahead.token.range.start()), "deleting unexpected token");
            self.push_trivia(&lookahead.trivia);
            let element = self.deleted(&lookahead.token);
            self.stack.push_transparent(element);
            return Ok(Recovered::Continue(self.lex(state)?));
        }

        if lookahead.token.is_end() {
            if let Some(symbols) = self.completion_at_end() {
                for symbol in symbols {
                    self.insert_missing(symbol)?;
                }
                return Ok(Recovered::Continue(lookahead));
            }
        } else if let Some(symbol) = self.insertion_candidate(&lookahead) {
            self.insert_missing(symbol)?;
            return Ok(Recovered::Continue(lookahead));
        }

        if self.unwind(&lookahead) {
            return Ok(Recovered::Continue(lookahead));
        }

        self.skip_to_sync(lookahead)
    }

    fn deletion_succeeds(&self, lookahead: &Lookahead) -> bool {
        !lookahead.token.is_end()
            && self.accepts_ahead(
                self.stack.states(),
                lookahead.token.range.end(),
                self.config.recovery.deletion_window,
            )
    }

    /// The first expected terminal whose insertion lets the lookahead and the
    /// tokens after it parse.
    fn insertion_candidate(&self, lookahead: &Lookahead) -> Option<Symbol> {
        let states = self.stack.states();
        let window = self.config.recovery.insertion_window.max(1);
        self.language
            .expected_symbols(self.stack.state())
            .iter()
            .copied()
            .filter(|symbol| !symbol.is_end())
            .find(|&symbol| {
                let mut simulated = states.clone();
                if self.step(&mut simulated, symbol) != Step::Shifted {
                    return false;
                }
                match self.step(&mut simulated, lookahead.token.symbol) {
                    Step::Accepted => true,
                    Step::Failed => false,
                    Step::Shifted => {
                        self.accepts_ahead(simulated, lookahead.token.range.end(), window - 1)
                    }
                }
            })
    }

    /// Shortest run of insertions (ascending symbols first) after which the
    /// input can end.
    fn completion_at_end(&self) -> Option<Vec<Symbol>> {
        let max_len = self.config.recovery.max_eof_insertions;
        let mut queue = VecDeque::from([(self.stack.states(), Vec::new())]);
        let mut explored = 0;
        while let Some((states, inserted)) = queue.pop_front() {
            if inserted.len() >= max_len {
                continue;
            }
            let top = *states.last()?;
            for &symbol in self.language.expected_symbols(top) {
                if symbol.is_end() {
                    continue;
                }
                explored += 1;
                if explored > MAX_EOF_SEARCH {
                    return None;
                }
                let mut next = states.clone();
                if self.step(&mut next, symbol) != Step::Shifted {
                    continue;
                }
                let mut run = inserted.clone();
                run.push(symbol);
                if self.step(&mut next.clone(), Symbol::END) == Step::Accepted {
                    debug!(count = run.len(), "completing tree with missing tokens");
                    return Some(run);
                }
                queue.push_back((next, run));
            }
        }
        None
    }

    /// Pop back to the nearest deeper state that accepts the lookahead. Only
    /// once per token position.
    fn unwind(&mut self, lookahead: &Lookahead) -> bool {
        let at = lookahead.token.range.start();
        if self.last_unwind == Some(at) {
            return false;
        }
        let symbol = lookahead.token.symbol;
        let Some(len) = self
            .stack
            .pop_points()
            .find(|&len| !self.language.action(self.stack.state_at(len), symbol).is_error())
        else {
            return false;
        };
        self.last_unwind = Some(at);
        let popped = self.stack.truncate(len);
        debug!(popped = popped.len(), offset = u32::from(at), "unwinding to an accepting state");
        let children = popped.into_iter().map(|entry| entry.element).collect();
        self.stack
            .push_transparent(NodeOrToken::Node(green::error_node(children)));
        true
    }

    /// Skip tokens through the next synchronizing token, then pop back to the
    /// nearest state accepting what follows.
    fn skip_to_sync(&mut self, lookahead: Lookahead) -> Result<Recovered, ParseError> {
        if lookahead.token.is_end() {
            return Ok(self.give_up(lookahead));
        }

        let state = self.stack.state();
        let mut skipped: Vec<GreenElement> = Vec::new();
        let mut count = 0;
        let mut current = lookahead;
        loop {
            let was_sync = self.is_sync(current.token.symbol);
            self.skip(&current, &mut skipped);
            count += 1;
            current = self.lex(state)?;
            let limit_reached = self
                .config
                .recovery
                .max_skipped_tokens
                .is_some_and(|max| count >= max);
            if was_sync || current.token.is_end() || limit_reached {
                break;
            }
        }
        debug!(skipped = count, "skipped input while resynchronizing");

        let symbol = current.token.symbol;
        let target = std::iter::once(self.stack.len())
            .chain(self.stack.pop_points())
            .find(|&len| !self.language.action(self.stack.state_at(len), symbol).is_error());

        match target {
            Some(len) => {
                let mut children: Vec<GreenElement> = self
                    .stack
                    .truncate(len)
                    .into_iter()
                    .map(|entry| entry.element)
                    .collect();
                children.extend(skipped);
                self.stack
                    .push_transparent(NodeOrToken::Node(green::error_node(children)));
                Ok(Recovered::Continue(current))
            }
            None => {
                self.stack
                    .push_transparent(NodeOrToken::Node(green::error_node(skipped)));
                if !current.token.is_end() {
                    return Ok(Recovered::Continue(current));
                }
                if let Some(symbols) = self.completion_at_end() {
                    for symbol in symbols {
                        self.insert_missing(symbol)?;
                    }
                    return Ok(Recovered::Continue(current));
                }
                Ok(self.give_up(current))
            }
        }
    }

    /// Nothing accepts the end of input: the whole stack becomes an ERROR root.
    fn give_up(&mut self, end: Lookahead) -> Recovered {
        debug!("no recovery at end of input, wrapping the stack in an ERROR root");
        self.push_trivia(&end.trivia);
        Recovered::Finished(self.finish_with_error())
    }

    fn skip(&self, lookahead: &Lookahead, skipped: &mut Vec<GreenElement>) {
        for trivia in &lookahead.trivia {
            skipped.push(NodeOrToken::Token(self.leaf(trivia)));
        }
        skipped.push(NodeOrToken::Token(self.leaf(&lookahead.token)));
    }

    /// Element recording a deleted token.
    fn deleted(&self, token: &Token) -> GreenElement {
        let leaf = NodeOrToken::Token(self.leaf(token));
        NodeOrToken::Node(green::error_node(vec![leaf]))
    }

    /// Reduce as the table dictates for `symbol`, then push it as missing.
    fn insert_missing(&mut self, symbol: Symbol) -> Result<(), ParseError> {
        loop {
            match self.language.action(self.stack.state(), symbol) {
                Action::Reduce(rule) => self.reduce(rule)?,
                Action::Shift(next) => {
                    debug!(symbol = self.language.symbol_name(symbol), "inserting missing token");
                    self.stack.push_token(next, green::missing(symbol));
                    return Ok(());
                }
                action => {
                    return Err(LanguageError::invalid(format!(
                        "cannot insert {symbol} in state {}: {action:?}",
                        self.stack.state().0
                    ))
                    .into());
                }
            }
        }
    }

    /// Feed `count` tokens starting at `position` to a simulated automaton.
    fn accepts_ahead(
        &self,
        mut states: Vec<StateId>,
        mut position: TextSize,
        count: usize,
    ) -> bool {
        for _ in 0..count {
            let Some(&top) = states.last() else {
                return false;
            };
            let token = self.peek(top, position);
            match self.step(&mut states, token.symbol) {
                Step::Accepted => return true,
                Step::Failed => return false,
                Step::Shifted => position = token.range.end(),
            }
        }
        true
    }

    /// Lex without committing: trivia is skipped, nothing is counted.
    fn peek(&self, state: StateId, mut position: TextSize) -> Token {
        let expected = self.language.expected_symbols(state);
        loop {
            let token = self.lexer.next_token(position, expected);
            if token.is_error || !self.language.is_extra(token.symbol) {
                return token;
            }
            position = token.range.end();
        }
    }

    /// Apply reductions and then shift or accept `symbol` on a stack of
    /// states.
    fn step(&self, states: &mut Vec<StateId>, symbol: Symbol) -> Step {
        let table = self.language.table();
        loop {
            let Some(&top) = states.last() else {
                return Step::Failed;
            };
            match table.action(top, symbol) {
                Action::Shift(next) => {
                    states.push(next);
                    return Step::Shifted;
                }
                Action::Reduce(rule) => {
                    let Some(rule) = table.rule(rule) else {
                        return Step::Failed;
                    };
                    let len = usize::from(rule.len);
                    if len >= states.len() {
                        return Step::Failed;
                    }
                    states.truncate(states.len() - len);
                    let next = states.last().and_then(|&below| table.goto(below, rule.lhs));
                    let Some(next) = next else {
                        return Step::Failed;
                    };
                    states.push(next);
                }
                Action::Accept => return Step::Accepted,
                Action::Error | Action::Goto(_) => return Step::Failed,
            }
        }
    }
}
