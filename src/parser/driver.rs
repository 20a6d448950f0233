//! The shift-reduce loop.

use rowan::{GreenNode, GreenToken, NodeOrToken, TextSize};
use tracing::{trace, warn};

use super::reparse::Reuse;
use super::stack::ParseStack;
use crate::base::{RuleId, StateId, Symbol};
use crate::config::ParserConfig;
use crate::error::{LanguageError, ParseError};
use crate::lexer::{Lexer, Token};
use crate::syntax::green::{self, GreenElement};
use crate::table::{Action, Language};

/// The next real token and the trivia lexed in front of it.
#[derive(Debug, Clone)]
pub(crate) struct Lookahead {
    pub token: Token,
    pub trivia: Vec<Token>,
}

pub(crate) enum Recovered {
    Continue(Lookahead),
    Finished(GreenNode),
}

/// State of one parse call.
pub(crate) struct ParseRun<'a> {
    pub(super) language: &'a Language,
    pub(super) config: &'a ParserConfig,
    pub(super) lexer: Lexer<'a>,
    pub(super) text: &'a str,
    pub(super) stack: ParseStack,
    position: TextSize,
    tokens: u64,
    bytes: u64,
    /// Token position where the stack was last unwound for recovery.
    pub(super) last_unwind: Option<TextSize>,
    pub(super) reuse: Option<Reuse<'a>>,
}

impl<'a> ParseRun<'a> {
    pub fn new(
        language: &'a Language,
        config: &'a ParserConfig,
        text: &'a str,
        stack: ParseStack,
        position: TextSize,
    ) -> Self {
        Self {
            language,
            config,
            lexer: Lexer::new(language, text),
            text,
            stack,
            position,
            tokens: 0,
            bytes: 0,
            last_unwind: None,
            reuse: None,
        }
    }

    pub fn with_reuse(mut self, reuse: Reuse<'a>) -> Self {
        self.reuse = Some(reuse);
        self
    }

    pub fn tokens_lexed(&self) -> u64 {
        self.tokens
    }

    pub fn run(&mut self) -> Result<GreenNode, ParseError> {
        let mut lookahead = self.lex(self.stack.state())?;
        loop {
            let state = self.stack.state();
            match self.language.action(state, lookahead.token.symbol) {
                Action::Shift(next) => {
                    if let Some(root) = self.shift(next, lookahead)? {
                        return Ok(root);
                    }
                    lookahead = self.lex(next)?;
                }
                Action::Reduce(rule) => self.reduce(rule)?,
                Action::Accept => {
                    self.push_trivia(&lookahead.trivia);
                    return Ok(self.finish());
                }
                Action::Error | Action::Goto(_) => match self.recover(lookahead)? {
                    Recovered::Continue(next) => lookahead = next,
                    Recovered::Finished(root) => return Ok(root),
                },
            }
        }
    }

    /// Lex the next real token in `state`, collecting trivia in front of it.
    pub(super) fn lex(&mut self, state: StateId) -> Result<Lookahead, ParseError> {
        let expected = self.language.expected_symbols(state);
        let mut trivia = Vec::new();
        loop {
            if self.config.is_cancelled() {
                return Err(ParseError::Cancelled);
            }
            let token = self.lexer.next_token(self.position, expected);
            self.position = token.range.end();
            if !token.is_end() {
                self.tokens += 1;
                self.bytes += u64::from(u32::from(token.range.len()));
                if self.config.budget.exceeded(self.tokens, self.bytes) {
                    warn!(
                        tokens = self.tokens,
                        bytes = self.bytes,
                        "operation budget exceeded, abandoning parse"
                    );
                    return Err(ParseError::BudgetExceeded {
                        tokens: self.tokens,
                        bytes: self.bytes,
                    });
                }
            }
            if !token.is_error && self.language.is_extra(token.symbol) {
                trivia.push(token);
                continue;
            }
            return Ok(Lookahead { token, trivia });
        }
    }

    /// Green leaf for a lexed token.
    pub(super) fn leaf(&self, token: &Token) -> GreenToken {
        let text = &self.text[token.range];
        if token.is_error {
            green::unrecognized(text)
        } else if self.language.is_extra(token.symbol) {
            green::extra(token.symbol, text, token.lookahead_excess())
        } else {
            green::token(token.symbol, text, token.lookahead_excess())
        }
    }

    pub(super) fn push_trivia(&mut self, trivia: &[Token]) {
        for token in trivia {
            let leaf = self.leaf(token);
            self.stack.push_transparent(NodeOrToken::Token(leaf));
        }
    }

    /// Returns the finished tree when the token rejoins the previous tree.
    fn shift(
        &mut self,
        next: StateId,
        lookahead: Lookahead,
    ) -> Result<Option<GreenNode>, ParseError> {
        self.push_trivia(&lookahead.trivia);
        if let Some(root) = self.try_rejoin(&lookahead.token) {
            return Ok(Some(root));
        }
        trace!(
            symbol = self.language.symbol_name(lookahead.token.symbol),
            state = next.0,
            "shift"
        );
        let leaf = self.leaf(&lookahead.token);
        self.stack.push_token(next, leaf);
        Ok(None)
    }

    pub(super) fn reduce(&mut self, rule_id: RuleId) -> Result<(), ParseError> {
        let table = self.language.table();
        let rule = table
            .rule(rule_id)
            .ok_or_else(|| LanguageError::invalid(format!("unknown rule {}", rule_id.0)))?;
        let children = self.stack.pop_children(usize::from(rule.len)).ok_or_else(|| {
            LanguageError::invalid(format!(
                "rule {} pops {} entries from a shorter stack",
                rule_id.0, rule.len
            ))
        })?;
        let node = green::node(rule.lhs, children);
        let below = self.stack.state();
        let next = table.goto(below, rule.lhs).ok_or_else(|| {
            LanguageError::invalid(format!("no goto from state {} on {}", below.0, rule.lhs))
        })?;
        trace!(
            lhs = self.language.symbol_name(rule.lhs),
            rule = rule_id.0,
            state = next.0,
            "reduce"
        );
        self.stack.push(next, NodeOrToken::Node(node));
        Ok(())
    }

    /// Build the root after acceptance: the start node's children joined by
    /// the trivia and ERROR entries around it.
    fn finish(&mut self) -> GreenNode {
        let entries =
            std::mem::replace(&mut self.stack, ParseStack::new(StateId(0))).into_entries();
        let mut real = entries.iter().enumerate().filter(|(_, entry)| !entry.transparent);
        let start = match (real.next(), real.next()) {
            (Some((index, entry)), None) => match &entry.element {
                NodeOrToken::Node(node) => Some((index, node.clone())),
                NodeOrToken::Token(_) => None,
            },
            _ => None,
        };
        let Some((index, start)) = start else {
            return green::error_node(entries.into_iter().map(|entry| entry.element).collect());
        };

        let mut children: Vec<GreenElement> =
            Vec::with_capacity(entries.len() + start.children().len());
        for (i, entry) in entries.into_iter().enumerate() {
            if i == index {
                children.extend(start.children().map(green::to_owned));
            } else {
                children.push(entry.element);
            }
        }
        let symbol = green::element_kind(NodeOrToken::Node(&*start)).symbol();
        green::node(symbol, children)
    }

    /// Wrap whatever the stack holds into an ERROR root.
    pub(super) fn finish_with_error(&mut self) -> GreenNode {
        let entries =
            std::mem::replace(&mut self.stack, ParseStack::new(StateId(0))).into_entries();
        green::error_node(entries.into_iter().map(|entry| entry.element).collect())
    }

    pub(super) fn is_sync(&self, symbol: Symbol) -> bool {
        self.language.table().is_sync(symbol)
    }
}
