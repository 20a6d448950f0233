//! Table-driven, state-aware lexer.
//!
//! The parser asks for one token at a time, passing the terminals valid in
//! its current state. Only those terminals (plus extras) compete, so the same
//! characters can lex differently in different parse states. Every token
//! records how far past its end the lexer looked to decide it; incremental
//! reparsing relies on that bound.

use std::fmt;

use rowan::{TextRange, TextSize};

use crate::base::Symbol;
use crate::table::{Language, SymbolKind};

/// A lexed token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub symbol: Symbol,
    pub range: TextRange,
    /// Characters no rule could match, wrapped as a single token.
    pub is_error: bool,
    /// One past the furthest byte examined while lexing this token.
    pub lookahead_end: TextSize,
}

impl Token {
    pub fn is_end(&self) -> bool {
        self.symbol.is_end()
    }

    /// Bytes examined beyond the end of the token.
    pub fn lookahead_excess(&self) -> u32 {
        self.lookahead_end
            .checked_sub(self.range.end())
            .map_or(0, u32::from)
    }
}

/// Recognizes tokens the table cannot describe (indentation, heredocs, ...).
///
/// The scanner is consulted before the table's rules whenever one of the
/// language's external symbols is valid in the current state. It must be
/// pure: the same text and expected set always produce the same token.
pub trait ExternalScanner: Send + Sync + fmt::Debug {
    /// Return the recognized symbol after calling [`ScanCursor::mark_end`],
    /// or `None` to fall through to the table's rules.
    fn scan(&self, cursor: &mut ScanCursor<'_>, expected: &[Symbol]) -> Option<Symbol>;
}

/// Character cursor handed to an [`ExternalScanner`].
///
/// Every character looked at is recorded, so scanners get exact lookahead
/// tracking for free.
#[derive(Debug)]
pub struct ScanCursor<'a> {
    text: &'a str,
    start: usize,
    pos: usize,
    end: Option<usize>,
    examined: usize,
}

impl<'a> ScanCursor<'a> {
    fn new(text: &'a str, start: usize) -> Self {
        Self {
            text,
            start,
            pos: start,
            end: None,
            examined: start,
        }
    }

    /// The character at the cursor, `None` at end of input.
    pub fn lookahead(&mut self) -> Option<char> {
        let c = self.text[self.pos..].chars().next();
        let width = c.map_or(1, char::len_utf8);
        self.examined = self.examined.max(self.pos + width);
        c
    }

    /// Step over the current character.
    pub fn advance(&mut self) {
        if let Some(c) = self.lookahead() {
            self.pos += c.len_utf8();
        }
    }

    /// The token ends at the current position.
    pub fn mark_end(&mut self) {
        self.end = Some(self.pos);
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.text.len()
    }

    /// Byte offset of the cursor.
    pub fn position(&self) -> TextSize {
        TextSize::new(self.pos as u32)
    }

    /// Bytes consumed since the token started.
    pub fn consumed(&self) -> &'a str {
        &self.text[self.start..self.pos]
    }
}

/// Lexes `text` against a language's table.
#[derive(Debug, Clone, Copy)]
pub struct Lexer<'a> {
    language: &'a Language,
    text: &'a str,
}

struct Candidate {
    symbol: Symbol,
    end: usize,
    precedence: i32,
    literal: bool,
}

impl Candidate {
    /// Longest match, then precedence, then literal over pattern, then the
    /// lower symbol id.
    fn beats(&self, other: &Candidate) -> bool {
        (self.end, self.precedence, self.literal, std::cmp::Reverse(self.symbol))
            > (other.end, other.precedence, other.literal, std::cmp::Reverse(other.symbol))
    }
}

impl<'a> Lexer<'a> {
    pub fn new(language: &'a Language, text: &'a str) -> Self {
        Self { language, text }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Lex one token at `position`, preferring terminals in `expected`.
    ///
    /// Extras are always candidates. When nothing expected matches, every
    /// terminal is tried so the parser sees the real token and can recover;
    /// when nothing matches at all, an error token swallows characters until
    /// some rule matches again.
    pub fn next_token(&self, position: TextSize, expected: &[Symbol]) -> Token {
        let start = usize::from(position);
        if start >= self.text.len() {
            let at = TextSize::new(self.text.len() as u32);
            return Token {
                symbol: Symbol::END,
                range: TextRange::empty(at),
                is_error: false,
                lookahead_end: at,
            };
        }

        let mut examined = start;

        if let Some(token) = self.scan_external(start, expected, &mut examined) {
            return token;
        }

        let table = self.language.table();
        let preferred = expected
            .iter()
            .copied()
            .filter(|&s| table.symbol_kind(s) == Some(SymbolKind::Terminal))
            .chain(self.language.extras().iter().copied());
        if let Some(best) = self.longest_match(start, preferred, &mut examined) {
            return self.token(best.symbol, start, best.end, false, examined);
        }

        let all = self.all_rules();
        if let Some(best) = self.longest_match(start, all.clone(), &mut examined) {
            tracing::trace!(
                symbol = self.language.symbol_name(best.symbol),
                offset = start,
                "lexed a token the current state does not expect"
            );
            return self.token(best.symbol, start, best.end, false, examined);
        }

        // at least one character, then up to the next position any rule accepts
        let mut end = start + self.char_width(start);
        while end < self.text.len()
            && self.longest_match(end, all.clone(), &mut examined).is_none()
        {
            end += self.char_width(end);
        }
        tracing::trace!(start, end, "unrecognized characters");
        self.token(Symbol::ERROR, start, end, true, examined)
    }

    fn all_rules(&self) -> impl Iterator<Item = Symbol> + Clone + 'a {
        self.language
            .lexed_terminals()
            .iter()
            .chain(self.language.extras())
            .copied()
    }

    fn scan_external(
        &self,
        start: usize,
        expected: &[Symbol],
        examined: &mut usize,
    ) -> Option<Token> {
        let scanner = self.language.external_scanner()?;
        let table = self.language.table();
        let externals: Vec<Symbol> = expected
            .iter()
            .copied()
            .filter(|&s| table.symbol_kind(s) == Some(SymbolKind::External))
            .collect();
        if externals.is_empty() {
            return None;
        }

        let mut cursor = ScanCursor::new(self.text, start);
        let result = scanner.scan(&mut cursor, &externals);
        *examined = (*examined).max(cursor.examined);
        let symbol = result?;
        let end = cursor.end?;
        if end <= start || !externals.contains(&symbol) {
            return None;
        }
        Some(self.token(symbol, start, end, false, *examined))
    }

    fn longest_match(
        &self,
        start: usize,
        symbols: impl Iterator<Item = Symbol>,
        examined: &mut usize,
    ) -> Option<Candidate> {
        let table = self.language.table();
        let mut best: Option<Candidate> = None;
        for symbol in symbols {
            let Some(rule) = table.lex_rule(symbol) else {
                continue;
            };
            let Some(end) = rule.pattern.match_at(self.text, start, examined) else {
                continue;
            };
            if end == start {
                continue;
            }
            let candidate = Candidate {
                symbol,
                end,
                precedence: rule.precedence,
                literal: rule.pattern.is_literal(),
            };
            if best.as_ref().is_none_or(|best| candidate.beats(best)) {
                best = Some(candidate);
            }
        }
        best
    }

    fn char_width(&self, at: usize) -> usize {
        self.text[at..].chars().next().map_or(1, char::len_utf8)
    }

    fn token(
        &self,
        symbol: Symbol,
        start: usize,
        end: usize,
        is_error: bool,
        examined: usize,
    ) -> Token {
        Token {
            symbol,
            range: TextRange::new(TextSize::new(start as u32), TextSize::new(end as u32)),
            is_error,
            lookahead_end: TextSize::new(examined.max(end) as u32),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{GrammarBuilder, Pattern};

    fn language() -> Language {
        let mut g = GrammarBuilder::new("lexer-test");
        g.token("identifier", Pattern::identifier())
            .token("number", Pattern::integer())
            .literal("if")
            .literal("=")
            .literal("==")
            .extra("whitespace", Pattern::whitespace())
            .rule("stmt", &["identifier", "=", "number"])
            .rule("stmt", &["if", "identifier", "==", "number"]);
        Language::new(g.build().unwrap()).unwrap()
    }

    fn sym(language: &Language, name: &str) -> Symbol {
        language.symbol_for_name(name).unwrap()
    }

    #[test]
    fn test_longest_match_wins() {
        let language = language();
        let lexer = Lexer::new(&language, "== 1");
        let everything = [sym(&language, "="), sym(&language, "==")];
        let token = lexer.next_token(TextSize::new(0), &everything);
        assert_eq!(token.symbol, sym(&language, "=="));
        assert_eq!(token.range, TextRange::new(0.into(), 2.into()));
    }

    #[test]
    fn test_literal_beats_pattern_on_equal_length() {
        let language = language();
        let lexer = Lexer::new(&language, "if x");
        let expected = [sym(&language, "identifier"), sym(&language, "if")];
        let token = lexer.next_token(TextSize::new(0), &expected);
        assert_eq!(token.symbol, sym(&language, "if"));
    }

    #[test]
    fn test_expected_set_restricts_candidates() {
        let language = language();
        let lexer = Lexer::new(&language, "if x");
        let token = lexer.next_token(TextSize::new(0), &[sym(&language, "identifier")]);
        assert_eq!(token.symbol, sym(&language, "identifier"));
    }

    #[test]
    fn test_unexpected_token_is_still_lexed() {
        let language = language();
        let lexer = Lexer::new(&language, "42");
        let token = lexer.next_token(TextSize::new(0), &[sym(&language, "identifier")]);
        assert_eq!(token.symbol, sym(&language, "number"));
        assert!(!token.is_error);
    }

    #[test]
    fn test_error_token_runs_to_next_match() {
        let language = language();
        let lexer = Lexer::new(&language, "@#! x");
        let token = lexer.next_token(TextSize::new(0), &[]);
        assert!(token.is_error);
        assert_eq!(token.symbol, Symbol::ERROR);
        assert_eq!(token.range, TextRange::new(0.into(), 3.into()));
    }

    #[test]
    fn test_end_of_input() {
        let language = language();
        let lexer = Lexer::new(&language, "x");
        let token = lexer.next_token(TextSize::new(1), &[]);
        assert!(token.is_end());
        assert_eq!(token.range, TextRange::empty(1.into()));
        assert_eq!(token.lookahead_excess(), 0);
    }

    #[test]
    fn test_lookahead_excess_never_underflows() {
        let token = Token {
            symbol: Symbol(2),
            range: TextRange::new(2.into(), 5.into()),
            is_error: false,
            lookahead_end: TextSize::new(4),
        };
        assert_eq!(token.lookahead_excess(), 0);
        let token = Token {
            lookahead_end: TextSize::new(7),
            ..token
        };
        assert_eq!(token.lookahead_excess(), 2);
    }

    #[test]
    fn test_lookahead_covers_terminating_character() {
        let language = language();
        let lexer = Lexer::new(&language, "abc=1");
        let token = lexer.next_token(TextSize::new(0), &[sym(&language, "identifier")]);
        assert_eq!(token.range.end(), TextSize::new(3));
        assert_eq!(token.lookahead_excess(), 1);
    }

    #[derive(Debug)]
    struct Dollars;

    impl ExternalScanner for Dollars {
        fn scan(&self, cursor: &mut ScanCursor<'_>, expected: &[Symbol]) -> Option<Symbol> {
            while cursor.lookahead() == Some('$') {
                cursor.advance();
            }
            cursor.mark_end();
            (!cursor.consumed().is_empty()).then(|| expected[0])
        }
    }

    #[test]
    fn test_external_scanner_runs_first() {
        let mut g = GrammarBuilder::new("external-test");
        g.external("dollars")
            .token("identifier", Pattern::identifier())
            .rule("item", &["dollars", "identifier"]);
        let language =
            Language::with_external_scanner(g.build().unwrap(), std::sync::Arc::new(Dollars))
                .unwrap();
        let dollars = sym(&language, "dollars");
        let lexer = Lexer::new(&language, "$$$x");
        let token = lexer.next_token(TextSize::new(0), &[dollars]);
        assert_eq!(token.symbol, dollars);
        assert_eq!(token.range.end(), TextSize::new(3));
        assert_eq!(token.lookahead_end, TextSize::new(4));
    }
}
