//! Lexical patterns stored in the grammar table.
//!
//! Patterns are PEG-style: choices are ordered and repetition is greedy and
//! possessive. Matching never backtracks into a finished repetition, which
//! keeps every decision local and lets the matcher report exactly how far
//! into the input it looked. That bound is what incremental reparsing uses to
//! decide whether an edit can change a previously lexed token.

use smol_str::SmolStr;

/// A set of characters matched by a single [`Pattern::Class`] step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharClass {
    /// Any character.
    Any,
    /// Exactly this character.
    Char(char),
    /// An inclusive character range.
    Range(char, char),
    /// ASCII digits `0-9`.
    Digit,
    /// Unicode whitespace.
    Whitespace,
    /// Characters that may start an identifier (`XID_Start` or `_`).
    IdentStart,
    /// Characters that may continue an identifier (`XID_Continue`).
    IdentContinue,
    /// Union of classes.
    Union(Vec<CharClass>),
    /// Complement of a class.
    Not(Box<CharClass>),
}

impl CharClass {
    pub fn contains(&self, c: char) -> bool {
        match self {
            Self::Any => true,
            Self::Char(x) => *x == c,
            Self::Range(lo, hi) => (*lo..=*hi).contains(&c),
            Self::Digit => c.is_ascii_digit(),
            Self::Whitespace => c.is_whitespace(),
            Self::IdentStart => c == '_' || unicode_ident::is_xid_start(c),
            Self::IdentContinue => unicode_ident::is_xid_continue(c),
            Self::Union(classes) => classes.iter().any(|class| class.contains(c)),
            Self::Not(class) => !class.contains(c),
        }
    }

    /// Characters from a string, e.g. `CharClass::any_of("+-")`.
    pub fn any_of(chars: &str) -> Self {
        Self::Union(chars.chars().map(Self::Char).collect())
    }

    pub fn negate(self) -> Self {
        Self::Not(Box::new(self))
    }
}

/// A lexical pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// An exact string.
    Literal(SmolStr),
    /// One character from a class.
    Class(CharClass),
    /// Each pattern in order.
    Seq(Vec<Pattern>),
    /// The first alternative that matches.
    Choice(Vec<Pattern>),
    /// Greedy, possessive repetition.
    Repeat {
        pattern: Box<Pattern>,
        min: u32,
        max: Option<u32>,
    },
    /// Negative lookahead: succeeds without consuming if the pattern fails.
    Not(Box<Pattern>),
}

impl Pattern {
    pub fn literal(text: impl Into<SmolStr>) -> Self {
        Self::Literal(text.into())
    }

    pub fn class(class: CharClass) -> Self {
        Self::Class(class)
    }

    pub fn seq(patterns: impl IntoIterator<Item = Pattern>) -> Self {
        Self::Seq(patterns.into_iter().collect())
    }

    pub fn choice(patterns: impl IntoIterator<Item = Pattern>) -> Self {
        Self::Choice(patterns.into_iter().collect())
    }

    pub fn zero_or_more(self) -> Self {
        self.repeat(0, None)
    }

    pub fn one_or_more(self) -> Self {
        self.repeat(1, None)
    }

    pub fn optional(self) -> Self {
        self.repeat(0, Some(1))
    }

    pub fn repeat(self, min: u32, max: Option<u32>) -> Self {
        Self::Repeat {
            pattern: Box::new(self),
            min,
            max,
        }
    }

    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    /// `[_\p{XID_Start}][\p{XID_Continue}]*`
    pub fn identifier() -> Self {
        Self::seq([
            Self::Class(CharClass::IdentStart),
            Self::Class(CharClass::IdentContinue).zero_or_more(),
        ])
    }

    /// `[0-9]+`
    pub fn integer() -> Self {
        Self::Class(CharClass::Digit).one_or_more()
    }

    /// One or more whitespace characters.
    pub fn whitespace() -> Self {
        Self::Class(CharClass::Whitespace).one_or_more()
    }

    /// `prefix` followed by everything up to (not including) the next newline.
    pub fn line_comment(prefix: &str) -> Self {
        Self::seq([
            Self::literal(prefix),
            Self::Class(CharClass::Char('\n').negate()).zero_or_more(),
        ])
    }

    /// A double-quoted string with backslash escapes.
    pub fn quoted_string() -> Self {
        let escape = Self::seq([Self::literal("\\"), Self::Class(CharClass::Any)]);
        let plain = Self::Class(CharClass::any_of("\"\\").negate());
        Self::seq([
            Self::literal("\""),
            Self::choice([escape, plain]).zero_or_more(),
            Self::literal("\""),
        ])
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// Match at byte offset `pos` of `text`.
    ///
    /// Returns the end offset of the match. `examined` is raised to one past
    /// the furthest byte the matcher inspected; inspecting the end of input
    /// counts as inspecting byte `text.len()`.
    pub fn match_at(&self, text: &str, pos: usize, examined: &mut usize) -> Option<usize> {
        match self {
            Self::Literal(lit) => {
                let lit = lit.as_bytes();
                let rest = &text.as_bytes()[pos..];
                for (i, byte) in lit.iter().enumerate() {
                    *examined = (*examined).max(pos + i + 1);
                    if rest.get(i) != Some(byte) {
                        return None;
                    }
                }
                Some(pos + lit.len())
            }
            Self::Class(class) => match text[pos..].chars().next() {
                Some(c) => {
                    *examined = (*examined).max(pos + c.len_utf8());
                    class.contains(c).then(|| pos + c.len_utf8())
                }
                None => {
                    *examined = (*examined).max(pos + 1);
                    None
                }
            },
            Self::Seq(patterns) => {
                let mut cur = pos;
                for pattern in patterns {
                    cur = pattern.match_at(text, cur, examined)?;
                }
                Some(cur)
            }
            Self::Choice(patterns) => patterns
                .iter()
                .find_map(|pattern| pattern.match_at(text, pos, examined)),
            Self::Repeat { pattern, min, max } => {
                let mut cur = pos;
                let mut count = 0u32;
                while max.is_none_or(|max| count < max) {
                    match pattern.match_at(text, cur, examined) {
                        // an empty iteration would repeat forever
                        Some(next) if next > cur => {
                            cur = next;
                            count += 1;
                        }
                        Some(_) => {
                            count = count.max(*min);
                            break;
                        }
                        None => break,
                    }
                }
                (count >= *min).then_some(cur)
            }
            Self::Not(pattern) => match pattern.match_at(text, pos, examined) {
                Some(_) => None,
                None => Some(pos),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(pattern: &Pattern, text: &str) -> (Option<usize>, usize) {
        let mut examined = 0;
        let end = pattern.match_at(text, 0, &mut examined);
        (end, examined)
    }

    #[test]
    fn test_identifier_stops_before_punctuation() {
        assert_eq!(run(&Pattern::identifier(), "abc = 1"), (Some(3), 4));
    }

    #[test]
    fn test_identifier_at_end_of_input_examines_past_end() {
        assert_eq!(run(&Pattern::identifier(), "abc"), (Some(3), 4));
    }

    #[test]
    fn test_literal_mismatch_reports_examined_prefix() {
        assert_eq!(run(&Pattern::literal("==="), "==x"), (None, 3));
        assert_eq!(run(&Pattern::literal("="), "=="), (Some(1), 1));
    }

    #[test]
    fn test_quoted_string_with_escape() {
        let text = r#""a\"b" rest"#;
        assert_eq!(run(&Pattern::quoted_string(), text).0, Some(6));
    }

    #[test]
    fn test_unterminated_string_examines_to_end() {
        let text = "\"abc";
        assert_eq!(run(&Pattern::quoted_string(), text), (None, 5));
    }

    #[test]
    fn test_optional_group_does_not_consume_on_failure() {
        // decimal: digits ('.' digits)?
        let decimal = Pattern::seq([
            Pattern::integer(),
            Pattern::seq([Pattern::literal("."), Pattern::integer()]).optional(),
        ]);
        assert_eq!(run(&decimal, "12.x"), (Some(2), 4));
        assert_eq!(run(&decimal, "12.5;"), (Some(4), 5));
    }

    #[test]
    fn test_negative_lookahead() {
        let keyword = Pattern::seq([
            Pattern::literal("if"),
            Pattern::Class(CharClass::IdentContinue).not(),
        ]);
        assert_eq!(run(&keyword, "if(").0, Some(2));
        assert_eq!(run(&keyword, "iffy").0, None);
    }

    #[test]
    fn test_repeat_bounds() {
        let two_digits = Pattern::Class(CharClass::Digit).repeat(2, Some(2));
        assert_eq!(run(&two_digits, "123").0, Some(2));
        assert_eq!(run(&two_digits, "1a").0, None);
    }

    #[test]
    fn test_unicode_identifier() {
        assert_eq!(run(&Pattern::identifier(), "größe+").0, Some("größe".len()));
    }
}
