//! Rowan kind encoding.
//!
//! A rowan kind is a `u16`. The low 11 bits carry the grammar [`Symbol`];
//! the high bits carry per-node metadata that would otherwise need a side
//! table:
//!
//! ```text
//! 15      13 12      11        10 ........ 0
//! EXTRA | LOOKAHEAD | HAS_ERROR | MISSING | symbol
//! ```
//!
//! `LOOKAHEAD` is how many bytes past its end the lexer examined to decide a
//! token (0..=2 exactly, 3 for "far"). Nodes carry the maximum of their
//! children.

use std::fmt;

use crate::base::Symbol;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Kind(u16);

impl Kind {
    const SYMBOL_MASK: u16 = (1 << 11) - 1;
    const MISSING: u16 = 1 << 11;
    const HAS_ERROR: u16 = 1 << 12;
    const LOOKAHEAD_SHIFT: u16 = 13;
    const LOOKAHEAD_MASK: u16 = 0b11 << Self::LOOKAHEAD_SHIFT;
    const EXTRA: u16 = 1 << 15;

    /// Lookahead value meaning "examined an unknown distance ahead".
    pub const LOOKAHEAD_FAR: u8 = 3;

    pub const fn new(symbol: Symbol) -> Self {
        Self(symbol.0 & Self::SYMBOL_MASK)
    }

    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u16 {
        self.0
    }

    pub const fn symbol(self) -> Symbol {
        Symbol(self.0 & Self::SYMBOL_MASK)
    }

    pub const fn is_missing(self) -> bool {
        self.0 & Self::MISSING != 0
    }

    pub const fn has_error(self) -> bool {
        self.0 & Self::HAS_ERROR != 0
    }

    pub const fn is_extra(self) -> bool {
        self.0 & Self::EXTRA != 0
    }

    pub const fn lookahead(self) -> u8 {
        ((self.0 & Self::LOOKAHEAD_MASK) >> Self::LOOKAHEAD_SHIFT) as u8
    }

    pub const fn is_far(self) -> bool {
        self.lookahead() == Self::LOOKAHEAD_FAR
    }

    pub const fn with_missing(self) -> Self {
        Self(self.0 | Self::MISSING)
    }

    pub const fn with_error(self, has_error: bool) -> Self {
        if has_error {
            Self(self.0 | Self::HAS_ERROR)
        } else {
            Self(self.0 & !Self::HAS_ERROR)
        }
    }

    pub const fn with_extra(self) -> Self {
        Self(self.0 | Self::EXTRA)
    }

    /// Saturates at [`Kind::LOOKAHEAD_FAR`].
    pub fn with_lookahead(self, excess: u32) -> Self {
        let value = excess.min(u32::from(Self::LOOKAHEAD_FAR)) as u16;
        Self((self.0 & !Self::LOOKAHEAD_MASK) | (value << Self::LOOKAHEAD_SHIFT))
    }

    pub fn with_far_lookahead(self) -> Self {
        self.with_lookahead(u32::from(Self::LOOKAHEAD_FAR))
    }

    /// Same node shape, ignoring lexer bookkeeping.
    pub const fn same_shape(self, other: Kind) -> bool {
        (self.0 & !Self::LOOKAHEAD_MASK) == (other.0 & !Self::LOOKAHEAD_MASK)
    }
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kind({}", self.symbol())?;
        if self.is_missing() {
            f.write_str(" missing")?;
        }
        if self.has_error() {
            f.write_str(" error")?;
        }
        if self.is_extra() {
            f.write_str(" extra")?;
        }
        write!(f, " la={})", self.lookahead())
    }
}

impl From<Kind> for rowan::SyntaxKind {
    fn from(kind: Kind) -> Self {
        Self(kind.0)
    }
}

impl From<rowan::SyntaxKind> for Kind {
    fn from(raw: rowan::SyntaxKind) -> Self {
        Self(raw.0)
    }
}

/// Rowan language tag for trees built by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SomniumLanguage {}

impl rowan::Language for SomniumLanguage {
    type Kind = Kind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        raw.into()
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind.into()
    }
}

pub type SyntaxNode = rowan::SyntaxNode<SomniumLanguage>;
pub type SyntaxToken = rowan::SyntaxToken<SomniumLanguage>;
pub type SyntaxElement = rowan::SyntaxElement<SomniumLanguage>;
pub type SyntaxNodeChildren = rowan::SyntaxNodeChildren<SomniumLanguage>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_flags_do_not_disturb_symbol() {
        let kind = Kind::new(Symbol(2047))
            .with_missing()
            .with_error(true)
            .with_extra()
            .with_lookahead(2);
        assert_eq!(kind.symbol(), Symbol(2047));
        assert!(kind.is_missing());
        assert!(kind.has_error());
        assert!(kind.is_extra());
        assert_eq!(kind.lookahead(), 2);
    }

    #[rstest]
    #[case(0, 0)]
    #[case(1, 1)]
    #[case(2, 2)]
    #[case(3, 3)]
    #[case(40, 3)]
    fn test_lookahead_saturates(#[case] excess: u32, #[case] stored: u8) {
        let kind = Kind::new(Symbol(5)).with_lookahead(excess);
        assert_eq!(kind.lookahead(), stored);
        assert_eq!(kind.is_far(), stored == Kind::LOOKAHEAD_FAR);
    }

    #[test]
    fn test_error_flag_can_be_cleared() {
        let kind = Kind::new(Symbol(9)).with_error(true).with_error(false);
        assert!(!kind.has_error());
    }

    #[test]
    fn test_same_shape_ignores_lookahead() {
        let a = Kind::new(Symbol(4)).with_lookahead(1);
        let b = Kind::new(Symbol(4)).with_lookahead(3);
        assert!(a.same_shape(b));
        assert!(!a.same_shape(b.with_extra()));
    }

    #[test]
    fn test_raw_roundtrip_through_rowan() {
        let kind = Kind::new(Symbol(17)).with_extra();
        let raw: rowan::SyntaxKind = kind.into();
        assert_eq!(Kind::from(raw), kind);
    }
}
