//! Green tree construction.
//!
//! Nodes are created with [`rowan::GreenNode::new`] rather than through a
//! node cache, so two elements are the same subtree exactly when they share
//! an allocation. Flags on a node are always recomputed from its children.

use rowan::{GreenNode, GreenNodeData, GreenToken, GreenTokenData, NodeOrToken, TextSize};

use super::kind::Kind;
use crate::base::Symbol;

pub type GreenElement = NodeOrToken<GreenNode, GreenToken>;
pub type GreenElementRef<'a> = NodeOrToken<&'a GreenNodeData, &'a GreenTokenData>;

/// A lexed token of `symbol` whose lexer looked `lookahead` bytes past it.
pub fn token(symbol: Symbol, text: &str, lookahead: u32) -> GreenToken {
    GreenToken::new(Kind::new(symbol).with_lookahead(lookahead).into(), text)
}

/// Trivia (an extra) covering `text`.
pub fn extra(symbol: Symbol, text: &str, lookahead: u32) -> GreenToken {
    GreenToken::new(
        Kind::new(symbol).with_extra().with_lookahead(lookahead).into(),
        text,
    )
}

/// A zero-width token synthesized by error recovery.
pub fn missing(symbol: Symbol) -> GreenToken {
    GreenToken::new(Kind::new(symbol).with_missing().with_far_lookahead().into(), "")
}

/// Characters no lexical rule recognized.
pub fn unrecognized(text: &str) -> GreenToken {
    GreenToken::new(Kind::new(Symbol::ERROR).with_far_lookahead().into(), text)
}

/// An interior node; error and lookahead flags come from `children`.
pub fn node(symbol: Symbol, children: Vec<GreenElement>) -> GreenNode {
    let mut has_error = symbol.is_error();
    let mut lookahead = if symbol.is_error() {
        u32::from(Kind::LOOKAHEAD_FAR)
    } else {
        0
    };
    for child in &children {
        let kind = element_kind(borrow(child));
        has_error |= kind.has_error() || kind.is_missing() || kind.symbol().is_error();
        lookahead = lookahead.max(u32::from(kind.lookahead()));
    }
    let kind = Kind::new(symbol).with_error(has_error).with_lookahead(lookahead);
    GreenNode::new(kind.into(), children)
}

/// An ERROR node wrapping skipped or unparseable input.
pub fn error_node(children: Vec<GreenElement>) -> GreenNode {
    node(Symbol::ERROR, children)
}

pub fn borrow(element: &GreenElement) -> GreenElementRef<'_> {
    match element {
        NodeOrToken::Node(node) => NodeOrToken::Node(&**node),
        NodeOrToken::Token(token) => NodeOrToken::Token(&**token),
    }
}

pub fn element_kind(element: GreenElementRef<'_>) -> Kind {
    match element {
        NodeOrToken::Node(node) => node.kind().into(),
        NodeOrToken::Token(token) => token.kind().into(),
    }
}

pub fn element_len(element: GreenElementRef<'_>) -> TextSize {
    match element {
        NodeOrToken::Node(node) => node.text_len(),
        NodeOrToken::Token(token) => token.text_len(),
    }
}

pub fn to_owned(element: GreenElementRef<'_>) -> GreenElement {
    match element {
        NodeOrToken::Node(node) => NodeOrToken::Node(node.to_owned()),
        NodeOrToken::Token(token) => NodeOrToken::Token(token.to_owned()),
    }
}

/// Whether both elements are the same allocation.
pub fn same_allocation(a: GreenElementRef<'_>, b: GreenElementRef<'_>) -> bool {
    match (a, b) {
        (NodeOrToken::Node(a), NodeOrToken::Node(b)) => std::ptr::eq(a, b),
        (NodeOrToken::Token(a), NodeOrToken::Token(b)) => std::ptr::eq(a, b),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_collects_child_flags() {
        let ok = token(Symbol(2), "x", 1);
        let gap = missing(Symbol(3));
        let parent = node(
            Symbol(9),
            vec![NodeOrToken::Token(ok), NodeOrToken::Token(gap)],
        );
        let kind = Kind::from(parent.kind());
        assert!(kind.has_error());
        assert!(kind.is_far());
        assert_eq!(parent.text_len(), TextSize::new(1));
    }

    #[test]
    fn test_clean_node_has_no_error() {
        let parent = node(
            Symbol(9),
            vec![NodeOrToken::Token(token(Symbol(2), "ab", 0))],
        );
        let kind = Kind::from(parent.kind());
        assert!(!kind.has_error());
        assert_eq!(kind.lookahead(), 0);
    }

    #[test]
    fn test_error_node_is_flagged_even_when_empty() {
        let kind = Kind::from(error_node(Vec::new()).kind());
        assert!(kind.has_error());
        assert_eq!(kind.symbol(), Symbol::ERROR);
    }
}
