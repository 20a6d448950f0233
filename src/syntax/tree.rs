//! Parsed trees and the query surface hosts read them through.

use std::fmt;

use rowan::{GreenNode, NodeOrToken, TextRange, TextSize};

use super::errors::{ErrorCode, SyntaxError};
use super::green::{self, GreenElementRef};
use super::kind::{Kind, SyntaxElement, SyntaxNode, SyntaxToken};
use crate::base::Symbol;
use crate::table::Language;

/// Predicates shared by nodes, tokens and elements.
pub trait SyntaxElementExt {
    fn syntax_kind(&self) -> Kind;

    fn symbol(&self) -> Symbol {
        self.syntax_kind().symbol()
    }

    /// A zero-width token synthesized by error recovery.
    fn is_missing(&self) -> bool {
        self.syntax_kind().is_missing()
    }

    /// An ERROR node or an unrecognized-input token.
    fn is_error(&self) -> bool {
        self.symbol().is_error()
    }

    fn is_extra(&self) -> bool {
        self.syntax_kind().is_extra()
    }

    /// This element or anything below it came out of error recovery.
    fn has_error(&self) -> bool {
        let kind = self.syntax_kind();
        kind.has_error() || kind.is_missing() || kind.symbol().is_error()
    }
}

impl SyntaxElementExt for SyntaxNode {
    fn syntax_kind(&self) -> Kind {
        self.kind()
    }
}

impl SyntaxElementExt for SyntaxToken {
    fn syntax_kind(&self) -> Kind {
        self.kind()
    }
}

impl SyntaxElementExt for SyntaxElement {
    fn syntax_kind(&self) -> Kind {
        self.kind()
    }
}

/// An immutable concrete syntax tree.
///
/// Cloning is cheap, and trees produced by an incremental reparse share every
/// untouched subtree with the tree they were derived from.
#[derive(Clone)]
pub struct Tree {
    root: GreenNode,
    language: Language,
}

impl Tree {
    pub(crate) fn new(root: GreenNode, language: Language) -> Self {
        Self { root, language }
    }

    pub fn root(&self) -> &GreenNode {
        &self.root
    }

    /// Navigable view of the root, with parent and sibling links.
    pub fn root_node(&self) -> SyntaxNode {
        SyntaxNode::new_root(self.root.clone())
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    /// Revision of the grammar this tree was parsed with.
    pub fn revision(&self) -> &str {
        self.language.revision()
    }

    pub fn source_len(&self) -> TextSize {
        self.root.text_len()
    }

    /// The source, reassembled from the leaves.
    pub fn text(&self) -> String {
        self.root_node().text().to_string()
    }

    pub fn has_error(&self) -> bool {
        self.root_node().has_error()
    }

    pub fn symbol_name(&self, symbol: Symbol) -> &str {
        self.language.symbol_name(symbol)
    }

    /// Name of an element's symbol.
    pub fn name_of(&self, element: &impl SyntaxElementExt) -> &str {
        self.symbol_name(element.symbol())
    }

    /// The leaf covering `offset` (the one starting there, at a boundary).
    pub fn element_at(&self, offset: TextSize) -> Option<SyntaxToken> {
        if offset > self.source_len() {
            return None;
        }
        self.root_node().token_at_offset(offset).right_biased()
    }

    /// The smallest node or token covering `range`.
    pub fn descendant_for_range(&self, range: TextRange) -> Option<SyntaxElement> {
        let root = self.root_node();
        root.text_range()
            .contains_range(range)
            .then(|| root.covering_element(range))
    }

    /// All leaves in source order, trivia and missing tokens included.
    pub fn leaves(&self) -> impl Iterator<Item = SyntaxToken> {
        self.root_node()
            .descendants_with_tokens()
            .filter_map(NodeOrToken::into_token)
    }

    /// Diagnostics for every ERROR node, unrecognized token and missing
    /// token, in source order.
    pub fn syntax_errors(&self) -> Vec<SyntaxError> {
        let mut errors = Vec::new();
        self.collect_errors(&NodeOrToken::Node(self.root_node()), &mut errors);
        errors
    }

    fn collect_errors(&self, element: &SyntaxElement, errors: &mut Vec<SyntaxError>) {
        match element {
            NodeOrToken::Node(node) if node.is_error() => {
                let first = node
                    .descendants_with_tokens()
                    .filter_map(NodeOrToken::into_token)
                    .find(|token| !token.is_extra() && !token.text().is_empty());
                let error = match first {
                    Some(token) if token.is_error() => SyntaxError::new(
                        format!("unrecognized input `{}`", token.text()),
                        node.text_range(),
                        ErrorCode::E0101,
                    ),
                    Some(token) => SyntaxError::new(
                        format!("unexpected `{}`", token.text()),
                        node.text_range(),
                        ErrorCode::E0301,
                    ),
                    None => SyntaxError::new(
                        ErrorCode::E0301.default_message(),
                        node.text_range(),
                        ErrorCode::E0301,
                    ),
                };
                errors.push(error);
            }
            NodeOrToken::Node(node) => {
                if node.has_error() {
                    for child in node.children_with_tokens() {
                        self.collect_errors(&child, errors);
                    }
                }
            }
            NodeOrToken::Token(token) if token.is_missing() => {
                let name = self.display_name(token.symbol());
                errors.push(
                    SyntaxError::at_offset(
                        format!("missing {name}"),
                        token.text_range().start(),
                        ErrorCode::E0201,
                    )
                    .with_hint(format!("insert {name}")),
                );
            }
            NodeOrToken::Token(token) if token.is_error() => {
                errors.push(SyntaxError::new(
                    format!("unrecognized input `{}`", token.text()),
                    token.text_range(),
                    ErrorCode::E0101,
                ));
            }
            NodeOrToken::Token(_) => {}
        }
    }

    fn display_name(&self, symbol: Symbol) -> String {
        let name = self.symbol_name(symbol);
        if self.language.is_named(symbol) {
            name.to_string()
        } else {
            format!("`{name}`")
        }
    }

    /// S-expression of the named structure, e.g.
    /// `(program (stmt (identifier) (number) (MISSING ";")))`.
    pub fn to_sexp(&self) -> String {
        self.sexp(&NodeOrToken::Node(self.root_node()))
            .unwrap_or_default()
    }

    fn sexp(&self, element: &SyntaxElement) -> Option<String> {
        let symbol = element.symbol();
        let name = self.symbol_name(symbol);
        let named = self.language.is_named(symbol);
        match element {
            NodeOrToken::Token(token) if token.is_missing() => Some(if named {
                format!("(MISSING {name})")
            } else {
                format!("(MISSING {name:?})")
            }),
            // unrecognized input only shows through its enclosing ERROR node
            NodeOrToken::Token(token) if token.is_error() => None,
            NodeOrToken::Token(_) => named.then(|| format!("({name})")),
            NodeOrToken::Node(node) => {
                let children: Vec<String> = node
                    .children_with_tokens()
                    .filter_map(|child| self.sexp(&child))
                    .collect();
                if named {
                    let mut out = format!("({name}");
                    for child in &children {
                        out.push(' ');
                        out.push_str(child);
                    }
                    out.push(')');
                    Some(out)
                } else if children.is_empty() {
                    None
                } else {
                    Some(children.join(" "))
                }
            }
        }
    }

    /// Same symbols, flags, shape and text, regardless of node sharing.
    pub fn structurally_eq(&self, other: &Tree) -> bool {
        green_eq(
            NodeOrToken::Node(&*self.root),
            NodeOrToken::Node(&*other.root),
        )
    }
}

fn green_eq(a: GreenElementRef<'_>, b: GreenElementRef<'_>) -> bool {
    if !green::element_kind(a).same_shape(green::element_kind(b)) {
        return false;
    }
    match (a, b) {
        (NodeOrToken::Token(a), NodeOrToken::Token(b)) => a.text() == b.text(),
        (NodeOrToken::Node(a), NodeOrToken::Node(b)) => {
            a.children().len() == b.children().len()
                && a.children().zip(b.children()).all(|(a, b)| green_eq(a, b))
        }
        _ => false,
    }
}

impl fmt::Debug for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("revision", &self.revision())
            .field("source_len", &self.source_len())
            .field("root", &self.to_sexp())
            .finish()
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sexp())
    }
}
