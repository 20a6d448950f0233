//! Shared fixtures for the integration tests.

#![allow(dead_code)]

pub mod grammars;
pub mod source_fixtures;

use somnium_parse::syntax::SyntaxNode;
use somnium_parse::{SyntaxElementExt, Tree};

/// Every node named `name`, in source order.
pub fn nodes_named(tree: &Tree, name: &str) -> Vec<SyntaxNode> {
    tree.root_node()
        .descendants()
        .filter(|node| tree.name_of(node) == name)
        .collect()
}

/// Assert that the tree reproduces its source and spans all of it.
pub fn assert_lossless(tree: &Tree, source: &str) {
    assert_eq!(tree.text(), source, "tree text differs from source");
    assert_eq!(usize::from(tree.source_len()), source.len());
    assert_eq!(
        tree.root_node().text_range(),
        somnium_parse::TextRange::up_to(tree.source_len())
    );
}

/// The number of ERROR nodes and missing tokens in the tree.
pub fn error_count(tree: &Tree) -> usize {
    tree.root_node()
        .descendants_with_tokens()
        .filter(|element| {
            element.is_missing() || (element.is_error() && element.as_node().is_some())
        })
        .count()
}
