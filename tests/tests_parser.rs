//! Parsing well-formed input: tree shape, trivia placement and the query
//! surface.

#[path = "helpers/mod.rs"]
mod helpers;

use helpers::grammars::{assignments, expressions};
use helpers::source_fixtures::*;
use helpers::{assert_lossless, nodes_named};
use rstest::rstest;
use somnium_parse::{Parser, SyntaxElementExt, TextRange, TextSize};

// =============================================================================
// Tree shape
// =============================================================================

#[rstest]
#[case(SINGLE_ASSIGNMENT, "(program (stmts (stmt (identifier) (number))))")]
#[case(
    THREE_ASSIGNMENTS,
    concat!(
        "(program (stmts (stmts (stmts (stmt (identifier) (number)))",
        " (stmt (identifier) (number))) (stmt (identifier) (number))))"
    )
)]
#[case(
    COMMENTED_ASSIGNMENTS,
    concat!(
        "(program (comment) (stmts (stmts (stmt (identifier) (number)))",
        " (comment) (stmt (identifier) (number))))"
    )
)]
#[case(PADDED_ASSIGNMENT, "(program (stmts (stmt (identifier) (number))))")]
fn test_assignment_shapes(#[case] source: &str, #[case] expected: &str) {
    let tree = Parser::new(assignments()).parse(source).unwrap();
    assert!(!tree.has_error(), "unexpected errors: {:?}", tree.syntax_errors());
    assert_eq!(tree.to_sexp(), expected);
}

#[rstest]
#[case(ARITHMETIC, "(expr (expr (number)) (expr (expr (number)) (expr (number))))")]
#[case(PARENTHESIZED, "(expr (expr (expr (expr (number)) (expr (number)))) (expr (number)))")]
#[case("8 - 4 - 2", "(expr (expr (expr (number)) (expr (number))) (expr (number)))")]
fn test_expression_precedence(#[case] source: &str, #[case] expected: &str) {
    let tree = Parser::new(expressions()).parse(source).unwrap();
    assert!(!tree.has_error());
    assert_eq!(tree.to_sexp(), expected);
}

// =============================================================================
// Lossless reconstruction
// =============================================================================

#[rstest]
#[case(SINGLE_ASSIGNMENT)]
#[case(THREE_ASSIGNMENTS)]
#[case(COMMENTED_ASSIGNMENTS)]
#[case(PADDED_ASSIGNMENT)]
#[case(MISSING_SEMICOLON)]
#[case(DOUBLED_EQUALS)]
#[case(EXTRA_NUMBERS)]
#[case(GARBAGE)]
#[case("")]
fn test_tree_reproduces_source(#[case] source: &str) {
    let tree = Parser::new(assignments()).parse(source).unwrap();
    assert_lossless(&tree, source);
}

#[test]
fn test_trivia_stays_outside_first_child() {
    let tree = Parser::new(assignments()).parse(PADDED_ASSIGNMENT).unwrap();
    let stmt = nodes_named(&tree, "stmt").remove(0);
    // leading whitespace belongs to the root, not the statement
    assert_eq!(stmt.text_range().start(), TextSize::new(4));
    let first = stmt.first_token().unwrap();
    assert_eq!(first.text(), "x");

    let root = tree.root_node();
    let last = root.last_token().unwrap();
    assert!(last.is_extra());
    assert_eq!(last.text(), "  \n");
}

#[test]
fn test_leaves_cover_every_byte_in_order() {
    let tree = Parser::new(assignments()).parse(COMMENTED_ASSIGNMENTS).unwrap();
    let mut offset = TextSize::new(0);
    for leaf in tree.leaves() {
        assert_eq!(leaf.text_range().start(), offset);
        offset = leaf.text_range().end();
    }
    assert_eq!(offset, tree.source_len());
}

// =============================================================================
// Query surface
// =============================================================================

#[test]
fn test_element_at_offset() {
    let tree = Parser::new(assignments()).parse(THREE_ASSIGNMENTS).unwrap();
    let token = tree.element_at(TextSize::new(7)).unwrap();
    assert_eq!(token.text(), "b");
    assert_eq!(tree.name_of(&token), "identifier");

    // a boundary picks the token that starts there
    let token = tree.element_at(TextSize::new(4)).unwrap();
    assert_eq!(token.text(), "1");

    assert!(tree.element_at(TextSize::new(100)).is_none());
}

#[test]
fn test_descendant_for_range() {
    let tree = Parser::new(assignments()).parse(THREE_ASSIGNMENTS).unwrap();
    let element = tree
        .descendant_for_range(TextRange::new(7.into(), 13.into()))
        .unwrap();
    assert_eq!(tree.name_of(&element), "stmt");
    assert_eq!(element.text_range(), TextRange::new(7.into(), 13.into()));

    let element = tree
        .descendant_for_range(TextRange::new(11.into(), 12.into()))
        .unwrap();
    assert_eq!(tree.name_of(&element), "number");

    assert!(tree.descendant_for_range(TextRange::new(0.into(), 99.into())).is_none());
}

#[test]
fn test_tree_records_revision_and_names() {
    let language = assignments();
    let tree = Parser::new(language.clone()).parse(SINGLE_ASSIGNMENT).unwrap();
    assert_eq!(tree.revision(), "assignments-1");
    assert!(tree.language().ptr_eq(&language));
    let root = tree.root_node();
    assert_eq!(tree.name_of(&root), "program");
    assert_eq!(tree.symbol_name(language.symbol_for_name("stmt").unwrap()), "stmt");
}

#[test]
fn test_structural_equality_ignores_sharing() {
    let parser = Parser::new(assignments());
    let a = parser.parse(THREE_ASSIGNMENTS).unwrap();
    let b = parser.parse(THREE_ASSIGNMENTS).unwrap();
    let c = parser.parse(SINGLE_ASSIGNMENT).unwrap();
    assert!(a.structurally_eq(&b));
    assert!(!a.structurally_eq(&c));
}

#[test]
fn test_display_prints_sexp() {
    let tree = Parser::new(assignments()).parse(SINGLE_ASSIGNMENT).unwrap();
    assert_eq!(tree.to_string(), tree.to_sexp());
    assert!(format!("{tree:?}").contains("assignments-1"));
}
