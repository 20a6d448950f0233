//! Language handles, the bundled grammar, the registry and call-level limits.

#[path = "helpers/mod.rs"]
mod helpers;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use helpers::assert_lossless;
use helpers::grammars::assignments;
use helpers::source_fixtures::*;
use rstest::rstest;
use somnium_parse::table::{ABI_VERSION, MIN_COMPATIBLE_ABI_VERSION};
use somnium_parse::{
    Budget, Language, LanguageError, LanguageRegistry, ParseError, Parser, ParserConfig, somnium,
    parse_many,
};

// =============================================================================
// Table loading
// =============================================================================

#[rstest]
#[case(0)]
#[case(MIN_COMPATIBLE_ABI_VERSION - 1)]
#[case(ABI_VERSION + 1)]
fn test_incompatible_table_version_is_rejected(#[case] version: u32) {
    let mut table = somnium::table().clone();
    table.abi_version = version;
    assert_eq!(
        Language::new(table).unwrap_err(),
        LanguageError::IncompatibleVersion {
            found: version,
            min: MIN_COMPATIBLE_ABI_VERSION,
            max: ABI_VERSION,
        }
    );
}

#[test]
fn test_oldest_supported_version_loads() {
    let mut table = somnium::table().clone();
    table.abi_version = MIN_COMPATIBLE_ABI_VERSION;
    assert!(Language::new(table).is_ok());
}

#[test]
fn test_truncated_action_matrix_is_rejected() {
    let mut table = somnium::table().clone();
    table.actions.pop();
    assert!(matches!(
        Language::new(table).unwrap_err(),
        LanguageError::InvalidTable(_)
    ));
}

// =============================================================================
// The somnium grammar
// =============================================================================

#[rstest]
#[case("hello", "(source_file)")]
#[case("  hello\n", "(source_file)")]
#[case("", r#"(source_file (MISSING "hello"))"#)]
#[case("goodbye", r#"(source_file (ERROR) (MISSING "hello"))"#)]
#[case("hello hello", "(source_file (ERROR))")]
fn test_somnium_parses(#[case] source: &str, #[case] expected: &str) {
    let tree = Parser::new(somnium::language().unwrap()).parse(source).unwrap();
    assert_eq!(tree.to_sexp(), expected);
    assert_eq!(tree.revision(), somnium::REVISION);
    assert_lossless(&tree, source);
}

#[test]
fn test_somnium_valid_input_has_no_errors() {
    let tree = Parser::new(somnium::language().unwrap()).parse(" hello ").unwrap();
    assert!(!tree.has_error());
    assert!(tree.syntax_errors().is_empty());
}

// =============================================================================
// Registry
// =============================================================================

#[test]
fn test_registry_resolves_languages_for_the_parser() {
    let registry = LanguageRegistry::new();
    registry.register(somnium::NAME, somnium::language().unwrap());
    registry.register("assignments", assignments());

    let language = registry.get("assignments").unwrap();
    let tree = Parser::new(language).parse(SINGLE_ASSIGNMENT).unwrap();
    assert!(!tree.has_error());
    assert_eq!(registry.names(), ["assignments", "somnium"]);
}

#[test]
fn test_registry_is_shared_across_threads() {
    let registry = Arc::new(LanguageRegistry::new());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                registry.register(format!("lang{i}"), assignments());
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(registry.len(), 4);
}

// =============================================================================
// Parallel parsing
// =============================================================================

#[test]
fn test_parse_many_keeps_order() {
    let sources = [SINGLE_ASSIGNMENT, MISSING_SEMICOLON, THREE_ASSIGNMENTS, GARBAGE];
    let results = parse_many(&assignments(), &sources, &ParserConfig::default());
    assert_eq!(results.len(), sources.len());
    for (result, source) in results.iter().zip(sources) {
        let tree = result.as_ref().unwrap();
        assert_eq!(tree.text(), source);
    }
    assert!(!results[0].as_ref().unwrap().has_error());
    assert!(results[1].as_ref().unwrap().has_error());
}

#[test]
fn test_trees_move_between_threads() {
    let parser = Parser::new(assignments());
    let tree = parser.parse(THREE_ASSIGNMENTS).unwrap();
    let text = std::thread::spawn(move || tree.text()).join().unwrap();
    assert_eq!(text, THREE_ASSIGNMENTS);
}

// =============================================================================
// Budget and cancellation
// =============================================================================

#[test]
fn test_token_budget_aborts_parse() {
    let config = ParserConfig::default().with_budget(Budget::default().with_max_tokens(2));
    let err = Parser::with_config(assignments(), config)
        .parse(SINGLE_ASSIGNMENT)
        .unwrap_err();
    assert_eq!(err, ParseError::BudgetExceeded { tokens: 3, bytes: 3 });
}

#[test]
fn test_byte_budget_aborts_parse() {
    let config = ParserConfig::default().with_budget(Budget::default().with_max_bytes(8));
    let parser = Parser::with_config(assignments(), config);
    assert!(parser.parse(SINGLE_ASSIGNMENT).is_ok());
    assert!(matches!(
        parser.parse(THREE_ASSIGNMENTS),
        Err(ParseError::BudgetExceeded { .. })
    ));
}

#[test]
fn test_budget_large_enough_is_invisible() {
    let config = ParserConfig::default().with_budget(Budget::default().with_max_tokens(1_000));
    let limited = Parser::with_config(assignments(), config)
        .parse(THREE_ASSIGNMENTS)
        .unwrap();
    let unlimited = Parser::new(assignments()).parse(THREE_ASSIGNMENTS).unwrap();
    assert!(limited.structurally_eq(&unlimited));
}

#[test]
fn test_raised_flag_cancels_parse() {
    let flag = Arc::new(AtomicBool::new(true));
    let config = ParserConfig::default().with_cancellation_flag(flag);
    let err = Parser::with_config(assignments(), config)
        .parse(SINGLE_ASSIGNMENT)
        .unwrap_err();
    assert_eq!(err, ParseError::Cancelled);
}

#[test]
fn test_lowered_flag_does_not_cancel() {
    let flag = Arc::new(AtomicBool::new(false));
    let config = ParserConfig::default().with_cancellation_flag(flag);
    assert!(Parser::with_config(assignments(), config).parse(SINGLE_ASSIGNMENT).is_ok());
}
