//! Grammars compiled with the builder for integration tests.

use somnium_parse::table::Assoc;
use somnium_parse::{GrammarBuilder, Language, Pattern};

/// ```text
/// program := stmts
/// stmts   := stmts stmt | stmt
/// stmt    := identifier "=" number ";"
/// ```
///
/// Whitespace and `#` line comments are extras; `;` synchronizes recovery.
pub fn assignments() -> Language {
    let mut g = GrammarBuilder::new("assignments-1");
    g.token("identifier", Pattern::identifier())
        .token("number", Pattern::integer())
        .literal("=")
        .literal(";")
        .extra("whitespace", Pattern::whitespace())
        .named_extra("comment", Pattern::line_comment("#"))
        .rule("program", &["stmts"])
        .rule("stmts", &["stmts", "stmt"])
        .rule("stmts", &["stmt"])
        .rule("stmt", &["identifier", "=", "number", ";"])
        .sync(";");
    Language::new(g.build().expect("assignment grammar builds")).expect("assignment table loads")
}

/// Arithmetic with the usual precedence, parentheses synchronizing.
pub fn expressions() -> Language {
    let mut g = GrammarBuilder::new("expressions-1");
    g.token("number", Pattern::integer())
        .literal("+")
        .literal("-")
        .literal("*")
        .literal("/")
        .literal("(")
        .literal(")")
        .extra("whitespace", Pattern::whitespace())
        .precedence(Assoc::Left, &["+", "-"])
        .precedence(Assoc::Left, &["*", "/"])
        .rule("expr", &["expr", "+", "expr"])
        .rule("expr", &["expr", "-", "expr"])
        .rule("expr", &["expr", "*", "expr"])
        .rule("expr", &["expr", "/", "expr"])
        .rule("expr", &["(", "expr", ")"])
        .rule("expr", &["number"])
        .sync(")");
    Language::new(g.build().expect("expression grammar builds")).expect("expression table loads")
}
