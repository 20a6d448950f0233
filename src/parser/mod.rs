//! Table-driven LR parser with error recovery and incremental reparsing.
//!
//! ## Architecture
//!
//! ```text
//! Source text
//!     ↓
//! Lexer (state-aware, expected terminals) → Token
//!     ↓
//! ParseRun: shift / reduce over the ParseTable, ParseStack of green subtrees
//!     ↓  (no action)
//! Recovery: delete → insert → unwind / skip to sync
//!     ↓
//! GreenNode root → Tree
//! ```
//!
//! ## Incremental reparsing
//!
//! When text changes, we:
//! 1. Find the last leaf whose lexing stayed clear of the edit
//! 2. Replay the LR stack up to it from the old tree
//! 3. Parse forward until a token lines up with the old tree again, then take
//!    the rest of the old tree by reference

mod driver;
mod recovery;
mod reparse;
mod stack;

use rayon::prelude::*;
use rowan::TextSize;
use tracing::debug;

use self::driver::ParseRun;
use self::stack::ParseStack;
use crate::config::ParserConfig;
use crate::error::ParseError;
use crate::syntax::{Edit, Tree};
use crate::table::Language;

/// A language handle plus the settings parses run with.
///
/// Cheap to clone; holds no per-parse state, so one parser can serve many
/// threads at once.
#[derive(Debug, Clone)]
pub struct Parser {
    language: Language,
    config: ParserConfig,
}

impl Parser {
    pub fn new(language: Language) -> Self {
        Self::with_config(language, ParserConfig::default())
    }

    pub fn with_config(language: Language, config: ParserConfig) -> Self {
        Self { language, config }
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse a complete source text.
    ///
    /// Syntax errors never fail the call: they end up as ERROR nodes and
    /// missing tokens in the returned tree. Only an exhausted budget,
    /// cancellation or an oversized source return `Err`.
    pub fn parse(&self, text: &str) -> Result<Tree, ParseError> {
        check_len(text)?;
        let start = self.language.table().start_state;
        let mut run = ParseRun::new(
            &self.language,
            &self.config,
            text,
            ParseStack::new(start),
            TextSize::new(0),
        );
        let root = run.run()?;
        debug!(tokens = run.tokens_lexed(), len = text.len(), "parsed");
        Ok(Tree::new(root, self.language.clone()))
    }

    /// Parse `text`, which is `old`'s source with `edit` applied, reusing
    /// what the edit left intact.
    ///
    /// The result is structurally identical to `self.parse(text)`.
    pub fn reparse(&self, old: &Tree, edit: &Edit, text: &str) -> Result<Tree, ParseError> {
        check_len(text)?;
        edit.validate(old.source_len(), TextSize::of(text))?;
        if !old.language().ptr_eq(&self.language) {
            debug!(
                old = old.revision(),
                new = self.language.revision(),
                "tree comes from another language handle, parsing from scratch"
            );
            return self.parse(text);
        }
        let root = reparse::reparse(&self.language, &self.config, old.root(), *edit, text)?;
        Ok(Tree::new(root, self.language.clone()))
    }
}

/// Parse independent sources in parallel against one language.
///
/// Results come back in the order of `sources`.
pub fn parse_many<S>(
    language: &Language,
    sources: &[S],
    config: &ParserConfig,
) -> Vec<Result<Tree, ParseError>>
where
    S: AsRef<str> + Sync,
{
    let parser = Parser::with_config(language.clone(), config.clone());
    sources
        .par_iter()
        .map(|source| parser.parse(source.as_ref()))
        .collect()
}

fn check_len(text: &str) -> Result<(), ParseError> {
    if u32::try_from(text.len()).is_err() {
        return Err(ParseError::SourceTooLarge { len: text.len() });
    }
    Ok(())
}
