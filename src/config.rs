//! Parser configuration.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Limits on how much input one parse call may process.
///
/// Both limits count committed work: every token the parser consumes,
/// trivia included, and the bytes those tokens cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Budget {
    pub max_tokens: Option<u64>,
    pub max_bytes: Option<u64>,
}

impl Budget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    pub fn exceeded(&self, tokens: u64, bytes: u64) -> bool {
        self.max_tokens.is_some_and(|max| tokens > max)
            || self.max_bytes.is_some_and(|max| bytes > max)
    }
}

/// Bounds for the error recovery strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryConfig {
    /// Tokens that must parse after a deleted token.
    pub deletion_window: usize,
    /// Tokens (the lookahead included) that must parse after an inserted one.
    pub insertion_window: usize,
    /// Longest run of tokens synthesized to complete a tree at end of input.
    pub max_eof_insertions: usize,
    /// Upper bound on tokens skipped while looking for a synchronizing
    /// symbol. `None` skips until one is found or input ends.
    pub max_skipped_tokens: Option<usize>,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            deletion_window: 3,
            insertion_window: 2,
            max_eof_insertions: 3,
            max_skipped_tokens: None,
        }
    }
}

impl RecoveryConfig {
    pub fn with_deletion_window(mut self, tokens: usize) -> Self {
        self.deletion_window = tokens.max(1);
        self
    }

    pub fn with_insertion_window(mut self, tokens: usize) -> Self {
        self.insertion_window = tokens.max(1);
        self
    }

    pub fn with_max_eof_insertions(mut self, tokens: usize) -> Self {
        self.max_eof_insertions = tokens;
        self
    }

    pub fn with_max_skipped_tokens(mut self, tokens: usize) -> Self {
        self.max_skipped_tokens = Some(tokens.max(1));
        self
    }
}

/// Options shared by every parse a [`Parser`](crate::Parser) runs.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub budget: Budget,
    pub recovery: RecoveryConfig,
    /// How many times an incremental reparse tries to rejoin the previous
    /// tree before it simply parses to the end.
    pub max_sync_attempts: usize,
    /// Raised by the host to abandon a parse in progress.
    pub cancellation_flag: Option<Arc<AtomicBool>>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            budget: Budget::default(),
            recovery: RecoveryConfig::default(),
            max_sync_attempts: 64,
            cancellation_flag: None,
        }
    }
}

impl ParserConfig {
    pub fn with_budget(mut self, budget: Budget) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_recovery(mut self, recovery: RecoveryConfig) -> Self {
        self.recovery = recovery;
        self
    }

    pub fn with_max_sync_attempts(mut self, attempts: usize) -> Self {
        self.max_sync_attempts = attempts;
        self
    }

    pub fn with_cancellation_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancellation_flag = Some(flag);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}
