//! Concrete syntax trees.
//!
//! Trees are rowan green trees whose kinds carry the grammar symbol plus the
//! recovery and lookahead flags described in [`kind`]. Green nodes store
//! lengths rather than offsets, so a subtree can be shared by any number of
//! tree versions no matter where edits moved it.

mod edit;
mod errors;
pub(crate) mod green;
mod kind;
mod tree;

pub use edit::Edit;
pub use errors::{ErrorCode, Severity, SyntaxError};
pub use kind::{Kind, SomniumLanguage, SyntaxElement, SyntaxNode, SyntaxNodeChildren, SyntaxToken};
pub use tree::{SyntaxElementExt, Tree};
