//! The LR parse stack.

use rowan::NodeOrToken;

use crate::base::{StateId, Symbol};
use crate::syntax::green::{self, GreenElement};

/// One stack slot: a subtree and the automaton state after it.
#[derive(Debug, Clone)]
pub(crate) struct StackEntry {
    pub state: StateId,
    pub element: GreenElement,
    /// Trivia and ERROR entries leave the automaton state unchanged and are
    /// not counted by reductions.
    pub transparent: bool,
}

impl StackEntry {
    pub fn symbol(&self) -> Symbol {
        green::element_kind(green::borrow(&self.element)).symbol()
    }

    /// What incremental reuse compares: state, class and symbol.
    pub fn signature(&self) -> (StateId, bool, Symbol) {
        (self.state, self.transparent, self.symbol())
    }
}

#[derive(Debug, Clone)]
pub(crate) struct ParseStack {
    start: StateId,
    entries: Vec<StackEntry>,
}

impl ParseStack {
    pub fn new(start: StateId) -> Self {
        Self {
            start,
            entries: Vec::new(),
        }
    }

    /// A stack rebuilt from entries replayed out of an earlier tree.
    pub fn from_entries(start: StateId, entries: Vec<StackEntry>) -> Self {
        Self { start, entries }
    }

    pub fn state(&self) -> StateId {
        self.entries.last().map_or(self.start, |entry| entry.state)
    }

    pub fn entries(&self) -> &[StackEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn push(&mut self, state: StateId, element: GreenElement) {
        self.entries.push(StackEntry {
            state,
            element,
            transparent: false,
        });
    }

    pub fn push_token(&mut self, state: StateId, token: rowan::GreenToken) {
        self.push(state, NodeOrToken::Token(token));
    }

    /// Push an entry that keeps the current state.
    pub fn push_transparent(&mut self, element: GreenElement) {
        let state = self.state();
        self.entries.push(StackEntry {
            state,
            element,
            transparent: true,
        });
    }

    /// Pop the children of a reduction of length `len`.
    ///
    /// Transparent entries between or after the children are popped with
    /// them; those below the first child stay put. `None` when the stack
    /// holds fewer than `len` non-transparent entries.
    pub fn pop_children(&mut self, len: usize) -> Option<Vec<GreenElement>> {
        if len == 0 {
            return Some(Vec::new());
        }
        let mut remaining = len;
        let mut first = self.entries.len();
        while remaining > 0 {
            first = first.checked_sub(1)?;
            if !self.entries[first].transparent {
                remaining -= 1;
            }
        }
        Some(self.entries.drain(first..).map(|entry| entry.element).collect())
    }

    /// The state of a stack truncated to `len` entries.
    pub fn state_at(&self, len: usize) -> StateId {
        match len {
            0 => self.start,
            n => self.entries[n - 1].state,
        }
    }

    /// Remove every entry above `len`.
    pub fn truncate(&mut self, len: usize) -> Vec<StackEntry> {
        self.entries.split_off(len.min(self.entries.len()))
    }

    /// Automaton states of the non-transparent entries, start state first.
    pub fn states(&self) -> Vec<StateId> {
        std::iter::once(self.start)
            .chain(
                self.entries
                    .iter()
                    .filter(|entry| !entry.transparent)
                    .map(|entry| entry.state),
            )
            .collect()
    }

    /// Shorter stack lengths worth popping back to, nearest first. Each one
    /// ends on a non-transparent entry or is empty.
    pub fn pop_points(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.entries.len())
            .rev()
            .filter(|&len| len == 0 || !self.entries[len - 1].transparent)
    }

    pub fn into_entries(self) -> Vec<StackEntry> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(symbol: u16) -> GreenElement {
        NodeOrToken::Token(green::token(Symbol(symbol), "x", 0))
    }

    fn trivia() -> GreenElement {
        NodeOrToken::Token(green::extra(Symbol(3), " ", 1))
    }

    #[test]
    fn test_reduction_skips_trivia_below_first_child() {
        let mut stack = ParseStack::new(StateId(0));
        stack.push_transparent(trivia());
        stack.push(StateId(1), leaf(2));
        stack.push_transparent(trivia());
        stack.push(StateId(2), leaf(4));

        let children = stack.pop_children(2).unwrap();
        assert_eq!(children.len(), 3);
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.state(), StateId(0));
    }

    #[test]
    fn test_reduction_takes_trailing_transparent_entries() {
        let mut stack = ParseStack::new(StateId(0));
        stack.push(StateId(1), leaf(2));
        stack.push_transparent(trivia());
        let children = stack.pop_children(1).unwrap();
        assert_eq!(children.len(), 2);
        assert_eq!(stack.len(), 0);
    }

    #[test]
    fn test_short_stack_cannot_reduce() {
        let mut stack = ParseStack::new(StateId(0));
        stack.push(StateId(1), leaf(2));
        assert!(stack.pop_children(2).is_none());
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_transparent_entries_keep_state() {
        let mut stack = ParseStack::new(StateId(0));
        stack.push(StateId(7), leaf(2));
        stack.push_transparent(trivia());
        assert_eq!(stack.state(), StateId(7));
        assert_eq!(stack.states(), vec![StateId(0), StateId(7)]);
    }

    #[test]
    fn test_pop_points_skip_transparent_tops() {
        let mut stack = ParseStack::new(StateId(0));
        stack.push(StateId(1), leaf(2));
        stack.push_transparent(trivia());
        stack.push(StateId(2), leaf(4));
        // length 2 ends on trivia
        let points: Vec<_> = stack.pop_points().collect();
        assert_eq!(points, vec![1, 0]);
    }
}
