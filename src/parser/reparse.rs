//! Incremental reparsing.
//!
//! The old tree is used twice. Before the edit, the LR stack at the last
//! leaf whose lexing never looked into the edited bytes is replayed from the
//! tree, so the new parse starts there instead of at the beginning. After the
//! edit, whenever a token about to be shifted lines up with a leaf of the old
//! tree in the same automaton configuration, the rest of the old tree is
//! taken as is: only the leaf's ancestors are rebuilt.
//!
//! Both steps rely on nodes carrying how far past their end the lexer looked
//! and on recovery output being marked as looking arbitrarily far.

use rowan::{GreenNode, GreenNodeData, NodeOrToken, TextSize};
use tracing::debug;

use super::driver::ParseRun;
use super::stack::{ParseStack, StackEntry};
use crate::base::StateId;
use crate::config::ParserConfig;
use crate::error::ParseError;
use crate::lexer::Token;
use crate::syntax::green::{self, GreenElement, GreenElementRef};
use crate::syntax::Edit;
use crate::table::{Action, Language};

/// What a parse run may take over from the tree before the edit.
#[derive(Debug)]
pub(crate) struct Reuse<'a> {
    old: &'a GreenNode,
    edit: Edit,
    attempts: usize,
    max_attempts: usize,
    reused: usize,
}

impl<'a> Reuse<'a> {
    pub fn new(old: &'a GreenNode, edit: Edit, max_attempts: usize) -> Self {
        Self {
            old,
            edit,
            attempts: 0,
            max_attempts,
            reused: 0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ReparseStats {
    restart: TextSize,
    tokens_lexed: u64,
    sync_attempts: usize,
    reused_subtrees: usize,
}

/// Parse `text`, which is the old tree's source with `edit` applied.
pub(crate) fn reparse(
    language: &Language,
    config: &ParserConfig,
    old: &GreenNode,
    edit: Edit,
    text: &str,
) -> Result<GreenNode, ParseError> {
    let start = language.table().start_state;
    // an ERROR root came from a parse that never accepted; nothing in it lines up
    let usable = !green::element_kind(NodeOrToken::Node(&**old)).symbol().is_error();
    let restart = if usable {
        let mut path = Vec::new();
        find_restart(old, TextSize::new(0), edit.start_byte, &mut path)
    } else {
        None
    };

    let (stack, position) = match restart.and_then(|path| replay(language, old, &path, true)) {
        Some((entries, position)) => {
            let entries = entries.into_iter().map(|(_, entry)| entry).collect();
            (ParseStack::from_entries(start, entries), position)
        }
        None => (ParseStack::new(start), TextSize::new(0)),
    };
    debug!(restart = u32::from(position), "reparsing after edit");

    let mut run = ParseRun::new(language, config, text, stack, position);
    if usable {
        run = run.with_reuse(Reuse::new(old, edit, config.max_sync_attempts));
    }
    let root = run.run()?;

    let (sync_attempts, reused_subtrees) = run
        .reuse
        .as_ref()
        .map_or((0, 0), |reuse| (reuse.attempts, reuse.reused));
    let stats = ReparseStats {
        restart: position,
        tokens_lexed: run.tokens_lexed(),
        sync_attempts,
        reused_subtrees,
    };
    debug!(?stats, "incremental reparse finished");
    Ok(root)
}

impl ParseRun<'_> {
    /// Finish the parse from the old tree when `token` lines up with one of
    /// its leaves under the same stack.
    pub(super) fn try_rejoin(&mut self, token: &Token) -> Option<GreenNode> {
        let reuse = self.reuse.as_ref()?;
        let (old, edit) = (reuse.old, reuse.edit);
        if token.is_error
            || token.is_end()
            || token.range.start() < edit.new_end_byte
            || reuse.attempts >= reuse.max_attempts
        {
            return None;
        }

        let path = leaf_path_at(old, edit.unshift(token.range.start()))?;
        let ancestors = ancestors(old, &path)?;
        let parent = *ancestors.last()?;
        let leaf = parent.children().nth(*path.last()?)?;
        let kind = green::element_kind(leaf);
        if kind.symbol() != token.symbol
            || kind.is_missing()
            || kind.is_extra()
            || green::element_len(leaf) != token.range.len()
        {
            return None;
        }

        if let Some(reuse) = self.reuse.as_mut() {
            reuse.attempts += 1;
        }
        let (replayed, _) = replay(self.language, old, &path, false)?;
        let current = self.stack.entries();
        let lines_up = replayed.len() == current.len()
            && replayed
                .iter()
                .zip(current)
                .all(|((_, old_entry), entry)| old_entry.signature() == entry.signature());
        if !lines_up {
            debug!(
                offset = u32::from(token.range.start()),
                "old leaf found under a different stack, continuing"
            );
            return None;
        }

        let start = self.language.table().start_state;
        let entries = std::mem::replace(&mut self.stack, ParseStack::new(start)).into_entries();
        let mut left: Vec<Vec<GreenElement>> = vec![Vec::new(); path.len()];
        for ((depth, _), entry) in replayed.iter().zip(entries) {
            left[*depth].push(entry.element);
        }

        let mut reused = 1;
        let mut current = green::to_owned(leaf);
        for (depth, parent) in ancestors.iter().enumerate().rev() {
            let mut children = std::mem::take(&mut left[depth]);
            children.push(current);
            let right = parent.children().skip(path[depth] + 1).map(green::to_owned);
            let before = children.len();
            children.extend(right);
            reused += children.len() - before;
            let symbol = green::element_kind(NodeOrToken::Node(*parent)).symbol();
            current = NodeOrToken::Node(green::node(symbol, children));
        }
        if let Some(reuse) = self.reuse.as_mut() {
            reuse.reused = reused;
        }
        debug!(
            offset = u32::from(token.range.start()),
            rebuilt = ancestors.len(),
            reused,
            "rejoined the previous tree"
        );
        current.into_node()
    }
}

/// Child-index path to the last leaf that can be kept along with the stack
/// under it: nothing up to its end looked at bytes from `edit_start` on.
fn find_restart(
    node: &GreenNodeData,
    offset: TextSize,
    edit_start: TextSize,
    path: &mut Vec<usize>,
) -> Option<Vec<usize>> {
    let mut found = None;
    let mut child_start = offset;
    for (index, child) in node.children().enumerate() {
        let kind = green::element_kind(child);
        let end = child_start + green::element_len(child);
        let looked_to = end + TextSize::from(u32::from(kind.lookahead()));
        path.push(index);
        if kind.is_far() || looked_to > edit_start {
            if let NodeOrToken::Node(inner) = child {
                if !kind.symbol().is_error() {
                    if let Some(inner) = find_restart(inner, child_start, edit_start, path) {
                        found = Some(inner);
                    }
                }
            }
            path.pop();
            break;
        }
        if let Some(mut tail) = rightmost_real_leaf(child) {
            let mut full = path.clone();
            full.append(&mut tail);
            found = Some(full);
        }
        path.pop();
        child_start = end;
    }
    found
}

/// Path, relative to `element`, to its last leaf that is neither trivia nor
/// synthesized by recovery.
fn rightmost_real_leaf(element: GreenElementRef<'_>) -> Option<Vec<usize>> {
    match element {
        NodeOrToken::Token(token) => {
            let kind = green::element_kind(element);
            let real = !kind.is_extra()
                && !kind.is_missing()
                && !kind.symbol().is_error()
                && !token.text().is_empty();
            real.then(Vec::new)
        }
        NodeOrToken::Node(node) => {
            if green::element_kind(element).symbol().is_error() {
                return None;
            }
            let children: Vec<_> = node.children().collect();
            children.iter().enumerate().rev().find_map(|(index, &child)| {
                rightmost_real_leaf(child).map(|mut tail| {
                    tail.insert(0, index);
                    tail
                })
            })
        }
    }
}

/// Path to the non-empty leaf starting exactly at `offset`, if no ERROR node
/// lies above it.
fn leaf_path_at(root: &GreenNodeData, offset: TextSize) -> Option<Vec<usize>> {
    let mut path = Vec::new();
    let mut node = root;
    let mut node_start = TextSize::new(0);
    'descend: loop {
        let mut child_start = node_start;
        for (index, child) in node.children().enumerate() {
            let end = child_start + green::element_len(child);
            if end <= offset || end == child_start {
                child_start = end;
                continue;
            }
            if child_start > offset {
                return None;
            }
            path.push(index);
            match child {
                NodeOrToken::Token(_) => return (child_start == offset).then_some(path),
                NodeOrToken::Node(inner) => {
                    if green::element_kind(child).symbol().is_error() {
                        return None;
                    }
                    node = inner;
                    node_start = child_start;
                    continue 'descend;
                }
            }
        }
        return None;
    }
}

/// The nodes along `path`, root first, leaf excluded.
fn ancestors<'t>(root: &'t GreenNodeData, path: &[usize]) -> Option<Vec<&'t GreenNodeData>> {
    let (_, inner) = path.split_last()?;
    let mut nodes = vec![root];
    let mut node = root;
    for &index in inner {
        node = node.children().nth(index)?.into_node()?;
        nodes.push(node);
    }
    Some(nodes)
}

/// Replay the automaton down `path`: every element left of the path becomes a
/// stack entry tagged with the depth of its parent, and the target leaf is
/// pushed too when `include_target` is set. Also returns the offset reached.
///
/// `None` when the tree does not fit the table, e.g. because it was built by
/// another grammar revision.
fn replay(
    language: &Language,
    root: &GreenNodeData,
    path: &[usize],
    include_target: bool,
) -> Option<(Vec<(usize, StackEntry)>, TextSize)> {
    let mut entries = Vec::new();
    let mut state = language.table().start_state;
    let mut position = TextSize::new(0);
    let mut node = root;
    for (depth, &index) in path.iter().enumerate() {
        for child in node.children().take(index) {
            let entry = replay_entry(language, &mut state, child)?;
            position += green::element_len(child);
            entries.push((depth, entry));
        }
        let target = node.children().nth(index)?;
        if depth + 1 == path.len() {
            if include_target {
                let entry = replay_entry(language, &mut state, target)?;
                position += green::element_len(target);
                entries.push((depth, entry));
            }
        } else {
            node = target.into_node()?;
        }
    }
    Some((entries, position))
}

fn replay_entry(
    language: &Language,
    state: &mut StateId,
    element: GreenElementRef<'_>,
) -> Option<StackEntry> {
    let kind = green::element_kind(element);
    let transparent = kind.is_extra() || kind.symbol().is_error();
    if !transparent {
        *state = match language.action(*state, kind.symbol()) {
            Action::Shift(next) | Action::Goto(next) => next,
            _ => return None,
        };
    }
    Some(StackEntry {
        state: *state,
        element: green::to_owned(element),
        transparent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Symbol;
    use crate::syntax::green::{node, token};

    fn leaf(symbol: u16, text: &str, lookahead: u32) -> GreenElement {
        NodeOrToken::Token(token(Symbol(symbol), text, lookahead))
    }

    /// `(10 (11 "ab" "c") "de")`
    fn sample() -> GreenNode {
        let inner = node(Symbol(11), vec![leaf(2, "ab", 0), leaf(3, "c", 1)]);
        node(Symbol(10), vec![NodeOrToken::Node(inner), leaf(4, "de", 0)])
    }

    #[test]
    fn test_leaf_path_at_exact_start() {
        let root = sample();
        assert_eq!(leaf_path_at(&root, TextSize::new(0)), Some(vec![0, 0]));
        assert_eq!(leaf_path_at(&root, TextSize::new(2)), Some(vec![0, 1]));
        assert_eq!(leaf_path_at(&root, TextSize::new(3)), Some(vec![1]));
        assert_eq!(leaf_path_at(&root, TextSize::new(1)), None);
        assert_eq!(leaf_path_at(&root, TextSize::new(5)), None);
    }

    #[test]
    fn test_restart_respects_lookahead() {
        let root = sample();
        // "c" looked one byte past its end, into offset 3
        let mut path = Vec::new();
        assert_eq!(find_restart(&root, 0.into(), 3.into(), &mut path), Some(vec![0, 0]));
        assert_eq!(find_restart(&root, 0.into(), 4.into(), &mut path), Some(vec![0, 1]));
        assert_eq!(find_restart(&root, 0.into(), 0.into(), &mut path), None);
        assert!(path.is_empty());
    }

    #[test]
    fn test_restart_stops_at_missing_leaf() {
        let missing = NodeOrToken::Token(green::missing(Symbol(3)));
        let inner = node(Symbol(11), vec![leaf(2, "ab", 0), missing]);
        let root = node(Symbol(10), vec![NodeOrToken::Node(inner), leaf(4, "de", 0)]);
        let mut path = Vec::new();
        assert_eq!(find_restart(&root, 0.into(), 4.into(), &mut path), Some(vec![0, 0]));
    }

    #[test]
    fn test_rightmost_real_leaf_skips_trivia() {
        let trivia = NodeOrToken::Token(green::extra(Symbol(5), " ", 0));
        let root = node(Symbol(10), vec![leaf(2, "a", 0), trivia]);
        assert_eq!(rightmost_real_leaf(NodeOrToken::Node(&*root)), Some(vec![0]));
    }

    #[test]
    fn test_ancestors_follow_path() {
        let root = sample();
        let nodes = ancestors(&root, &[0, 1]).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(green::element_kind(NodeOrToken::Node(nodes[1])).symbol(), Symbol(11));
    }
}
