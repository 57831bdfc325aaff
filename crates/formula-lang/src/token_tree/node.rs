use std::fmt;

use smol_str::SmolStr;

use crate::arena::{Arena, ArenaId};

use super::TokenMapper;

pub type NodeId<T> = ArenaId<MatcherNode<T>>;

/// A single-character predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CharMatcher {
    Char(char),
    AnyOf(SmolStr),
}

impl CharMatcher {
    #[inline(always)]
    pub fn matches(&self, c: char) -> bool {
        match self {
            CharMatcher::Char(expected) => *expected == c,
            CharMatcher::AnyOf(allowed) => allowed.contains(c),
        }
    }
}

impl fmt::Display for CharMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CharMatcher::Char(c) => write!(f, "{}", c),
            CharMatcher::AnyOf(allowed) => write!(f, "[{}]", allowed),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Match(CharMatcher),
    /// Greedy run of `matcher` between `min` and `max` characters.
    Repeat {
        matcher: CharMatcher,
        min: usize,
        max: usize,
    },
    /// Everything up to the first unescaped `close`.
    AnyUntil {
        close: SmolStr,
        escape: Option<SmolStr>,
    },
}

pub struct MatcherNode<T> {
    pub(crate) kind: NodeKind,
    pub(crate) children: Vec<NodeId<T>>,
    pub(crate) mapper: Option<TokenMapper<T>>,
}

impl<T> fmt::Debug for MatcherNode<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatcherNode")
            .field("kind", &self.kind)
            .field("children", &self.children.len())
            .field("mapped", &self.mapper.is_some())
            .finish()
    }
}

impl<T> MatcherNode<T> {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
            mapper: None,
        }
    }
}

#[derive(Debug)]
pub struct TokenMatch<T> {
    pub start: usize,
    pub end: usize,
    pub node: NodeId<T>,
}

/// Adds `kind` under `parent`, reusing a structurally equal child if one exists.
pub fn add_child<T>(
    nodes: &mut Arena<MatcherNode<T>>,
    parent: NodeId<T>,
    kind: NodeKind,
) -> NodeId<T> {
    if let Some(existing) = nodes[parent]
        .children
        .iter()
        .copied()
        .find(|child| nodes[*child].kind == kind)
    {
        return existing;
    }

    let child = nodes.alloc(MatcherNode::new(kind));
    nodes[parent].children.push(child);
    child
}

/// Depth-first walk from `id`. Matches found below a node are recorded before
/// the node's own match, so deeper (longer) completions come first.
pub fn walk<T>(
    nodes: &Arena<MatcherNode<T>>,
    id: NodeId<T>,
    text: &[char],
    start: usize,
    current: usize,
    matches: &mut Vec<TokenMatch<T>>,
) {
    let node = &nodes[id];

    match &node.kind {
        NodeKind::Root => walk_children(nodes, node, text, start, current, matches),
        NodeKind::Match(matcher) => {
            if current >= text.len() || !matcher.matches(text[current]) {
                return;
            }
            walk_children(nodes, node, text, start, current + 1, matches);
            record(node, id, start, current + 1, matches);
        }
        NodeKind::Repeat { matcher, min, max } => {
            let length = text[current..]
                .iter()
                .take(*max)
                .take_while(|c| matcher.matches(**c))
                .count();

            if length < *min {
                return;
            }
            walk_children(nodes, node, text, start, current + length, matches);
            record(node, id, start, current + length, matches);
        }
        NodeKind::AnyUntil { close, escape } => {
            let close = close.chars().collect::<Vec<_>>();
            let escape = escape
                .as_ref()
                .map(|escape| escape.chars().collect::<Vec<_>>());

            for position in current..text.len() {
                if text[position..].starts_with(&close)
                    && !is_escaped(text, position, escape.as_deref())
                {
                    walk_children(nodes, node, text, start, position, matches);
                    record(node, id, start, position, matches);
                    return;
                }
            }

            record(node, id, start, text.len(), matches);
        }
    }
}

fn walk_children<T>(
    nodes: &Arena<MatcherNode<T>>,
    node: &MatcherNode<T>,
    text: &[char],
    start: usize,
    current: usize,
    matches: &mut Vec<TokenMatch<T>>,
) {
    for child in &node.children {
        walk(nodes, *child, text, start, current, matches);
    }
}

#[inline(always)]
fn record<T>(
    node: &MatcherNode<T>,
    id: NodeId<T>,
    start: usize,
    end: usize,
    matches: &mut Vec<TokenMatch<T>>,
) {
    // An empty match would never advance the cursor.
    if node.mapper.is_some() && end > start {
        matches.push(TokenMatch { start, end, node: id });
    }
}

/// True when the characters ending at `position` (inclusive) spell `escape`.
fn is_escaped(text: &[char], position: usize, escape: Option<&[char]>) -> bool {
    match escape {
        Some(escape) if !escape.is_empty() && position + 1 >= escape.len() => {
            let from = position + 1 - escape.len();
            text[from..].starts_with(escape)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::char_match(CharMatcher::Char('a'), 'a', true)]
    #[case::char_mismatch(CharMatcher::Char('a'), 'b', false)]
    #[case::any_of_match(CharMatcher::AnyOf("xyz".into()), 'y', true)]
    #[case::any_of_mismatch(CharMatcher::AnyOf("xyz".into()), 'a', false)]
    fn test_char_matcher(#[case] matcher: CharMatcher, #[case] c: char, #[case] expected: bool) {
        assert_eq!(matcher.matches(c), expected);
    }

    #[rstest]
    #[case::no_escape("a\"b", 1, None, false)]
    #[case::escaped("a\\\"b", 2, Some("\\\""), true)]
    #[case::not_escaped("ab\"", 2, Some("\\\""), false)]
    #[case::at_start("\"", 0, Some("\\\""), false)]
    fn test_is_escaped(
        #[case] text: &str,
        #[case] position: usize,
        #[case] escape: Option<&str>,
        #[case] expected: bool,
    ) {
        let text = text.chars().collect::<Vec<_>>();
        let escape = escape.map(|e| e.chars().collect::<Vec<_>>());
        assert_eq!(is_escaped(&text, position, escape.as_deref()), expected);
    }

    #[test]
    fn test_add_child_deduplicates() {
        let mut nodes: Arena<MatcherNode<()>> = Arena::default();
        let root = nodes.alloc(MatcherNode::new(NodeKind::Root));
        let first = add_child(&mut nodes, root, NodeKind::Match(CharMatcher::Char('a')));
        let second = add_child(&mut nodes, root, NodeKind::Match(CharMatcher::Char('a')));
        let other = add_child(&mut nodes, root, NodeKind::Match(CharMatcher::Char('b')));

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(nodes[root].children.len(), 2);
    }
}
