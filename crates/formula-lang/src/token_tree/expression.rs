//! Declarative grammar fragments that are chained onto a [`TokenTree`](super::TokenTree).
use std::fmt;

use itertools::Itertools;
use smol_str::SmolStr;

use crate::arena::Arena;

use super::node::{self, CharMatcher, MatcherNode, NodeId, NodeKind};

pub const DIGIT_CHARACTERS: &str = "0123456789";
pub const ALPHA_CHARACTERS: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const WORD_CHARACTERS: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_";
pub const BLANK_CHARACTERS: &str = " \t\r\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeExpression {
    Match(CharMatcher),
    Repeat {
        matcher: CharMatcher,
        min: usize,
        max: usize,
    },
    AnyUntil {
        close: SmolStr,
        escape: Option<SmolStr>,
    },
    Sequence(Vec<NodeExpression>),
    Optional(Vec<NodeExpression>),
}

impl NodeExpression {
    pub fn just(c: char) -> Self {
        NodeExpression::Match(CharMatcher::Char(c))
    }

    pub fn any_of(allowed: &str) -> Self {
        NodeExpression::Match(CharMatcher::AnyOf(allowed.into()))
    }

    /// A fixed run of characters.
    pub fn term(text: &str) -> Self {
        NodeExpression::Sequence(text.chars().map(Self::just).collect())
    }

    pub fn sequence(expressions: impl IntoIterator<Item = NodeExpression>) -> Self {
        NodeExpression::Sequence(expressions.into_iter().collect())
    }

    pub fn optional(expressions: impl IntoIterator<Item = NodeExpression>) -> Self {
        NodeExpression::Optional(expressions.into_iter().collect())
    }

    pub fn any_until(close: &str, escape: Option<&str>) -> Self {
        NodeExpression::AnyUntil {
            close: close.into(),
            escape: escape.map(SmolStr::from),
        }
    }

    /// `open`, then anything up to an unescaped `close`, then `close`.
    pub fn literal(open: &str, close: &str, escape: Option<&str>) -> Self {
        Self::sequence([
            Self::term(open),
            Self::any_until(close, escape),
            Self::term(close),
        ])
    }

    /// Turns a single-character matcher into an unbounded greedy repetition.
    ///
    /// Any other expression is returned unchanged.
    pub fn repeats(self, min: usize) -> Self {
        self.repeats_between(min, usize::MAX)
    }

    pub fn repeats_between(self, min: usize, max: usize) -> Self {
        match self {
            NodeExpression::Match(matcher) | NodeExpression::Repeat { matcher, .. } => {
                NodeExpression::Repeat { matcher, min, max }
            }
            other => other,
        }
    }

    /// Chains this fragment below every node in `tails` and returns the new
    /// tails. An optional fragment keeps the incoming tails alongside the ones
    /// it produced, so whatever follows it is reachable both ways.
    pub(crate) fn chain_to<T>(
        &self,
        nodes: &mut Arena<MatcherNode<T>>,
        tails: Vec<NodeId<T>>,
    ) -> Vec<NodeId<T>> {
        match self {
            NodeExpression::Match(matcher) => {
                add_to_all(nodes, &tails, NodeKind::Match(matcher.clone()))
            }
            NodeExpression::Repeat { matcher, min, max } => add_to_all(
                nodes,
                &tails,
                NodeKind::Repeat {
                    matcher: matcher.clone(),
                    min: *min,
                    max: *max,
                },
            ),
            NodeExpression::AnyUntil { close, escape } => add_to_all(
                nodes,
                &tails,
                NodeKind::AnyUntil {
                    close: close.clone(),
                    escape: escape.clone(),
                },
            ),
            NodeExpression::Sequence(expressions) => expressions
                .iter()
                .fold(tails, |tails, expression| expression.chain_to(nodes, tails)),
            NodeExpression::Optional(expressions) => {
                let ends = expressions
                    .iter()
                    .fold(tails.clone(), |tails, expression| {
                        expression.chain_to(nodes, tails)
                    });
                tails.into_iter().chain(ends).unique().collect()
            }
        }
    }
}

fn add_to_all<T>(
    nodes: &mut Arena<MatcherNode<T>>,
    tails: &[NodeId<T>],
    kind: NodeKind,
) -> Vec<NodeId<T>> {
    tails
        .iter()
        .map(|tail| node::add_child(nodes, *tail, kind.clone()))
        .unique()
        .collect()
}

impl fmt::Display for NodeExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeExpression::Match(matcher) => write!(f, "{}", matcher),
            NodeExpression::Repeat { matcher, min, max } if *max == usize::MAX => {
                write!(f, "{}{{{},}}", matcher, min)
            }
            NodeExpression::Repeat { matcher, min, max } => {
                write!(f, "{}{{{},{}}}", matcher, min, max)
            }
            NodeExpression::AnyUntil { close, .. } => write!(f, "...{}", close),
            NodeExpression::Sequence(expressions) => {
                write!(f, "{}", expressions.iter().join(""))
            }
            NodeExpression::Optional(expressions) => {
                write!(f, "({})?", expressions.iter().join(""))
            }
        }
    }
}

pub fn digits() -> NodeExpression {
    NodeExpression::any_of(DIGIT_CHARACTERS).repeats(1)
}

/// Unsigned; a leading minus is the unary operator's job.
pub fn integer() -> NodeExpression {
    digits()
}

pub fn decimal() -> NodeExpression {
    NodeExpression::sequence([integer(), NodeExpression::just('.'), digits()])
}

pub fn alpha() -> NodeExpression {
    NodeExpression::any_of(ALPHA_CHARACTERS)
}

/// Key characters following the leading letter of a variable.
pub fn key() -> NodeExpression {
    NodeExpression::any_of(&format!("{}:.#*", WORD_CHARACTERS)).repeats(1)
}

/// Key characters allowed between braces, where the closing brace delimits the key.
pub fn braced_key() -> NodeExpression {
    NodeExpression::any_of(&format!("{}:.#*- ", WORD_CHARACTERS)).repeats(1)
}

pub fn blank() -> NodeExpression {
    NodeExpression::any_of(BLANK_CHARACTERS).repeats(1)
}
