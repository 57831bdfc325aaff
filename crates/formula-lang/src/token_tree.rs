//! A trie-based tokenizer with ordered, possibly ambiguous alternatives.
//!
//! Grammar fragments ([`NodeExpression`]) are chained onto a shared prefix
//! trie. At each input position the whole trie is walked and every completed
//! match is collected; the first one recorded wins. Children are visited before
//! a node reports its own completion, and siblings are visited in registration
//! order, so the outcome depends on that order rather than on match length.
pub mod error;
pub mod expression;
pub mod node;

use std::sync::Arc;

use error::{ConfigurationError, ParseError};
use expression::NodeExpression;
use node::{MatcherNode, NodeId, NodeKind, TokenMatch};

use crate::arena::Arena;

/// Converts the matched text into a token, or `None` for ignorable input.
pub type TokenMapper<T> = Arc<dyn Fn(&str) -> Option<T> + Send + Sync>;

pub struct TokenTree<T> {
    nodes: Arena<MatcherNode<T>>,
    root: NodeId<T>,
}

impl<T> std::fmt::Debug for TokenTree<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenTree")
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

impl<T> Default for TokenTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TokenTree<T> {
    pub fn new() -> Self {
        let mut nodes = Arena::new(256);
        let root = nodes.alloc(MatcherNode::new(NodeKind::Root));
        Self { nodes, root }
    }

    /// Registers blank characters as a token that produces nothing.
    pub fn ignore_whitespace(&mut self) -> Result<&mut Self, ConfigurationError> {
        self.add(expression::blank(), Arc::new(|_: &str| None))
    }

    pub fn add_term(
        &mut self,
        text: &str,
        mapper: TokenMapper<T>,
    ) -> Result<&mut Self, ConfigurationError> {
        self.add(NodeExpression::term(text), mapper)
    }

    /// Chains `expression` onto the trie and assigns `mapper` to every node
    /// where it can complete.
    ///
    /// A node can carry a single mapper; registering a second one is a
    /// configuration error and no mapper of `expression` is assigned.
    pub fn add(
        &mut self,
        expression: NodeExpression,
        mapper: TokenMapper<T>,
    ) -> Result<&mut Self, ConfigurationError> {
        let tails = expression.chain_to(&mut self.nodes, vec![self.root]);

        if tails
            .iter()
            .any(|tail| *tail == self.root || self.nodes[*tail].mapper.is_some())
        {
            return Err(ConfigurationError::ConflictingTokens {
                pattern: expression.to_string(),
            });
        }

        for tail in tails {
            self.nodes[tail].mapper = Some(Arc::clone(&mapper));
        }

        Ok(self)
    }

    pub fn parse(&self, text: &str) -> Result<Vec<T>, ParseError> {
        let chars = text.chars().collect::<Vec<_>>();
        let mut tokens = Vec::new();
        let mut matches: Vec<TokenMatch<T>> = Vec::new();
        let mut index = 0;

        while index < chars.len() {
            matches.clear();
            node::walk(&self.nodes, self.root, &chars, index, index, &mut matches);

            let Some(first) = matches.first() else {
                return Err(ParseError::new(text, index, chars[index]));
            };

            let token_text = chars[first.start..first.end].iter().collect::<String>();
            let mapper = self.nodes[first.node].mapper.as_ref();

            if let Some(token) = mapper.and_then(|mapper| mapper(&token_text)) {
                log::trace!("token `{}` at {}..{}", token_text, first.start, first.end);
                tokens.push(token);
            }
            index = first.end;
        }

        Ok(tokens)
    }
}
