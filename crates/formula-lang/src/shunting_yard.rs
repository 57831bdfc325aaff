//! An operator-precedence parser that compiles infix formulas into postfix
//! programs over any operand type.
//!
//! A [`ShuntingYardParserBuilder`] registers the grammar: operators, functions,
//! terms, variables, comments and quoted literals. Every registration becomes
//! a token in a [`TokenTree`]; the resulting token stream is reordered into
//! postfix with the shunting-yard algorithm and evaluated by [`eval`].
pub mod error;
pub mod eval;
pub mod node;

use std::{fmt, sync::Arc};

use crate::token_tree::{
    TokenTree,
    error::{ConfigurationError, ParseError},
    expression::{self, NodeExpression},
};

use node::{
    Comment, CommentDecorator, Function, Operator, ProgramNode, Token, Variable, VariableResolver,
};

/// The value type a parser compiles literal terms into.
pub trait Operand: Clone + fmt::Debug + Send + Sync + 'static {
    fn from_integer(text: &str) -> Self;

    fn from_decimal(text: &str) -> Self;

    fn from_text(text: &str) -> Self;

    /// Wraps a quoted literal, remembering the delimiters it was written with.
    fn quoted(self, prefix: &str, suffix: &str) -> Self;
}

/// A compiled formula: postfix instructions plus the text they came from.
#[derive(Debug)]
pub struct Program<V> {
    nodes: Vec<ProgramNode<V>>,
    text: String,
}

impl<V> Program<V> {
    pub fn new(nodes: Vec<ProgramNode<V>>, text: impl Into<String>) -> Self {
        Self {
            nodes,
            text: text.into(),
        }
    }

    pub fn nodes(&self) -> &[ProgramNode<V>] {
        &self.nodes
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Debug)]
pub struct ShuntingYardParser<V> {
    tree: TokenTree<Token<V>>,
    list_operator: Option<Arc<Operator<V>>>,
}

impl<V: Operand> ShuntingYardParser<V> {
    pub fn builder() -> ShuntingYardParserBuilder<V> {
        ShuntingYardParserBuilder::new()
    }

    pub fn tokenize(&self, text: &str) -> Result<Vec<Token<V>>, ParseError> {
        self.tree.parse(text)
    }

    pub fn parse(&self, text: &str) -> Result<Program<V>, ParseError> {
        let tokens = self.tokenize(text)?;
        let nodes = Compiler::new(self.list_operator.as_ref()).compile(&tokens);
        log::debug!(
            "compiled `{}` into {} instructions from {} tokens",
            text,
            nodes.len(),
            tokens.len()
        );
        Ok(Program::new(nodes, text))
    }
}

/// Entries of the operator stack.
enum Pending<V> {
    Operator(Arc<Operator<V>>),
    Function(Arc<Function<V>>),
    /// An open parenthesis that started the argument list of `function`.
    Call {
        function: Arc<Function<V>>,
        arity: usize,
    },
    /// A grouping parenthesis.
    Group,
}

struct Compiler<'a, V> {
    list_operator: Option<&'a Arc<Operator<V>>>,
    output: Vec<ProgramNode<V>>,
    pending: Vec<Pending<V>>,
}

impl<'a, V: Clone> Compiler<'a, V> {
    fn new(list_operator: Option<&'a Arc<Operator<V>>>) -> Self {
        Self {
            list_operator,
            output: Vec::new(),
            pending: Vec::new(),
        }
    }

    fn compile(mut self, tokens: &[Token<V>]) -> Vec<ProgramNode<V>> {
        let mut previous: Option<&Token<V>> = None;

        for token in tokens {
            match token {
                Token::Term(value) => self.output.push(ProgramNode::Term(value.clone())),
                Token::Variable(variable) => {
                    self.output.push(ProgramNode::Variable(Arc::clone(variable)))
                }
                Token::Comment(comment) => {
                    self.output.push(ProgramNode::Comment(Arc::clone(comment)))
                }
                Token::Operator(operator) => self.push_operator(Arc::clone(operator)),
                Token::BiOperator { unary, binary } => {
                    if Token::precedes_operand(previous) {
                        self.push_operator(Arc::clone(unary))
                    } else {
                        self.push_operator(Arc::clone(binary))
                    }
                }
                Token::Function(function) => {
                    self.pending.push(Pending::Function(Arc::clone(function)))
                }
                Token::OpenParen => match previous {
                    // The function token is still on top of the stack.
                    Some(Token::Function(function)) => {
                        self.pending.pop();
                        self.pending.push(Pending::Call {
                            function: Arc::clone(function),
                            arity: 1,
                        });
                    }
                    _ => self.pending.push(Pending::Group),
                },
                Token::CloseParen => self.close_paren(previous),
                Token::Separator => self.separator(),
            }
            previous = Some(token);
        }

        while let Some(pending) = self.pending.pop() {
            self.emit(pending);
        }

        self.output
    }

    fn push_operator(&mut self, operator: Arc<Operator<V>>) {
        // A prefix operator has no left operand to compete for.
        if !operator.is_prefix() {
            while let Some(Pending::Operator(top)) = self.pending.last() {
                if !operator.yields_to(top) {
                    break;
                }
                self.output.push(ProgramNode::Operator(Arc::clone(top)));
                self.pending.pop();
            }
        }
        self.pending.push(Pending::Operator(operator));
    }

    fn separator(&mut self) {
        let in_call = matches!(
            self.pending
                .iter()
                .rev()
                .find(|pending| matches!(pending, Pending::Call { .. } | Pending::Group)),
            Some(Pending::Call { .. })
        );

        if !in_call {
            if let Some(list_operator) = self.list_operator {
                self.push_operator(Arc::clone(list_operator));
                return;
            }
        }

        self.flush_to_paren();
        if let Some(Pending::Call { arity, .. }) = self.pending.last_mut() {
            *arity += 1;
        }
    }

    fn close_paren(&mut self, previous: Option<&Token<V>>) {
        self.flush_to_paren();

        if let Some(Pending::Call { function, arity }) = self.pending.pop() {
            if function.callable.is_variadic() {
                let arity = match previous {
                    Some(Token::OpenParen) => 0,
                    _ => arity,
                };
                self.output.push(ProgramNode::Arity(arity));
            }
            self.output.push(ProgramNode::Function(function));
        }
    }

    fn flush_to_paren(&mut self) {
        while matches!(
            self.pending.last(),
            Some(Pending::Operator(_) | Pending::Function(_))
        ) {
            if let Some(pending) = self.pending.pop() {
                self.emit(pending);
            }
        }
    }

    fn emit(&mut self, pending: Pending<V>) {
        match pending {
            Pending::Operator(operator) => self.output.push(ProgramNode::Operator(operator)),
            Pending::Function(function) => self.output.push(ProgramNode::Function(function)),
            // Unbalanced parentheses are dropped.
            Pending::Call { .. } | Pending::Group => {}
        }
    }
}

/// Strips `prefix` and `suffix` off a matched token.
fn between<'t>(text: &'t str, prefix: &str, suffix: &str) -> &'t str {
    let text = text.strip_prefix(prefix).unwrap_or(text);
    text.strip_suffix(suffix).unwrap_or(text)
}

/// Registers a grammar. Registration order decides between tokens that match
/// at the same position; the first conflicting registration is reported by
/// [`build`](Self::build).
pub struct ShuntingYardParserBuilder<V> {
    tree: TokenTree<Token<V>>,
    list_operator: Option<Arc<Operator<V>>>,
    error: Option<ConfigurationError>,
}

impl<V: Operand> Default for ShuntingYardParserBuilder<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Operand> ShuntingYardParserBuilder<V> {
    /// Starts a grammar with decimal and integer literals, parentheses and the
    /// `,` separator.
    pub fn new() -> Self {
        Self {
            tree: TokenTree::new(),
            list_operator: None,
            error: None,
        }
        .token(expression::decimal(), |text| {
            Some(Token::Term(V::from_decimal(text)))
        })
        .token(expression::integer(), |text| {
            Some(Token::Term(V::from_integer(text)))
        })
        .token(NodeExpression::just('('), |_| Some(Token::OpenParen))
        .token(NodeExpression::just(')'), |_| Some(Token::CloseParen))
        .token(NodeExpression::just(','), |_| Some(Token::Separator))
    }

    pub fn token(
        mut self,
        expression: NodeExpression,
        mapper: impl Fn(&str) -> Option<Token<V>> + Send + Sync + 'static,
    ) -> Self {
        if self.error.is_none() {
            self.error = self.tree.add(expression, Arc::new(mapper)).err();
        }
        self
    }

    pub fn ignore_whitespace(mut self) -> Self {
        if self.error.is_none() {
            self.error = self.tree.ignore_whitespace().err();
        }
        self
    }

    pub fn operator(self, operator: Operator<V>) -> Self {
        let expression = NodeExpression::term(&operator.symbol);
        let operator = Arc::new(operator);
        self.token(expression, move |_| {
            Some(Token::Operator(Arc::clone(&operator)))
        })
    }

    /// Binds one symbol to a prefix and an infix operator. The prefix form is
    /// chosen when nothing that could be a left operand precedes the symbol.
    pub fn bi_operator(self, unary: Operator<V>, binary: Operator<V>) -> Self {
        let expression = NodeExpression::term(&binary.symbol);
        let (unary, binary) = (Arc::new(unary), Arc::new(binary));
        self.token(expression, move |_| {
            Some(Token::BiOperator {
                unary: Arc::clone(&unary),
                binary: Arc::clone(&binary),
            })
        })
    }

    /// Used as the operator for `,` outside a function call's argument list.
    pub fn list_operator(mut self, operator: Operator<V>) -> Self {
        self.list_operator = Some(Arc::new(operator));
        self
    }

    pub fn function(self, function: Function<V>) -> Self {
        let expression = NodeExpression::term(&function.name);
        let function = Arc::new(function);
        self.token(expression, move |_| {
            Some(Token::Function(Arc::clone(&function)))
        })
    }

    /// A keyword that compiles to a constant.
    pub fn term(self, text: &str, value: V) -> Self {
        self.token(NodeExpression::term(text), move |_| {
            Some(Token::Term(value.clone()))
        })
    }

    /// `prefix` followed by a letter and any run of key characters.
    pub fn variable(self, prefix: &str, resolver: VariableResolver<V>) -> Self {
        let expression = NodeExpression::sequence([
            NodeExpression::term(prefix),
            expression::alpha(),
            NodeExpression::optional([expression::key()]),
        ]);
        self.variable_token(expression, prefix, "", resolver)
    }

    /// A key between `prefix` and `suffix`, which may also hold spaces and dashes.
    pub fn braced_variable(
        self,
        prefix: &str,
        suffix: &str,
        resolver: VariableResolver<V>,
    ) -> Self {
        let expression = NodeExpression::sequence([
            NodeExpression::term(prefix),
            expression::braced_key(),
            NodeExpression::term(suffix),
        ]);
        self.variable_token(expression, prefix, suffix, resolver)
    }

    fn variable_token(
        self,
        expression: NodeExpression,
        prefix: &str,
        suffix: &str,
        resolver: VariableResolver<V>,
    ) -> Self {
        let (prefix, suffix) = (prefix.to_string(), suffix.to_string());
        self.token(expression, move |text| {
            Some(Token::Variable(Arc::new(Variable {
                key: between(text, &prefix, &suffix).into(),
                resolver: Arc::clone(&resolver),
            })))
        })
    }

    /// Text between `open` and `close` that decorates the preceding value.
    pub fn comment(self, open: &str, close: &str, decorator: CommentDecorator<V>) -> Self {
        let (prefix, suffix) = (open.to_string(), close.to_string());
        self.token(NodeExpression::literal(open, close, None), move |text| {
            Some(Token::Comment(Arc::new(Comment {
                text: between(text, &prefix, &suffix).into(),
                decorator: Arc::clone(&decorator),
            })))
        })
    }

    /// A quoted text literal. Escape sequences are kept verbatim.
    pub fn literal(self, open: &str, close: &str, escape: Option<&str>) -> Self {
        let (prefix, suffix) = (open.to_string(), close.to_string());
        self.token(NodeExpression::literal(open, close, escape), move |text| {
            let value = V::from_text(between(text, &prefix, &suffix));
            Some(Token::Term(value.quoted(&prefix, &suffix)))
        })
    }

    pub fn build(self) -> Result<ShuntingYardParser<V>, ConfigurationError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(ShuntingYardParser {
                tree: self.tree,
                list_operator: self.list_operator,
            }),
        }
    }
}
