use std::{fmt, sync::Arc};

use smol_str::SmolStr;

use crate::context::DataContext;

use super::{Program, error::ResolveError};

pub type NativeResult<V> = Result<V, ResolveError>;

/// The native implementation behind an operator or function, tagged with the
/// number of operands it takes.
pub enum Callable<V> {
    Nullary(Arc<dyn Fn() -> NativeResult<V> + Send + Sync>),
    Unary(Arc<dyn Fn(V) -> NativeResult<V> + Send + Sync>),
    Binary(Arc<dyn Fn(V, V) -> NativeResult<V> + Send + Sync>),
    Ternary(Arc<dyn Fn(V, V, V) -> NativeResult<V> + Send + Sync>),
    /// Takes however many arguments the call site supplied, in source order.
    Variadic(Arc<dyn Fn(Vec<V>) -> NativeResult<V> + Send + Sync>),
}

impl<V> Clone for Callable<V> {
    fn clone(&self) -> Self {
        match self {
            Callable::Nullary(f) => Callable::Nullary(Arc::clone(f)),
            Callable::Unary(f) => Callable::Unary(Arc::clone(f)),
            Callable::Binary(f) => Callable::Binary(Arc::clone(f)),
            Callable::Ternary(f) => Callable::Ternary(Arc::clone(f)),
            Callable::Variadic(f) => Callable::Variadic(Arc::clone(f)),
        }
    }
}

impl<V> Callable<V> {
    pub fn nullary(f: impl Fn() -> NativeResult<V> + Send + Sync + 'static) -> Self {
        Callable::Nullary(Arc::new(f))
    }

    pub fn unary(f: impl Fn(V) -> NativeResult<V> + Send + Sync + 'static) -> Self {
        Callable::Unary(Arc::new(f))
    }

    pub fn binary(f: impl Fn(V, V) -> NativeResult<V> + Send + Sync + 'static) -> Self {
        Callable::Binary(Arc::new(f))
    }

    pub fn ternary(f: impl Fn(V, V, V) -> NativeResult<V> + Send + Sync + 'static) -> Self {
        Callable::Ternary(Arc::new(f))
    }

    pub fn variadic(f: impl Fn(Vec<V>) -> NativeResult<V> + Send + Sync + 'static) -> Self {
        Callable::Variadic(Arc::new(f))
    }

    /// The fixed operand count, or `None` for variadic callables.
    pub fn arity(&self) -> Option<usize> {
        match self {
            Callable::Nullary(_) => Some(0),
            Callable::Unary(_) => Some(1),
            Callable::Binary(_) => Some(2),
            Callable::Ternary(_) => Some(3),
            Callable::Variadic(_) => None,
        }
    }

    pub fn is_variadic(&self) -> bool {
        self.arity().is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
}

pub struct Operator<V> {
    pub symbol: SmolStr,
    pub precedence: u8,
    pub associativity: Associativity,
    pub callable: Callable<V>,
}

impl<V> Operator<V> {
    pub fn new(
        symbol: impl Into<SmolStr>,
        precedence: u8,
        associativity: Associativity,
        callable: Callable<V>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            precedence,
            associativity,
            callable,
        }
    }

    pub fn is_prefix(&self) -> bool {
        self.callable.arity() == Some(1)
    }

    /// Whether `self`, arriving on the input, pops `top` off the operator stack.
    pub(crate) fn yields_to(&self, top: &Operator<V>) -> bool {
        self.precedence < top.precedence
            || (self.associativity == Associativity::Left && self.precedence == top.precedence)
    }
}

impl<V> fmt::Debug for Operator<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator")
            .field("symbol", &self.symbol)
            .field("precedence", &self.precedence)
            .field("associativity", &self.associativity)
            .field("arity", &self.callable.arity())
            .finish()
    }
}

pub struct Function<V> {
    pub name: SmolStr,
    pub callable: Callable<V>,
}

impl<V> Function<V> {
    pub fn new(name: impl Into<SmolStr>, callable: Callable<V>) -> Self {
        Self {
            name: name.into(),
            callable,
        }
    }
}

impl<V> fmt::Debug for Function<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("arity", &self.callable.arity())
            .finish()
    }
}

/// What a variable resolves to: a value, or another program whose
/// instructions replace the variable in the running evaluation.
pub enum Resolved<V> {
    Value(V),
    Splice(Arc<Program<V>>),
}

pub type VariableResolver<V> =
    Arc<dyn Fn(&dyn DataContext, &str) -> Result<Resolved<V>, ResolveError> + Send + Sync>;

pub struct Variable<V> {
    pub key: SmolStr,
    pub resolver: VariableResolver<V>,
}

pub type CommentDecorator<V> = Arc<dyn Fn(V, &str) -> V + Send + Sync>;

pub struct Comment<V> {
    pub text: SmolStr,
    pub decorator: CommentDecorator<V>,
}

/// An instruction of a compiled postfix program.
pub enum ProgramNode<V> {
    Term(V),
    Variable(Arc<Variable<V>>),
    Operator(Arc<Operator<V>>),
    Function(Arc<Function<V>>),
    /// The argument count of the variadic call that follows.
    Arity(usize),
    Comment(Arc<Comment<V>>),
}

impl<V: Clone> Clone for ProgramNode<V> {
    fn clone(&self) -> Self {
        match self {
            ProgramNode::Term(value) => ProgramNode::Term(value.clone()),
            ProgramNode::Variable(variable) => ProgramNode::Variable(Arc::clone(variable)),
            ProgramNode::Operator(operator) => ProgramNode::Operator(Arc::clone(operator)),
            ProgramNode::Function(function) => ProgramNode::Function(Arc::clone(function)),
            ProgramNode::Arity(arity) => ProgramNode::Arity(*arity),
            ProgramNode::Comment(comment) => ProgramNode::Comment(Arc::clone(comment)),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for ProgramNode<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramNode::Term(value) => write!(f, "Term({:?})", value),
            ProgramNode::Variable(variable) => write!(f, "Variable({})", variable.key),
            ProgramNode::Operator(operator) => write!(f, "Operator({})", operator.symbol),
            ProgramNode::Function(function) => write!(f, "Function({})", function.name),
            ProgramNode::Arity(arity) => write!(f, "Arity({})", arity),
            ProgramNode::Comment(comment) => write!(f, "Comment({})", comment.text),
        }
    }
}

/// The parser's input vocabulary, produced by the token tree.
pub enum Token<V> {
    Term(V),
    Variable(Arc<Variable<V>>),
    Operator(Arc<Operator<V>>),
    /// One symbol bound to a prefix and an infix operator.
    BiOperator {
        unary: Arc<Operator<V>>,
        binary: Arc<Operator<V>>,
    },
    Function(Arc<Function<V>>),
    Comment(Arc<Comment<V>>),
    OpenParen,
    CloseParen,
    Separator,
}

impl<V> Token<V> {
    /// A `-` following one of these tokens has no left operand.
    pub(crate) fn precedes_operand(token: Option<&Token<V>>) -> bool {
        matches!(
            token,
            None | Some(Token::Operator(_))
                | Some(Token::BiOperator { .. })
                | Some(Token::OpenParen)
                | Some(Token::Separator)
        )
    }
}

impl<V: fmt::Debug> fmt::Debug for Token<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Term(value) => write!(f, "Term({:?})", value),
            Token::Variable(variable) => write!(f, "Variable({})", variable.key),
            Token::Operator(operator) => write!(f, "Operator({})", operator.symbol),
            Token::BiOperator { binary, .. } => write!(f, "BiOperator({})", binary.symbol),
            Token::Function(function) => write!(f, "Function({})", function.name),
            Token::Comment(comment) => write!(f, "Comment({})", comment.text),
            Token::OpenParen => write!(f, "("),
            Token::CloseParen => write!(f, ")"),
            Token::Separator => write!(f, ","),
        }
    }
}
