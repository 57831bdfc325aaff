//! Symbolic simplification of formula text.
//!
//! The optimizer parses formulas with the same grammar shape as
//! [`Formula`](crate::formula::Formula) but binds every operator and function
//! to a [`Symbol`] instead of a [`Value`](crate::value::Value). Evaluating the
//! program builds a symbolic tree, which renders back to formula text with
//! redundant brackets dropped and nested `any`/`all` calls merged.
use std::sync::{Arc, LazyLock};

use itertools::Itertools;

use crate::{
    context::{DataContext, EmptyDataContext},
    error::{ConfigurationError, Error, ResolveError},
    formula::Options,
    shunting_yard::{
        Operand, ShuntingYardParser, eval,
        node::{Associativity, Callable, Function, Operator, Resolved},
    },
};

pub(crate) static DEFAULT_OPTIMIZER: LazyLock<Optimizer> = LazyLock::new(|| {
    Optimizer::new(&Options::default()).unwrap_or_else(|error| panic!("optimizer grammar: {error}"))
});

/// Precedence of the `,` list operator; list operands are bracketed inside
/// argument lists.
const LIST_PRECEDENCE: u8 = 1;

/// The four operators whose nesting is simplified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arithmetic {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Arithmetic {
    pub fn symbol(self) -> &'static str {
        match self {
            Arithmetic::Add => "+",
            Arithmetic::Subtract => "-",
            Arithmetic::Multiply => "*",
            Arithmetic::Divide => "/",
        }
    }

    fn precedence(self) -> u8 {
        match self {
            Arithmetic::Add | Arithmetic::Subtract => 2,
            Arithmetic::Multiply | Arithmetic::Divide => 3,
        }
    }

    fn same_class(self, other: Arithmetic) -> bool {
        self.precedence() == other.precedence()
    }

    /// Whether a same-class right operand regroups without changing the result.
    fn is_associative(self) -> bool {
        matches!(self, Arithmetic::Add | Arithmetic::Multiply)
    }
}

/// A formula fragment built by the optimizer grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum Symbol {
    /// Text that never needs brackets: literals, variables and calls.
    Atom(String),
    Boolean(bool),
    /// Rendered text of an operator other than the simplified arithmetic.
    Infix { text: String, precedence: u8 },
    Math {
        operator: Arithmetic,
        left: Box<Symbol>,
        right: Box<Symbol>,
    },
    Any(Vec<Symbol>),
    All(Vec<Symbol>),
    Named { subject: Box<Symbol>, label: String },
}

impl Symbol {
    pub fn atom(text: impl Into<String>) -> Self {
        Symbol::Atom(text.into())
    }

    fn infix(text: String, precedence: u8) -> Self {
        Symbol::Infix { text, precedence }
    }

    fn math(operator: Arithmetic, left: Symbol, right: Symbol) -> Self {
        Symbol::Math {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// `any` over `symbols`. Nested `any` calls are merged, `false` drops out
    /// and a single `true` decides the result.
    pub fn any(symbols: Vec<Symbol>) -> Self {
        Self::fold(symbols, true)
    }

    /// `all` over `symbols`. Nested `all` calls are merged, `true` drops out
    /// and a single `false` decides the result.
    pub fn all(symbols: Vec<Symbol>) -> Self {
        Self::fold(symbols, false)
    }

    fn fold(symbols: Vec<Symbol>, absorbing: bool) -> Self {
        let mut kept = Vec::with_capacity(symbols.len());

        for symbol in symbols {
            match symbol {
                Symbol::Any(nested) if absorbing => kept.extend(nested),
                Symbol::All(nested) if !absorbing => kept.extend(nested),
                Symbol::Boolean(b) if b == absorbing => return Symbol::Boolean(absorbing),
                Symbol::Boolean(_) => {}
                other => kept.push(other),
            }
        }

        match kept.len() {
            0 => Symbol::Boolean(!absorbing),
            1 => kept.pop().unwrap_or(Symbol::Boolean(!absorbing)),
            _ if absorbing => Symbol::Any(kept),
            _ => Symbol::All(kept),
        }
    }

    /// Renders the symbol as a complete formula, without enclosing brackets.
    pub fn to_formula_text(&self) -> String {
        match self {
            Symbol::Math {
                operator,
                left,
                right,
            } => format!(
                "{}{}{}",
                left.math_operand(*operator, false),
                operator.symbol(),
                right.math_operand(*operator, true)
            ),
            Symbol::Infix { text, .. } => text.clone(),
            _ => self.render(),
        }
    }

    /// Renders the symbol as an operand, bracketing anything compound.
    fn render(&self) -> String {
        match self {
            Symbol::Atom(text) => text.clone(),
            Symbol::Boolean(b) => b.to_string(),
            Symbol::Infix { text, .. } => format!("({})", text),
            Symbol::Math { .. } => format!("({})", self.to_formula_text()),
            Symbol::Any(symbols) => call("any", symbols),
            Symbol::All(symbols) => call("all", symbols),
            Symbol::Named { subject, label } => format!("{}[{}]", subject.render(), label),
        }
    }

    fn argument(&self) -> String {
        match self {
            Symbol::Infix { precedence, .. } if *precedence <= LIST_PRECEDENCE => self.render(),
            _ => self.to_formula_text(),
        }
    }

    /// Operand of an operator that binds with `precedence`. A `loose` operand
    /// sits on the side the operator associates towards, so an equal
    /// precedence needs no brackets there.
    fn operand(&self, precedence: u8, loose: bool) -> String {
        match self {
            Symbol::Infix {
                text,
                precedence: own,
            } if *own > precedence || (loose && *own == precedence) => text.clone(),
            _ => self.render(),
        }
    }

    fn math_operand(&self, parent: Arithmetic, right: bool) -> String {
        match self {
            Symbol::Math { operator, .. }
                if operator.same_class(parent) && (!right || parent.is_associative()) =>
            {
                self.to_formula_text()
            }
            _ => self.operand(parent.precedence(), !right),
        }
    }
}

fn call(name: &str, symbols: &[Symbol]) -> String {
    format!("{}({})", name, symbols.iter().map(Symbol::argument).join(","))
}

impl Operand for Symbol {
    fn from_integer(text: &str) -> Self {
        Symbol::atom(text)
    }

    fn from_decimal(text: &str) -> Self {
        Symbol::atom(text)
    }

    fn from_text(text: &str) -> Self {
        Symbol::atom(text)
    }

    fn quoted(self, prefix: &str, suffix: &str) -> Self {
        Symbol::Atom(format!("{}{}{}", prefix, self.render(), suffix))
    }
}

/// Rewrites formula text into an equivalent, simplified form.
#[derive(Debug)]
pub struct Optimizer {
    parser: ShuntingYardParser<Symbol>,
}

impl Optimizer {
    pub fn new(options: &Options) -> Result<Self, ConfigurationError> {
        Ok(Self {
            parser: grammar(options)?,
        })
    }

    /// The optimizer built with [`Options::default`].
    pub fn shared() -> &'static Optimizer {
        &DEFAULT_OPTIMIZER
    }

    pub fn optimize(&self, text: &str) -> Result<String, Error> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let symbol = self
            .parser
            .parse(text)
            .map(Arc::new)
            .map_err(|error| Error::from_error(text, error))
            .and_then(|program| {
                eval::evaluate(&program, &EmptyDataContext)
                    .map_err(|error| Error::from_error(text, error))
            })?;
        let optimized = symbol.to_formula_text();

        log::debug!("optimized `{}` into `{}`", text, optimized);
        Ok(optimized)
    }
}

fn grammar(options: &Options) -> Result<ShuntingYardParser<Symbol>, ConfigurationError> {
    let mut builder = ShuntingYardParser::builder();

    if options.ignore_whitespace {
        builder = builder.ignore_whitespace();
    }

    builder = builder
        .list_operator(infix(",", LIST_PRECEDENCE, Associativity::Left))
        .literal("\"", "\"", Some("\\\""))
        .literal("'", "'", Some("\\'"))
        .operator(infix("^", 4, Associativity::Right))
        .operator(math(Arithmetic::Multiply))
        .operator(math(Arithmetic::Divide))
        .operator(math(Arithmetic::Add))
        .bi_operator(prefix("-"), math(Arithmetic::Subtract))
        .operator(prefix("!"))
        .operator(infix("d", 5, Associativity::Left))
        .operator(infix("<", 3, Associativity::Left))
        .operator(infix("<=", 3, Associativity::Left))
        .operator(infix(">", 3, Associativity::Left))
        .operator(infix(">=", 3, Associativity::Left))
        .operator(infix("==", 3, Associativity::Left))
        .operator(infix("!=", 3, Associativity::Left))
        .operator(Operator::new(
            "AND",
            1,
            Associativity::Left,
            Callable::binary(|a: Symbol, b: Symbol| Ok(Symbol::all(vec![a, b]))),
        ))
        .operator(Operator::new(
            "OR",
            1,
            Associativity::Left,
            Callable::binary(|a: Symbol, b: Symbol| Ok(Symbol::any(vec![a, b]))),
        ))
        .term("true", Symbol::Boolean(true))
        .term("false", Symbol::Boolean(false))
        .term("null", Symbol::atom("null"));

    for name in ["abs", "floor", "ceil", "signed", "ordinal", "mineach", "maxeach"] {
        builder = builder.function(Function::new(
            name,
            Callable::unary(move |a: Symbol| Ok(Symbol::Atom(call(name, &[a])))),
        ));
    }
    for name in ["clamp", "if"] {
        builder = builder.function(Function::new(
            name,
            Callable::ternary(move |a: Symbol, b: Symbol, c: Symbol| {
                Ok(Symbol::Atom(call(name, &[a, b, c])))
            }),
        ));
    }
    for name in ["min", "max", "sum", "concat"] {
        builder = builder.function(Function::new(
            name,
            Callable::variadic(move |args: Vec<Symbol>| Ok(Symbol::Atom(call(name, &args)))),
        ));
    }

    builder
        .function(Function::new(
            "any",
            Callable::variadic(|args: Vec<Symbol>| Ok(Symbol::any(args))),
        ))
        .function(Function::new(
            "all",
            Callable::variadic(|args: Vec<Symbol>| Ok(Symbol::all(args))),
        ))
        .variable(
            "@",
            Arc::new(|_: &dyn DataContext, key: &str| -> Result<Resolved<Symbol>, ResolveError> {
                Ok(Resolved::Value(Symbol::Atom(format!("@{}", key))))
            }),
        )
        .braced_variable(
            "@{",
            "}",
            Arc::new(|_: &dyn DataContext, key: &str| -> Result<Resolved<Symbol>, ResolveError> {
                Ok(Resolved::Value(Symbol::Atom(format!("@{{{}}}", key))))
            }),
        )
        .comment(
            "[",
            "]",
            Arc::new(|subject: Symbol, label: &str| Symbol::Named {
                subject: Box::new(subject),
                label: label.to_string(),
            }),
        )
        .build()
}

fn math(operator: Arithmetic) -> Operator<Symbol> {
    Operator::new(
        operator.symbol(),
        operator.precedence(),
        Associativity::Left,
        Callable::binary(move |a: Symbol, b: Symbol| Ok(Symbol::math(operator, a, b))),
    )
}

fn infix(symbol: &'static str, precedence: u8, associativity: Associativity) -> Operator<Symbol> {
    Operator::new(
        symbol,
        precedence,
        associativity,
        Callable::binary(move |a: Symbol, b: Symbol| {
            let text = format!(
                "{}{}{}",
                a.operand(precedence, associativity == Associativity::Left),
                symbol,
                b.operand(precedence, associativity == Associativity::Right)
            );
            Ok(Symbol::infix(text, precedence))
        }),
    )
}

fn prefix(symbol: &'static str) -> Operator<Symbol> {
    Operator::new(
        symbol,
        4,
        Associativity::Left,
        Callable::unary(move |a: Symbol| Ok(Symbol::infix(format!("{}{}", symbol, a.operand(4, false)), 4))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn optimizer() -> &'static Optimizer {
        let _ = env_logger::builder().is_test(true).try_init();
        Optimizer::shared()
    }

    #[rstest]
    #[case::nested_any("any(any(@a, any(@b, @c)), @d)", "any(@a,@b,@c,@d)")]
    #[case::nested_all(
        "all(any(@a, all(@b)), @c, all(@d AND @e), @f)",
        "all(any(@a,@b),@c,@d,@e,@f)"
    )]
    #[case::and_chain("@a AND @b AND @c", "all(@a,@b,@c)")]
    #[case::or_chain("@a OR (@b OR @c)", "any(@a,@b,@c)")]
    #[case::same_class_addition("@a + (@b + @c)", "@a+@b+@c")]
    #[case::mixed_classes("@a * (@b + @c + @d)/2", "@a*(@b+@c+@d)/2")]
    #[case::bracketed_division("@a - (@b / @c)", "@a-(@b/@c)")]
    #[case::subtracted_sum("@a - (@b + @c)", "@a-(@b+@c)")]
    #[case::left_subtraction("(@a - @b) + @c", "@a-@b+@c")]
    #[case::divided_product("@a / (@b * @c)", "@a/(@b*@c)")]
    #[case::comparison("@a < (@b - @c)", "@a<(@b-@c)")]
    #[case::comparison_of_product("@a * 2 >= @b", "(@a*2)>=@b")]
    #[case::product_of_comparison("@a * (@b < @c)", "@a*(@b<@c)")]
    #[case::quoted("\"testing\"", "\"testing\"")]
    #[case::quoted_argument("any(@a,\"testing\")", "any(@a,\"testing\")")]
    #[case::comment("(@a+@b)[testing]", "(@a+@b)[testing]")]
    #[case::top_level_brackets("((@a + @b))", "@a+@b")]
    #[case::braced_variable("@{a b} + 1", "@{a b}+1")]
    #[case::any_true("any(@a, true)", "true")]
    #[case::any_false("any(@a, false)", "@a")]
    #[case::all_false("@a AND false", "false")]
    #[case::all_true("all(true, @a, @b)", "all(@a,@b)")]
    #[case::any_of_nothing("any(false)", "false")]
    #[case::all_of_nothing("all()", "true")]
    #[case::functions("abs(@a + @b) + max(1, @c)", "abs(@a+@b)+max(1,@c)")]
    #[case::if_function("if(@a > 1, 'yes', 'no')", "if(@a>1,'yes','no')")]
    #[case::unary("-(@a + 1)", "-(@a+1)")]
    #[case::not("!@a", "!@a")]
    #[case::power("(@a + 1) ^ 2", "(@a+1)^2")]
    #[case::power_chain("@a ^ @b ^ @c", "@a^@b^@c")]
    #[case::grouped_power("(@a ^ @b) ^ @c", "(@a^@b)^@c")]
    #[case::dice("2d6 + @a", "2d6+@a")]
    #[case::list("1, 2, @a", "1,2,@a")]
    #[case::list_argument("min((1, 2), 3)", "min((1,2),3)")]
    #[case::keywords("null == false", "null==false")]
    #[case::decimal("1.50 * @a", "1.50*@a")]
    fn test_optimize(optimizer: &Optimizer, #[case] input: &str, #[case] expected: &str) {
        assert_eq!(optimizer.optimize(input), Ok(expected.to_string()), "{input}");
    }

    #[rstest]
    fn test_blank_text(optimizer: &Optimizer) {
        assert_eq!(optimizer.optimize("   "), Ok(String::new()));
    }

    #[rstest]
    fn test_reports_parse_errors(optimizer: &Optimizer) {
        let error = optimizer.optimize("@a # 1").unwrap_err();
        assert_eq!(
            error.cause,
            crate::error::InnerError::Parse(crate::error::ParseError::new("@a # 1", 3, '#'))
        );
    }

    #[rstest]
    fn test_reports_missing_operands(optimizer: &Optimizer) {
        let error = optimizer.optimize("@a +").unwrap_err();
        assert_eq!(
            error.cause,
            crate::error::InnerError::Resolve(ResolveError::MissingOperand {
                name: "+".into(),
                position: 2
            })
        );
    }

    #[rstest]
    #[case::any(vec![Symbol::atom("@a"), Symbol::Any(vec![Symbol::atom("@b")])], Symbol::Any(vec![Symbol::atom("@a"), Symbol::atom("@b")]))]
    #[case::single(vec![Symbol::atom("@a"), Symbol::Boolean(false)], Symbol::atom("@a"))]
    #[case::keeps_all(
        vec![Symbol::All(vec![Symbol::atom("@a"), Symbol::atom("@b")]), Symbol::atom("@c")],
        Symbol::Any(vec![
            Symbol::All(vec![Symbol::atom("@a"), Symbol::atom("@b")]),
            Symbol::atom("@c")
        ])
    )]
    fn test_any(#[case] symbols: Vec<Symbol>, #[case] expected: Symbol) {
        assert_eq!(Symbol::any(symbols), expected);
    }
}
