//! The default evaluation grammar and its builtin operators and functions.
use std::{
    cmp::Ordering,
    sync::{Arc, LazyLock},
};

use crate::{
    context::{DataContext, WILDCARD},
    error::{ConfigurationError, Error, ParseError, ResolveError},
    resolvable::Resolvable,
    shunting_yard::{
        Operand, ShuntingYardParser,
        node::{Associativity, Callable, Function, Operator, Resolved},
    },
    value::Value,
};

pub(crate) static DEFAULT_FORMULA: LazyLock<Formula> = LazyLock::new(|| {
    Formula::new(Options::default()).unwrap_or_else(|error| panic!("default grammar: {error}"))
});

#[derive(Debug, Clone)]
pub struct Options {
    /// Raise [`ResolveError::NotANumber`] from arithmetic instead of producing NaN.
    pub strict_arithmetic: bool,
    pub ignore_whitespace: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            strict_arithmetic: false,
            ignore_whitespace: true,
        }
    }
}

impl Operand for Value {
    fn from_integer(text: &str) -> Self {
        text.parse::<i64>()
            .map(Value::Integer)
            .unwrap_or_else(|_| Self::from_decimal(text))
    }

    fn from_decimal(text: &str) -> Self {
        text.parse::<f64>().map(Value::decimal).unwrap_or(Value::NaN)
    }

    fn from_text(text: &str) -> Self {
        Value::text(text)
    }

    fn quoted(self, prefix: &str, suffix: &str) -> Self {
        Value::quoted(self, prefix, suffix)
    }
}

/// Parses formula text into [`Resolvable`]s that evaluate to [`Value`]s.
#[derive(Debug)]
pub struct Formula {
    parser: ShuntingYardParser<Value>,
    options: Options,
}

impl Formula {
    pub fn new(options: Options) -> Result<Self, ConfigurationError> {
        Ok(Self {
            parser: grammar(&options)?,
            options,
        })
    }

    /// The grammar built with [`Options::default`].
    pub fn shared() -> &'static Formula {
        &DEFAULT_FORMULA
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Blank text parses to [`Resolvable::Empty`].
    pub fn parse(&self, text: &str) -> Result<Resolvable, ParseError> {
        if text.trim().is_empty() {
            return Ok(Resolvable::Empty);
        }

        let program = self.parser.parse(text)?;
        Ok(Resolvable::Program(Arc::new(program)))
    }

    /// Parses and resolves `text` in one step.
    pub fn evaluate(&self, text: &str, context: &dyn DataContext) -> Result<Value, Error> {
        let resolvable = self
            .parse(text)
            .map_err(|error| Error::from_error(text, error))?;
        resolvable
            .resolve(context)
            .map_err(|error| Error::from_error(text, error))
    }
}

fn grammar(options: &Options) -> Result<ShuntingYardParser<Value>, ConfigurationError> {
    let strict = options.strict_arithmetic;
    let mut builder = ShuntingYardParser::builder();

    if options.ignore_whitespace {
        builder = builder.ignore_whitespace();
    }

    builder
        .list_operator(Operator::new(
            ",",
            1,
            Associativity::Left,
            Callable::binary(|a: Value, b: Value| {
                Ok(Value::List(a.as_list().into_iter().chain(b.as_list()).collect()))
            }),
        ))
        .literal("\"", "\"", Some("\\\""))
        .literal("'", "'", Some("\\'"))
        .operator(arithmetic("^", 4, Associativity::Right, strict, power))
        .operator(arithmetic("*", 3, Associativity::Left, strict, multiply))
        .operator(arithmetic("/", 3, Associativity::Left, strict, divide))
        .operator(arithmetic("+", 2, Associativity::Left, strict, add))
        .bi_operator(
            Operator::new(
                "-",
                4,
                Associativity::Left,
                Callable::unary(move |a: Value| lenient(strict, negate(&a))),
            ),
            arithmetic("-", 2, Associativity::Left, strict, subtract),
        )
        .operator(Operator::new(
            "!",
            4,
            Associativity::Left,
            Callable::unary(|a: Value| Ok(Value::Boolean(!a.as_boolean()))),
        ))
        .operator(Operator::new(
            "d",
            5,
            Associativity::Left,
            Callable::binary(|count: Value, sides: Value| {
                Ok(Value::roll(count.as_number()?, sides.as_number()?))
            }),
        ))
        .operator(comparison("<", Ordering::is_lt))
        .operator(comparison("<=", Ordering::is_le))
        .operator(comparison(">", Ordering::is_gt))
        .operator(comparison(">=", Ordering::is_ge))
        .operator(Operator::new(
            "==",
            3,
            Associativity::Left,
            Callable::binary(|a: Value, b: Value| Ok(Value::Boolean(a == b))),
        ))
        .operator(Operator::new(
            "!=",
            3,
            Associativity::Left,
            Callable::binary(|a: Value, b: Value| Ok(Value::Boolean(a != b))),
        ))
        .operator(Operator::new(
            "AND",
            1,
            Associativity::Left,
            Callable::binary(|a: Value, b: Value| Ok(Value::Boolean(a.as_boolean() && b.as_boolean()))),
        ))
        .operator(Operator::new(
            "OR",
            1,
            Associativity::Left,
            Callable::binary(|a: Value, b: Value| Ok(Value::Boolean(a.as_boolean() || b.as_boolean()))),
        ))
        .term("true", Value::TRUE)
        .term("false", Value::FALSE)
        .term("null", Value::NONE)
        .function(Function::new("abs", Callable::unary(|a: Value| absolute(&a))))
        .function(Function::new("floor", Callable::unary(|a: Value| round(&a, f64::floor))))
        .function(Function::new("ceil", Callable::unary(|a: Value| round(&a, f64::ceil))))
        .function(Function::new("signed", Callable::unary(|a: Value| signed(&a))))
        .function(Function::new("ordinal", Callable::unary(|a: Value| ordinal(&a))))
        .function(Function::new(
            "mineach",
            Callable::unary(|a: Value| each(&a, Ordering::Less)),
        ))
        .function(Function::new(
            "maxeach",
            Callable::unary(|a: Value| each(&a, Ordering::Greater)),
        ))
        .function(Function::new("clamp", Callable::ternary(clamp)))
        .function(Function::new(
            "if",
            Callable::ternary(|condition: Value, then: Value, otherwise: Value| {
                Ok(if condition.as_boolean() { then } else { otherwise })
            }),
        ))
        .function(Function::new(
            "min",
            Callable::variadic(|args: Vec<Value>| extremum(flatten(args), Ordering::Less)),
        ))
        .function(Function::new(
            "max",
            Callable::variadic(|args: Vec<Value>| extremum(flatten(args), Ordering::Greater)),
        ))
        .function(Function::new(
            "sum",
            Callable::variadic(move |args: Vec<Value>| sum(flatten(args), strict)),
        ))
        .function(Function::new(
            "any",
            Callable::variadic(|args: Vec<Value>| {
                Ok(Value::Boolean(flatten(args).iter().any(Value::as_boolean)))
            }),
        ))
        .function(Function::new(
            "all",
            Callable::variadic(|args: Vec<Value>| {
                Ok(Value::Boolean(flatten(args).iter().all(Value::as_boolean)))
            }),
        ))
        .function(Function::new(
            "concat",
            Callable::variadic(|args: Vec<Value>| Ok(Value::List(flatten(args)))),
        ))
        .variable("@", Arc::new(resolve_variable))
        .braced_variable("@{", "}", Arc::new(resolve_variable))
        .comment(
            "[",
            "]",
            Arc::new(|value: Value, label: &str| Value::named(value, label)),
        )
        .build()
}

/// Point lookups splice referenced programs into the running evaluation;
/// wildcard keys resolve to the list of every match, ordered by key.
fn resolve_variable(context: &dyn DataContext, key: &str) -> Result<Resolved<Value>, ResolveError> {
    if key.contains(WILDCARD) {
        let values = context
            .search(key)?
            .into_iter()
            .map(|found| found.value)
            .collect();
        return Ok(Resolved::Value(Value::List(values)));
    }

    match context.lookup(key) {
        Some(Resolvable::Program(program)) => Ok(Resolved::Splice(program)),
        Some(resolvable) => resolvable.resolve(context).map(Resolved::Value),
        None => Ok(Resolved::Value(Value::None)),
    }
}

type BinaryFn = fn(&Value, &Value) -> Result<Value, ResolveError>;

fn arithmetic(
    symbol: &str,
    precedence: u8,
    associativity: Associativity,
    strict: bool,
    f: BinaryFn,
) -> Operator<Value> {
    Operator::new(
        symbol,
        precedence,
        associativity,
        Callable::binary(move |a: Value, b: Value| lenient(strict, f(&a, &b))),
    )
}

/// Replaces a failed numeric coercion with NaN unless `strict`.
fn lenient(strict: bool, result: Result<Value, ResolveError>) -> Result<Value, ResolveError> {
    match result {
        Err(ResolveError::NotANumber { .. }) if !strict => Ok(Value::NaN),
        other => other,
    }
}

/// Keeps integers integral while the result fits; anything else is decimal.
fn integral(
    a: &Value,
    b: &Value,
    integer: fn(i64, i64) -> Option<i64>,
    decimal: fn(f64, f64) -> f64,
) -> Result<Value, ResolveError> {
    if let Some(n) = a
        .as_integer()
        .zip(b.as_integer())
        .and_then(|(x, y)| integer(x, y))
    {
        return Ok(Value::Integer(n));
    }

    Ok(Value::decimal(decimal(a.as_decimal()?, b.as_decimal()?)))
}

fn add(a: &Value, b: &Value) -> Result<Value, ResolveError> {
    integral(a, b, i64::checked_add, |x, y| x + y)
}

fn subtract(a: &Value, b: &Value) -> Result<Value, ResolveError> {
    integral(a, b, i64::checked_sub, |x, y| x - y)
}

fn multiply(a: &Value, b: &Value) -> Result<Value, ResolveError> {
    integral(a, b, i64::checked_mul, |x, y| x * y)
}

fn divide(a: &Value, b: &Value) -> Result<Value, ResolveError> {
    Ok(Value::decimal(a.as_decimal()? / b.as_decimal()?))
}

fn power(a: &Value, b: &Value) -> Result<Value, ResolveError> {
    integral(
        a,
        b,
        |x, y| u32::try_from(y).ok().and_then(|y| x.checked_pow(y)),
        f64::powf,
    )
}

fn negate(a: &Value) -> Result<Value, ResolveError> {
    match a.as_integer().and_then(i64::checked_neg) {
        Some(n) => Ok(Value::Integer(n)),
        None => Ok(Value::decimal(-a.as_decimal()?)),
    }
}

fn comparison(symbol: &str, test: fn(Ordering) -> bool) -> Operator<Value> {
    Operator::new(
        symbol,
        3,
        Associativity::Left,
        Callable::binary(move |a: Value, b: Value| {
            let ordering = a.as_decimal()?.partial_cmp(&b.as_decimal()?);
            Ok(Value::Boolean(ordering.is_some_and(test)))
        }),
    )
}

/// A whole number as an integer where it fits.
fn whole(n: f64) -> Value {
    if n.is_finite() && n.abs() < i64::MAX as f64 {
        Value::Integer(n as i64)
    } else {
        Value::decimal(n)
    }
}

fn absolute(a: &Value) -> Result<Value, ResolveError> {
    match a.as_integer().and_then(i64::checked_abs) {
        Some(n) => Ok(Value::Integer(n)),
        None => Ok(Value::decimal(a.as_decimal()?.abs())),
    }
}

fn round(a: &Value, f: fn(f64) -> f64) -> Result<Value, ResolveError> {
    match a.as_integer() {
        Some(n) => Ok(Value::Integer(n)),
        None => Ok(whole(f(a.as_decimal()?))),
    }
}

fn signed(a: &Value) -> Result<Value, ResolveError> {
    let n = a.as_number()?;
    Ok(Value::Text(if n >= 0 {
        format!("+{}", n)
    } else {
        n.to_string()
    }))
}

fn ordinal(a: &Value) -> Result<Value, ResolveError> {
    let n = a.as_number()?;
    let suffix = match (n.unsigned_abs() % 10, n.unsigned_abs() % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    Ok(Value::Text(format!("{}{}", n, suffix)))
}

fn clamp(value: Value, low: Value, high: Value) -> Result<Value, ResolveError> {
    let n = value.as_decimal()?;
    if n < low.as_decimal()? {
        Ok(low)
    } else if n > high.as_decimal()? {
        Ok(high)
    } else {
        Ok(value)
    }
}

/// The scalars of `values` in order, with nested lists expanded in place.
fn flatten(values: Vec<Value>) -> Vec<Value> {
    let mut flat = Vec::with_capacity(values.len());
    let mut pending = values.into_iter().rev().collect::<Vec<_>>();

    while let Some(value) = pending.pop() {
        if value.is_list() {
            pending.extend(value.as_list().into_iter().rev());
        } else {
            flat.push(value);
        }
    }

    flat
}

/// The smallest (`Less`) or largest (`Greater`) value. `None` elements are
/// skipped; the result is `None` when nothing else remains. Ties keep the
/// earlier value.
fn extremum(values: Vec<Value>, keep: Ordering) -> Result<Value, ResolveError> {
    let mut best: Option<(Value, f64)> = None;

    for value in values {
        if value.is_none() {
            continue;
        }
        let n = value.as_decimal()?;
        if best
            .as_ref()
            .is_none_or(|(_, current)| n.partial_cmp(current) == Some(keep))
        {
            best = Some((value, n));
        }
    }

    Ok(best.map(|(value, _)| value).unwrap_or(Value::None))
}

fn each(a: &Value, keep: Ordering) -> Result<Value, ResolveError> {
    a.as_list()
        .iter()
        .map(|element| extremum(flatten(vec![element.clone()]), keep))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::List)
}

/// Nothing to add is 0; adding two `None`s stays `None`. A `None` next to
/// anything else adds as integer zero.
fn sum(values: Vec<Value>, strict: bool) -> Result<Value, ResolveError> {
    let mut values = values.into_iter();
    let Some(first) = values.next() else {
        return Ok(Value::Integer(0));
    };

    values.try_fold(first, |total, value| match (total.is_none(), value.is_none()) {
        (true, true) => Ok(Value::None),
        (true, false) => lenient(strict, add(&Value::Integer(0), &value)),
        (false, true) => lenient(strict, add(&total, &Value::Integer(0))),
        (false, false) => lenient(strict, add(&total, &value)),
    })
}
