use std::fmt::{self, Debug, Display, Formatter};

use itertools::Itertools;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::{number::Number, shunting_yard::error::ResolveError};

/// Text values that read as `false`, compared case-insensitively.
const FALSE_TEXT_VALUES: [&str; 4] = ["false", "no", "0", ""];

static NONE: Value = Value::None;

/// The result of evaluating a formula.
///
/// Every kind can be viewed as text, as a whole number, as a decimal, as a
/// boolean and as a list. Numeric views of text fail with
/// [`ResolveError::NotANumber`]; all other views are total.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone)]
pub enum Value {
    Text(String),
    Integer(i64),
    Decimal(Number),
    Boolean(bool),
    List(Vec<Value>),
    None,
    NaN,
    /// A value annotated with a `[label]` comment.
    Named { value: Box<Value>, label: String },
    /// A literal that remembers the quotes it was written with.
    Quoted {
        value: Box<Value>,
        prefix: SmolStr,
        suffix: SmolStr,
    },
    /// `count` dice with `sides` sides; numerically its expected total.
    Roll { count: i64, sides: i64 },
}

impl Value {
    pub const NONE: Value = Self::None;
    pub const TRUE: Value = Self::Boolean(true);
    pub const FALSE: Value = Self::Boolean(false);

    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }

    pub fn decimal(value: f64) -> Self {
        Value::Decimal(Number::new(value))
    }

    pub fn roll(count: i64, sides: i64) -> Self {
        Value::Roll { count, sides }
    }

    pub fn named(value: Value, label: impl Into<String>) -> Self {
        Value::Named {
            value: Box::new(value),
            label: label.into(),
        }
    }

    pub fn quoted(value: Value, prefix: impl Into<SmolStr>, suffix: impl Into<SmolStr>) -> Self {
        Value::Quoted {
            value: Box::new(value),
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    /// Strips `Named` and `Quoted` wrappers.
    pub fn inner(&self) -> &Value {
        match self {
            Value::Named { value, .. } | Value::Quoted { value, .. } => value.inner(),
            other => other,
        }
    }

    /// Scalar views of a list read its last element.
    fn latest(&self) -> &Value {
        match self.inner() {
            Value::List(values) => values.last().map(Value::latest).unwrap_or(&NONE),
            other => other,
        }
    }

    /// The integer held by an `Integer` value, without coercing other kinds.
    pub fn as_integer(&self) -> Option<i64> {
        match self.latest() {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self.inner(), Value::None)
    }

    pub fn is_nan(&self) -> bool {
        match self.inner() {
            Value::NaN => true,
            Value::Decimal(n) => n.is_nan(),
            _ => false,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self.inner(), Value::List(_))
    }

    /// `false` only for `None` and for empty lists.
    pub fn has_value(&self) -> bool {
        match self.inner() {
            Value::None => false,
            Value::List(values) => !values.is_empty(),
            _ => true,
        }
    }

    pub fn as_text(&self) -> String {
        match self.latest() {
            Value::Text(s) => s.clone(),
            Value::Integer(n) => n.to_string(),
            Value::Decimal(n) => n.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::None => String::new(),
            Value::NaN => "NaN".to_string(),
            Value::Roll { count, sides } => format!("{}d{}", count, sides),
            Value::List(_) | Value::Named { .. } | Value::Quoted { .. } => unreachable!(),
        }
    }

    pub fn as_decimal(&self) -> Result<f64, ResolveError> {
        match self.latest() {
            Value::Text(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .ok_or_else(|| ResolveError::not_a_number(s.as_str())),
            Value::Integer(n) => Ok(*n as f64),
            Value::Decimal(n) => Ok(n.value()),
            Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::None => Ok(0.0),
            Value::NaN => Ok(f64::NAN),
            Value::Roll { count, sides } => Ok((*count as f64) * (*sides as f64 + 1.0) / 2.0),
            Value::List(_) | Value::Named { .. } | Value::Quoted { .. } => unreachable!(),
        }
    }

    /// The whole-number view; fractional parts are truncated.
    pub fn as_number(&self) -> Result<i64, ResolveError> {
        match self.latest() {
            Value::Integer(n) => Ok(*n),
            Value::Text(s) => match s.trim().parse::<i64>() {
                Ok(n) => Ok(n),
                Err(_) => self.as_decimal().map(|n| n as i64),
            },
            Value::NaN => Err(ResolveError::not_a_number("NaN")),
            Value::Decimal(n) if n.is_nan() => Err(ResolveError::not_a_number("NaN")),
            _ => self.as_decimal().map(|n| n as i64),
        }
    }

    pub fn as_boolean(&self) -> bool {
        match self.latest() {
            Value::Text(s) => !FALSE_TEXT_VALUES.contains(&s.to_lowercase().as_str()),
            Value::Integer(n) => *n != 0,
            Value::Decimal(n) => !n.is_zero() && !n.is_nan(),
            Value::Boolean(b) => *b,
            Value::None | Value::NaN => false,
            Value::Roll { count, sides } => *count > 0 && *sides > 0,
            Value::List(_) | Value::Named { .. } | Value::Quoted { .. } => unreachable!(),
        }
    }

    /// Lists yield their elements; anything else is a one-element list.
    pub fn as_list(&self) -> Vec<Value> {
        match self.inner() {
            Value::List(values) => values.clone(),
            _ => vec![self.clone()],
        }
    }

    /// Renders the value the way it would be written in a formula: quotes and
    /// `[label]` annotations are kept.
    pub fn to_formula_text(&self) -> String {
        match self {
            Value::Named { value, label } => format!("{}[{}]", value.to_formula_text(), label),
            Value::Quoted {
                value,
                prefix,
                suffix,
            } => format!("{}{}{}", prefix, value.as_text(), suffix),
            Value::List(values) => values.iter().map(Value::to_formula_text).join(","),
            Value::None => "null".to_string(),
            other => other.as_text(),
        }
    }

    /// Equality with the right-hand side coerced into this value's representation.
    fn coerced_eq(&self, other: &Value) -> bool {
        match (self.inner(), other.inner()) {
            (Value::None, Value::None) => true,
            (Value::None, _) | (_, Value::None) => false,
            (a, b) if a.is_nan() || b.is_nan() => false,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.coerced_eq(b))
            }
            (Value::List(a), b) => a.last().is_some_and(|a| a.coerced_eq(b)),
            (_, b) if !b.has_value() => false,
            (Value::Text(a), b) => *a == b.as_text(),
            (Value::Integer(a), b) => b.as_number().is_ok_and(|b| *a == b),
            (Value::Decimal(a), b) => b.as_decimal().is_ok_and(|b| a.is_close_to(b)),
            (Value::Boolean(a), b) => *a == b.as_boolean(),
            (
                Value::Roll { count, sides },
                Value::Roll {
                    count: other_count,
                    sides: other_sides,
                },
            ) => count == other_count && sides == other_sides,
            (a @ Value::Roll { .. }, b) => match (a.as_decimal(), b.as_decimal()) {
                (Ok(a), Ok(b)) => Number::new(a).is_close_to(b),
                _ => false,
            },
            (Value::NaN, _) | (Value::Named { .. }, _) | (Value::Quoted { .. }, _) => {
                unreachable!()
            }
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.coerced_eq(other)
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::None
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(n.into())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Decimal(n.into())
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Decimal(n)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::List(values)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::None)
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "{}", self.as_text())
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Value::Text(s) => write!(f, "\"{}\"", s),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Decimal(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::List(values) => f.debug_list().entries(values).finish(),
            Value::None => write!(f, "None"),
            Value::NaN => write!(f, "NaN"),
            Value::Named { value, label } => write!(f, "{:?}[{}]", value, label),
            Value::Quoted {
                value,
                prefix,
                suffix,
            } => write!(f, "{}{:?}{}", prefix, value, suffix),
            Value::Roll { count, sides } => write!(f, "{}d{}", count, sides),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::text(Value::text("abc"), "abc")]
    #[case::integer(Value::Integer(-3), "-3")]
    #[case::decimal(Value::decimal(2.5), "2.5")]
    #[case::whole_decimal(Value::decimal(5.0), "5")]
    #[case::boolean(Value::TRUE, "true")]
    #[case::none(Value::NONE, "")]
    #[case::nan(Value::NaN, "NaN")]
    #[case::list_latest(Value::List(vec![1.into(), 2.into()]), "2")]
    #[case::empty_list(Value::List(vec![]), "")]
    #[case::named(Value::named(4.into(), "four"), "4")]
    #[case::quoted(Value::quoted("a".into(), "'", "'"), "a")]
    #[case::roll(Value::roll(2, 6), "2d6")]
    fn test_as_text(#[case] value: Value, #[case] expected: &str) {
        assert_eq!(value.as_text(), expected);
        assert_eq!(value.to_string(), expected);
    }

    #[rstest]
    #[case::text(Value::text(" 1.5 "), Ok(1.5))]
    #[case::bad_text(Value::text("abc"), Err(ResolveError::not_a_number("abc")))]
    #[case::infinite_text(Value::text("inf"), Err(ResolveError::not_a_number("inf")))]
    #[case::integer(Value::Integer(7), Ok(7.0))]
    #[case::boolean(Value::FALSE, Ok(0.0))]
    #[case::none(Value::NONE, Ok(0.0))]
    #[case::roll(Value::roll(2, 6), Ok(7.0))]
    #[case::list(Value::List(vec![Value::text("x"), 3.into()]), Ok(3.0))]
    fn test_as_decimal(#[case] value: Value, #[case] expected: Result<f64, ResolveError>) {
        assert_eq!(value.as_decimal(), expected);
    }

    #[rstest]
    #[case::text(Value::text("12"), Ok(12))]
    #[case::decimal_text(Value::text("12.9"), Ok(12))]
    #[case::decimal(Value::decimal(-3.7), Ok(-3))]
    #[case::roll(Value::roll(3, 6), Ok(10))]
    #[case::nan(Value::NaN, Err(ResolveError::not_a_number("NaN")))]
    fn test_as_number(#[case] value: Value, #[case] expected: Result<i64, ResolveError>) {
        assert_eq!(value.as_number(), expected);
    }

    #[rstest]
    #[case::text_true(Value::text("yes"), true)]
    #[case::text_any(Value::text("hello"), true)]
    #[case::text_false(Value::text("False"), false)]
    #[case::text_no(Value::text("NO"), false)]
    #[case::text_zero(Value::text("0"), false)]
    #[case::text_empty(Value::text(""), false)]
    #[case::integer(Value::Integer(2), true)]
    #[case::zero(Value::Integer(0), false)]
    #[case::decimal_nan(Value::decimal(f64::NAN), false)]
    #[case::none(Value::NONE, false)]
    #[case::nan(Value::NaN, false)]
    #[case::roll(Value::roll(1, 6), true)]
    #[case::empty_roll(Value::roll(0, 6), false)]
    #[case::list(Value::List(vec![true.into(), false.into()]), false)]
    fn test_as_boolean(#[case] value: Value, #[case] expected: bool) {
        assert_eq!(value.as_boolean(), expected);
    }

    #[rstest]
    #[case::none_none(Value::NONE, Value::NONE, true)]
    #[case::none_zero(Value::NONE, Value::Integer(0), false)]
    #[case::zero_none(Value::Integer(0), Value::NONE, false)]
    #[case::empty_text_none(Value::text(""), Value::NONE, false)]
    #[case::false_none(Value::FALSE, Value::NONE, false)]
    #[case::integer_text(Value::Integer(3), Value::text("3"), true)]
    #[case::integer_bad_text(Value::Integer(3), Value::text("three"), false)]
    #[case::text_integer(Value::text("3"), Value::Integer(3), true)]
    #[case::decimal_tolerance(Value::decimal(1.0), Value::decimal(1.004), true)]
    #[case::decimal_outside_tolerance(Value::decimal(1.0), Value::decimal(1.02), false)]
    #[case::integer_decimal(Value::Integer(5), Value::decimal(5.0), true)]
    #[case::decimal_integer(Value::decimal(5.0), Value::Integer(5), true)]
    #[case::nan_nan(Value::NaN, Value::NaN, false)]
    #[case::boolean_text(Value::TRUE, Value::text("yes"), true)]
    #[case::roll_roll(Value::roll(2, 6), Value::roll(2, 6), true)]
    #[case::roll_number(Value::roll(2, 6), Value::Integer(7), true)]
    #[case::list_list(Value::List(vec![1.into(), 2.into()]), Value::List(vec![1.into(), 2.into()]), true)]
    #[case::list_scalar(Value::List(vec![1.into(), 2.into()]), Value::Integer(2), true)]
    #[case::empty_list_none(Value::List(vec![]), Value::NONE, false)]
    #[case::named(Value::named(3.into(), "x"), Value::Integer(3), true)]
    #[case::quoted(Value::text("a"), Value::quoted("a".into(), "\"", "\""), true)]
    fn test_equality(#[case] left: Value, #[case] right: Value, #[case] expected: bool) {
        assert_eq!(left == right, expected);
    }

    #[rstest]
    #[case::scalar(Value::Integer(1), vec![Value::Integer(1)])]
    #[case::none(Value::NONE, vec![Value::NONE])]
    #[case::list(Value::List(vec![1.into(), 2.into()]), vec![1.into(), 2.into()])]
    #[case::named_list(Value::named(Value::List(vec![1.into()]), "l"), vec![1.into()])]
    fn test_as_list(#[case] value: Value, #[case] expected: Vec<Value>) {
        assert_eq!(value.as_list(), expected);
    }

    #[rstest]
    #[case::named(Value::named(Value::text("a"), "label"), "a[label]")]
    #[case::quoted(Value::quoted(Value::text("a b"), "\"", "\""), "\"a b\"")]
    #[case::named_quoted(Value::named(Value::quoted(Value::text("a"), "'", "'"), "x"), "'a'[x]")]
    #[case::list(Value::List(vec![1.into(), Value::text("b")]), "1,b")]
    #[case::none(Value::NONE, "null")]
    fn test_to_formula_text(#[case] value: Value, #[case] expected: &str) {
        assert_eq!(value.to_formula_text(), expected);
    }

    #[rstest]
    #[case(Value::NONE, false)]
    #[case(Value::List(vec![]), false)]
    #[case(Value::List(vec![Value::NONE]), true)]
    #[case(Value::named(Value::NONE, "x"), false)]
    #[case(Value::NaN, true)]
    fn test_has_value(#[case] value: Value, #[case] expected: bool) {
        assert_eq!(value.has_value(), expected);
    }

    #[test]
    fn test_from_option() {
        assert!(Value::from(None::<i64>).is_none());
        assert_eq!(Value::from(Some(2)), Value::Integer(2));
    }
}
