#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// A decimal number with the formula language's text rendering.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, PartialOrd, Copy, Default)]
pub struct Number(f64);

/// Values closer than this compare as equal.
pub const TOLERANCE: f64 = 0.01;

impl Number {
    pub fn new(value: f64) -> Self {
        Number(value)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Returns `true` if the number represents an integer value.
    ///
    /// Uses epsilon comparison to account for floating-point precision.
    pub fn is_int(&self) -> bool {
        (self.0 - self.0.trunc()).abs() < f64::EPSILON
    }

    pub fn is_nan(&self) -> bool {
        self.0.is_nan()
    }

    pub fn is_zero(&self) -> bool {
        self.0.abs() < f64::EPSILON
    }

    /// Equality within [`TOLERANCE`]. NaN is never close to anything.
    pub fn is_close_to(&self, other: f64) -> bool {
        (self.0 - other).abs() < TOLERANCE
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number(value)
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number(value as f64)
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Number(value as f64)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_nan() {
            write!(f, "NaN")
        } else if self.0.is_infinite() {
            write!(f, "{}", if self.0 > 0.0 { "Infinity" } else { "-Infinity" })
        } else if self.is_int() {
            write!(f, "{}", self.0 as i64)
        } else {
            let s = format!("{:.6}", self.0);
            let s = s.trim_end_matches('0').trim_end_matches('.');
            write!(f, "{}", s)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case(42.0, "42")]
    #[case(42.123, "42.123")]
    #[case(42.100, "42.1")]
    #[case(42.0000001, "42")]
    #[case(-42.0, "-42")]
    #[case(-2.5, "-2.5")]
    #[case(0.0, "0")]
    #[case(1.0 / 3.0, "0.333333")]
    #[case(f64::NAN, "NaN")]
    #[case(f64::INFINITY, "Infinity")]
    #[case(f64::NEG_INFINITY, "-Infinity")]
    fn test_display_formatting(#[case] input: f64, #[case] expected: &str) {
        assert_eq!(Number::new(input).to_string(), expected);
    }

    #[rstest]
    #[case(1.0, 1.005, true)]
    #[case(1.0, 1.02, false)]
    #[case(f64::NAN, f64::NAN, false)]
    fn test_is_close_to(#[case] a: f64, #[case] b: f64, #[case] expected: bool) {
        assert_eq!(Number::new(a).is_close_to(b), expected);
    }

    #[rstest]
    #[case(3.9, false, false)]
    #[case(-2.0, true, false)]
    #[case(0.0, true, true)]
    fn test_conversions(#[case] input: f64, #[case] is_int: bool, #[case] is_zero: bool) {
        let number = Number::from(input);
        assert_eq!(number.is_int(), is_int);
        assert_eq!(number.is_zero(), is_zero);
    }
}
