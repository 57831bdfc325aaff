use std::sync::Arc;

use itertools::Itertools;

use crate::{
    context::DataContext,
    shunting_yard::{Program, error::ResolveError, eval},
    value::Value,
};

/// Something that produces a [`Value`] against a [`DataContext`].
#[derive(Debug, Clone)]
pub enum Resolvable {
    Empty,
    Static(Value),
    Program(Arc<Program<Value>>),
    List(Vec<Resolvable>),
}

impl Resolvable {
    pub fn resolve(&self, context: &dyn DataContext) -> Result<Value, ResolveError> {
        match self {
            Resolvable::Empty => Ok(Value::None),
            Resolvable::Static(value) => Ok(value.clone()),
            Resolvable::Program(program) => eval::evaluate(program, context),
            Resolvable::List(items) => items
                .iter()
                .map(|item| item.resolve(context))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
        }
    }

    /// The text this resolvable was parsed from, or the formula that writes
    /// its static value.
    pub fn formula_text(&self) -> String {
        match self {
            Resolvable::Empty => String::new(),
            Resolvable::Static(value) => value.to_formula_text(),
            Resolvable::Program(program) => program.text().to_string(),
            Resolvable::List(items) => items.iter().map(Resolvable::formula_text).join(","),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Resolvable::Empty)
    }
}

impl Default for Resolvable {
    fn default() -> Self {
        Resolvable::Empty
    }
}

impl From<Value> for Resolvable {
    fn from(value: Value) -> Self {
        Resolvable::Static(value)
    }
}

impl From<Arc<Program<Value>>> for Resolvable {
    fn from(program: Arc<Program<Value>>) -> Self {
        Resolvable::Program(program)
    }
}

impl From<Vec<Resolvable>> for Resolvable {
    fn from(items: Vec<Resolvable>) -> Self {
        Resolvable::List(items)
    }
}

macro_rules! impl_from_scalar {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Resolvable {
                fn from(value: $ty) -> Self {
                    Resolvable::Static(Value::from(value))
                }
            }
        )*
    };
}

impl_from_scalar!(bool, i32, i64, f64, &str, String);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EmptyDataContext;
    use rstest::rstest;

    #[rstest]
    #[case::empty(Resolvable::Empty, Value::NONE)]
    #[case::static_value(Resolvable::from(3), Value::Integer(3))]
    #[case::list(
        Resolvable::List(vec![Resolvable::from("a"), Resolvable::Empty]),
        Value::List(vec![Value::text("a"), Value::NONE])
    )]
    fn test_resolve(#[case] resolvable: Resolvable, #[case] expected: Value) {
        assert_eq!(resolvable.resolve(&EmptyDataContext), Ok(expected));
    }

    #[rstest]
    #[case::empty(Resolvable::Empty, "")]
    #[case::text(Resolvable::from("abc"), "abc")]
    #[case::named(Resolvable::from(Value::named(2.into(), "two")), "2[two]")]
    #[case::list(Resolvable::List(vec![1.into(), 2.5.into()]), "1,2.5")]
    fn test_formula_text(#[case] resolvable: Resolvable, #[case] expected: &str) {
        assert_eq!(resolvable.formula_text(), expected);
    }
}
