//! Property-based tests for parsing, evaluation and optimization.
use formula_lang::{EmptyDataContext, MutableDataContext, Resolvable, Value};
use proptest::prelude::*;

mod strategies {
    use super::*;

    pub fn constant() -> impl Strategy<Value = String> {
        prop_oneof![
            (0i64..1000).prop_map(|n| n.to_string()),
            (0u32..100, 0u32..100).prop_map(|(whole, fraction)| format!("{whole}.{fraction}")),
            Just("true".to_string()),
            Just("null".to_string()),
            "[a-z]{1,5}".prop_map(|text| format!("'{text}'")),
        ]
    }

    pub fn operand() -> impl Strategy<Value = String> {
        prop_oneof![
            4 => constant(),
            1 => "[a-e]".prop_map(|key| format!("@{key}")),
        ]
    }

    /// Well-formed formulas over the default grammar's operators and functions.
    pub fn formula() -> impl Strategy<Value = String> {
        expression(operand())
    }

    /// Formulas without variables.
    pub fn constant_formula() -> impl Strategy<Value = String> {
        expression(constant())
    }

    /// Small formulas over the four arithmetic operators and aggregates.
    pub fn arithmetic_formula() -> impl Strategy<Value = String> {
        let leaf = prop_oneof![
            3 => (0i64..10).prop_map(|n| n.to_string()),
            1 => (0u32..10, 0u32..10).prop_map(|(whole, fraction)| format!("{whole}.{fraction}")),
            2 => "[a-e]".prop_map(|key| format!("@{key}")),
        ];

        leaf.prop_recursive(3, 12, 3, |inner| {
            prop_oneof![
                3 => (
                    inner.clone(),
                    prop::sample::select(vec!["+", "-", "*", "/"]),
                    inner.clone()
                )
                    .prop_map(|(a, op, b)| format!("{a} {op} {b}")),
                2 => inner.clone().prop_map(|a| format!("({a})")),
                1 => prop::collection::vec(inner.clone(), 1..4).prop_flat_map(|args| {
                    prop::sample::select(vec!["min", "max", "sum"])
                        .prop_map(move |name| format!("{name}({})", args.join(", ")))
                }),
            ]
        })
    }

    fn expression(leaf: impl Strategy<Value = String> + 'static) -> impl Strategy<Value = String> {
        leaf.prop_recursive(4, 32, 3, |inner| {
            prop_oneof![
                (
                    inner.clone(),
                    prop::sample::select(vec![
                        "+", "-", "*", "/", "^", "<", "<=", ">", ">=", "==", "!=", "AND", "OR",
                    ]),
                    inner.clone()
                )
                    .prop_map(|(a, op, b)| format!("{a} {op} {b}")),
                inner.clone().prop_map(|a| format!("({a})")),
                inner.clone().prop_map(|a| format!("-({a})")),
                prop::collection::vec(inner.clone(), 1..4).prop_flat_map(|args| {
                    prop::sample::select(vec!["min", "max", "sum", "any", "all"])
                        .prop_map(move |name| format!("{name}({})", args.join(", ")))
                }),
                (inner.clone(), "[a-z]{1,6}").prop_map(|(a, label)| format!("({a})[{label}]")),
            ]
        })
    }
}

fn context() -> MutableDataContext {
    MutableDataContext::from([
        ("a", Resolvable::from(7)),
        ("b", Resolvable::from(-3)),
        ("c", Resolvable::from(2.5)),
        ("d", Resolvable::from(0)),
        ("e", Resolvable::from("12")),
    ])
}

/// Whether `text` has a key directly followed by `*`, which reads as a
/// wildcard.
fn has_wildcard_key(text: &str) -> bool {
    ["@a*", "@b*", "@c*", "@d*", "@e*"]
        .iter()
        .any(|key| text.contains(key))
}

/// Equal values, treating NaN and infinities as equal to themselves.
fn same(a: &Value, b: &Value) -> bool {
    a == b || a.to_formula_text() == b.to_formula_text()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The tokenizer reports bad input as an error instead of panicking.
    #[test]
    fn parse_never_panics(text in "\\PC{0,40}") {
        let _ = formula_lang::parse(&text);
        let _ = formula_lang::optimize(&text);
    }

    /// Generated formulas always parse.
    #[test]
    fn generated_formulas_parse(text in strategies::formula()) {
        prop_assert!(formula_lang::parse(&text).is_ok(), "failed to parse {}", text);
    }

    /// Resolving the same formula against the same context is deterministic.
    #[test]
    fn resolve_is_deterministic(text in strategies::formula()) {
        let context = context();
        let resolvable = formula_lang::parse(&text).unwrap();
        let first = formula_lang::resolve(&resolvable, &context);
        let second = formula_lang::resolve(&resolvable, &context);

        match (&first, &second) {
            (Ok(a), Ok(b)) => prop_assert!(same(a, b), "{} gave {:?} then {:?}", text, a, b),
            _ => prop_assert_eq!(first.is_ok(), second.is_ok()),
        }
    }

    /// Formulas without variables evaluate the same against any context.
    #[test]
    fn variable_free_formulas_ignore_context(text in strategies::constant_formula()) {
        let with_context = formula_lang::evaluate(&text, &context());
        let without_context = formula_lang::evaluate(&text, &EmptyDataContext);

        match (&with_context, &without_context) {
            (Ok(a), Ok(b)) => prop_assert!(same(a, b), "{} gave {:?} and {:?}", text, a, b),
            _ => prop_assert_eq!(with_context.is_ok(), without_context.is_ok()),
        }
    }

    /// Optimized text is itself a valid formula and optimizes to itself.
    /// A key rendered right before `*` reads back as a wildcard, so those
    /// outputs are left out.
    #[test]
    fn optimized_formulas_reparse(text in strategies::formula()) {
        let optimized = formula_lang::optimize(&text).unwrap();
        prop_assume!(!has_wildcard_key(&optimized));

        prop_assert!(formula_lang::parse(&optimized).is_ok(), "{} optimized to {}", text, optimized);
        prop_assert_eq!(formula_lang::optimize(&optimized).ok(), Some(optimized.clone()));
    }

    /// Optimized arithmetic evaluates to the value of the formula it came from,
    /// unless the compact output turned a key into a wildcard.
    #[test]
    fn optimized_arithmetic_keeps_its_value(text in strategies::arithmetic_formula()) {
        let optimized = formula_lang::optimize(&text).unwrap();
        prop_assume!(!has_wildcard_key(&optimized));

        let before = formula_lang::evaluate(&text, &context());
        let after = formula_lang::evaluate(&optimized, &context());

        match (&before, &after) {
            (Ok(a), Ok(b)) => {
                prop_assert!(same(a, b), "{} gave {:?}, {} gave {:?}", text, a, optimized, b)
            }
            _ => prop_assert_eq!(before.is_ok(), after.is_ok(), "{} became {}", text, optimized),
        }
    }
}
