#![no_main]

use arbitrary::Arbitrary;
use itertools::Itertools;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
enum Term {
    Integer(u16),
    Variable(String),
    Call(String, Vec<Term>),
    Binary(Box<Term>, String, Box<Term>),
    Comment(Box<Term>, String),
    Raw(String),
}

impl Term {
    fn to_formula(&self) -> String {
        match self {
            Term::Integer(n) => n.to_string(),
            Term::Variable(key) => format!("@{{{}}}", key),
            Term::Call(name, args) => {
                format!("{}({})", name, args.iter().map(Term::to_formula).join(", "))
            }
            Term::Binary(a, op, b) => format!("{} {} {}", a.to_formula(), op, b.to_formula()),
            Term::Comment(term, label) => format!("({})[{}]", term.to_formula(), label),
            Term::Raw(text) => text.clone(),
        }
    }
}

#[derive(Debug, Clone, Arbitrary)]
struct Context {
    raw_formula: Option<String>,
    generated: Option<Term>,
    bindings: Vec<(String, String)>,
}

fuzz_target!(|context: Context| {
    let formula = match (&context.raw_formula, &context.generated) {
        (Some(raw), _) => raw.clone(),
        (_, Some(generated)) => generated.to_formula(),
        _ => "".to_string(),
    };

    let mut data = formula_lang::MutableDataContext::new();
    for (key, text) in &context.bindings {
        if let Ok(resolvable) = formula_lang::parse(text) {
            data.set(key.as_str(), resolvable);
        }
    }

    let _ = formula_lang::evaluate(&formula, &data);
    let _ = formula_lang::optimize(&formula);
});
