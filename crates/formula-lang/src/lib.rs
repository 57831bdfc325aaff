//! `formula-lang` parses, evaluates and simplifies a small formula language:
//! arithmetic, comparisons, boolean logic, builtin functions, `@variables`
//! (including `@family_*` wildcards) and `[label]` annotations.
//!
//! ## Examples
//!
//! ```rust
//! use formula_lang::{MutableDataContext, Resolvable, Value};
//!
//! let context = MutableDataContext::from([
//!     ("strength", Resolvable::from(4)),
//!     ("bonus_armor", Resolvable::from(2)),
//!     ("bonus_shield", Resolvable::from(1)),
//! ]);
//!
//! let formula = formula_lang::parse("@strength * 2 + sum(@bonus_*)").unwrap();
//! assert_eq!(formula_lang::resolve(&formula, &context).unwrap(), Value::Integer(11));
//!
//! // Formulas can reference other formulas through the context.
//! let mut context = context;
//! context.set("attack", formula_lang::parse("@strength + 1").unwrap());
//! let damage = formula_lang::parse("@attack * 2").unwrap();
//! assert_eq!(formula_lang::resolve(&damage, &context).unwrap(), Value::Integer(10));
//!
//! // Simplify formula text without evaluating it.
//! assert_eq!(
//!     formula_lang::optimize("any(any(@a, any(@b, @c)), @d)").unwrap(),
//!     "any(@a,@b,@c,@d)"
//! );
//! ```
mod arena;
mod context;
mod error;
mod formula;
mod number;
mod optimizer;
mod resolvable;
pub mod shunting_yard;
pub mod token_tree;
mod value;

pub use arena::{Arena, ArenaId};
pub use context::{
    DataContext, EmptyDataContext, MutableDataContext, PersistentDataContext, SearchMatch, WILDCARD,
};
pub use error::{ConfigurationError, Error, InnerError, ParseError, ResolveError};
pub use formula::{Formula, Options};
pub use number::Number;
pub use optimizer::{Arithmetic, Optimizer, Symbol};
pub use resolvable::Resolvable;
pub use shunting_yard::{Operand, Program, ShuntingYardParser, ShuntingYardParserBuilder};
pub use token_tree::TokenTree;
pub use value::Value;

pub type FormulaResult = Result<Value, Error>;

/// Parses `text` with the default grammar.
#[allow(clippy::result_large_err)]
pub fn parse(text: &str) -> Result<Resolvable, Error> {
    Formula::shared()
        .parse(text)
        .map_err(|e| Error::from_error(text, e))
}

/// Evaluates `resolvable` against `context`.
#[allow(clippy::result_large_err)]
pub fn resolve(resolvable: &Resolvable, context: &dyn DataContext) -> FormulaResult {
    resolvable
        .resolve(context)
        .map_err(|e| Error::from_error(resolvable.formula_text(), e))
}

/// Parses and evaluates `text` in one step.
#[allow(clippy::result_large_err)]
pub fn evaluate(text: &str, context: &dyn DataContext) -> FormulaResult {
    Formula::shared().evaluate(text, context)
}

/// Simplifies formula text with the default optimizer grammar.
#[allow(clippy::result_large_err)]
pub fn optimize(text: &str) -> Result<String, Error> {
    Optimizer::shared().optimize(text)
}
