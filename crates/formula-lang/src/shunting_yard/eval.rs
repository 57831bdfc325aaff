//! Stack evaluation of postfix programs.
//!
//! Variables that resolve to another program are spliced into the running
//! evaluation instead of being evaluated recursively, so chains of formulas
//! referencing formulas only grow a heap-allocated frame stack. A splice in
//! tail position replaces the exhausted frame.
use std::sync::Arc;

use smol_str::SmolStr;

use crate::context::DataContext;

use super::{
    Program,
    error::ResolveError,
    node::{Callable, ProgramNode, Resolved},
};

enum Slot<V> {
    Value(V),
    Arity(usize),
}

struct Frame<V> {
    program: Arc<Program<V>>,
    next: usize,
}

impl<V: Clone> Frame<V> {
    fn new(program: Arc<Program<V>>) -> Self {
        Self { program, next: 0 }
    }

    fn advance(&mut self) -> Option<ProgramNode<V>> {
        let node = self.program.nodes().get(self.next)?.clone();
        self.next += 1;
        Some(node)
    }

    fn is_done(&self) -> bool {
        self.next >= self.program.len()
    }
}

pub fn evaluate<V: Clone>(
    program: &Arc<Program<V>>,
    context: &dyn DataContext,
) -> Result<V, ResolveError> {
    let mut frames = vec![Frame::new(Arc::clone(program))];
    let mut stack: Vec<Slot<V>> = Vec::new();

    while let Some(frame) = frames.last_mut() {
        let Some(node) = frame.advance() else {
            frames.pop();
            continue;
        };

        match node {
            ProgramNode::Term(value) => stack.push(Slot::Value(value)),
            ProgramNode::Arity(arity) => stack.push(Slot::Arity(arity)),
            ProgramNode::Operator(operator) => {
                let value = apply(&operator.symbol, &operator.callable, &mut stack)?;
                stack.push(Slot::Value(value));
            }
            ProgramNode::Function(function) => {
                let value = apply(&function.name, &function.callable, &mut stack)?;
                stack.push(Slot::Value(value));
            }
            ProgramNode::Comment(comment) => {
                let value = pop_operand(&mut stack, &comment.text, 1)?;
                stack.push(Slot::Value((comment.decorator)(value, comment.text.as_str())));
            }
            ProgramNode::Variable(variable) => {
                match (variable.resolver)(context, variable.key.as_str())? {
                    Resolved::Value(value) => stack.push(Slot::Value(value)),
                    Resolved::Splice(program) => {
                        log::trace!("splicing `{}` for {}", program.text(), variable.key);
                        if frames.last().is_some_and(Frame::is_done) {
                            frames.pop();
                        }
                        frames.push(Frame::new(program));
                    }
                }
            }
        }
    }

    let remaining = stack.len();
    match stack.pop() {
        Some(Slot::Value(value)) if remaining == 1 => Ok(value),
        _ => Err(ResolveError::InvalidProgram { remaining }),
    }
}

/// Pops the operands of `callable` and applies it. Operands are numbered from
/// the top of the stack in errors.
fn apply<V>(
    name: &SmolStr,
    callable: &Callable<V>,
    stack: &mut Vec<Slot<V>>,
) -> Result<V, ResolveError> {
    match callable {
        Callable::Nullary(f) => f(),
        Callable::Unary(f) => {
            let a = pop_operand(stack, name, 1)?;
            f(a)
        }
        Callable::Binary(f) => {
            let b = pop_operand(stack, name, 1)?;
            let a = pop_operand(stack, name, 2)?;
            f(a, b)
        }
        Callable::Ternary(f) => {
            let c = pop_operand(stack, name, 1)?;
            let b = pop_operand(stack, name, 2)?;
            let a = pop_operand(stack, name, 3)?;
            f(a, b, c)
        }
        Callable::Variadic(f) => {
            let arity = match stack.pop() {
                Some(Slot::Arity(arity)) => arity,
                other => {
                    stack.extend(other);
                    return Err(ResolveError::MissingArity { name: name.clone() });
                }
            };

            let mut args = (1..=arity)
                .map(|position| pop_operand(stack, name, position))
                .collect::<Result<Vec<_>, _>>()?;
            args.reverse();
            f(args)
        }
    }
}

fn pop_operand<V>(
    stack: &mut Vec<Slot<V>>,
    name: &SmolStr,
    position: usize,
) -> Result<V, ResolveError> {
    match stack.pop() {
        Some(Slot::Value(value)) => Ok(value),
        Some(Slot::Arity(_)) | None => Err(ResolveError::MissingOperand {
            name: name.clone(),
            position,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        context::{EmptyDataContext, MutableDataContext},
        shunting_yard::node::{Associativity, Function, Operator, Variable, VariableResolver},
    };
    use rstest::rstest;

    fn add() -> ProgramNode<i64> {
        ProgramNode::Operator(Arc::new(Operator::new(
            "+",
            2,
            Associativity::Left,
            Callable::binary(|a: i64, b| Ok(a + b)),
        )))
    }

    fn count() -> ProgramNode<i64> {
        ProgramNode::Function(Arc::new(Function::new(
            "count",
            Callable::variadic(|args: Vec<i64>| Ok(args.len() as i64)),
        )))
    }

    fn run(nodes: Vec<ProgramNode<i64>>) -> Result<i64, ResolveError> {
        evaluate(&Arc::new(Program::new(nodes, "")), &EmptyDataContext)
    }

    #[rstest]
    #[case::single_term(vec![ProgramNode::Term(4)], Ok(4))]
    #[case::binary(vec![ProgramNode::Term(1), ProgramNode::Term(2), add()], Ok(3))]
    #[case::variadic(
        vec![ProgramNode::Term(7), ProgramNode::Term(8), ProgramNode::Arity(2), count()],
        Ok(2)
    )]
    #[case::empty_variadic(vec![ProgramNode::Arity(0), count()], Ok(0))]
    #[case::missing_second_operand(
        vec![ProgramNode::Term(1), add()],
        Err(ResolveError::MissingOperand { name: "+".into(), position: 2 })
    )]
    #[case::missing_operands(
        vec![add()],
        Err(ResolveError::MissingOperand { name: "+".into(), position: 1 })
    )]
    #[case::missing_arity(
        vec![ProgramNode::Term(1), count()],
        Err(ResolveError::MissingArity { name: "count".into() })
    )]
    #[case::too_few_variadic_operands(
        vec![ProgramNode::Term(1), ProgramNode::Arity(2), count()],
        Err(ResolveError::MissingOperand { name: "count".into(), position: 2 })
    )]
    #[case::empty(vec![], Err(ResolveError::InvalidProgram { remaining: 0 }))]
    #[case::leftover(
        vec![ProgramNode::Term(1), ProgramNode::Term(2)],
        Err(ResolveError::InvalidProgram { remaining: 2 })
    )]
    fn test_evaluate(#[case] nodes: Vec<ProgramNode<i64>>, #[case] expected: Result<i64, ResolveError>) {
        assert_eq!(run(nodes), expected);
    }

    fn splicing_resolver(programs: Vec<(&'static str, Arc<Program<i64>>)>) -> VariableResolver<i64> {
        Arc::new(
            move |_: &dyn DataContext, key: &str| -> Result<Resolved<i64>, ResolveError> {
                Ok(programs
                    .iter()
                    .find(|(name, _)| *name == key)
                    .map(|(_, program)| Resolved::Splice(Arc::clone(program)))
                    .unwrap_or(Resolved::Value(0)))
            },
        )
    }

    fn variable(key: &str, resolver: &VariableResolver<i64>) -> ProgramNode<i64> {
        ProgramNode::Variable(Arc::new(Variable {
            key: key.into(),
            resolver: Arc::clone(resolver),
        }))
    }

    #[test]
    fn test_splices_referenced_programs() {
        // b = 10 + 5, a = @b + 1
        let b = Arc::new(Program::new(
            vec![ProgramNode::Term(10), ProgramNode::Term(5), add()],
            "10 + 5",
        ));
        let resolver = splicing_resolver(vec![("b", b)]);
        let a = Arc::new(Program::new(
            vec![variable("b", &resolver), ProgramNode::Term(1), add()],
            "@b + 1",
        ));

        assert_eq!(evaluate(&a, &MutableDataContext::new()), Ok(16));
    }
}
