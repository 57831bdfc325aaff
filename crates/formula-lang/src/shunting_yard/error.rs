use smol_str::SmolStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Missing parameter #{position} for \"{name}\"")]
    MissingOperand { name: SmolStr, position: usize },
    #[error("Missing arity count for \"{name}\"")]
    MissingArity { name: SmolStr },
    #[error("Cannot convert '{text}' to a number")]
    NotANumber { text: String },
    #[error("Invalid program, expected exactly one value but {remaining} remained")]
    InvalidProgram { remaining: usize },
    #[error("Invalid key pattern '{pattern}'")]
    InvalidPattern { pattern: String },
}

impl ResolveError {
    pub fn not_a_number(text: impl Into<String>) -> Self {
        ResolveError::NotANumber { text: text.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::missing_operand(
        ResolveError::MissingOperand { name: "+".into(), position: 2 },
        "Missing parameter #2 for \"+\""
    )]
    #[case::missing_arity(ResolveError::MissingArity { name: "min".into() }, "Missing arity count for \"min\"")]
    #[case::not_a_number(ResolveError::not_a_number("abc"), "Cannot convert 'abc' to a number")]
    #[case::invalid_program(
        ResolveError::InvalidProgram { remaining: 2 },
        "Invalid program, expected exactly one value but 2 remained"
    )]
    #[case::invalid_pattern(
        ResolveError::InvalidPattern { pattern: "a*".into() },
        "Invalid key pattern 'a*'"
    )]
    fn test_display(#[case] error: ResolveError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }
}
