use thiserror::Error;

fn caret(index: &usize) -> String {
    format!("{}^", " ".repeat(*index))
}

/// Raised when no registered token matches at some position of the input.
///
/// `index` counts characters, not bytes, so the caret line lines up with the
/// rendered text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "Parse error at index {index} of \"{text}\": did not expect character: '{character}'\n{text}\n{}",
    caret(.index)
)]
pub struct ParseError {
    pub text: String,
    pub index: usize,
    pub character: char,
}

impl ParseError {
    pub fn new(text: impl Into<String>, index: usize, character: char) -> Self {
        Self {
            text: text.into(),
            index,
            character,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Conflicting tokens for pattern `{pattern}`")]
    ConflictingTokens { pattern: String },
}
