use miette::{Diagnostic, SourceOffset, SourceSpan};

pub use crate::shunting_yard::error::ResolveError;
pub use crate::token_tree::error::{ConfigurationError, ParseError};

#[derive(Debug, thiserror::Error, PartialEq, Clone)]
pub enum InnerError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// Represents a high-level error with diagnostic information for the user.
#[derive(PartialEq, Debug, Clone, thiserror::Error)]
#[error("{cause}")]
pub struct Error {
    /// The underlying cause of the error.
    pub cause: InnerError,
    /// The formula text the error was raised for.
    pub source_code: String,
    /// The location in the source code for diagnostics.
    pub location: SourceSpan,
}

impl Error {
    pub fn from_error(source_code: impl Into<String>, cause: impl Into<InnerError>) -> Self {
        let source_code = source_code.into();
        let cause = cause.into();

        let location = match &cause {
            InnerError::Parse(ParseError { index, .. }) => {
                let (offset, width) = source_code
                    .char_indices()
                    .nth(*index)
                    .map(|(offset, c)| (offset, c.len_utf8()))
                    .unwrap_or((source_code.len(), 1));
                SourceSpan::new(SourceOffset::from(offset), width)
            }
            InnerError::Resolve(_) | InnerError::Configuration(_) => {
                SourceSpan::new(SourceOffset::from(0), source_code.len().max(1))
            }
        };

        Self {
            cause,
            source_code,
            location,
        }
    }
}

impl Diagnostic for Error {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let c = match &self.cause {
            InnerError::Parse(_) => "ParseError::UnexpectedCharacter",
            InnerError::Resolve(ResolveError::MissingOperand { .. }) => {
                "ResolveError::MissingOperand"
            }
            InnerError::Resolve(ResolveError::MissingArity { .. }) => "ResolveError::MissingArity",
            InnerError::Resolve(ResolveError::NotANumber { .. }) => "ResolveError::NotANumber",
            InnerError::Resolve(ResolveError::InvalidProgram { .. }) => {
                "ResolveError::InvalidProgram"
            }
            InnerError::Resolve(ResolveError::InvalidPattern { .. }) => {
                "ResolveError::InvalidPattern"
            }
            InnerError::Configuration(ConfigurationError::ConflictingTokens { .. }) => {
                "ConfigurationError::ConflictingTokens"
            }
        };

        Some(Box::new(c))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        let msg = match &self.cause {
            InnerError::Parse(ParseError { character, .. }) => {
                Some(format!("'{character}' does not start any known token."))
            }
            InnerError::Resolve(ResolveError::MissingOperand { name, .. }) => Some(format!(
                "'{name}' was given fewer operands than it takes. Check for a dangling operator."
            )),
            InnerError::Resolve(ResolveError::MissingArity { name }) => Some(format!(
                "'{name}' takes a variable number of arguments and must be called with parentheses."
            )),
            InnerError::Resolve(ResolveError::NotANumber { .. }) => {
                Some("A text value was used where a number is required.".to_string())
            }
            InnerError::Resolve(ResolveError::InvalidProgram { .. }) => Some(
                "The formula does not combine into a single value. Check for missing operators."
                    .to_string(),
            ),
            InnerError::Resolve(ResolveError::InvalidPattern { .. }) => None,
            InnerError::Configuration(ConfigurationError::ConflictingTokens { .. }) => Some(
                "Two grammar registrations complete on the same pattern; rename one of them."
                    .to_string(),
            ),
        };

        msg.map(|m| Box::new(m) as Box<dyn std::fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(
            miette::LabeledSpan::new_with_span(Some(format!("{}", self.cause)), self.location),
        )))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.source_code)
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::parse_error(
        "1 $ 2",
        InnerError::Parse(ParseError::new("1 $ 2", 2, '$')),
        SourceSpan::new(SourceOffset::from(2), 1),
        "ParseError::UnexpectedCharacter"
    )]
    #[case::parse_error_after_multibyte(
        "é $",
        InnerError::Parse(ParseError::new("é $", 2, '$')),
        SourceSpan::new(SourceOffset::from(3), 1),
        "ParseError::UnexpectedCharacter"
    )]
    #[case::resolve_error(
        "1 +",
        InnerError::Resolve(ResolveError::MissingOperand { name: "+".into(), position: 2 }),
        SourceSpan::new(SourceOffset::from(0), 3),
        "ResolveError::MissingOperand"
    )]
    #[case::configuration_error(
        "",
        InnerError::Configuration(ConfigurationError::ConflictingTokens { pattern: "+".into() }),
        SourceSpan::new(SourceOffset::from(0), 1),
        "ConfigurationError::ConflictingTokens"
    )]
    fn test_from_error(
        #[case] source_code: &str,
        #[case] cause: InnerError,
        #[case] expected_location: SourceSpan,
        #[case] expected_code: &str,
    ) {
        let error = Error::from_error(source_code, cause.clone());

        assert_eq!(error.cause, cause);
        assert_eq!(error.source_code, source_code);
        assert_eq!(error.location, expected_location);
        assert_eq!(error.code().map(|c| c.to_string()), Some(expected_code.to_string()));
        assert_eq!(error.to_string(), cause.to_string());
    }

    #[test]
    fn test_labels_point_at_location() {
        let error = Error::from_error("1 # 2", ParseError::new("1 # 2", 2, '#'));
        let labels = error.labels().map(|labels| labels.collect::<Vec<_>>());

        assert_eq!(labels.as_ref().map(Vec::len), Some(1));
        assert_eq!(
            labels.and_then(|labels| labels.first().map(|label| *label.inner())),
            Some(error.location)
        );
        assert!(error.help().is_some());
        assert!(error.source_code().is_some());
    }
}
