use thiserror::Error;

/// Every failure the engine can report.
///
/// Parse errors carry the byte offset where the lexer or parser gave up.
/// `QuestionNotFound` and `InvalidTraversal` are raised by the form
/// extension and pass through the evaluator untouched, so callers can tell a
/// misconfigured form apart from a generic evaluation failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("{message}{}", position_suffix(.position))]
    Parse {
        message: String,
        position: Option<usize>,
    },

    #[error("Transform '{0}' is not defined")]
    UnknownTransform(String),

    #[error("Binary operator '{0}' is not defined")]
    UnknownOperator(String),

    #[error("Identifier '{0}' is not defined")]
    UndefinedIdentifier(String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Evaluation failed: {0}")]
    Evaluation(String),

    #[error("Expression nesting exceeds the maximum depth of {0}")]
    DepthExceeded(usize),

    #[error("Question could not be found: {0}")]
    QuestionNotFound(String),

    #[error("Invalid answer traversal: {0}")]
    InvalidTraversal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

fn position_suffix(position: &Option<usize>) -> String {
    match position {
        Some(pos) => format!(" at position {}", pos),
        None => String::new(),
    }
}

impl Error {
    pub fn parse<M: Into<String>>(message: M, position: Option<usize>) -> Self {
        Self::Parse {
            message: message.into(),
            position,
        }
    }

    pub fn type_mismatch<M: Into<String>>(message: M) -> Self {
        Self::TypeMismatch(message.into())
    }

    pub fn evaluation<M: Into<String>>(message: M) -> Self {
        Self::Evaluation(message.into())
    }

    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::Config(message.into())
    }

    /// Byte offset of a parse error, if known.
    pub fn position(&self) -> Option<usize> {
        match self {
            Self::Parse { position, .. } => *position,
            _ => None,
        }
    }

    pub fn is_parse_error(&self) -> bool {
        matches!(self, Self::Parse { .. })
    }

    /// Errors raised by the form extension's answer lookup.
    pub fn is_domain_error(&self) -> bool {
        matches!(self, Self::QuestionNotFound(_) | Self::InvalidTraversal(_))
    }
}
