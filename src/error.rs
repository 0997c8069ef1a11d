//! Error types returned at the public boundary.
//!
//! Engine layers report plain `String` messages; they are lifted into these
//! enums by the document wrapper.

use thiserror::Error;

/// Failure to construct a document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The input contained no markup at all
    #[error("input is empty")]
    EmptyInput,

    /// The input is not a document the parser could build
    #[error("malformed document at line {line}: {message}")]
    Malformed { message: String, line: u32 },

    /// The bytes could not be decoded, or the encoding label is unknown
    #[error("encoding error: {0}")]
    Encoding(String),
}

impl ParseError {
    pub(crate) fn malformed(message: impl Into<String>, line: u32) -> Self {
        ParseError::Malformed {
            message: message.into(),
            line,
        }
    }
}

/// Failure of a strict query entry point (`try_*`)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("invalid XPath expression {expression:?}: {reason}")]
    InvalidExpression { expression: String, reason: String },

    #[error("invalid CSS selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// A relative query was given a node captured from another document
    #[error("node belongs to a different document")]
    ForeignNode,
}

impl QueryError {
    pub(crate) fn expression(expression: &str, reason: impl Into<String>) -> Self {
        QueryError::InvalidExpression {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn selector(selector: &str, reason: impl Into<String>) -> Self {
        QueryError::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_problem() {
        let err = ParseError::malformed("Unclosed element <a>", 3);
        assert_eq!(err.to_string(), "malformed document at line 3: Unclosed element <a>");

        let err = QueryError::expression("//[", "Expected node test");
        assert_eq!(err.to_string(), "invalid XPath expression \"//[\": Expected node test");
        assert_eq!(QueryError::ForeignNode.to_string(), "node belongs to a different document");
    }
}
