use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use shapecheck_ast::{Span, ToMiette};

#[derive(Error, Diagnostic, Debug, Clone)]
pub enum ParseError {
    #[error("Unrecognized token")]
    #[diagnostic(code("P-001"))]
    InvalidToken {
        #[label]
        span: SourceSpan,
    },
    #[error("Tabs are not allowed in indentation")]
    #[diagnostic(code("P-002"))]
    TabInIndent {
        #[label]
        span: SourceSpan,
    },
    #[error("Dedent does not match any outer indentation level")]
    #[diagnostic(code("P-003"))]
    InconsistentDedent {
        #[label]
        span: SourceSpan,
    },
    #[error("Expected {expected}, found {found}")]
    #[diagnostic(code("P-004"))]
    UnexpectedToken {
        expected: String,
        found: String,
        #[label]
        span: SourceSpan,
    },
    #[error("Unexpected end of input, expected {expected}")]
    #[diagnostic(code("P-005"))]
    UnexpectedEof { expected: String },
}

impl ParseError {
    pub fn invalid_token(span: Span) -> Self {
        ParseError::InvalidToken { span: span.to_miette() }
    }

    pub fn tab_in_indent(span: Span) -> Self {
        ParseError::TabInIndent { span: span.to_miette() }
    }

    pub fn inconsistent_dedent(span: Span) -> Self {
        ParseError::InconsistentDedent { span: span.to_miette() }
    }

    pub fn unexpected_token(expected: &str, found: &str, span: Span) -> Self {
        ParseError::UnexpectedToken {
            expected: expected.to_owned(),
            found: found.to_owned(),
            span: span.to_miette(),
        }
    }

    pub fn unexpected_eof(expected: &str) -> Self {
        ParseError::UnexpectedEof { expected: expected.to_owned() }
    }
}
