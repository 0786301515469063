use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use shapecheck_ast::{Ast, HasSpan, Span, ToMiette};
use shapecheck_types::UnificationError;

pub type CheckResult<T = ()> = Result<T, TypeError>;

/// The error taxonomy of the evaluator.
///
/// `RulesFailed` aggregates the failures of every rule that matched a node;
/// `NoApplicableRule` marks a node no pattern matched at all. Both carry the
/// node's source span. Errors are cloneable because the evaluator memoizes
/// them.
#[derive(Error, Diagnostic, Debug, Clone)]
pub enum TypeError {
    #[error("Unbound identifier `{name}`")]
    #[diagnostic(code("T-001"))]
    UnboundIdentifier {
        name: String,
        #[label]
        span: Option<SourceSpan>,
    },
    #[error("{msg}")]
    #[diagnostic(code("T-002"))]
    Value {
        msg: String,
        #[label]
        span: Option<SourceSpan>,
    },
    #[error(transparent)]
    #[diagnostic(transparent)]
    Unification(#[from] UnificationError),
    #[error("No applicable rule")]
    #[diagnostic(code("T-003"))]
    NoApplicableRule {
        #[label("for this")]
        span: Option<SourceSpan>,
    },
    #[error("Every applicable rule failed")]
    #[diagnostic(code("T-004"))]
    RulesFailed {
        #[label("while checking this")]
        span: Option<SourceSpan>,
        /// Rules attempted, paired with the errors they produced.
        errors: Vec<(String, TypeError)>,
    },
    #[error("Unsatisfiable constraint")]
    #[diagnostic(code("T-005"))]
    UnsatisfiableConstraint {
        #[label]
        span: Option<SourceSpan>,
    },
    #[error("An unexpected internal error occurred: {message}")]
    #[diagnostic(code("T-XXX"))]
    /// This error should not occur.
    /// Some internal invariant has been violated.
    Impossible { message: String },
}

impl TypeError {
    pub fn unbound(name: &str, span: Span) -> Self {
        TypeError::UnboundIdentifier { name: name.to_owned(), span: Some(span.to_miette()) }
    }

    pub fn value(msg: impl Into<String>, span: Option<Span>) -> Self {
        TypeError::Value { msg: msg.into(), span: span.map(|s| s.to_miette()) }
    }

    pub fn confusion(ast: &Ast) -> Self {
        TypeError::NoApplicableRule { span: Some(ast.span().to_miette()) }
    }

    pub fn rules_failed(ast: &Ast, errors: Vec<(String, TypeError)>) -> Self {
        TypeError::RulesFailed { span: Some(ast.span().to_miette()), errors }
    }

    pub fn unsat(span: Option<Span>) -> Self {
        TypeError::UnsatisfiableConstraint { span: span.map(|s| s.to_miette()) }
    }

    pub fn impossible(message: impl Into<String>) -> Self {
        TypeError::Impossible { message: message.into() }
    }

    /// Whether an unsatisfiable constraint occurs anywhere in the error tree.
    /// The `check` driver retries in careful mode when it does.
    pub fn mentions_unsat(&self) -> bool {
        match self {
            TypeError::UnsatisfiableConstraint { .. } => true,
            TypeError::RulesFailed { errors, .. } => {
                errors.iter().any(|(_, err)| err.mentions_unsat())
            }
            _ => false,
        }
    }
}
