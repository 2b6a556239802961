use thiserror::Error;

use crate::ast::Span;

/// Result type for tolgen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Internal invariant violations raised during code generation.
///
/// Every variant indicates a compiler defect upstream or in the generator:
/// the validator is expected to have rejected ill-formed programs already,
/// so none of these are user diagnostics and generation never recovers.
#[derive(Error, Debug)]
pub enum Error {
    #[error("label L{label} marked twice (first at {first}, again at {second})")]
    LabelMarkedTwice { label: u32, first: usize, second: usize },

    #[error("label L{label} is referenced but never marked")]
    UnmarkedLabel { label: u32 },

    #[error("rethrow at {span} has no enclosing bound catch variable")]
    RethrowOutsideCatch { span: Span },

    #[error("{construct} at {span} has no resolved jump target")]
    UnresolvedTarget { construct: &'static str, span: Span },

    #[error("goto case at {span}: no case label {key} in the target switch")]
    MissingCaseLabel { key: String, span: Span },

    #[error("local scope underflow: exit without matching enter")]
    ScopeUnderflow,

    #[error("local #{local} used at {span} was never declared")]
    UnknownLocal { local: u32, span: Span },

    #[error("yield at {span} outside an iterator method")]
    YieldOutsideIterator { span: Span },

    #[error("yield at {span} cannot suspend inside {region}")]
    YieldInsideRegion { region: &'static str, span: Span },

    #[error("switch label at {span} is not an integral or string constant")]
    NonConstantCaseLabel { span: Span },

    #[error("unsupported {what} at {span}")]
    Unsupported { what: String, span: Span },

    #[error("Internal compiler error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create an internal compiler error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Create an unsupported-construct error
    pub fn unsupported(what: impl Into<String>, span: Span) -> Self {
        Self::Unsupported { what: what.into(), span }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_name_the_position() {
        let err = Error::YieldInsideRegion { region: "finally", span: Span::at(12, 5) };
        assert_eq!(err.to_string(), "yield at 12:5 cannot suspend inside finally");
        let err = Error::unsupported("operator Shl on Reference", Span::synthetic());
        assert_eq!(err.to_string(), "unsupported operator Shl on Reference at 0:0");
    }
}
