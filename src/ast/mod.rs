//! Annotated statement/expression tree consumed by the code generator.
//!
//! The validator produces this tree; every statement carries an optional
//! [`StatementInfo`] and every expression an [`ExpressionInfo`]. The
//! generator reads these annotations and never re-derives them.

mod nodes;
mod types;
mod visitor;
pub mod info;

pub use nodes::*;
pub use types::*;
pub use visitor::*;

use std::fmt;

/// Start position of the construct an annotation or error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn at(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Nodes built by the generator or by hand have no position
    pub fn synthetic() -> Self {
        Self::default()
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
