//! tolgen: statement-level code generator for a JVM-style stack machine
//!
//! Takes a validated, annotated method tree and produces linear instruction
//! streams with resolved jump targets, exception tables and local variable
//! tables, plus the synthetic members the lowering needs.
//!
//! ## Architecture
//!
//! - **ast**: the annotated statement/expression tree the validator hands over
//! - **codegen**: statement lowering, exception regions, switch dispatch,
//!   iterator state machines, closure scopes, erasure bridges and constant folding
//! - **config**: generation switches
//! - **error**: internal invariant violations
//!
//! ## Generation Flow
//!
//! ```text
//! ClassDecl → bridges → per method: closure pre-pass → statement lowering → ClassDef
//!                                  ↘ iterator methods: state class + moveNext
//! ```

pub mod ast;
pub mod codegen;
pub mod config;
pub mod consts;
pub mod error;

pub use codegen::generate_class;
pub use config::Config;
pub use error::{Error, Result};
