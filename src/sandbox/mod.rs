//! Whitelist-sandboxed extension loader.
//!
//! Takes an untrusted snippet of candidate source text, verifies it defines
//! exactly one side-effect-limited function, and binds that function to a
//! host object so it can be invoked later. Instead of handing the snippet to
//! any general-purpose eval facility, the snippet is parsed into a
//! restricted statement tree, checked against a closed whitelist, and run by
//! a small tree-walking evaluator whose only capability is a host-provided
//! `print`.
//!
//! Validation is a pure function of the snippet: a rejected snippet never
//! becomes valid without edits, and all registry state is scoped to one host
//! instance.

pub mod ast;
pub mod eval;
pub mod extension;
pub mod lexer;
pub mod parser;
pub mod validate;

use thiserror::Error;

use ast::NodeKind;

pub use eval::{EvalError, PrintSink, StdoutSink, Value};
pub use extension::{BoundExtension, CallError, ExtensionRegistry};
pub use validate::ParsedFunction;

/// Why a candidate snippet was not accepted. Every variant is local and
/// recoverable; the caller logs or displays it and carries on without the
/// extension.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RejectionReason {
    /// The snippet does not parse as valid source.
    #[error("syntax error: {0}")]
    SyntaxInvalid(String),
    /// Parses, but is not exactly one plain function definition.
    #[error("{0}")]
    StructureInvalid(String),
    /// A disallowed statement or expression kind appears in the body.
    #[error("forbidden construct: {0}")]
    ForbiddenConstruct(NodeKind),
    /// A call targets anything other than the bare `print` identifier.
    #[error("forbidden call target: {0}")]
    ForbiddenCall(String),
    /// The whitelisted definition failed when executed in isolation.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
    /// The function was not retrievable after definition.
    #[error("function not found after definition")]
    RegistrationFailed,
}

impl RejectionReason {
    pub(crate) fn structure_invalid() -> Self {
        RejectionReason::StructureInvalid(
            "expected exactly one function definition".to_string(),
        )
    }
}
