//! Error types for the annotation engine.
//!
//! The decision engine itself never fails: every negative outcome narrows the
//! scope of analysis instead. Errors only arise at the edges, when loading a
//! program model or reading external inputs.

use thiserror::Error;
use std::fmt;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum AnnotateError {
    /// Malformed program model
    #[error("IR error: {0}")]
    Ir(#[from] IrError),

    /// Malformed JSON input
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error while validating a function's loop and region trees.
#[derive(Error, Debug, Clone)]
pub struct IrError {
    /// The error message
    pub message: String,
    /// Function the error was found in
    pub function: String,
    /// The kind of IR error
    pub kind: IrErrorKind,
}

impl IrError {
    /// Create a new IR error.
    pub fn new(kind: IrErrorKind, function: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            function: function.into(),
            kind,
        }
    }
}

impl fmt::Display for IrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in function `{}`", self.message, self.function)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrErrorKind {
    /// Reference to a block that does not exist
    DanglingBlock,
    /// Reference to a loop that does not exist
    DanglingLoop,
    /// Reference to a region that does not exist
    DanglingRegion,
    /// Node ids are not dense and in declaration order
    MisnumberedNode,
    /// A loop is its own ancestor
    CyclicLoopNest,
    /// A region is its own ancestor
    CyclicRegionTree,
    /// No region without a parent
    MissingTopRegion,
    /// More than one region without a parent
    MultipleTopRegions,
    /// Two functions share a name
    DuplicateFunction,
}

/// Result type using AnnotateError.
pub type AnnotateResult<T> = Result<T, AnnotateError>;
