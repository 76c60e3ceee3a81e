//! The top-level error type, composing every subsystem's error enum.

use crate::frame::FrameError;
use crate::interpreter::decode::DecodeError;
use crate::value::ValueError;

/// A name resolution failure.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NameError {
    /// `LOAD_FAST`/`STORE_FAST` found no binding for a local name.
    #[error("local variable '{0}' referenced before assignment")]
    UnboundLocal(String),
    /// `LOAD_NAME`/`LOAD_GLOBAL` found no binding in globals, built-ins, or the class table.
    #[error("name '{0}' is not defined")]
    UnboundGlobal(String),
}

/// The interpreter's single fatal-error type, composing every subsystem's
/// own error enum via `#[from]`.
#[derive(Debug, thiserror::Error)]
pub enum VmError {
    /// A malformed or unsupported instruction.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// A value-stack discipline violation.
    #[error(transparent)]
    Frame(#[from] FrameError),
    /// An unresolved local or global name.
    #[error(transparent)]
    Name(#[from] NameError),
    /// An arithmetic, comparison, or attribute type error.
    #[error(transparent)]
    Value(#[from] ValueError),
}
