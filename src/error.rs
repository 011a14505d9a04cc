//! Kernel error taxonomy.
//!
//! Every fallible operation in this kernel happens during bring-up (thread
//! creation); nothing at runtime after threads start running returns a
//! `Result`. Kept to exactly the variants bring-up can produce.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// A required callback or output pointer was missing.
    NullPointer,
    /// A parameter was outside its valid range.
    InvalidParameter,
    /// The fixed-capacity thread array is full.
    OutOfMemory,
    /// A list invariant check failed (e.g. a ready-list walk exceeded capacity).
    InvalidState,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            KernelError::NullPointer => "null pointer",
            KernelError::InvalidParameter => "invalid parameter",
            KernelError::OutOfMemory => "out of memory",
            KernelError::InvalidState => "invalid state",
        };
        f.write_str(msg)
    }
}

pub type KernelResult<T> = Result<T, KernelError>;
