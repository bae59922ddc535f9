//! Error types for simt-spmm

use std::time::Duration;

use crate::runtime::MemAccess;
use thiserror::Error;

/// Result type alias using simt-spmm's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, launching or checking an SpMM run
///
/// Verification mismatches are not errors: they are counted in a
/// [`VerificationReport`](crate::verify::VerificationReport).
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// Shape mismatch between operands
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected shape
        expected: Vec<usize>,
        /// Actual shape
        got: Vec<usize>,
    },

    /// CSR arrays violate the row-pointer or column-index invariants
    #[error("Invalid CSR structure: {reason}")]
    InvalidCsr {
        /// Which invariant is broken
        reason: String,
    },

    /// Device memory exhausted
    #[error("Out of memory: failed to allocate {size} bytes ({available} bytes available)")]
    OutOfMemory {
        /// Requested size in bytes
        size: usize,
        /// Bytes still available on the device
        available: usize,
    },

    /// Handle does not name a live device resource
    #[error("Buffer {id:#x} not found")]
    BufferNotFound {
        /// Raw buffer handle
        id: u64,
    },

    /// Byte range outside a buffer
    #[error("Buffer {id:#x} access out of range: offset {offset} + {len} bytes exceeds size {size}")]
    BufferAccess {
        /// Raw buffer handle
        id: u64,
        /// Start offset in bytes
        offset: usize,
        /// Length of the access in bytes
        len: usize,
        /// Size of the buffer in bytes
        size: usize,
    },

    /// Device-side store into a buffer allocated without write access
    #[error("Buffer {id:#x} is {access:?}, device writes are not permitted")]
    AccessDenied {
        /// Raw buffer handle
        id: u64,
        /// Access mode the buffer was allocated with
        access: MemAccess,
    },

    /// Kernel file does not resolve to a registered kernel
    #[error("Kernel '{name}' not found")]
    KernelNotFound {
        /// Name the lookup was attempted with
        name: String,
    },

    /// Kernel launch or execution failed
    #[error("Kernel launch failed: {0}")]
    Launch(String),

    /// Device did not signal completion in time
    #[error("Timed out after {timeout:?} waiting for device completion")]
    Timeout {
        /// The timeout that elapsed
        timeout: Duration,
    },

    /// A grid thread produced an output outside its partition
    #[error("Output partition violated at index {index}: {reason}")]
    PartitionViolation {
        /// Flat output index
        index: usize,
        /// What went wrong
        reason: &'static str,
    },

    /// Operation on a device that was already closed
    #[error("Device is closed")]
    DeviceClosed,
}

impl Error {
    /// Create a shape mismatch error
    pub fn shape_mismatch(expected: &[usize], got: &[usize]) -> Self {
        Self::ShapeMismatch {
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }

    /// Create an invalid CSR error
    pub fn invalid_csr(reason: impl Into<String>) -> Self {
        Self::InvalidCsr {
            reason: reason.into(),
        }
    }
}
