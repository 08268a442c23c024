//! Error types for densr

use crate::dtype::DType;
use crate::linalg::Algorithm;
use thiserror::Error;

/// Result type alias using densr's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in densr operations
///
/// Precondition violations on the panicking entry points (`Matrix::from_slice`,
/// `Matrix::block`, ...) abort with the `Display` text of one of these variants;
/// the `try_*` counterparts hand the value back instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Shape mismatch in an operation
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        /// Expected (rows, cols)
        expected: (usize, usize),
        /// Actual (rows, cols)
        got: (usize, usize),
    },

    /// Operand shapes are not covered by any supported broadcast rule
    #[error("Cannot broadcast shapes {lhs:?} and {rhs:?}: {reason}")]
    Broadcast {
        /// Left-hand side (rows, cols)
        lhs: (usize, usize),
        /// Right-hand side (rows, cols)
        rhs: (usize, usize),
        /// Which rule was violated
        reason: &'static str,
    },

    /// Index or range out of bounds
    #[error("Index {index} out of bounds for dimension of size {size}")]
    IndexOutOfBounds {
        /// The invalid index (or range end)
        index: usize,
        /// Size of the dimension
        size: usize,
    },

    /// Unknown storage location tag
    #[error("Invalid storage location tag {0}")]
    InvalidLocation(u8),

    /// Out of memory
    #[error("Out of memory: failed to allocate {size} bytes")]
    OutOfMemory {
        /// Requested size in bytes
        size: usize,
    },

    /// Operation requires a square matrix
    #[error("Support only for square matrix, got {rows}x{cols}")]
    NotSquare {
        /// Row count
        rows: usize,
        /// Column count
        cols: usize,
    },

    /// Element type tag does not match the requested element type
    #[error("DType mismatch: {lhs:?} vs {rhs:?}")]
    DTypeMismatch {
        /// Expected dtype
        lhs: DType,
        /// Found dtype
        rhs: DType,
    },

    /// Invalid argument provided to an operation
    #[error("Invalid argument '{arg}': {reason}")]
    InvalidArgument {
        /// The argument name
        arg: &'static str,
        /// Reason for invalidity
        reason: String,
    },

    /// A factorization reported a non-zero status
    #[error("{algorithm:?} factorization failed with status {status}")]
    Numerical {
        /// Algorithm that failed
        algorithm: Algorithm,
        /// Backend status code
        status: i32,
    },

    /// Device backend error
    #[error("Backend error: {0}")]
    Backend(String),
}

impl Error {
    /// Create a shape mismatch error
    pub fn shape_mismatch(expected: (usize, usize), got: (usize, usize)) -> Self {
        Self::ShapeMismatch { expected, got }
    }

    /// Create a broadcast error
    pub fn broadcast(lhs: (usize, usize), rhs: (usize, usize), reason: &'static str) -> Self {
        Self::Broadcast { lhs, rhs, reason }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg,
            reason: reason.into(),
        }
    }
}

/// Abort the current operation with a precondition error.
///
/// Used by the infallible entry points that wrap a `try_*` variant.
#[track_caller]
#[inline(never)]
#[cold]
pub(crate) fn fatal(err: Error) -> ! {
    panic!("{err}")
}

/// Unwrap a `Result`, aborting with the error message on failure.
pub(crate) trait OrFatal<T> {
    /// Return the value or abort with the contained error
    fn or_fatal(self) -> T;
}

impl<T> OrFatal<T> for Result<T> {
    #[track_caller]
    #[inline]
    fn or_fatal(self) -> T {
        match self {
            Ok(v) => v,
            Err(e) => fatal(e),
        }
    }
}
