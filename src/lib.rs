//! # densr
//!
//! **Dense matrices with lazy expression evaluation, pluggable storage and a
//! factorization-based linear solver.**
//!
//! Arithmetic on matrices builds expression nodes; nothing is computed until an
//! expression is assigned to a matrix or evaluated explicitly. Result shape and
//! element type are resolved when a node is built, so the destination is
//! allocated once at its final size.
//!
//! ## Features
//!
//! - **Storage**: inline fixed-size, aligned heap (shared handles), device
//!   (linear and pitched) behind a pluggable backend
//! - **Expressions**: element-wise ops with broadcasting, scalar ops, matrix
//!   product, transpose, cached inverse, reductions
//! - **Solver**: Cholesky / LU dispatch from matrix structure, SVD and
//!   least-squares for non-square or rank-deficient systems
//! - **Element types**: f64, f32, i64, i32, u32, u8 with compile-time promotion
//!
//! ## Quick Start
//!
//! ```
//! use densr::prelude::*;
//!
//! let a = DMatrix::from_slice(2, 2, &[2.0f64, 1.0, 1.0, 3.0]);
//! let b = DMatrix::from_slice(2, 2, &[1.0, 0.0, 0.0, 1.0]);
//!
//! // lazy: (a + b) * 0.5, then matrix product with aᵀ
//! let c = ((&a + &b) * 0.5f64).matmul((&a).t()).eval();
//! assert_eq!(c.shape(), Shape::new(2, 2));
//!
//! let x = (&a).inv().eval();
//! assert!(((&x).matmul(&a).eval().trace() - 2.0).abs() < 1e-12);
//! ```
//!
//! ## Feature Flags
//!
//! - `rayon` (default): multi-threaded materialization and reductions above
//!   [`PARALLEL_THRESHOLD`](expr::PARALLEL_THRESHOLD) elements

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod device;
pub mod dtype;
pub mod error;
pub mod expr;
pub mod linalg;
pub mod matrix;
pub mod storage;
pub mod tensor;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::device::{DeviceBackend, HostDevice};
    pub use crate::dtype::{DType, Element, Real};
    pub use crate::error::{Error, Result};
    pub use crate::expr::{Expression, Shape, covar, outer_product, skew, sym};
    pub use crate::linalg::{Algorithm, Lapack, LinearSolver, SolverInfo, svd, svd_solve};
    pub use crate::matrix::{
        DMatrix, DeviceMatrix, Format, Layout, Matrix, Matrix2, Matrix3, Matrix4, MatrixView,
        MatrixViewMut, SMatrix, Structure, Vector2, Vector3, Vector4,
    };
    pub use crate::storage::{Location, Ownership};
    pub use crate::tensor::{MatrixGrid, MultiMatrix};
}
