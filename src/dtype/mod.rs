//! Element types for densr matrices
//!
//! Six element types are supported: `f64`, `f32`, `i64`, `i32`, `u32` and `u8`.
//! [`DType`] is their runtime tag, used by foreign-buffer interop and in
//! diagnostics. [`Element`] ties a Rust type to its tag and [`Promote`] picks the
//! common type of a mixed-type expression.

mod element;
mod promotion;

pub use element::{Element, Real};
pub use promotion::{Promote, promote};

use crate::error::{Error, Result};
use std::fmt;

/// Runtime tag of a matrix element type
///
/// The discriminant is the tag used by [`ForeignDense`](crate::matrix::ForeignDense)
/// descriptors; it is stable across releases.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DType {
    /// `f64`
    F64 = 0,
    /// `f32`
    F32 = 1,
    /// `i64`
    I64 = 2,
    /// `i32`
    I32 = 3,
    /// `u32`
    U32 = 4,
    /// `u8`
    U8 = 5,
}

impl DType {
    /// Every tag, widest float first
    pub const ALL: [DType; 6] = [Self::F64, Self::F32, Self::I64, Self::I32, Self::U32, Self::U8];

    /// Width of one element
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            Self::F64 | Self::I64 => 8,
            Self::F32 | Self::I32 | Self::U32 => 4,
            Self::U8 => 1,
        }
    }

    /// `f32` or `f64`
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F64 | Self::F32)
    }

    /// Rust spelling of the type
    pub const fn name(self) -> &'static str {
        match self {
            Self::F64 => "f64",
            Self::F32 => "f32",
            Self::I64 => "i64",
            Self::I32 => "i32",
            Self::U32 => "u32",
            Self::U8 => "u8",
        }
    }
}

impl TryFrom<u8> for DType {
    type Error = Error;

    fn try_from(tag: u8) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|dt| *dt as u8 == tag)
            .ok_or_else(|| Error::invalid_argument("dtype", format!("unknown tag {tag}")))
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes_match_rust_types() {
        assert_eq!(DType::F64.size_in_bytes(), std::mem::size_of::<f64>());
        assert_eq!(DType::U32.size_in_bytes(), std::mem::size_of::<u32>());
        assert_eq!(DType::U8.size_in_bytes(), 1);
        assert!(DType::F32.is_float() && !DType::I64.is_float());
    }

    #[test]
    fn test_tag_round_trip() {
        for dt in DType::ALL {
            assert_eq!(DType::try_from(dt as u8).unwrap(), dt);
        }
        assert!(DType::try_from(6u8).is_err());
        assert_eq!(DType::I32.to_string(), "i32");
    }
}
