//! Element traits mapping Rust types to DType

use super::DType;
use bytemuck::{Pod, Zeroable};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Trait for types that can be elements of a matrix
///
/// # Bounds
/// - `Copy + Send + Sync + 'static` - elements are plain values shared across threads
/// - `Pod + Zeroable` - buffers are allocated zeroed and viewed as bytes (bytemuck)
/// - `Add + Sub + Mul + Div` - arithmetic (Output = Self)
/// - `PartialOrd` - comparison for min/max
///
/// `Neg` is not required since unsigned types don't support it; negation and the
/// transcendental functors go through `to_f64` / `from_f64`.
pub trait Element:
    Copy
    + Send
    + Sync
    + Pod
    + Zeroable
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + PartialOrd
    + fmt::Debug
    + fmt::Display
{
    /// The corresponding DType for this Rust type
    const DTYPE: DType;

    /// Convert to f64 for generic numeric operations
    fn to_f64(self) -> f64;

    /// Convert from f64 to this type (saturating for integers)
    fn from_f64(v: f64) -> Self;

    /// Zero value
    fn zero() -> Self;

    /// One value
    fn one() -> Self;
}

macro_rules! impl_element {
    ($ty:ty, $dtype:expr, $zero:expr, $one:expr) => {
        impl Element for $ty {
            const DTYPE: DType = $dtype;

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn from_f64(v: f64) -> Self {
                v as $ty
            }

            #[inline]
            fn zero() -> Self {
                $zero
            }

            #[inline]
            fn one() -> Self {
                $one
            }
        }
    };
}

impl_element!(f64, DType::F64, 0.0, 1.0);
impl_element!(f32, DType::F32, 0.0, 1.0);
impl_element!(i64, DType::I64, 0, 1);
impl_element!(i32, DType::I32, 0, 1);
impl_element!(u32, DType::U32, 0, 1);
impl_element!(u8, DType::U8, 0, 1);

/// Floating point elements usable by the factorization kernels.
///
/// Methods like `zero()`, `one()`, `to_f64()` and `from_f64()` are inherited
/// from `Element`.
pub trait Real: Element + Neg<Output = Self> {
    /// Machine epsilon for this type
    fn epsilon_val() -> f64;
    /// Absolute value
    fn abs_val(self) -> Self;
    /// Square root
    fn sqrt_val(self) -> Self;
}

impl Real for f32 {
    #[inline]
    fn epsilon_val() -> f64 {
        f32::EPSILON as f64
    }
    #[inline]
    fn abs_val(self) -> Self {
        self.abs()
    }
    #[inline]
    fn sqrt_val(self) -> Self {
        self.sqrt()
    }
}

impl Real for f64 {
    #[inline]
    fn epsilon_val() -> f64 {
        f64::EPSILON
    }
    #[inline]
    fn abs_val(self) -> Self {
        self.abs()
    }
    #[inline]
    fn sqrt_val(self) -> Self {
        self.sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_f64_saturates_integers() {
        assert_eq!(<u8 as Element>::from_f64(300.0), 255);
        assert_eq!(<u8 as Element>::from_f64(-3.0), 0);
        assert_eq!(<i32 as Element>::from_f64(2.9), 2);
    }

    #[test]
    fn test_dtype_constants() {
        assert_eq!(f32::DTYPE, DType::F32);
        assert_eq!(u32::DTYPE, DType::U32);
        assert_eq!(std::mem::size_of::<i64>(), i64::DTYPE.size_in_bytes());
    }
}
