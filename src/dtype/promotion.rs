//! Type promotion rules for binary operations
//!
//! Two views of the same table: `promote` answers at runtime from `DType` tags,
//! `Promote` answers at compile time from Rust element types. Expression nodes
//! use the latter to pick their value type before any element is evaluated.

use super::{DType, Element};

/// Common dtype of a binary operation on `lhs` and `rhs`
///
/// The wider float wins, then any float beats any integer, then `i64`. Mixing
/// `i32` with `u32` widens to `i64` since neither holds the other's range.
pub fn promote(lhs: DType, rhs: DType) -> DType {
    use DType::*;

    match (lhs, rhs) {
        _ if lhs == rhs => lhs,
        (F64, _) | (_, F64) => F64,
        (F32, _) | (_, F32) => F32,
        (I64, _) | (_, I64) | (I32, U32) | (U32, I32) => I64,
        (I32, _) | (_, I32) => I32,
        (U32, _) | (_, U32) => U32,
        _ => U8,
    }
}

/// Compile-time common type of two element types.
///
/// `<A as Promote<B>>::Output` is the value type of any binary expression
/// mixing `A` (left) and `B` (right) operands.
pub trait Promote<Rhs: Element>: Element {
    /// The common element type
    type Output: Element;

    /// Convert a left-hand operand to the common type
    fn promote_lhs(self) -> <Self as Promote<Rhs>>::Output;

    /// Convert a right-hand operand to the common type
    fn promote_rhs(rhs: Rhs) -> <Self as Promote<Rhs>>::Output;
}

macro_rules! impl_promote {
    ($($lhs:ty, $rhs:ty => $out:ty;)*) => {
        $(
            impl Promote<$rhs> for $lhs {
                type Output = $out;

                #[inline(always)]
                fn promote_lhs(self) -> $out {
                    self as $out
                }

                #[inline(always)]
                fn promote_rhs(rhs: $rhs) -> $out {
                    rhs as $out
                }
            }
        )*
    };
}

impl_promote! {
    f64, f64 => f64; f64, f32 => f64; f64, i64 => f64; f64, i32 => f64; f64, u32 => f64; f64, u8 => f64;
    f32, f64 => f64; f32, f32 => f32; f32, i64 => f32; f32, i32 => f32; f32, u32 => f32; f32, u8 => f32;
    i64, f64 => f64; i64, f32 => f32; i64, i64 => i64; i64, i32 => i64; i64, u32 => i64; i64, u8 => i64;
    i32, f64 => f64; i32, f32 => f32; i32, i64 => i64; i32, i32 => i32; i32, u32 => i64; i32, u8 => i32;
    u32, f64 => f64; u32, f32 => f32; u32, i64 => i64; u32, i32 => i64; u32, u32 => u32; u32, u8 => u32;
    u8, f64 => f64;  u8, f32 => f32;  u8, i64 => i64;  u8, i32 => i32;  u8, u32 => u32;  u8, u8 => u8;
}
