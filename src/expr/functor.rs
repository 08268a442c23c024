//! Operator functors applied by expression nodes
//!
//! Functors are zero-sized types so a node's operator is part of its type and
//! costs nothing at runtime. Transcendental functions go through `f64` and are
//! converted back to the element type.

use crate::dtype::Element;

/// Binary element operator
pub trait BinaryFn: Copy + Send + Sync + 'static {
    /// Operator name for diagnostics
    const NAME: &'static str;

    /// Apply the operator
    fn apply<T: Element>(a: T, b: T) -> T;
}

/// Unary element operator
pub trait UnaryFn: Copy + Send + Sync + 'static {
    /// Operator name for diagnostics
    const NAME: &'static str;

    /// Apply the operator
    fn apply<T: Element>(v: T) -> T;
}

macro_rules! binary_fn {
    ($(#[$doc:meta])* $name:ident, $label:literal, |$a:ident, $b:ident| $body:expr) => {
        $(#[$doc])*
        #[derive(Copy, Clone, Debug, Default)]
        pub struct $name;

        impl BinaryFn for $name {
            const NAME: &'static str = $label;

            #[inline(always)]
            fn apply<T: Element>($a: T, $b: T) -> T {
                $body
            }
        }
    };
}

macro_rules! unary_fn {
    ($(#[$doc:meta])* $name:ident, $label:literal, |$v:ident| $body:expr) => {
        $(#[$doc])*
        #[derive(Copy, Clone, Debug, Default)]
        pub struct $name;

        impl UnaryFn for $name {
            const NAME: &'static str = $label;

            #[inline(always)]
            fn apply<T: Element>($v: T) -> T {
                $body
            }
        }
    };
}

binary_fn!(
    /// `a + b`
    AddOp, "add", |a, b| a + b
);
binary_fn!(
    /// `a - b`
    SubOp, "sub", |a, b| a - b
);
binary_fn!(
    /// `a * b` (element-wise)
    MulOp, "mul", |a, b| a * b
);
binary_fn!(
    /// `a / b`
    DivOp, "div", |a, b| a / b
);
binary_fn!(
    /// Larger of `a` and `b`
    MaxOp, "max", |a, b| if b > a { b } else { a }
);
binary_fn!(
    /// Smaller of `a` and `b`
    MinOp, "min", |a, b| if b < a { b } else { a }
);

unary_fn!(
    /// Square root
    Sqrt, "sqrt", |v| T::from_f64(v.to_f64().sqrt())
);
unary_fn!(
    /// Natural exponential
    Exp, "exp", |v| T::from_f64(v.to_f64().exp())
);
unary_fn!(
    /// Natural logarithm
    Log, "log", |v| T::from_f64(v.to_f64().ln())
);
unary_fn!(
    /// Base-2 logarithm
    Log2, "log2", |v| T::from_f64(v.to_f64().log2())
);
unary_fn!(
    /// Base-10 logarithm
    Log10, "log10", |v| T::from_f64(v.to_f64().log10())
);
unary_fn!(
    /// Absolute value
    Abs, "abs", |v| if v < T::zero() { T::zero() - v } else { v }
);
unary_fn!(
    /// Round towards negative infinity
    Floor, "floor", |v| T::from_f64(v.to_f64().floor())
);
unary_fn!(
    /// `v * v`
    Square, "sq", |v| v * v
);
unary_fn!(
    /// Negation; saturates to zero for unsigned elements
    NegOp, "neg", |v| T::from_f64(-v.to_f64())
);
