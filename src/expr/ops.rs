//! Operator overloads building expression nodes
//!
//! `+ - * /` between two expressions yield [`Binary`] (`*` is element-wise;
//! the matrix product is [`Expression::matmul`]). An expression combined with a
//! scalar of its own element type yields [`BinaryScalar`] or [`ScalarBinary`].

use super::functor::{AddOp, DivOp, MulOp, NegOp, SubOp};
use super::{
    Binary, BinaryFn, BinaryScalar, Expression, Inverse, Map, MatMul, ScalarBinary, Transposed,
    Unary, UnaryFn,
};
use crate::dtype::{Element, Promote};
use crate::matrix::{Matrix, MatrixView};
use crate::storage::HostStorage;
use std::ops;

macro_rules! impl_binary_op {
    ([$($gen:tt)*] $ty:ty, $trait:ident, $method:ident, $op:ty) => {
        impl<$($gen)*, Rhs: Expression> ops::$trait<Rhs> for $ty
        where
            $ty: Expression,
            <$ty as Expression>::Elem: Promote<Rhs::Elem>,
        {
            type Output = Binary<$ty, Rhs, $op>;

            #[inline]
            fn $method(self, rhs: Rhs) -> Self::Output {
                Binary::new(self, rhs)
            }
        }
    };
}

macro_rules! impl_scalar_op {
    ([$($gen:tt)*] $ty:ty, $s:ty, $trait:ident, $method:ident, $op:ty) => {
        impl<$($gen)*> ops::$trait<$s> for $ty
        where
            $ty: Expression<Elem = $s>,
        {
            type Output = BinaryScalar<$ty, $op>;

            #[inline]
            fn $method(self, s: $s) -> Self::Output {
                BinaryScalar::new(self, s)
            }
        }

        impl<$($gen)*> ops::$trait<$ty> for $s
        where
            $ty: Expression<Elem = $s>,
        {
            type Output = ScalarBinary<$ty, $op>;

            #[inline]
            fn $method(self, e: $ty) -> Self::Output {
                ScalarBinary::new(self, e)
            }
        }
    };
}

macro_rules! impl_scalar_ops {
    ([$($gen:tt)*] $ty:ty, $s:ty) => {
        impl_scalar_op!([$($gen)*] $ty, $s, Add, add, AddOp);
        impl_scalar_op!([$($gen)*] $ty, $s, Sub, sub, SubOp);
        impl_scalar_op!([$($gen)*] $ty, $s, Mul, mul, MulOp);
        impl_scalar_op!([$($gen)*] $ty, $s, Div, div, DivOp);
    };
}

macro_rules! impl_expr_ops {
    ([$($gen:tt)*] $ty:ty) => {
        impl_binary_op!([$($gen)*] $ty, Add, add, AddOp);
        impl_binary_op!([$($gen)*] $ty, Sub, sub, SubOp);
        impl_binary_op!([$($gen)*] $ty, Mul, mul, MulOp);
        impl_binary_op!([$($gen)*] $ty, Div, div, DivOp);

        impl<$($gen)*> ops::Neg for $ty
        where
            $ty: Expression,
        {
            type Output = Unary<$ty, NegOp>;

            #[inline]
            fn neg(self) -> Self::Output {
                Unary::new(self)
            }
        }

        impl_scalar_ops!([$($gen)*] $ty, f64);
        impl_scalar_ops!([$($gen)*] $ty, f32);
        impl_scalar_ops!([$($gen)*] $ty, i64);
        impl_scalar_ops!([$($gen)*] $ty, i32);
        impl_scalar_ops!([$($gen)*] $ty, u32);
        impl_scalar_ops!([$($gen)*] $ty, u8);
    };
}

impl_expr_ops!(['a, T: Element, S: HostStorage<T>] &'a Matrix<T, S>);
impl_expr_ops!(['a, T: Element] MatrixView<'a, T>);
impl_expr_ops!([L, R, Op: BinaryFn] Binary<L, R, Op>);
impl_expr_ops!([E: Expression, Op: BinaryFn] BinaryScalar<E, Op>);
impl_expr_ops!([E: Expression, Op: BinaryFn] ScalarBinary<E, Op>);
impl_expr_ops!([E, Op: UnaryFn] Unary<E, Op>);
impl_expr_ops!([E, F] Map<E, F>);
impl_expr_ops!([L, R] MatMul<L, R>);
impl_expr_ops!([E] Transposed<E>);
impl_expr_ops!([E: Expression] Inverse<E>);
