//! Element-wise expression nodes

use super::functor::{BinaryFn, UnaryFn};
use super::{Expression, Shape};
use crate::dtype::Promote;
use crate::error::{OrFatal, Result};
use std::marker::PhantomData;

/// `op(lhs, rhs)` applied element by element
///
/// Operands of equal shape pair up element by element. Otherwise the left
/// operand is read once per result row: `result(i) = op(lhs(i / cols), rhs(i))`.
#[derive(Clone, Debug)]
pub struct Binary<L, R, Op> {
    lhs: L,
    rhs: R,
    shape: Shape,
    broadcast: bool,
    /// Both operands have exactly the result shape
    aligned: bool,
    _op: PhantomData<Op>,
}

impl<L, R, Op> Binary<L, R, Op>
where
    L: Expression,
    R: Expression,
    L::Elem: Promote<R::Elem>,
    Op: BinaryFn,
{
    /// Combine two expressions
    ///
    /// # Panics
    /// If the operand shapes do not pair up (see [`Shape::ewise_broadcast`]).
    #[track_caller]
    pub fn new(lhs: L, rhs: R) -> Self {
        Self::try_new(lhs, rhs).or_fatal()
    }

    /// Combine two expressions, returning an error on incompatible shapes
    pub fn try_new(lhs: L, rhs: R) -> Result<Self> {
        let (ls, rs) = (lhs.shape(), rhs.shape());
        let (shape, broadcast) = Shape::ewise_broadcast(ls, rs)?;
        Ok(Self {
            lhs,
            rhs,
            shape,
            broadcast,
            aligned: ls == shape && rs == shape,
            _op: PhantomData,
        })
    }

    /// Whether the left operand is broadcast across result rows
    pub fn is_broadcast(&self) -> bool {
        self.broadcast
    }
}

impl<L, R, Op> Expression for Binary<L, R, Op>
where
    L: Expression,
    R: Expression,
    L::Elem: Promote<R::Elem>,
    Op: BinaryFn,
{
    type Elem = <L::Elem as Promote<R::Elem>>::Output;

    #[inline]
    fn shape(&self) -> Shape {
        self.shape
    }

    #[inline]
    fn eval_at(&self, i: usize) -> Self::Elem {
        let a = if self.broadcast {
            self.lhs.eval_at(i / self.shape.cols)
        } else {
            self.lhs.eval_at(i)
        };
        let b = self.rhs.eval_at(i);
        Op::apply(a.promote_lhs(), <L::Elem as Promote<R::Elem>>::promote_rhs(b))
    }

    #[inline]
    fn eval_rc(&self, r: usize, c: usize) -> Self::Elem {
        if !self.aligned {
            return self.eval_at(r * self.shape.cols + c);
        }
        let a = self.lhs.eval_rc(r, c);
        let b = self.rhs.eval_rc(r, c);
        Op::apply(a.promote_lhs(), <L::Elem as Promote<R::Elem>>::promote_rhs(b))
    }
}

/// `op(expr, scalar)` applied to every element
#[derive(Clone, Debug)]
pub struct BinaryScalar<E: Expression, Op> {
    expr: E,
    scalar: E::Elem,
    _op: PhantomData<Op>,
}

impl<E: Expression, Op: BinaryFn> BinaryScalar<E, Op> {
    /// Combine an expression with a trailing scalar
    pub fn new(expr: E, scalar: E::Elem) -> Self {
        Self {
            expr,
            scalar,
            _op: PhantomData,
        }
    }
}

impl<E: Expression, Op: BinaryFn> Expression for BinaryScalar<E, Op> {
    type Elem = E::Elem;

    #[inline]
    fn shape(&self) -> Shape {
        self.expr.shape()
    }

    #[inline]
    fn eval_at(&self, i: usize) -> Self::Elem {
        Op::apply(self.expr.eval_at(i), self.scalar)
    }

    #[inline]
    fn eval_rc(&self, r: usize, c: usize) -> Self::Elem {
        Op::apply(self.expr.eval_rc(r, c), self.scalar)
    }
}

/// `op(scalar, expr)` applied to every element
#[derive(Clone, Debug)]
pub struct ScalarBinary<E: Expression, Op> {
    scalar: E::Elem,
    expr: E,
    _op: PhantomData<Op>,
}

impl<E: Expression, Op: BinaryFn> ScalarBinary<E, Op> {
    /// Combine a leading scalar with an expression
    pub fn new(scalar: E::Elem, expr: E) -> Self {
        Self {
            scalar,
            expr,
            _op: PhantomData,
        }
    }
}

impl<E: Expression, Op: BinaryFn> Expression for ScalarBinary<E, Op> {
    type Elem = E::Elem;

    #[inline]
    fn shape(&self) -> Shape {
        self.expr.shape()
    }

    #[inline]
    fn eval_at(&self, i: usize) -> Self::Elem {
        Op::apply(self.scalar, self.expr.eval_at(i))
    }

    #[inline]
    fn eval_rc(&self, r: usize, c: usize) -> Self::Elem {
        Op::apply(self.scalar, self.expr.eval_rc(r, c))
    }
}

/// A [`UnaryFn`] applied to every element
#[derive(Clone, Debug)]
pub struct Unary<E, Op> {
    expr: E,
    _op: PhantomData<Op>,
}

impl<E: Expression, Op: UnaryFn> Unary<E, Op> {
    /// Wrap an expression
    pub fn new(expr: E) -> Self {
        Self {
            expr,
            _op: PhantomData,
        }
    }
}

impl<E: Expression, Op: UnaryFn> Expression for Unary<E, Op> {
    type Elem = E::Elem;

    #[inline]
    fn shape(&self) -> Shape {
        self.expr.shape()
    }

    #[inline]
    fn eval_at(&self, i: usize) -> Self::Elem {
        Op::apply(self.expr.eval_at(i))
    }

    #[inline]
    fn eval_rc(&self, r: usize, c: usize) -> Self::Elem {
        Op::apply(self.expr.eval_rc(r, c))
    }
}

/// A closure applied to every element
#[derive(Clone)]
pub struct Map<E, F> {
    expr: E,
    f: F,
}

impl<E, F> Map<E, F>
where
    E: Expression,
    F: Fn(E::Elem) -> E::Elem + Sync,
{
    /// Wrap an expression
    pub fn new(expr: E, f: F) -> Self {
        Self { expr, f }
    }
}

impl<E, F> Expression for Map<E, F>
where
    E: Expression,
    F: Fn(E::Elem) -> E::Elem + Sync,
{
    type Elem = E::Elem;

    #[inline]
    fn shape(&self) -> Shape {
        self.expr.shape()
    }

    #[inline]
    fn eval_at(&self, i: usize) -> Self::Elem {
        (self.f)(self.expr.eval_at(i))
    }

    #[inline]
    fn eval_rc(&self, r: usize, c: usize) -> Self::Elem {
        (self.f)(self.expr.eval_rc(r, c))
    }
}
