//! Eager reductions over a matrix

use super::Matrix;
use crate::dtype::{Element, Promote};
use crate::error::{Error, fatal};
use crate::expr::{BinaryFn, Expression, MulOp};
use crate::storage::HostStorage;

impl<T: Element, S: HostStorage<T>> Matrix<T, S> {
    /// Largest element
    ///
    /// # Panics
    /// If the matrix is empty.
    #[track_caller]
    pub fn max(&self) -> T {
        self.extremum("max", |a, b| b > a)
    }

    /// Smallest element
    ///
    /// # Panics
    /// If the matrix is empty.
    #[track_caller]
    pub fn min(&self) -> T {
        self.extremum("min", |a, b| b < a)
    }

    #[track_caller]
    fn extremum(&self, op: &'static str, better: impl Fn(T, T) -> bool) -> T {
        let mut it = self.iter().copied();
        let Some(first) = it.next() else {
            fatal(Error::invalid_argument(op, "empty matrix"));
        };
        it.fold(first, |acc, v| if better(acc, v) { v } else { acc })
    }

    /// Sum of the main diagonal
    pub fn trace(&self) -> T {
        let n = self.rows().min(self.cols());
        let step = self.cols() + 1;
        self.iter().step_by(step).take(n).fold(T::zero(), |acc, &v| acc + v)
    }

    /// Frobenius norm `sqrt(Σ a²)`
    pub fn norm(&self) -> T {
        let ss: f64 = self.iter().map(|v| v.to_f64() * v.to_f64()).sum();
        T::from_f64(ss.sqrt())
    }

    /// Element-wise p-norm `(Σ |a|^p)^(1/p)`; `p == 0` selects the max-norm
    pub fn norm_p(&self, p: u32) -> T {
        let abs = self.iter().map(|v| v.to_f64().abs());
        let value = match p {
            0 => abs.fold(0.0, f64::max),
            1 => abs.sum(),
            _ => abs.map(|v| v.powi(p as i32)).sum::<f64>().powf(1.0 / p as f64),
        };
        T::from_f64(value)
    }

    /// Sum of the element-wise product with `rhs`
    ///
    /// Operands pair by linear index, so a row and a column of the same length
    /// multiply like two vectors.
    ///
    /// # Panics
    /// If the element counts differ.
    #[track_caller]
    pub fn dot<E: Expression>(&self, rhs: E) -> <T as Promote<E::Elem>>::Output
    where
        T: Promote<E::Elem>,
    {
        if rhs.size() != self.size() {
            fatal(Error::shape_mismatch(self.shape().into(), rhs.shape().into()));
        }
        self.iter().enumerate().fold(Element::zero(), |acc, (i, &a)| {
            let b = <T as Promote<E::Elem>>::promote_rhs(rhs.eval_at(i));
            acc + MulOp::apply(<T as Promote<E::Elem>>::promote_lhs(a), b)
        })
    }
}
