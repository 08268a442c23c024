//! Generic factorization and substitution kernels
//!
//! Square buffers are addressed through their [`Layout`]: a column-major
//! buffer is factorized as the matrix it encodes in column order, and the
//! factors are written back in the same order. Right-hand sides are always
//! row-major `n×nrhs` buffers.

use crate::dtype::Real;
use crate::matrix::Layout;

/// Sweep limit of the one-sided Jacobi SVD
pub const MAX_SWEEPS: usize = 30;

#[inline(always)]
fn index(layout: Layout, n: usize, r: usize, c: usize) -> usize {
    match layout {
        Layout::RowMajor => r * n + c,
        Layout::ColMajor => c * n + r,
    }
}

/// Cholesky-Banachiewicz, in place on the lower triangle
///
/// Returns the 1-based order of the first leading minor that is not positive
/// definite, or `0`.
pub(crate) fn cholesky<T: Real>(layout: Layout, n: usize, a: &mut [T]) -> i32 {
    debug_assert!(a.len() >= n * n);
    let at = move |r: usize, c: usize| index(layout, n, r, c);

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[at(i, j)];
            for k in 0..j {
                sum = sum - a[at(i, k)] * a[at(j, k)];
            }
            if i == j {
                let d = sum.to_f64();
                if d <= 0.0 || d.is_nan() {
                    return (i + 1) as i32;
                }
                a[at(i, i)] = sum.sqrt_val();
            } else {
                a[at(i, j)] = sum / a[at(j, j)];
            }
        }
    }
    0
}

/// Doolittle LU with partial pivoting, in place
///
/// `L` (unit diagonal, implied) and `U` share the buffer. Factorization runs to
/// completion on a singular matrix; the return value is then the 1-based column
/// of the first exactly-zero pivot.
pub(crate) fn lu<T: Real>(layout: Layout, n: usize, a: &mut [T], ipiv: &mut [i32]) -> i32 {
    debug_assert!(a.len() >= n * n && ipiv.len() >= n);
    let at = move |r: usize, c: usize| index(layout, n, r, c);
    let mut info = 0;

    for col in 0..n {
        let mut pivot_row = col;
        let mut max_val = a[at(col, col)].abs_val();
        for row in (col + 1)..n {
            let val = a[at(row, col)].abs_val();
            if val > max_val {
                max_val = val;
                pivot_row = row;
            }
        }
        ipiv[col] = (pivot_row + 1) as i32;

        if pivot_row != col {
            for j in 0..n {
                a.swap(at(col, j), at(pivot_row, j));
            }
        }

        let pivot = a[at(col, col)];
        if pivot == T::zero() {
            if info == 0 {
                info = (col + 1) as i32;
            }
            continue;
        }

        for row in (col + 1)..n {
            a[at(row, col)] = a[at(row, col)] / pivot;
        }
        for row in (col + 1)..n {
            let multiplier = a[at(row, col)];
            for j in (col + 1)..n {
                a[at(row, j)] = a[at(row, j)] - multiplier * a[at(col, j)];
            }
        }
    }
    info
}

/// Solve `L·Lᵀ·x = b` for every column of `b`
pub(crate) fn cholesky_solve<T: Real>(layout: Layout, n: usize, l: &[T], b: &mut [T], nrhs: usize) {
    let at = move |r: usize, c: usize| index(layout, n, r, c);
    for c in 0..nrhs {
        for i in 0..n {
            let mut sum = b[i * nrhs + c];
            for j in 0..i {
                sum = sum - l[at(i, j)] * b[j * nrhs + c];
            }
            b[i * nrhs + c] = sum / l[at(i, i)];
        }
        for i in (0..n).rev() {
            let mut sum = b[i * nrhs + c];
            for j in (i + 1)..n {
                sum = sum - l[at(j, i)] * b[j * nrhs + c];
            }
            b[i * nrhs + c] = sum / l[at(i, i)];
        }
    }
}

/// Solve `P·L·U·x = b` for every column of `b`
pub(crate) fn lu_solve<T: Real>(
    layout: Layout,
    n: usize,
    lu: &[T],
    ipiv: &[i32],
    b: &mut [T],
    nrhs: usize,
) {
    let at = move |r: usize, c: usize| index(layout, n, r, c);
    for (i, &p) in ipiv.iter().enumerate().take(n) {
        let p = (p - 1) as usize;
        if p != i {
            for c in 0..nrhs {
                b.swap(i * nrhs + c, p * nrhs + c);
            }
        }
    }
    for c in 0..nrhs {
        for i in 1..n {
            let mut sum = b[i * nrhs + c];
            for j in 0..i {
                sum = sum - lu[at(i, j)] * b[j * nrhs + c];
            }
            b[i * nrhs + c] = sum;
        }
        for i in (0..n).rev() {
            let mut sum = b[i * nrhs + c];
            for j in (i + 1)..n {
                sum = sum - lu[at(i, j)] * b[j * nrhs + c];
            }
            b[i * nrhs + c] = sum / lu[at(i, i)];
        }
    }
}

/// Givens rotation parameters
///
/// ```text
/// J = [ c  -s ]
///     [ s   c ]
/// ```
#[derive(Debug, Clone, Copy)]
struct JacobiRotation {
    c: f64,
    s: f64,
}

impl JacobiRotation {
    /// Rotation zeroing the off-diagonal of a symmetric 2x2 block
    ///
    /// ```text
    /// τ = (a_qq - a_pp) / (2 * a_pq)
    /// t = sign(τ) / (|τ| + sqrt(1 + τ²))
    /// c = 1 / sqrt(1 + t²)
    /// s = t * c
    /// ```
    #[inline]
    fn compute(a_pp: f64, a_qq: f64, a_pq: f64) -> Self {
        let tau_den = 2.0 * a_pq;
        if tau_den.abs() < 1e-300 {
            return Self { c: 1.0, s: 0.0 };
        }

        let tau = (a_qq - a_pp) / tau_den;
        let t = if tau >= 0.0 {
            1.0 / (tau + (1.0 + tau * tau).sqrt())
        } else {
            -1.0 / (-tau + (1.0 + tau * tau).sqrt())
        };

        let c = 1.0 / (1.0 + t * t).sqrt();
        Self { c, s: t * c }
    }

    /// `[col_p, col_q] ← [col_p, col_q] · [[c, s], [-s, c]]`
    #[inline]
    fn apply<T: Real>(&self, data: &mut [T], rows: usize, cols: usize, p: usize, q: usize) {
        let (c, s) = (T::from_f64(self.c), T::from_f64(self.s));
        for i in 0..rows {
            let (ip, iq) = (i * cols + p, i * cols + q);
            let (vp, vq) = (data[ip], data[iq]);
            data[ip] = c * vp - s * vq;
            data[iq] = s * vp + c * vq;
        }
    }
}

/// `(B[:,p]·B[:,p], B[:,q]·B[:,q], B[:,p]·B[:,q])`
#[inline]
fn gram<T: Real>(b: &[T], rows: usize, cols: usize, p: usize, q: usize) -> (f64, f64, f64) {
    let (mut a_pp, mut a_qq, mut a_pq) = (T::zero(), T::zero(), T::zero());
    for i in 0..rows {
        let bp = b[i * cols + p];
        let bq = b[i * cols + q];
        a_pp = a_pp + bp * bp;
        a_qq = a_qq + bq * bq;
        a_pq = a_pq + bp * bq;
    }
    (a_pp.to_f64(), a_qq.to_f64(), a_pq.to_f64())
}

/// One-sided Jacobi SVD of a row-major `m×n` matrix
///
/// 1. If `m < n`, decompose `Aᵀ` and swap the roles of `U` and `V`.
/// 2. Rotate column pairs of `B = A` (accumulating `V`) until no pair has a
///    relative inner product above `n·ε`, for at most [`MAX_SWEEPS`] sweeps.
/// 3. `S[j] = ‖B[:,j]‖`, `U[:,j] = B[:,j] / S[j]`, sorted by descending `S`.
///
/// Returns `1` if the sweeps did not converge, `0` otherwise.
pub(crate) fn jacobi_svd<T: Real>(
    m: usize,
    n: usize,
    a: &[T],
    u: &mut [T],
    s: &mut [T],
    vt: &mut [T],
) -> i32 {
    let k = m.min(n);
    if k == 0 {
        return 0;
    }

    let transpose = m < n;
    let (wm, wn) = if transpose { (n, m) } else { (m, n) };
    let mut b: Vec<T> = if transpose {
        (0..wm * wn).map(|i| a[(i % wn) * n + i / wn]).collect()
    } else {
        a[..m * n].to_vec()
    };
    let mut v = vec![T::zero(); wn * wn];
    for i in 0..wn {
        v[i * wn + i] = T::one();
    }

    let eps = T::epsilon_val();
    let tol = wn as f64 * eps;
    let mut sweeps = 0;
    let mut converged = false;
    while sweeps < MAX_SWEEPS {
        sweeps += 1;
        let mut rotated = false;
        for p in 0..wn {
            for q in (p + 1)..wn {
                let (a_pp, a_qq, a_pq) = gram(&b, wm, wn, p, q);
                if a_pq.abs() <= tol * (a_pp * a_qq).sqrt() {
                    continue;
                }
                let rot = JacobiRotation::compute(a_pp, a_qq, a_pq);
                rot.apply(&mut b, wm, wn, p, q);
                rot.apply(&mut v, wn, wn, p, q);
                rotated = true;
            }
        }
        if !rotated {
            converged = true;
            break;
        }
    }

    let mut norms = vec![T::zero(); wn];
    for (j, norm) in norms.iter_mut().enumerate() {
        let ss = (0..wm).fold(T::zero(), |acc, i| acc + b[i * wn + j] * b[i * wn + j]);
        *norm = ss.sqrt_val();
        let keep = norm.to_f64() > eps;
        for i in 0..wm {
            let x = &mut b[i * wn + j];
            *x = if keep { *x / *norm } else { T::zero() };
        }
    }

    let mut order: Vec<usize> = (0..wn).collect();
    order.sort_by(|&i, &j| {
        norms[j]
            .partial_cmp(&norms[i])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for (dst, &src) in order.iter().enumerate() {
        s[dst] = norms[src];
        if transpose {
            // A = V'·S·U'ᵀ: U takes V' columns, Vᵀ takes U' columns as rows
            for r in 0..m {
                u[r * k + dst] = v[r * wn + src];
            }
            for c in 0..n {
                vt[dst * n + c] = b[c * wn + src];
            }
        } else {
            for r in 0..m {
                u[r * k + dst] = b[r * wn + src];
            }
            for c in 0..n {
                vt[dst * n + c] = v[c * wn + src];
            }
        }
    }

    if converged {
        log::debug!("jacobi svd {m}x{n} converged after {sweeps} sweeps");
        0
    } else {
        log::warn!("jacobi svd {m}x{n} did not converge in {MAX_SWEEPS} sweeps");
        1
    }
}
