//! Random matrix factories

use super::Matrix;
use crate::dtype::Real;
use crate::error::{Error, OrFatal, Result};
use crate::storage::HostStorage;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

impl<T: Real, S: HostStorage<T>> Matrix<T, S> {
    /// Uniform values in `[0, 1)` from the thread-local generator
    ///
    /// Every call draws fresh values.
    #[track_caller]
    pub fn rand(rows: usize, cols: usize) -> Self {
        Self::rand_with(&mut rand::rng(), rows, cols)
    }

    /// Uniform values in `[0, 1)` from `rng`
    #[track_caller]
    pub fn rand_with<R: Rng + ?Sized>(rng: &mut R, rows: usize, cols: usize) -> Self {
        let mut m = Self::new(rows, cols);
        m.each(|v| {
            let val: f64 = rng.random();
            *v = T::from_f64(val);
        });
        m
    }

    /// Normally distributed values from the thread-local generator
    ///
    /// # Panics
    /// If `std` is negative or not finite.
    #[track_caller]
    pub fn randn(mean: T, std: T, rows: usize, cols: usize) -> Self {
        Self::randn_with(&mut rand::rng(), mean, std, rows, cols).or_fatal()
    }

    /// Normally distributed values from `rng`
    pub fn randn_with<R: Rng + ?Sized>(
        rng: &mut R,
        mean: T,
        std: T,
        rows: usize,
        cols: usize,
    ) -> Result<Self> {
        let (mean, std) = (mean.to_f64(), std.to_f64());
        if !(std.is_finite() && std >= 0.0) {
            return Err(Error::invalid_argument(
                "std",
                format!("standard deviation must be finite and non-negative, got {std}"),
            ));
        }
        let mut m = Self::try_new(rows, cols)?;
        m.each(|v| {
            let z: f64 = StandardNormal.sample(rng);
            *v = T::from_f64(mean + std * z);
        });
        Ok(m)
    }
}

#[cfg(test)]
mod tests {
    use crate::expr::Expression;
    use crate::matrix::DMatrix;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_rand_range() {
        let m = DMatrix::<f64>::rand(8, 8);
        assert!(m.iter().all(|&v| (0.0..1.0).contains(&v)));
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let a = DMatrix::<f32>::rand_with(&mut StdRng::seed_from_u64(7), 3, 3);
        let b = DMatrix::<f32>::rand_with(&mut StdRng::seed_from_u64(7), 3, 3);
        assert_eq!(a, b);
    }

    #[test]
    fn test_randn_moments() {
        let mut rng = StdRng::seed_from_u64(42);
        let m = DMatrix::<f64>::randn_with(&mut rng, 2.0, 0.5, 100, 100).unwrap();
        assert!((m.avg() - 2.0).abs() < 0.05);
        assert!((m.var() - 0.25).abs() < 0.05);
    }

    #[test]
    fn test_randn_rejects_negative_std() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(DMatrix::<f64>::randn_with(&mut rng, 0.0, -1.0, 2, 2).is_err());
    }
}
