use super::Matrix;
use crate::dtype::Element;
use crate::storage::HostStorage;
use std::fmt;

impl<T: Element, S: HostStorage<T>> fmt::Display for Matrix<T, S> {
    /// One bracketed line per row; honours width and precision flags
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Matrix({}x{}, dtype={})", self.rows(), self.cols(), T::DTYPE)?;
        for row in self.rows_iter() {
            f.write_str("[")?;
            for (c, v) in row.iter().enumerate() {
                if c > 0 {
                    f.write_str(", ")?;
                }
                fmt::Display::fmt(&v, f)?;
            }
            f.write_str("]\n")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::matrix::DMatrix;

    #[test]
    fn test_display_rows() {
        let m = DMatrix::from_slice(2, 2, &[1.5f32, 2.0, -3.0, 4.25]);
        let text = format!("{m:.2}");
        assert_eq!(
            text,
            "Matrix(2x2, dtype=f32)\n[1.50, 2.00]\n[-3.00, 4.25]\n"
        );
    }
}
