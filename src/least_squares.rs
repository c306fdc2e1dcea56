//! Ordinary least squares through the normal equations
//!
//! Both forms compute `params = (HᵗH)⁻¹ · Hᵗ · Y` with the operations in
//! [`crate::matrix`]. [`solve`] takes the whole design matrix; [`NormalEquations`]
//! folds rows in one at a time so the sample count does not dictate the
//! matrix shapes.

use nalgebra::{RealField, SMatrix};

use crate::error::SingularMatrix;
use crate::matrix::{inverse, multiply, transpose};

/// Solve the overdetermined system `H · params ≈ Y`
///
/// `h` is `K`×`M` (one row per observation), `y` is `K`×`C`, the result is `M`×`C`.
///
/// # Example
/// ```
/// use nalgebra::{Matrix3x2, Vector3};
/// use imu_calibration::least_squares::solve;
///
/// // y = 2x + 1
/// let h = Matrix3x2::new(0.0, 1.0, 1.0, 1.0, 2.0, 1.0);
/// let y = Vector3::new(1.0, 3.0, 5.0);
/// let params = solve(&h, &y).unwrap();
/// assert!((params[0] - 2.0_f64).abs() < 1e-12);
/// assert!((params[1] - 1.0_f64).abs() < 1e-12);
/// ```
pub fn solve<T, const K: usize, const M: usize, const C: usize>(
    h: &SMatrix<T, K, M>,
    y: &SMatrix<T, K, C>,
) -> Result<SMatrix<T, M, C>, SingularMatrix>
where
    T: RealField + Copy,
{
    let h_t = transpose(h);
    let normal = multiply(&h_t, h);
    let normal_inverse = inverse(&normal)?;
    let projection = multiply(&normal_inverse, &h_t);
    Ok(multiply(&projection, y))
}

/// Running normal equations `HᵗH` and `HᵗY` for `M` parameters and `C` targets
#[derive(Debug, Clone, Copy)]
pub struct NormalEquations<T: RealField + Copy, const M: usize, const C: usize> {
    normal: SMatrix<T, M, M>,
    moment: SMatrix<T, M, C>,
    rows: u32,
}

impl<T: RealField + Copy, const M: usize, const C: usize> NormalEquations<T, M, C> {
    pub fn new() -> Self {
        Self {
            normal: SMatrix::zeros(),
            moment: SMatrix::zeros(),
            rows: 0,
        }
    }

    /// Fold one design row `h` (1×M) with its target `y` (1×C) into the sums
    pub fn add_row(&mut self, h: &SMatrix<T, 1, M>, y: &SMatrix<T, 1, C>) {
        let h_t = transpose(h);
        self.normal += multiply(&h_t, h);
        self.moment += multiply(&h_t, y);
        self.rows += 1;
    }

    /// Number of rows folded in so far
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Accumulated `HᵗH`
    pub fn normal_matrix(&self) -> &SMatrix<T, M, M> {
        &self.normal
    }

    /// Accumulated `HᵗY`
    pub fn moment(&self) -> &SMatrix<T, M, C> {
        &self.moment
    }

    /// Least-squares parameters for the rows seen so far
    pub fn solve(&self) -> Result<SMatrix<T, M, C>, SingularMatrix> {
        let normal_inverse = inverse(&self.normal)?;
        Ok(multiply(&normal_inverse, &self.moment))
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl<T: RealField + Copy, const M: usize, const C: usize> Default for NormalEquations<T, M, C> {
    fn default() -> Self {
        Self::new()
    }
}
