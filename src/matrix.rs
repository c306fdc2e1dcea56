//! Fixed-shape matrix operations used by the least-squares solver
//!
//! Every shape is a const generic, so the matrices live on the stack and a
//! dimension mismatch is a compile error rather than a runtime one.

use nalgebra::{RealField, SMatrix, convert};

use crate::error::SingularMatrix;

/// Matrix product `a · b`
pub fn multiply<T, const M: usize, const N: usize, const P: usize>(
    a: &SMatrix<T, M, N>,
    b: &SMatrix<T, N, P>,
) -> SMatrix<T, M, P>
where
    T: RealField + Copy,
{
    let mut product = SMatrix::<T, M, P>::zeros();
    for i in 0..M {
        for j in 0..P {
            let mut sum = T::zero();
            for k in 0..N {
                sum += a[(i, k)] * b[(k, j)];
            }
            product[(i, j)] = sum;
        }
    }
    product
}

/// Transpose `aᵗ`
pub fn transpose<T, const M: usize, const N: usize>(a: &SMatrix<T, M, N>) -> SMatrix<T, N, M>
where
    T: RealField + Copy,
{
    let mut transposed = SMatrix::<T, N, M>::zeros();
    for i in 0..M {
        for j in 0..N {
            transposed[(j, i)] = a[(i, j)];
        }
    }
    transposed
}

/// `N`×`N` identity matrix
pub fn identity<T, const N: usize>() -> SMatrix<T, N, N>
where
    T: RealField + Copy,
{
    SMatrix::identity()
}

/// Inverse by Gauss–Jordan elimination
///
/// Rows are never exchanged: column `k` is always eliminated with the current
/// diagonal element `a[k][k]`. Before each division the pivot is checked
/// against a tolerance of `ε · N · max|aᵢⱼ|`, and a pivot at or below it (or a
/// non-finite one) returns [`SingularMatrix`] rather than letting infinities
/// and NaNs into the result.
///
/// Without row exchanges a nonsingular matrix can still fail when a leading
/// minor vanishes. The normal matrices `HᵗH` this crate inverts are symmetric
/// positive definite whenever the fit is well posed, and for those every
/// pivot is positive.
///
/// # Example
/// ```
/// use nalgebra::Matrix2;
/// use imu_calibration::matrix::inverse;
///
/// let a = Matrix2::new(4.0, 1.0, 2.0, 3.0);
/// let inv = inverse(&a).unwrap();
/// assert!((a * inv - Matrix2::identity()).norm() < 1e-12);
/// ```
pub fn inverse<T, const N: usize>(a: &SMatrix<T, N, N>) -> Result<SMatrix<T, N, N>, SingularMatrix>
where
    T: RealField + Copy,
{
    let scale = a.iter().fold(T::zero(), |max, &value| max.max(value.abs()));
    let tolerance = T::default_epsilon() * convert::<f64, T>(N as f64) * scale;

    let mut reduced = *a;
    let mut inverse = identity::<T, N>();

    for pivot_index in 0..N {
        let pivot = reduced[(pivot_index, pivot_index)];
        if !pivot.is_finite() || pivot.abs() <= tolerance {
            return Err(SingularMatrix { pivot: pivot_index });
        }

        for column in 0..N {
            reduced[(pivot_index, column)] /= pivot;
            inverse[(pivot_index, column)] /= pivot;
        }

        for row in 0..N {
            if row == pivot_index {
                continue;
            }
            let factor = reduced[(row, pivot_index)];
            if factor == T::zero() {
                continue;
            }
            for column in 0..N {
                let reduced_term = reduced[(pivot_index, column)];
                let inverse_term = inverse[(pivot_index, column)];
                reduced[(row, column)] -= factor * reduced_term;
                inverse[(row, column)] -= factor * inverse_term;
            }
        }
    }

    Ok(inverse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Matrix2x3, Matrix3, Matrix3x2, Matrix4};

    const EPSILON: f64 = 1e-10;

    #[test]
    fn test_multiply_by_identity_is_exact() {
        let a = Matrix2x3::new(1.0, -2.0, 3.0, 4.0, 5.0, -6.0);
        assert_eq!(multiply(&a, &identity::<f64, 3>()), a);
        assert_eq!(multiply(&identity::<f64, 2>(), &a), a);
    }

    #[test]
    fn test_multiply_matches_hand_computation() {
        let a = Matrix2x3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        let b = Matrix3x2::new(7.0, 8.0, 9.0, 10.0, 11.0, 12.0);
        let product = multiply(&a, &b);
        assert_eq!(product, nalgebra::Matrix2::new(58.0, 64.0, 139.0, 154.0));
    }

    #[test]
    fn test_double_transpose_is_identity() {
        let a = Matrix2x3::new(1.5, -2.0, 3.25, 4.0, 0.0, -6.5);
        let t = transpose(&a);
        assert_eq!(t, Matrix3x2::new(1.5, 4.0, -2.0, 0.0, 3.25, -6.5));
        assert_eq!(transpose(&t), a);
    }

    #[test]
    fn test_inverse_of_diagonally_dominant_3x3() {
        let a = Matrix3::new(10.0, 2.0, -1.0, 3.0, 12.0, 2.0, -2.0, 1.0, 9.0);
        let inv = inverse(&a).unwrap();
        let product = multiply(&a, &inv);
        assert!((product - Matrix3::identity()).norm() < EPSILON);
    }

    #[test]
    fn test_inverse_of_diagonally_dominant_4x4() {
        let a = Matrix4::new(
            20.0, 1.0, 2.0, -3.0, //
            1.0, 15.0, -1.0, 2.0, //
            0.5, 2.0, 18.0, 1.0, //
            -2.0, 3.0, 1.0, 25.0,
        );
        let inv = inverse(&a).unwrap();
        assert!((multiply(&a, &inv) - Matrix4::identity()).norm() < EPSILON);
        assert!((multiply(&inv, &a) - Matrix4::identity()).norm() < EPSILON);
    }

    #[test]
    fn test_inverse_works_in_single_precision() {
        let a = Matrix3::<f32>::new(4.0, 1.0, 0.0, 1.0, 4.0, 1.0, 0.0, 1.0, 4.0);
        let inv = inverse(&a).unwrap();
        assert!((multiply(&a, &inv) - Matrix3::identity()).norm() < 1e-5);
    }

    #[test]
    fn test_inverse_rejects_zero_leading_pivot() {
        // Nonsingular, but the unpivoted elimination cannot start
        let a = Matrix3::new(0.0, 1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        assert_eq!(inverse(&a), Err(SingularMatrix { pivot: 0 }));
    }

    #[test]
    fn test_inverse_rejects_rank_deficient_matrix() {
        let a = Matrix3::new(1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 1.0, 0.0, 1.0);
        assert_eq!(inverse(&a), Err(SingularMatrix { pivot: 1 }));
    }

    #[test]
    fn test_inverse_rejects_zero_matrix() {
        assert_eq!(inverse(&Matrix3::<f64>::zeros()), Err(SingularMatrix { pivot: 0 }));
    }

    #[test]
    fn test_inverse_rejects_non_finite_entries() {
        let a = nalgebra::Matrix2::new(f64::NAN, 0.0, 0.0, 1.0);
        assert_eq!(inverse(&a), Err(SingularMatrix { pivot: 0 }));
    }
}
