//! Applying calibration parameters to raw readings

use nalgebra::{Matrix4x3, RowVector4, Vector3};

/// Applies the six-position accelerometer correction
///
/// Computes `[x, y, z, 1] · matrix`: rows 0–2 of `matrix` scale and mix the
/// axes, row 3 adds the offset.
///
/// # Arguments
/// * `uncalibrated` - Raw reading in m/s²
/// * `matrix` - 4×3 affine correction from the six-position fit
///
/// # Example
/// ```
/// use nalgebra::{Matrix4x3, Vector3};
/// use imu_calibration::calibration::apply_accelerometer;
///
/// let raw = Vector3::new(0.1, -0.2, 9.9);
/// let calibrated = apply_accelerometer(raw, &Matrix4x3::identity());
/// assert_eq!(calibrated, raw);
/// ```
pub fn apply_accelerometer(uncalibrated: Vector3<f32>, matrix: &Matrix4x3<f32>) -> Vector3<f32> {
    let augmented = RowVector4::new(uncalibrated.x, uncalibrated.y, uncalibrated.z, 1.0);
    (augmented * matrix).transpose()
}

/// Applies the ellipsoid magnetometer correction
///
/// Computes `(uncalibrated - offset) / scale` per axis. A reading on the
/// fitted ellipsoid maps onto the unit sphere.
///
/// # Arguments
/// * `uncalibrated` - Raw reading in µT
/// * `offset` - Ellipsoid centre (hard-iron offset)
/// * `scale` - Ellipsoid semi-axes, all non-zero
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use imu_calibration::calibration::apply_magnetometer;
///
/// let raw = Vector3::new(60.0, 20.0, -10.0);
/// let offset = Vector3::new(10.0, 20.0, 30.0);
/// let scale = Vector3::new(50.0, 40.0, 40.0);
///
/// let calibrated = apply_magnetometer(raw, offset, scale);
/// assert_eq!(calibrated, Vector3::new(1.0, 0.0, -1.0));
/// ```
pub fn apply_magnetometer(
    uncalibrated: Vector3<f32>,
    offset: Vector3<f32>,
    scale: Vector3<f32>,
) -> Vector3<f32> {
    (uncalibrated - offset).component_div(&scale)
}

/// Removes the static gyroscope bias
pub fn apply_gyroscope(uncalibrated: Vector3<f32>, bias: Vector3<f32>) -> Vector3<f32> {
    uncalibrated - bias
}
