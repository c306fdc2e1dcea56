//! Core types and settings for the calibration engine

use core::fmt;
use core::time::Duration;

use nalgebra::{Matrix4x3, Vector3};

/// Standard gravity in m/s² used as the six-position reference magnitude
pub const STANDARD_GRAVITY: f32 = 9.8065;

/// Sensor axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Index of this axis into a `Vector3`
    pub const fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Axis::X => "X",
            Axis::Y => "Y",
            Axis::Z => "Z",
        })
    }
}

/// Which way the designated axis points relative to gravity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Axis points up, reading is close to +g
    Up,
    /// Axis points down, reading is close to -g
    Down,
}

impl Direction {
    /// Expected sign of the reading on the designated axis
    pub const fn sign(self) -> f32 {
        match self {
            Direction::Up => 1.0,
            Direction::Down => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Up => "up",
            Direction::Down => "down",
        })
    }
}

/// Measurement channel served by a [`SampleSource`](crate::SampleSource)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Acceleration in m/s²
    Accelerometer,
    /// Angular rate in deg/s
    Gyroscope,
    /// Magnetic field in µT
    Magnetometer,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Channel::Accelerometer => "accelerometer",
            Channel::Gyroscope => "gyroscope",
            Channel::Magnetometer => "magnetometer",
        })
    }
}

/// Per-sensor calibration state
///
/// Starts as `NotCalibrated` and only becomes `Calibrated` when the sensor's
/// calibration run completes. A failed run never changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalibrationStatus {
    #[default]
    NotCalibrated,
    Calibrated,
}

impl CalibrationStatus {
    pub fn is_calibrated(self) -> bool {
        self == CalibrationStatus::Calibrated
    }
}

/// Six-position accelerometer calibration
///
/// `calibrated = [raw_x, raw_y, raw_z, 1] · matrix`. Rows 0–2 hold scale and
/// cross-axis coupling, row 3 holds the offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccelCalibration {
    pub matrix: Matrix4x3<f32>,
    /// RMS distance in m/s² between the corrected position averages and their references
    pub residual: f32,
}

impl Default for AccelCalibration {
    fn default() -> Self {
        Self {
            matrix: Matrix4x3::identity(),
            residual: 0.0,
        }
    }
}

/// Axis-aligned ellipsoid magnetometer calibration
///
/// `calibrated = (raw - offset) / scale` per axis, mapping the fitted
/// ellipsoid onto the unit sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MagCalibration {
    /// Ellipsoid centre (hard-iron offset) in µT
    pub offset: Vector3<f32>,
    /// Ellipsoid semi-axes in µT, all strictly positive
    pub scale: Vector3<f32>,
    /// RMS deviation of the corrected samples' norm from 1
    pub residual: f32,
}

impl Default for MagCalibration {
    fn default() -> Self {
        Self {
            offset: Vector3::zeros(),
            scale: Vector3::repeat(1.0),
            residual: 0.0,
        }
    }
}

/// Mean gyroscope rate per axis measured while stationary, in deg/s
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GyroBias {
    pub bias: Vector3<f32>,
}

/// Calibration protocol settings
///
/// # Example
/// ```
/// use core::time::Duration;
/// use imu_calibration::CalibrationSettings;
///
/// let settings = CalibrationSettings {
///     accel_samples_per_position: 50,
///     orientation_timeout: Duration::from_secs(60),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationSettings {
    /// In-band samples averaged for each of the six positions
    pub accel_samples_per_position: u32,
    /// How long to wait for the operator to reach each orientation
    pub orientation_timeout: Duration,
    /// Pause between orientation polls in milliseconds
    pub poll_interval_ms: u32,
    /// Pause after the orientation is reached and before sampling starts
    pub settle_time_ms: u32,
    /// Pause between accelerometer sampling attempts in milliseconds
    pub accel_sample_interval_ms: u32,
    /// Cap on sampling attempts per position, `None` to retry forever
    pub max_sample_attempts: Option<u32>,
    /// Samples collected while the operator sweeps the magnetometer
    pub mag_samples: u32,
    /// Pause between magnetometer samples in milliseconds
    pub mag_sample_interval_ms: u32,
    /// Samples averaged for the gyroscope bias
    pub gyro_samples: u32,
    /// Pause between gyroscope samples in milliseconds
    pub gyro_sample_interval_ms: u32,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            accel_samples_per_position: 100,
            orientation_timeout: Duration::from_secs(30),
            poll_interval_ms: 10,
            settle_time_ms: 2000,
            accel_sample_interval_ms: 5,
            max_sample_attempts: Some(10_000),
            mag_samples: 1000,
            mag_sample_interval_ms: 10,
            gyro_samples: 500,
            gyro_sample_interval_ms: 2,
        }
    }
}
