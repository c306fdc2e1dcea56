//! Calibration parameters and status owned by a driver instance

use nalgebra::Vector3;

use crate::calibration::{apply_accelerometer, apply_gyroscope, apply_magnetometer};
use crate::types::{AccelCalibration, CalibrationStatus, Channel, GyroBias, MagCalibration};

/// Current calibration of all three sensors
///
/// The calibration protocols are the only writers and need `&mut` access for
/// the whole run, so a reading can never observe a half-written calibration.
/// Until a sensor is calibrated its parameters are the identity correction.
///
/// # Example
/// ```
/// use nalgebra::Vector3;
/// use imu_calibration::{CalibrationContext, CalibrationStatus, Channel};
///
/// let context = CalibrationContext::new();
/// assert_eq!(context.status(Channel::Magnetometer), CalibrationStatus::NotCalibrated);
///
/// let raw = Vector3::new(1.0, 2.0, 3.0);
/// assert_eq!(context.apply(Channel::Accelerometer, raw), raw);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CalibrationContext {
    accelerometer: AccelCalibration,
    magnetometer: MagCalibration,
    gyroscope: GyroBias,
    accelerometer_status: CalibrationStatus,
    magnetometer_status: CalibrationStatus,
    gyroscope_status: CalibrationStatus,
}

impl CalibrationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accelerometer(&self) -> &AccelCalibration {
        &self.accelerometer
    }

    pub fn magnetometer(&self) -> &MagCalibration {
        &self.magnetometer
    }

    pub fn gyroscope(&self) -> &GyroBias {
        &self.gyroscope
    }

    pub fn status(&self, channel: Channel) -> CalibrationStatus {
        match channel {
            Channel::Accelerometer => self.accelerometer_status,
            Channel::Magnetometer => self.magnetometer_status,
            Channel::Gyroscope => self.gyroscope_status,
        }
    }

    /// True once every sensor has been calibrated
    pub fn is_fully_calibrated(&self) -> bool {
        [Channel::Accelerometer, Channel::Gyroscope, Channel::Magnetometer]
            .into_iter()
            .all(|channel| self.status(channel).is_calibrated())
    }

    /// Apply the current parameters of `channel` to a raw reading
    pub fn apply(&self, channel: Channel, raw: Vector3<f32>) -> Vector3<f32> {
        match channel {
            Channel::Accelerometer => apply_accelerometer(raw, &self.accelerometer.matrix),
            Channel::Magnetometer => {
                apply_magnetometer(raw, self.magnetometer.offset, self.magnetometer.scale)
            }
            Channel::Gyroscope => apply_gyroscope(raw, self.gyroscope.bias),
        }
    }

    /// Restore the identity parameters of `channel` and mark it not calibrated
    pub fn reset_channel(&mut self, channel: Channel) {
        match channel {
            Channel::Accelerometer => {
                self.accelerometer = AccelCalibration::default();
                self.accelerometer_status = CalibrationStatus::NotCalibrated;
            }
            Channel::Magnetometer => {
                self.magnetometer = MagCalibration::default();
                self.magnetometer_status = CalibrationStatus::NotCalibrated;
            }
            Channel::Gyroscope => {
                self.gyroscope = GyroBias::default();
                self.gyroscope_status = CalibrationStatus::NotCalibrated;
            }
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub(crate) fn set_accelerometer(&mut self, calibration: AccelCalibration) {
        self.accelerometer = calibration;
        self.accelerometer_status = CalibrationStatus::Calibrated;
    }

    pub(crate) fn set_magnetometer(&mut self, calibration: MagCalibration) {
        self.magnetometer = calibration;
        self.magnetometer_status = CalibrationStatus::Calibrated;
    }

    pub(crate) fn set_gyroscope(&mut self, bias: GyroBias) {
        self.gyroscope = bias;
        self.gyroscope_status = CalibrationStatus::Calibrated;
    }
}
