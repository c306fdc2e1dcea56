//! Sensor driver owning the collaborators and the calibration context

use embedded_hal::delay::DelayNs;
use nalgebra::Vector3;

use crate::clock::Clock;
use crate::context::CalibrationContext;
use crate::error::CalibrationError;
use crate::feedback::Feedback;
use crate::source::SampleSource;
use crate::types::{AccelCalibration, CalibrationSettings, Channel, GyroBias, MagCalibration};
use crate::{accelerometer, gyroscope, magnetometer};

/// 9-axis IMU with in-memory calibration
///
/// Owns the sample source, a delay provider, a monotonic clock and an operator
/// feedback sink, plus the [`CalibrationContext`] every calibrated read goes
/// through. Calibration runs take `&mut self`, so they cannot overlap with each
/// other or with a read.
pub struct Imu<S, D, C, F> {
    source: S,
    delay: D,
    clock: C,
    feedback: F,
    settings: CalibrationSettings,
    context: CalibrationContext,
}

impl<S, D, C, F> Imu<S, D, C, F>
where
    S: SampleSource,
    D: DelayNs,
    C: Clock,
    F: Feedback,
{
    /// Create a driver with default settings and an uncalibrated context
    pub fn new(source: S, delay: D, clock: C, feedback: F) -> Self {
        Self::with_settings(source, delay, clock, feedback, CalibrationSettings::default())
    }

    pub fn with_settings(
        source: S,
        delay: D,
        clock: C,
        feedback: F,
        settings: CalibrationSettings,
    ) -> Self {
        Self {
            source,
            delay,
            clock,
            feedback,
            settings,
            context: CalibrationContext::new(),
        }
    }

    pub fn settings(&self) -> &CalibrationSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: CalibrationSettings) {
        self.settings = settings;
    }

    pub fn context(&self) -> &CalibrationContext {
        &self.context
    }

    /// Mutable access for resetting calibration state
    pub fn context_mut(&mut self) -> &mut CalibrationContext {
        &mut self.context
    }

    /// Reading in physical units without calibration applied
    pub fn read_raw(&mut self, channel: Channel) -> Result<Vector3<f32>, S::Error> {
        self.source.read(channel)
    }

    /// Reading with the channel's current calibration applied
    ///
    /// Uncalibrated channels come back unchanged.
    pub fn read_calibrated(&mut self, channel: Channel) -> Result<Vector3<f32>, S::Error> {
        let raw = self.source.read(channel)?;
        Ok(self.context.apply(channel, raw))
    }

    /// Run the six-position accelerometer calibration
    pub fn calibrate_accelerometer(&mut self) -> Result<AccelCalibration, CalibrationError<S::Error>> {
        accelerometer::calibrate(
            &mut self.source,
            &mut self.delay,
            &self.clock,
            &mut self.feedback,
            &self.settings,
            &mut self.context,
        )
    }

    /// Run the magnetometer ellipsoid calibration
    pub fn calibrate_magnetometer(&mut self) -> Result<MagCalibration, CalibrationError<S::Error>> {
        magnetometer::calibrate(
            &mut self.source,
            &mut self.delay,
            &mut self.feedback,
            &self.settings,
            &mut self.context,
        )
    }

    /// Estimate the gyroscope bias; the device must be still
    pub fn calibrate_gyroscope(&mut self) -> Result<GyroBias, CalibrationError<S::Error>> {
        gyroscope::calibrate(
            &mut self.source,
            &mut self.delay,
            &mut self.feedback,
            &self.settings,
            &mut self.context,
        )
    }

    /// Give back the collaborators and the final calibration
    pub fn release(self) -> (S, D, C, F, CalibrationContext) {
        (self.source, self.delay, self.clock, self.feedback, self.context)
    }
}
