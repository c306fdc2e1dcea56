//! Gyroscope static bias estimation

use embedded_hal::delay::DelayNs;
use nalgebra::Vector3;

use crate::context::CalibrationContext;
use crate::error::CalibrationError;
use crate::feedback::{Feedback, FeedbackEvent};
use crate::source::SampleSource;
use crate::types::{CalibrationSettings, Channel, GyroBias};

/// Running mean of gyroscope readings
///
/// Sums in double precision so that long runs do not lose the small bias
/// against the accumulated total.
#[derive(Debug, Clone, Copy, Default)]
pub struct BiasEstimator {
    sum: Vector3<f64>,
    count: u32,
}

impl BiasEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, rate: &Vector3<f32>) {
        self.sum += rate.cast::<f64>();
        self.count += 1;
    }

    /// Number of samples added since creation or the last reset
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Mean rate per axis, `None` before the first sample
    pub fn mean(&self) -> Option<Vector3<f32>> {
        if self.count == 0 {
            return None;
        }
        Some((self.sum / f64::from(self.count)).cast::<f32>())
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Average `gyro_samples` readings into the gyroscope bias
///
/// The device must be still for the whole run; nothing here checks that it
/// is. On success the bias is stored and the gyroscope marked calibrated. A
/// read error leaves the context unchanged.
pub fn calibrate<S, D, F>(
    source: &mut S,
    delay: &mut D,
    feedback: &mut F,
    settings: &CalibrationSettings,
    context: &mut CalibrationContext,
) -> Result<GyroBias, CalibrationError<S::Error>>
where
    S: SampleSource + ?Sized,
    D: DelayNs + ?Sized,
    F: Feedback + ?Sized,
{
    if settings.gyro_samples == 0 {
        return Err(CalibrationError::NoSamples);
    }

    feedback.notify(&FeedbackEvent::HoldStill {
        samples: settings.gyro_samples,
    });

    let mut estimator = BiasEstimator::new();
    for _ in 0..settings.gyro_samples {
        let rate = match source.read(Channel::Gyroscope) {
            Ok(rate) => rate,
            Err(err) => {
                feedback.notify(&FeedbackEvent::Failed {
                    channel: Channel::Gyroscope,
                });
                return Err(CalibrationError::Source(err));
            }
        };
        estimator.add(&rate);
        if estimator.count() < settings.gyro_samples {
            delay.delay_ms(settings.gyro_sample_interval_ms);
        }
    }

    let bias = GyroBias {
        bias: estimator.mean().ok_or(CalibrationError::NoSamples)?,
    };
    log::debug!("gyroscope bias {:?}", bias.bias);
    context.set_gyroscope(bias);
    feedback.notify(&FeedbackEvent::Calibrated {
        channel: Channel::Gyroscope,
        residual: 0.0,
    });

    Ok(bias)
}
