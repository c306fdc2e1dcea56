//! Operator feedback emitted while a calibration runs

use core::fmt;

use nalgebra::Vector3;

use crate::accelerometer::Position;
use crate::types::Channel;

/// Something the operator should see
///
/// `Display` renders the text message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeedbackEvent {
    /// Ask the operator to hold the device in `position`
    Orient {
        position: Position,
        step: usize,
        total: usize,
    },
    /// The designated axis entered the target band
    OrientationReached { position: Position },
    /// One more in-band sample was accepted
    SampleAccepted {
        position: Position,
        accepted: u32,
        required: u32,
    },
    /// All samples for `position` were collected
    PositionComplete {
        position: Position,
        average: Vector3<f32>,
    },
    OrientationTimeout { position: Position },
    SampleAttemptsExhausted { position: Position, attempts: u32 },
    /// Ask the operator to sweep the device through as many orientations as possible
    SweepDevice { samples: u32 },
    /// Ask the operator to keep the device still
    HoldStill { samples: u32 },
    /// Calibration of `channel` finished and was stored
    Calibrated { channel: Channel, residual: f32 },
    /// Calibration of `channel` failed, previous parameters are kept
    Failed { channel: Channel },
}

impl fmt::Display for FeedbackEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedbackEvent::Orient { position, step, total } => {
                write!(f, "position {step}/{total}: orient the {position} now")
            }
            FeedbackEvent::OrientationReached { position } => {
                write!(f, "{position} reached, hold still")
            }
            FeedbackEvent::SampleAccepted {
                position,
                accepted,
                required,
            } => write!(f, "{position}: sample {accepted}/{required}"),
            FeedbackEvent::PositionComplete { position, average } => write!(
                f,
                "{position} done, average ({:.4}, {:.4}, {:.4})",
                average.x, average.y, average.z
            ),
            FeedbackEvent::OrientationTimeout { position } => {
                write!(f, "timed out waiting for the {position}, calibration aborted")
            }
            FeedbackEvent::SampleAttemptsExhausted { position, attempts } => write!(
                f,
                "{position}: no stable reading after {attempts} attempts, calibration aborted"
            ),
            FeedbackEvent::SweepDevice { samples } => write!(
                f,
                "rotate the device slowly through all orientations ({samples} samples)"
            ),
            FeedbackEvent::HoldStill { samples } => {
                write!(f, "keep the device still ({samples} samples)")
            }
            FeedbackEvent::Calibrated { channel, residual } => {
                write!(f, "{channel} calibrated, residual {residual:.6}")
            }
            FeedbackEvent::Failed { channel } => write!(f, "{channel} calibration failed"),
        }
    }
}

/// Sink for [`FeedbackEvent`]s
pub trait Feedback {
    fn notify(&mut self, event: &FeedbackEvent);
}

/// Discards every event
impl Feedback for () {
    fn notify(&mut self, _event: &FeedbackEvent) {}
}

impl<F: Feedback + ?Sized> Feedback for &mut F {
    fn notify(&mut self, event: &FeedbackEvent) {
        (**self).notify(event)
    }
}

/// Routes feedback through the `log` facade
///
/// Prompts and results go out at `info`, per-sample progress at `debug`,
/// failures at `warn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFeedback;

impl Feedback for LogFeedback {
    fn notify(&mut self, event: &FeedbackEvent) {
        match event {
            FeedbackEvent::SampleAccepted { .. } => log::debug!("{event}"),
            FeedbackEvent::OrientationTimeout { .. }
            | FeedbackEvent::SampleAttemptsExhausted { .. }
            | FeedbackEvent::Failed { .. } => log::warn!("{event}"),
            _ => log::info!("{event}"),
        }
    }
}
