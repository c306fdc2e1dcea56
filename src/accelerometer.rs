//! Six-position accelerometer calibration
//!
//! The device is held in six orientations, each with one axis pointing
//! straight up or down. For every orientation the protocol waits until the
//! designated axis reads close to ±g, lets the device settle, then averages a
//! number of in-band samples. The six averages and the six ideal gravity
//! vectors determine the 4×3 affine correction
//!
//! ```text
//! [x̄ ȳ z̄ 1] · M ≈ g_ref
//! ```
//!
//! solved by least squares. Nothing is written to the context unless all six
//! positions complete and the fit succeeds.

use core::fmt;

use embedded_hal::delay::DelayNs;
use nalgebra::{ComplexField, Matrix6x3, Matrix6x4, RowVector4, Vector3};

use crate::clock::Clock;
use crate::context::CalibrationContext;
use crate::error::{CalibrationError, DegenerateFit};
use crate::feedback::{Feedback, FeedbackEvent};
use crate::least_squares::solve;
use crate::matrix::multiply;
use crate::source::SampleSource;
use crate::types::{AccelCalibration, Axis, CalibrationSettings, Channel, Direction, STANDARD_GRAVITY};

/// Closed interval of accepted readings in m/s²
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub min: f32,
    pub max: f32,
}

impl Band {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Band the designated axis must enter before an upward position counts as reached
pub const TARGET_UP: Band = Band::new(9.0, 11.0);
pub const TARGET_DOWN: Band = Band::new(-11.0, -9.0);
/// Band a sample must fall in to be averaged once an upward position is reached
pub const SETTLE_UP: Band = Band::new(8.5, 11.0);
pub const SETTLE_DOWN: Band = Band::new(-11.0, -8.5);

/// One orientation of the six-position sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub axis: Axis,
    pub direction: Direction,
    /// Orientation wait succeeds once the designated axis is inside this band
    pub target: Band,
    /// Samples are accepted only while the designated axis is inside this band
    pub settle: Band,
}

impl Position {
    pub const fn new(axis: Axis, direction: Direction) -> Self {
        let (target, settle) = match direction {
            Direction::Up => (TARGET_UP, SETTLE_UP),
            Direction::Down => (TARGET_DOWN, SETTLE_DOWN),
        };
        Self {
            axis,
            direction,
            target,
            settle,
        }
    }

    /// Ideal reading in this position: ±g on the designated axis, zero elsewhere
    pub fn reference(&self) -> Vector3<f32> {
        let mut reference = Vector3::zeros();
        reference[self.axis.index()] = STANDARD_GRAVITY * self.direction.sign();
        reference
    }

    /// Reading of the designated axis
    pub fn designated(&self, sample: &Vector3<f32>) -> f32 {
        sample[self.axis.index()]
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} axis {}", self.axis, self.direction)
    }
}

/// The six positions in the order they are visited
pub const POSITIONS: [Position; 6] = [
    Position::new(Axis::Z, Direction::Up),
    Position::new(Axis::Z, Direction::Down),
    Position::new(Axis::Y, Direction::Up),
    Position::new(Axis::Y, Direction::Down),
    Position::new(Axis::X, Direction::Up),
    Position::new(Axis::X, Direction::Down),
];

/// Run the six-position calibration and store the result in `context`
///
/// Blocks for the whole run. On any error the context keeps its previous
/// calibration and status.
pub fn calibrate<S, D, C, F>(
    source: &mut S,
    delay: &mut D,
    clock: &C,
    feedback: &mut F,
    settings: &CalibrationSettings,
    context: &mut CalibrationContext,
) -> Result<AccelCalibration, CalibrationError<S::Error>>
where
    S: SampleSource + ?Sized,
    D: DelayNs + ?Sized,
    C: Clock + ?Sized,
    F: Feedback + ?Sized,
{
    if settings.accel_samples_per_position == 0 {
        return Err(CalibrationError::NoSamples);
    }

    let result = collect_averages(source, delay, clock, feedback, settings)
        .and_then(|averages| fit_six_position(&averages).map_err(CalibrationError::from));

    match result {
        Ok(calibration) => {
            log::debug!("accelerometer fit {:?}", calibration.matrix);
            context.set_accelerometer(calibration);
            feedback.notify(&FeedbackEvent::Calibrated {
                channel: Channel::Accelerometer,
                residual: calibration.residual,
            });
            Ok(calibration)
        }
        Err(err) => {
            feedback.notify(&FeedbackEvent::Failed {
                channel: Channel::Accelerometer,
            });
            Err(err)
        }
    }
}

fn collect_averages<S, D, C, F>(
    source: &mut S,
    delay: &mut D,
    clock: &C,
    feedback: &mut F,
    settings: &CalibrationSettings,
) -> Result<[Vector3<f32>; 6], CalibrationError<S::Error>>
where
    S: SampleSource + ?Sized,
    D: DelayNs + ?Sized,
    C: Clock + ?Sized,
    F: Feedback + ?Sized,
{
    let mut averages = [Vector3::zeros(); 6];

    for (step, (position, average)) in POSITIONS.iter().zip(averages.iter_mut()).enumerate() {
        feedback.notify(&FeedbackEvent::Orient {
            position: *position,
            step: step + 1,
            total: POSITIONS.len(),
        });

        wait_for_orientation(source, delay, clock, feedback, settings, position)?;
        feedback.notify(&FeedbackEvent::OrientationReached { position: *position });

        delay.delay_ms(settings.settle_time_ms);

        *average = sample_position(source, delay, feedback, settings, position)?;
        feedback.notify(&FeedbackEvent::PositionComplete {
            position: *position,
            average: *average,
        });
    }

    Ok(averages)
}

/// Poll until the designated axis enters the target band or the deadline passes
fn wait_for_orientation<S, D, C, F>(
    source: &mut S,
    delay: &mut D,
    clock: &C,
    feedback: &mut F,
    settings: &CalibrationSettings,
    position: &Position,
) -> Result<(), CalibrationError<S::Error>>
where
    S: SampleSource + ?Sized,
    D: DelayNs + ?Sized,
    C: Clock + ?Sized,
    F: Feedback + ?Sized,
{
    let deadline = clock.now().saturating_add(settings.orientation_timeout);

    loop {
        let sample = source
            .read(Channel::Accelerometer)
            .map_err(CalibrationError::Source)?;
        if position.target.contains(position.designated(&sample)) {
            return Ok(());
        }

        if clock.now() >= deadline {
            feedback.notify(&FeedbackEvent::OrientationTimeout { position: *position });
            return Err(CalibrationError::OrientationTimeout { position: *position });
        }

        delay.delay_ms(settings.poll_interval_ms);
    }
}

/// Average `accel_samples_per_position` samples whose designated axis is in the settle band
fn sample_position<S, D, F>(
    source: &mut S,
    delay: &mut D,
    feedback: &mut F,
    settings: &CalibrationSettings,
    position: &Position,
) -> Result<Vector3<f32>, CalibrationError<S::Error>>
where
    S: SampleSource + ?Sized,
    D: DelayNs + ?Sized,
    F: Feedback + ?Sized,
{
    let required = settings.accel_samples_per_position;
    let mut sum = Vector3::<f64>::zeros();
    let mut accepted = 0;
    let mut attempts = 0;

    while accepted < required {
        if let Some(max_attempts) = settings.max_sample_attempts {
            if attempts >= max_attempts {
                feedback.notify(&FeedbackEvent::SampleAttemptsExhausted {
                    position: *position,
                    attempts,
                });
                return Err(CalibrationError::SampleAttemptsExhausted {
                    position: *position,
                    accepted,
                    attempts,
                });
            }
        }
        attempts += 1;

        let sample = source
            .read(Channel::Accelerometer)
            .map_err(CalibrationError::Source)?;
        let reading = position.designated(&sample);
        if position.settle.contains(reading) {
            sum += sample.cast::<f64>();
            accepted += 1;
            feedback.notify(&FeedbackEvent::SampleAccepted {
                position: *position,
                accepted,
                required,
            });
        } else {
            log::trace!("{position}: rejected reading {reading}");
        }

        if accepted < required {
            delay.delay_ms(settings.accel_sample_interval_ms);
        }
    }

    Ok((sum / f64::from(required)).cast::<f32>())
}

/// Solve for the affine correction from six position averages
///
/// `averages[i]` is the mean raw reading taken in `POSITIONS[i]`.
///
/// # Example
/// ```
/// use imu_calibration::accelerometer::{fit_six_position, POSITIONS};
/// use imu_calibration::calibration::apply_accelerometer;
///
/// // A sensor that reads 2% high with a 0.1 m/s² offset on every axis
/// let averages = POSITIONS.map(|p| p.reference() * 1.02 + nalgebra::Vector3::repeat(0.1));
/// let calibration = fit_six_position(&averages).unwrap();
///
/// let corrected = apply_accelerometer(averages[0], &calibration.matrix);
/// assert!((corrected - POSITIONS[0].reference()).norm() < 1e-4);
/// ```
pub fn fit_six_position(averages: &[Vector3<f32>; 6]) -> Result<AccelCalibration, DegenerateFit> {
    let mut design = Matrix6x4::<f64>::zeros();
    let mut targets = Matrix6x3::<f64>::zeros();

    for (row, (position, average)) in POSITIONS.iter().zip(averages).enumerate() {
        let average = average.cast::<f64>();
        design.set_row(row, &RowVector4::new(average.x, average.y, average.z, 1.0));
        targets.set_row(row, &position.reference().cast::<f64>().transpose());
    }

    let matrix = solve(&design, &targets)?;
    if matrix.iter().any(|value| !value.is_finite()) {
        return Err(DegenerateFit::NonFinite);
    }

    let residuals = multiply(&design, &matrix) - targets;
    let residual = (residuals.norm_squared() / POSITIONS.len() as f64).sqrt();

    Ok(AccelCalibration {
        matrix: matrix.cast::<f32>(),
        residual: residual as f32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::apply_accelerometer;
    use nalgebra::{Matrix3, Matrix4x3};

    const EPSILON: f32 = 1e-4;

    #[test]
    fn test_position_table_order_and_bands() {
        let expected = [
            (Axis::Z, Direction::Up),
            (Axis::Z, Direction::Down),
            (Axis::Y, Direction::Up),
            (Axis::Y, Direction::Down),
            (Axis::X, Direction::Up),
            (Axis::X, Direction::Down),
        ];
        for (position, (axis, direction)) in POSITIONS.iter().zip(expected) {
            assert_eq!(position.axis, axis);
            assert_eq!(position.direction, direction);
        }

        assert!(POSITIONS[0].target.contains(9.0));
        assert!(POSITIONS[0].target.contains(11.0));
        assert!(!POSITIONS[0].target.contains(8.9));
        assert!(POSITIONS[0].settle.contains(8.5));
        assert!(!POSITIONS[0].settle.contains(11.1));
        assert!(POSITIONS[1].target.contains(-9.5));
        assert!(!POSITIONS[1].target.contains(9.5));
        assert!(POSITIONS[1].settle.contains(-8.5));
    }

    #[test]
    fn test_references_are_gravity_vectors() {
        assert_eq!(POSITIONS[0].reference(), Vector3::new(0.0, 0.0, 9.8065));
        assert_eq!(POSITIONS[1].reference(), Vector3::new(0.0, 0.0, -9.8065));
        assert_eq!(POSITIONS[2].reference(), Vector3::new(0.0, 9.8065, 0.0));
        assert_eq!(POSITIONS[3].reference(), Vector3::new(0.0, -9.8065, 0.0));
        assert_eq!(POSITIONS[4].reference(), Vector3::new(9.8065, 0.0, 0.0));
        assert_eq!(POSITIONS[5].reference(), Vector3::new(-9.8065, 0.0, 0.0));
    }

    #[test]
    fn test_ideal_averages_reproduce_targets() {
        let averages = POSITIONS.map(|position| position.reference());
        let calibration = fit_six_position(&averages).unwrap();

        for (position, average) in POSITIONS.iter().zip(averages) {
            let corrected = apply_accelerometer(average, &calibration.matrix);
            assert!((corrected - position.reference()).norm() < EPSILON);
        }
        assert!(calibration.residual < EPSILON);

        // Ideal data needs no correction
        assert!((calibration.matrix - Matrix4x3::identity()).norm() < EPSILON);
    }

    #[test]
    fn test_recovers_scale_cross_coupling_and_offset() {
        // raw = distortion · true + bias
        let distortion = Matrix3::new(1.05, 0.02, 0.0, -0.01, 0.97, 0.03, 0.0, 0.01, 1.02);
        let bias = Vector3::new(0.15, -0.2, 0.35);
        let averages = POSITIONS.map(|position| distortion * position.reference() + bias);

        let calibration = fit_six_position(&averages).unwrap();

        for (position, average) in POSITIONS.iter().zip(averages) {
            let corrected = apply_accelerometer(average, &calibration.matrix);
            assert!((corrected - position.reference()).norm() < EPSILON);
        }

        // Any other reading is corrected by the same affine map
        let truth = Vector3::new(3.0, -4.0, 8.0);
        let corrected = apply_accelerometer(distortion * truth + bias, &calibration.matrix);
        assert!((corrected - truth).norm() < 1e-3);
    }

    #[test]
    fn test_collapsed_axis_is_degenerate() {
        // X never moves, so its column of the design matrix is constant
        let averages = POSITIONS.map(|position| {
            let mut reading = position.reference();
            reading.x = 0.5;
            reading
        });
        assert!(matches!(
            fit_six_position(&averages),
            Err(DegenerateFit::Singular(_))
        ));
    }
}
