//! Magnetometer ellipsoid calibration
//!
//! Raw readings of a constant field swept through all orientations lie on an
//! axis-aligned ellipsoid
//!
//! ```text
//! (x − Ox)²/Sx² + (y − Oy)²/Sy² + (z − Oz)²/Sz² = 1
//! ```
//!
//! Rearranged around `x²` this is linear in six coefficients:
//!
//! ```text
//! x² = c0·x + c1·y + c2·z − c3·y² − c4·z² + c5
//! ```
//!
//! with `c3 = Sx²/Sy²` and `c4 = Sx²/Sz²`. The coefficients are fitted by least
//! squares and the centre and semi-axes recovered from them. Cross-axis terms
//! are not modelled.
//!
//! Samples are folded in relative to the first one. The model is unchanged by
//! a translation, and without it a large hard-iron offset swamps the normal
//! matrix with terms of order `‖O‖⁴`.

use embedded_hal::delay::DelayNs;
use nalgebra::{ComplexField, Matrix1, RowVector6, Vector3, Vector6};

use crate::context::CalibrationContext;
use crate::error::{CalibrationError, DegenerateFit};
use crate::feedback::{Feedback, FeedbackEvent};
use crate::least_squares::NormalEquations;
use crate::source::SampleSource;
use crate::types::{Axis, CalibrationSettings, Channel, MagCalibration};

/// Fewest samples that can determine the six coefficients
pub const MIN_SAMPLES: u32 = 6;

/// Streaming ellipsoid fit
///
/// Samples are folded into the normal equations as they arrive, so memory
/// use does not grow with the sample count.
#[derive(Debug, Clone, Copy, Default)]
pub struct EllipsoidFit {
    equations: NormalEquations<f64, 6, 1>,
    target_energy: f64,
    origin: Option<Vector3<f64>>,
}

impl EllipsoidFit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sample(&mut self, sample: &Vector3<f32>) {
        let sample = sample.cast::<f64>();
        let origin = *self.origin.get_or_insert(sample);
        let s = sample - origin;
        let row = RowVector6::new(s.x, s.y, s.z, -s.y * s.y, -s.z * s.z, 1.0);
        let target = s.x * s.x;
        self.equations.add_row(&row, &Matrix1::new(target));
        self.target_energy += target * target;
    }

    pub fn samples(&self) -> u32 {
        self.equations.rows()
    }

    /// First sample, the origin of the coordinates the coefficients are fitted in
    pub fn origin(&self) -> Option<Vector3<f32>> {
        self.origin.map(|origin| origin.cast::<f32>())
    }

    /// Raw coefficients `c0..c5`, relative to [`origin`](Self::origin)
    pub fn coefficients(&self) -> Result<Vector6<f64>, DegenerateFit> {
        let coefficients = self.equations.solve()?;
        if coefficients.iter().any(|value| !value.is_finite()) {
            return Err(DegenerateFit::NonFinite);
        }
        Ok(coefficients)
    }

    /// Fit the ellipsoid and derive offsets and scales
    ///
    /// Fails with [`DegenerateFit::NonPositiveRadicand`] when a semi-axis would be
    /// the square root of a non-positive number: `c3` or `c4` not positive
    /// (reported for Y and Z), or `A = Sx²` not positive (reported for X).
    pub fn solve(&self) -> Result<MagCalibration, DegenerateFit> {
        let c = self.coefficients()?;

        if c[3] <= 0.0 {
            return Err(DegenerateFit::NonPositiveRadicand { axis: Axis::Y });
        }
        if c[4] <= 0.0 {
            return Err(DegenerateFit::NonPositiveRadicand { axis: Axis::Z });
        }

        let offset = Vector3::new(c[0] / 2.0, c[1] / (2.0 * c[3]), c[2] / (2.0 * c[4]));
        let a = c[5] + offset.x * offset.x + c[3] * offset.y * offset.y + c[4] * offset.z * offset.z;
        if a <= 0.0 || !a.is_finite() {
            return Err(DegenerateFit::NonPositiveRadicand { axis: Axis::X });
        }

        let scale = Vector3::new(a.sqrt(), (a / c[3]).sqrt(), (a / c[4]).sqrt());
        let offset = offset + self.origin.unwrap_or_else(Vector3::zeros);
        if !scale.iter().chain(offset.iter()).all(|value| value.is_finite()) {
            return Err(DegenerateFit::NonFinite);
        }

        Ok(MagCalibration {
            offset: offset.cast::<f32>(),
            scale: scale.cast::<f32>(),
            residual: self.residual(&c, a) as f32,
        })
    }

    /// RMS of `‖calibrated‖² − 1` over the samples
    ///
    /// Dividing the fitted equation by `A` turns each algebraic residual into
    /// exactly this quantity, so it follows from the accumulated sums without
    /// revisiting the samples.
    fn residual(&self, c: &Vector6<f64>, a: f64) -> f64 {
        let normal = self.equations.normal_matrix();
        let moment = self.equations.moment();
        let sum_of_squares = self.target_energy - 2.0 * c.dot(moment) + c.dot(&(normal * c));
        (sum_of_squares.max(0.0) / f64::from(self.samples())).sqrt() / a
    }
}

/// Collect `mag_samples` readings while the operator sweeps the device, then fit
///
/// Blocks for the whole run. On any error the context keeps its previous
/// calibration and status.
pub fn calibrate<S, D, F>(
    source: &mut S,
    delay: &mut D,
    feedback: &mut F,
    settings: &CalibrationSettings,
    context: &mut CalibrationContext,
) -> Result<MagCalibration, CalibrationError<S::Error>>
where
    S: SampleSource + ?Sized,
    D: DelayNs + ?Sized,
    F: Feedback + ?Sized,
{
    let requested = settings.mag_samples;
    if requested == 0 {
        return Err(CalibrationError::NoSamples);
    }
    if requested < MIN_SAMPLES {
        return Err(CalibrationError::TooFewSamples {
            required: MIN_SAMPLES,
            requested,
        });
    }

    feedback.notify(&FeedbackEvent::SweepDevice { samples: requested });

    let result = sweep(source, delay, settings)
        .and_then(|fit| fit.solve().map_err(CalibrationError::from));

    match result {
        Ok(calibration) => {
            log::debug!(
                "magnetometer offset {:?} scale {:?}",
                calibration.offset,
                calibration.scale
            );
            context.set_magnetometer(calibration);
            feedback.notify(&FeedbackEvent::Calibrated {
                channel: Channel::Magnetometer,
                residual: calibration.residual,
            });
            Ok(calibration)
        }
        Err(err) => {
            feedback.notify(&FeedbackEvent::Failed {
                channel: Channel::Magnetometer,
            });
            Err(err)
        }
    }
}

fn sweep<S, D>(
    source: &mut S,
    delay: &mut D,
    settings: &CalibrationSettings,
) -> Result<EllipsoidFit, CalibrationError<S::Error>>
where
    S: SampleSource + ?Sized,
    D: DelayNs + ?Sized,
{
    let mut fit = EllipsoidFit::new();
    for _ in 0..settings.mag_samples {
        let sample = source
            .read(Channel::Magnetometer)
            .map_err(CalibrationError::Source)?;
        fit.add_sample(&sample);
        if fit.samples() < settings.mag_samples {
            delay.delay_ms(settings.mag_sample_interval_ms);
        }
    }
    Ok(fit)
}
