//! Error types for the calibration engine

use core::fmt::Debug;

use crate::accelerometer::Position;
use crate::types::Axis;

/// Gauss–Jordan elimination hit a pivot too small to divide by
///
/// `pivot` is the zero-based column whose diagonal element vanished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("matrix is singular: pivot {pivot} is zero or near zero")]
pub struct SingularMatrix {
    pub pivot: usize,
}

/// A least-squares fit that produced no usable calibration
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DegenerateFit {
    #[error(transparent)]
    Singular(#[from] SingularMatrix),

    /// The ellipsoid radius for this axis would be the root of a non-positive number
    #[error("non-positive radicand for the {axis} axis scale")]
    NonPositiveRadicand { axis: Axis },

    #[error("fit produced a non-finite coefficient")]
    NonFinite,
}

/// Errors returned by the calibration protocols
///
/// `E` is the error type of the [`SampleSource`](crate::SampleSource). Whatever
/// the variant, the calibration context is left exactly as it was before the run.
#[derive(Debug, thiserror::Error)]
pub enum CalibrationError<E: Debug> {
    #[error("sample source failed: {0:?}")]
    Source(E),

    #[error("timed out waiting for the {position} orientation")]
    OrientationTimeout { position: Position },

    #[error("gave up on {position} after {attempts} attempts with {accepted} samples accepted")]
    SampleAttemptsExhausted {
        position: Position,
        accepted: u32,
        attempts: u32,
    },

    #[error("degenerate fit: {0}")]
    DegenerateFit(#[from] DegenerateFit),

    #[error("sample count must be non-zero")]
    NoSamples,

    #[error("at least {required} samples are required, {requested} requested")]
    TooFewSamples { required: u32, requested: u32 },
}

impl<E: Debug> From<SingularMatrix> for CalibrationError<E> {
    fn from(err: SingularMatrix) -> Self {
        CalibrationError::DegenerateFit(DegenerateFit::Singular(err))
    }
}
