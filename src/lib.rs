#![no_std]

//! IMU Calibration - in-memory calibration for 9-axis inertial/magnetic sensors
//!
//! This library calibrates the accelerometer, gyroscope and magnetometer of a
//! 9-axis IMU from readings that the register layer has already scaled to
//! physical units. It sits between that layer and whatever consumes the data
//! (an AHRS filter, a logger) and keeps the fitted parameters in memory for
//! the lifetime of the driver.
//!
//! # Features
//!
//! - Six-position accelerometer calibration: scale, cross-axis coupling and
//!   offset from a 4×3 affine least-squares fit
//! - Orientation-gated sampling with a time-based deadline per position
//! - Magnetometer hard/soft-iron calibration from an axis-aligned ellipsoid fit
//! - Gyroscope static bias estimation
//! - Small fixed-shape linear algebra (Gauss–Jordan inverse, normal equations)
//!   on stack-allocated matrices
//! - `#![no_std]` compatible, no allocation
//!
//! # Quick Start
//!
//! ```rust
//! use nalgebra::Vector3;
//! use imu_calibration::accelerometer::{fit_six_position, POSITIONS};
//! use imu_calibration::calibration::apply_accelerometer;
//!
//! // Average readings taken in the six positions (Z up, Z down, Y up, ...)
//! let averages = POSITIONS.map(|position| position.reference() * 0.98 + Vector3::new(0.2, 0.0, -0.1));
//!
//! let calibration = fit_six_position(&averages).unwrap();
//! let corrected = apply_accelerometer(Vector3::new(0.2, 0.0, 9.51037), &calibration.matrix);
//! assert!((corrected - Vector3::new(0.0, 0.0, 9.8065)).norm() < 1e-3);
//! ```
//!
//! # `no_std`
//!
//! The library builds without `std`; nalgebra's `libm` backend provides the
//! float functions. Check with `cargo build --lib --no-default-features`.
//! The `std` feature only adds `StdClock`.
//!
//! On hardware the protocols run through [`Imu`], which owns a
//! [`SampleSource`] for the bus, an `embedded_hal` delay, a [`Clock`] and a
//! [`Feedback`] sink for operator prompts.

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod accelerometer;
pub mod calibration;
mod clock;
mod context;
mod driver;
mod error;
mod feedback;
pub mod gyroscope;
pub mod least_squares;
pub mod magnetometer;
pub mod matrix;
mod source;
mod types;

// Re-export all public types and functions
pub use clock::Clock;
#[cfg(feature = "std")]
pub use clock::StdClock;
pub use context::CalibrationContext;
pub use driver::Imu;
pub use error::{CalibrationError, DegenerateFit, SingularMatrix};
pub use feedback::{Feedback, FeedbackEvent, LogFeedback};
pub use source::SampleSource;
pub use types::*;
