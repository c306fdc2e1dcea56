//! Raw sample collaborator

use core::fmt::Debug;

use nalgebra::Vector3;

use crate::types::Channel;

/// Source of range-scaled sensor readings
///
/// Implemented by the register/bus layer. Readings are already in physical
/// units (m/s², deg/s, µT). A read blocks until the bus transaction completes;
/// errors are handed back to the caller of the calibration run untouched.
pub trait SampleSource {
    type Error: Debug;

    fn read(&mut self, channel: Channel) -> Result<Vector3<f32>, Self::Error>;
}

impl<S: SampleSource + ?Sized> SampleSource for &mut S {
    type Error = S::Error;

    fn read(&mut self, channel: Channel) -> Result<Vector3<f32>, Self::Error> {
        (**self).read(channel)
    }
}
