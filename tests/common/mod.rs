//! Simulated collaborators shared by the integration tests

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use imu_calibration::accelerometer::{Position, POSITIONS};
use imu_calibration::{Channel, Clock, Feedback, FeedbackEvent, SampleSource};
use nalgebra::{Matrix3, Vector3};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    Nack,
    ScriptExhausted(Channel),
}

/// Simulated time shared between the delay and the clock
#[derive(Debug, Clone, Default)]
pub struct SimTime(Rc<Cell<u64>>);

impl SimTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, nanos: u64) {
        self.0.set(self.0.get() + nanos);
    }

    pub fn now_ms(&self) -> u64 {
        self.0.get() / 1_000_000
    }

    pub fn delay(&self) -> SimDelay {
        SimDelay(self.clone())
    }
}

impl Clock for SimTime {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.0.get())
    }
}

#[derive(Debug, Clone)]
pub struct SimDelay(SimTime);

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.advance(u64::from(ns));
    }
}

/// Replays a fixed sequence of readings per channel
///
/// Once a channel's script runs dry it keeps returning its fallback reading,
/// or `ScriptExhausted` when there is none. Every read takes 1 ms of simulated time.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    accelerometer: VecDeque<Result<Vector3<f32>, BusError>>,
    gyroscope: VecDeque<Result<Vector3<f32>, BusError>>,
    magnetometer: VecDeque<Result<Vector3<f32>, BusError>>,
    fallback: Option<Vector3<f32>>,
    time: Option<SimTime>,
    pub reads: usize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time(mut self, time: &SimTime) -> Self {
        self.time = Some(time.clone());
        self
    }

    pub fn with_fallback(mut self, reading: Vector3<f32>) -> Self {
        self.fallback = Some(reading);
        self
    }

    pub fn push(&mut self, channel: Channel, reading: Vector3<f32>) {
        self.queue(channel).push_back(Ok(reading));
    }

    pub fn push_error(&mut self, channel: Channel) {
        self.queue(channel).push_back(Err(BusError::Nack));
    }

    pub fn extend(&mut self, channel: Channel, readings: impl IntoIterator<Item = Vector3<f32>>) {
        for reading in readings {
            self.push(channel, reading);
        }
    }

    pub fn remaining(&self, channel: Channel) -> usize {
        match channel {
            Channel::Accelerometer => self.accelerometer.len(),
            Channel::Gyroscope => self.gyroscope.len(),
            Channel::Magnetometer => self.magnetometer.len(),
        }
    }

    fn queue(&mut self, channel: Channel) -> &mut VecDeque<Result<Vector3<f32>, BusError>> {
        match channel {
            Channel::Accelerometer => &mut self.accelerometer,
            Channel::Gyroscope => &mut self.gyroscope,
            Channel::Magnetometer => &mut self.magnetometer,
        }
    }
}

impl SampleSource for ScriptedSource {
    type Error = BusError;

    fn read(&mut self, channel: Channel) -> Result<Vector3<f32>, BusError> {
        self.reads += 1;
        if let Some(time) = &self.time {
            time.advance(1_000_000);
        }
        let fallback = self.fallback;
        match self.queue(channel).pop_front() {
            Some(reading) => reading,
            None => fallback.ok_or(BusError::ScriptExhausted(channel)),
        }
    }
}

/// Keeps every event it is sent
#[derive(Debug, Default)]
pub struct RecordingFeedback {
    pub events: Vec<FeedbackEvent>,
}

impl RecordingFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn orient_prompts(&self) -> Vec<Position> {
        self.events
            .iter()
            .filter_map(|event| match event {
                FeedbackEvent::Orient { position, .. } => Some(*position),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&FeedbackEvent) -> bool) -> usize {
        self.events.iter().filter(|event| predicate(event)).count()
    }
}

impl Feedback for RecordingFeedback {
    fn notify(&mut self, event: &FeedbackEvent) {
        self.events.push(*event);
    }
}

/// Accelerometer error model: `raw = distortion · true + bias`
#[derive(Debug, Clone, Copy)]
pub struct AccelModel {
    pub distortion: Matrix3<f32>,
    pub bias: Vector3<f32>,
}

impl AccelModel {
    pub fn typical() -> Self {
        Self {
            distortion: Matrix3::new(1.03, 0.01, -0.02, 0.0, 0.98, 0.015, 0.01, -0.01, 1.01),
            bias: Vector3::new(0.12, -0.25, 0.3),
        }
    }

    pub fn raw(&self, truth: Vector3<f32>) -> Vector3<f32> {
        self.distortion * truth + self.bias
    }
}

/// Readings an operator produces walking through the six positions
///
/// For each position: a few readings while the device is being turned, one
/// reading that satisfies the orientation check, then `samples` in-band
/// readings with a glitch every tenth sample that the settle band rejects.
pub fn six_position_script(model: &AccelModel, samples: u32, seed: u64) -> Vec<Vector3<f32>> {
    let mut rng = Pcg64::seed_from_u64(seed);
    let mut readings = Vec::new();

    for position in POSITIONS {
        for _ in 0..3 {
            readings.push(Vector3::new(4.0, 4.0, 4.0));
        }
        readings.push(model.raw(position.reference()));

        for i in 0..samples {
            if i % 10 == 9 {
                let mut glitch = model.raw(position.reference());
                glitch[position.axis.index()] *= 0.5;
                readings.push(glitch);
            }
            let noise = Vector3::new(
                rng.random_range(-0.02..0.02),
                rng.random_range(-0.02..0.02),
                rng.random_range(-0.02..0.02),
            );
            readings.push(model.raw(position.reference()) + noise);
        }
    }

    readings
}

/// Noisy magnetometer readings spread over an axis-aligned ellipsoid
pub fn ellipsoid_sweep(
    offset: Vector3<f32>,
    scale: Vector3<f32>,
    count: u32,
    seed: u64,
) -> Vec<Vector3<f32>> {
    let mut rng = Pcg64::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            // Uniform direction on the sphere
            let z: f32 = rng.random_range(-1.0..1.0);
            let azimuth: f32 = rng.random_range(0.0..std::f32::consts::TAU);
            let ring = (1.0 - z * z).sqrt();
            let unit = Vector3::new(ring * azimuth.cos(), ring * azimuth.sin(), z);
            let noise = Vector3::new(
                rng.random_range(-0.05..0.05),
                rng.random_range(-0.05..0.05),
                rng.random_range(-0.05..0.05),
            );
            offset + unit.component_mul(&scale) + noise
        })
        .collect()
}
