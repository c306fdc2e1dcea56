//! Full calibration run against a simulated sensor
//!
//! Run with `cargo run --example six_position --features std`.

use std::convert::Infallible;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use imu_calibration::accelerometer::POSITIONS;
use imu_calibration::{CalibrationSettings, Channel, Imu, LogFeedback, SampleSource, StdClock};
use log::LevelFilter;
use nalgebra::{Matrix3, Vector3};

const READS_PER_POSITION: u32 = 60;

struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(u64::from(ns)));
    }
}

/// A sensor with known distortions whose operator turns it every
/// `READS_PER_POSITION` accelerometer reads
struct SimulatedSensor {
    accel_distortion: Matrix3<f32>,
    accel_bias: Vector3<f32>,
    gyro_bias: Vector3<f32>,
    mag_offset: Vector3<f32>,
    mag_scale: Vector3<f32>,
    accel_reads: u32,
    mag_reads: u32,
}

impl SimulatedSensor {
    fn new() -> Self {
        Self {
            accel_distortion: Matrix3::new(1.03, 0.01, -0.02, 0.0, 0.98, 0.015, 0.01, -0.01, 1.01),
            accel_bias: Vector3::new(0.12, -0.25, 0.3),
            gyro_bias: Vector3::new(0.4, -0.7, 0.15),
            mag_offset: Vector3::new(18.0, -6.0, 31.0),
            mag_scale: Vector3::new(47.0, 44.0, 50.0),
            accel_reads: 0,
            mag_reads: 0,
        }
    }
}

impl SampleSource for SimulatedSensor {
    type Error = Infallible;

    fn read(&mut self, channel: Channel) -> Result<Vector3<f32>, Infallible> {
        let reading = match channel {
            Channel::Accelerometer => {
                let step = (self.accel_reads / READS_PER_POSITION) as usize;
                self.accel_reads += 1;
                let truth = POSITIONS[step.min(POSITIONS.len() - 1)].reference();
                self.accel_distortion * truth + self.accel_bias
            }
            Channel::Gyroscope => self.gyro_bias,
            Channel::Magnetometer => {
                // Spiral from pole to pole
                let t = self.mag_reads as f32 * 0.01;
                self.mag_reads += 1;
                let z = (t * 0.37).cos();
                let ring = (1.0 - z * z).sqrt();
                let unit = Vector3::new(ring * (t * 7.0).cos(), ring * (t * 7.0).sin(), z);
                self.mag_offset + unit.component_mul(&self.mag_scale)
            }
        };
        Ok(reading)
    }
}

fn main() {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .init();

    let settings = CalibrationSettings {
        accel_samples_per_position: 20,
        settle_time_ms: 50,
        poll_interval_ms: 5,
        accel_sample_interval_ms: 1,
        mag_samples: 850,
        mag_sample_interval_ms: 1,
        gyro_samples: 200,
        gyro_sample_interval_ms: 1,
        ..Default::default()
    };
    let mut imu = Imu::with_settings(
        SimulatedSensor::new(),
        StdDelay,
        StdClock::new(),
        LogFeedback,
        settings,
    );

    let gyroscope = imu.calibrate_gyroscope().expect("gyroscope calibration");
    println!("Gyroscope bias: {:?}", gyroscope.bias);

    let magnetometer = imu.calibrate_magnetometer().expect("magnetometer calibration");
    println!(
        "Magnetometer offset: {:?}, scale: {:?}, residual: {:.5}",
        magnetometer.offset, magnetometer.scale, magnetometer.residual
    );

    let accelerometer = imu.calibrate_accelerometer().expect("accelerometer calibration");
    println!("Accelerometer residual: {:.5}", accelerometer.residual);

    for channel in [Channel::Accelerometer, Channel::Gyroscope, Channel::Magnetometer] {
        let raw = imu.read_raw(channel).unwrap_or_else(|never| match never {});
        let calibrated = imu.context().apply(channel, raw);
        println!(
            "{channel}: raw [{:.3}, {:.3}, {:.3}] -> calibrated [{:.3}, {:.3}, {:.3}]",
            raw.x, raw.y, raw.z, calibrated.x, calibrated.y, calibrated.z
        );
    }
}
