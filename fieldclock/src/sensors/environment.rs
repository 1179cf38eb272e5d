//! The simulated air temperature and humidity probe.

use super::sim::{FaultGate, Waveform};
use super::{Measurement, Sampler};
use crate::config::SimulationConfig;
use crate::error::SensorError;

const SALT_TEMPERATURE: u64 = 0xE1;
const SALT_HUMIDITY: u64 = 0xE2;
const SALT_FAULTS: u64 = 0xEF;

/// A temperate-climate air probe.
///
/// Temperature drifts a few tenths of a degree per sample; humidity wanders
/// more freely across the mid-range.
#[derive(Debug)]
pub struct EnvironmentProbe {
    faults: FaultGate,
    temperature: Waveform,
    humidity: Waveform,
}

impl EnvironmentProbe {
    pub fn new(sim: &SimulationConfig) -> Self {
        Self {
            faults: FaultGate::new(sim, SALT_FAULTS),
            temperature: Waveform::new(sim, SALT_TEMPERATURE, 15.0, 32.0, 0.3),
            humidity: Waveform::new(sim, SALT_HUMIDITY, 20.0, 90.0, 0.8),
        }
    }
}

impl Sampler for EnvironmentProbe {
    fn sample(&mut self) -> Result<Measurement, SensorError> {
        self.faults.check()?;
        Ok(Measurement::Environment {
            temperature_c: self.temperature.advance(),
            humidity_pct: self.humidity.advance(),
        })
    }
}
