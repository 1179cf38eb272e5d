//! The simulated soil moisture and temperature probe.

use super::sim::{FaultGate, Waveform};
use super::{Measurement, Sampler};
use crate::config::SimulationConfig;
use crate::error::SensorError;

const SALT_MOISTURE: u64 = 0x51;
const SALT_TEMPERATURE: u64 = 0x52;
const SALT_FAULTS: u64 = 0x5F;

/// A buried probe. Soil changes slowly, so both channels use small steps.
#[derive(Debug)]
pub struct SoilProbe {
    faults: FaultGate,
    moisture: Waveform,
    temperature: Waveform,
}

impl SoilProbe {
    pub fn new(sim: &SimulationConfig) -> Self {
        Self {
            faults: FaultGate::new(sim, SALT_FAULTS),
            moisture: Waveform::new(sim, SALT_MOISTURE, 10.0, 95.0, 0.5),
            temperature: Waveform::new(sim, SALT_TEMPERATURE, 5.0, 25.0, 0.2),
        }
    }
}

impl Sampler for SoilProbe {
    fn sample(&mut self) -> Result<Measurement, SensorError> {
        self.faults.check()?;
        Ok(Measurement::Soil {
            moisture: self.moisture.advance(),
            temperature_c: self.temperature.advance(),
        })
    }
}
