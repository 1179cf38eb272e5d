//! The simulated anemometer and its voltage-to-speed conversion.

use super::sim::{FaultGate, Waveform};
use super::{Measurement, Sampler};
use crate::config::{SimulationConfig, WindCalibration};
use crate::error::{ConfigError, SensorError};

const SALT_VOLTS: u64 = 0xA1;
const SALT_FAULTS: u64 = 0xAF;

/// Linearly maps `value` from `in_min..in_max` onto `out_min..out_max`,
/// clamping the result to the output range. Out-of-range inputs saturate
/// instead of extrapolating. The input range must be non-empty.
pub fn map_range(value: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    let mapped = (value - in_min) * (out_max - out_min) / (in_max - in_min) + out_min;
    if out_min <= out_max {
        mapped.clamp(out_min, out_max)
    } else {
        mapped.clamp(out_max, out_min)
    }
}

/// An anemometer read through an analog channel.
///
/// The simulated channel drifts across the calibrated voltage range;
/// sampling converts the voltage to a speed with [`map_range`].
#[derive(Debug)]
pub struct Anemometer {
    faults: FaultGate,
    volts: Waveform,
    calibration: WindCalibration,
}

impl Anemometer {
    /// Creates the probe, rejecting an unusable calibration up front so a
    /// bad voltage range fails at startup rather than mid-run.
    pub fn new(
        calibration: WindCalibration,
        sim: &SimulationConfig,
    ) -> Result<Self, ConfigError> {
        calibration.validate()?;
        Ok(Self {
            faults: FaultGate::new(sim, SALT_FAULTS),
            volts: Waveform::new(
                sim,
                SALT_VOLTS,
                calibration.volts_min,
                calibration.volts_max,
                0.05,
            ),
            calibration,
        })
    }

    /// The wind speed a given channel voltage maps to, in m/s.
    pub fn speed_for_volts(&self, volts: f64) -> f64 {
        map_range(
            volts,
            self.calibration.volts_min,
            self.calibration.volts_max,
            0.0,
            self.calibration.speed_max,
        )
    }
}

impl Sampler for Anemometer {
    fn sample(&mut self) -> Result<Measurement, SensorError> {
        self.faults.check()?;
        let volts = self.volts.advance();
        Ok(Measurement::Wind {
            speed_mps: self.speed_for_volts(volts),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn midpoint_maps_to_half_scale() {
        assert!(close(map_range(1.2, 0.4, 2.0, 0.0, 32.4), 16.2));
    }

    #[test]
    fn endpoints_map_to_endpoints() {
        assert!(close(map_range(0.4, 0.4, 2.0, 0.0, 32.4), 0.0));
        assert!(close(map_range(2.0, 0.4, 2.0, 0.0, 32.4), 32.4));
    }

    #[test]
    fn out_of_range_inputs_saturate() {
        assert!(close(map_range(0.0, 0.4, 2.0, 0.0, 32.4), 0.0));
        assert!(close(map_range(5.0, 0.4, 2.0, 0.0, 32.4), 32.4));
    }

    #[test]
    fn reversed_output_ranges_clamp_too() {
        assert!(close(map_range(2.0, 0.0, 1.0, 10.0, 0.0), 0.0));
        assert!(close(map_range(-1.0, 0.0, 1.0, 10.0, 0.0), 10.0));
    }

    #[test]
    fn empty_voltage_range_fails_construction() {
        let bad = WindCalibration {
            volts_min: 2.0,
            volts_max: 0.4,
            speed_max: 32.4,
        };
        let sim = SimulationConfig::default();
        assert!(matches!(
            Anemometer::new(bad, &sim),
            Err(ConfigError::Calibration { .. })
        ));
    }

    #[test]
    fn speeds_stay_inside_the_calibrated_scale() {
        let sim = SimulationConfig {
            seed: Some(5),
            fault_rate: 0.0,
        };
        let mut probe = Anemometer::new(WindCalibration::default(), &sim).unwrap();
        for _ in 0..500 {
            match probe.sample().unwrap() {
                Measurement::Wind { speed_mps } => {
                    assert!((0.0..=32.4).contains(&speed_mps));
                }
                other => panic!("unexpected measurement {other:?}"),
            }
        }
    }
}
