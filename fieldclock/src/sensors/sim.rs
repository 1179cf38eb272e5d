//! Building blocks for the simulated probes.
//!
//! Real deployments wire tasks to hardware drivers; the compiled-in station
//! tasks run on these instead so the daemon is runnable anywhere. A
//! [`Waveform`] walks randomly inside fixed bounds, and a [`FaultGate`]
//! turns the configured fault rate into occasional unreachable-probe
//! errors.

use crate::config::SimulationConfig;
use crate::error::SensorError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A bounded random walk.
///
/// Each call to [`Waveform::advance`] moves the value by at most `step` in
/// either direction and clamps it to `min..=max`, which reads like slow
/// sensor drift rather than white noise.
#[derive(Debug)]
pub struct Waveform {
    rng: StdRng,
    value: f64,
    min: f64,
    max: f64,
    step: f64,
}

impl Waveform {
    /// Creates a waveform starting midway through its range.
    ///
    /// `salt` decorrelates channels that share a configured seed; without
    /// it every channel of a seeded run would walk in lockstep.
    pub fn new(sim: &SimulationConfig, salt: u64, min: f64, max: f64, step: f64) -> Self {
        Self {
            rng: seeded_rng(sim, salt),
            value: (min + max) / 2.0,
            min,
            max,
            step,
        }
    }

    /// Advances the walk and returns the new value.
    pub fn advance(&mut self) -> f64 {
        let delta = self.rng.gen_range(-self.step..=self.step);
        self.value = (self.value + delta).clamp(self.min, self.max);
        self.value
    }
}

/// Draws once per sample against the configured fault rate.
#[derive(Debug)]
pub struct FaultGate {
    rng: StdRng,
    rate: f64,
}

impl FaultGate {
    pub fn new(sim: &SimulationConfig, salt: u64) -> Self {
        Self {
            rng: seeded_rng(sim, salt),
            rate: sim.fault_rate,
        }
    }

    /// Returns the unreachable-probe error when the draw trips.
    pub fn check(&mut self) -> Result<(), SensorError> {
        if self.rate > 0.0 && self.rng.gen_bool(self.rate) {
            Err(SensorError::Unreachable)
        } else {
            Ok(())
        }
    }
}

fn seeded_rng(sim: &SimulationConfig, salt: u64) -> StdRng {
    match sim.seed {
        Some(seed) => StdRng::seed_from_u64(seed ^ salt),
        None => StdRng::from_entropy(),
    }
}
