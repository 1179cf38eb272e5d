//! Sampling collaborators for the station's periodic tasks.
//!
//! Each scheduled task owns one [`Sampler`] and calls it on every due
//! service. Samplers are deliberately synchronous: a reading either comes
//! back or fails with a [`SensorError`], and the owning worker decides what
//! to do with either. Plain closures implement the trait too, which keeps
//! tests and one-off tasks light.

pub mod environment;
pub mod sim;
pub mod soil;
pub mod wind;

pub use environment::EnvironmentProbe;
pub use soil::SoilProbe;
pub use wind::Anemometer;

use crate::error::SensorError;
use std::fmt;

/// One successful reading from a probe.
///
/// The `Display` impl renders the station's report body, one value per
/// line, with three decimal places throughout.
#[derive(Debug, Clone, PartialEq)]
pub enum Measurement {
    /// Air temperature and relative humidity.
    Environment {
        temperature_c: f64,
        humidity_pct: f64,
    },
    /// Soil moisture index and soil temperature.
    Soil { moisture: f64, temperature_c: f64 },
    /// Wind speed.
    Wind { speed_mps: f64 },
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measurement::Environment {
                temperature_c,
                humidity_pct,
            } => write!(
                f,
                "Temperature: {temperature_c:.3} C\nHumidity: {humidity_pct:.3}%"
            ),
            Measurement::Soil {
                moisture,
                temperature_c,
            } => write!(
                f,
                "Soil Moisture: {moisture:.3}\nSoil Temperature: {temperature_c:.3} C"
            ),
            Measurement::Wind { speed_mps } => {
                write!(f, "Wind Speed: {speed_mps:.3} m/s")
            }
        }
    }
}

/// The sampling side of a periodic task.
///
/// Implementations may block briefly (a real driver would talk to a bus
/// here); each worker calls its sampler from its own task, so one slow
/// probe never stalls another.
pub trait Sampler: Send {
    /// Takes one reading.
    fn sample(&mut self) -> Result<Measurement, SensorError>;
}

impl<F> Sampler for F
where
    F: FnMut() -> Result<Measurement, SensorError> + Send,
{
    fn sample(&mut self) -> Result<Measurement, SensorError> {
        (self)()
    }
}
