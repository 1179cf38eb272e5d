//! Defines all configuration structures for the Fieldclock engine.
//!
//! These structs are designed to be deserialized from a configuration file
//! (e.g., a TOML file) using `serde`, with environment-variable overrides
//! layered on top. Every field has a default, so an absent file yields the
//! classic station setup: one-second ticks, a 100 ms worker poll delay, and
//! the wind/environment/soil periods of 3, 5, and 6 ticks.

use crate::error::ConfigError;
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The top-level configuration for the `FieldclockEngine`.
///
/// This struct is the entry point for all engine settings. It is typically
/// loaded from a TOML file at daemon startup via [`FieldclockConfig::load`].
#[derive(Debug, Clone, Deserialize)]
pub struct FieldclockConfig {
    /// The tick length of the master clock.
    #[serde(default)]
    pub resolution: TickResolution,

    /// How long a worker sleeps between polls of its due flag, in
    /// milliseconds. Must stay below the shortest task period for every due
    /// event to be serviced before the next one lands; the engine warns at
    /// startup when it is not.
    #[serde(default = "default_poll_delay_ms")]
    pub poll_delay_ms: u64,

    /// The timezone report timestamps are rendered in. Uses the string
    /// names from the IANA Time Zone Database (e.g., "America/Los_Angeles").
    /// Defaults to UTC.
    #[serde(default = "default_timezone")]
    pub timezone: Tz,

    /// Where formatted readings are sent.
    #[serde(default)]
    pub reporter: ReporterConfig,

    /// Sampling periods for the compiled-in station tasks, in ticks.
    #[serde(default)]
    pub tasks: TaskPeriods,

    /// Knobs for the simulated probes.
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// Voltage-to-speed mapping for the anemometer channel.
    #[serde(default)]
    pub wind_calibration: WindCalibration,
}

/// Defines the tick length of the master clock.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TickResolution {
    /// One tick per second. The station's native granularity.
    #[default]
    Second,
    /// A user-defined tick length in milliseconds, mostly useful for
    /// demos and tests that should not wait on wall-clock seconds.
    Custom {
        /// Tick length in milliseconds; must be nonzero.
        millis_per_tick: u64,
    },
}

impl TickResolution {
    /// The real-time duration of one tick.
    pub fn tick_duration(&self) -> Duration {
        match self {
            TickResolution::Second => Duration::from_secs(1),
            TickResolution::Custom { millis_per_tick } => {
                Duration::from_millis(*millis_per_tick)
            }
        }
    }
}

/// Sampling periods, in ticks, for the three compiled-in station tasks.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TaskPeriods {
    /// Anemometer period.
    #[serde(default = "default_wind_period")]
    pub wind: u64,
    /// Temperature/humidity probe period.
    #[serde(default = "default_environment_period")]
    pub environment: u64,
    /// Soil moisture/temperature probe period.
    #[serde(default = "default_soil_period")]
    pub soil: u64,
}

/// Selects the destination for formatted readings.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase", tag = "mode")]
pub enum ReporterConfig {
    /// Emit readings through the process log, one named stream per task.
    #[default]
    Console,
    /// Append readings to a log file.
    File {
        /// Path of the report log. Created (with a header line) if absent.
        path: PathBuf,
    },
}

/// Knobs for the simulated probes backing the station tasks.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SimulationConfig {
    /// Seed for the probes' noise generators. A fixed seed makes a run
    /// reproducible; when absent each probe seeds itself from the OS.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Probability, per sample, that a probe simulates an unreachable
    /// device. Zero by default.
    #[serde(default)]
    pub fault_rate: f64,
}

/// Linear mapping from anemometer channel voltage to wind speed.
///
/// Matches the transfer curve of the station's analog anemometer: readings
/// at or below `volts_min` map to 0 m/s, readings at or above `volts_max`
/// map to `speed_max`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WindCalibration {
    /// Channel voltage corresponding to still air.
    #[serde(default = "default_volts_min")]
    pub volts_min: f64,
    /// Channel voltage corresponding to full-scale wind.
    #[serde(default = "default_volts_max")]
    pub volts_max: f64,
    /// Wind speed at full-scale voltage, in m/s.
    #[serde(default = "default_speed_max")]
    pub speed_max: f64,
}

/// The immutable registration record for one periodic task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    /// Unique task name, used in reports, events, and log fields.
    pub name: String,
    /// Sampling period in ticks. Must be nonzero.
    pub period: u64,
}

impl TaskSpec {
    /// Creates a new task spec.
    pub fn new(name: impl Into<String>, period: u64) -> Self {
        Self {
            name: name.into(),
            period,
        }
    }
}

impl FieldclockConfig {
    /// Loads configuration from an optional TOML file plus `FIELDSTATION_*`
    /// environment overrides, then validates it.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("FIELDSTATION").separator("__"),
        );
        let loaded: Self = builder.build()?.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Checks every value that would otherwise fail after the clock has
    /// started ticking. All violations are fatal here, at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let TickResolution::Custom { millis_per_tick: 0 } = self.resolution {
            return Err(ConfigError::ZeroTick);
        }
        for (name, period) in [
            ("wind", self.tasks.wind),
            ("environment", self.tasks.environment),
            ("soil", self.tasks.soil),
        ] {
            if period == 0 {
                return Err(ConfigError::ZeroPeriod {
                    name: name.to_string(),
                });
            }
        }
        if !(0.0..=1.0).contains(&self.simulation.fault_rate) {
            return Err(ConfigError::FaultRate {
                rate: self.simulation.fault_rate,
            });
        }
        self.wind_calibration.validate()?;
        Ok(())
    }

    /// The real-time duration of one tick.
    pub fn tick_duration(&self) -> Duration {
        self.resolution.tick_duration()
    }

    /// The worker poll delay as a duration.
    pub fn poll_delay(&self) -> Duration {
        Duration::from_millis(self.poll_delay_ms)
    }
}

impl WindCalibration {
    /// Rejects voltage ranges that cannot produce a speed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.volts_min.is_finite()
            || !self.volts_max.is_finite()
            || self.volts_min >= self.volts_max
        {
            return Err(ConfigError::Calibration {
                detail: format!(
                    "anemometer voltage range {}..{} V is empty",
                    self.volts_min, self.volts_max
                ),
            });
        }
        if !self.speed_max.is_finite() || self.speed_max <= 0.0 {
            return Err(ConfigError::Calibration {
                detail: format!("full-scale wind speed {} m/s is not positive", self.speed_max),
            });
        }
        Ok(())
    }
}

// --- Default value functions for serde ---

fn default_poll_delay_ms() -> u64 {
    100
}

fn default_timezone() -> Tz {
    Tz::UTC
}

fn default_wind_period() -> u64 {
    3
}

fn default_environment_period() -> u64 {
    5
}

fn default_soil_period() -> u64 {
    6
}

fn default_volts_min() -> f64 {
    0.4
}

fn default_volts_max() -> f64 {
    2.0
}

fn default_speed_max() -> f64 {
    32.4
}

impl Default for FieldclockConfig {
    fn default() -> Self {
        Self {
            resolution: TickResolution::default(),
            poll_delay_ms: default_poll_delay_ms(),
            timezone: default_timezone(),
            reporter: ReporterConfig::default(),
            tasks: TaskPeriods::default(),
            simulation: SimulationConfig::default(),
            wind_calibration: WindCalibration::default(),
        }
    }
}

impl Default for TaskPeriods {
    fn default() -> Self {
        Self {
            wind: default_wind_period(),
            environment: default_environment_period(),
            soil: default_soil_period(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            fault_rate: 0.0,
        }
    }
}

impl Default for WindCalibration {
    fn default() -> Self {
        Self {
            volts_min: default_volts_min(),
            volts_max: default_volts_max(),
            speed_max: default_speed_max(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_station_setup() {
        let cfg = FieldclockConfig::default();
        assert_eq!(cfg.resolution, TickResolution::Second);
        assert_eq!(cfg.tick_duration(), Duration::from_secs(1));
        assert_eq!(cfg.poll_delay(), Duration::from_millis(100));
        assert_eq!(cfg.timezone, Tz::UTC);
        assert_eq!(cfg.tasks.wind, 3);
        assert_eq!(cfg.tasks.environment, 5);
        assert_eq!(cfg.tasks.soil, 6);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn toml_overrides_deserialize() {
        let cfg: FieldclockConfig = toml_from(
            r#"
            poll_delay_ms = 50
            timezone = "America/Los_Angeles"

            [resolution.custom]
            millis_per_tick = 20

            [tasks]
            wind = 2
            environment = 4
            soil = 8

            [reporter]
            mode = "file"
            path = "/tmp/station.log"
            "#,
        );
        assert_eq!(cfg.tick_duration(), Duration::from_millis(20));
        assert_eq!(cfg.poll_delay(), Duration::from_millis(50));
        assert_eq!(cfg.timezone, Tz::America__Los_Angeles);
        assert_eq!(cfg.tasks.wind, 2);
        assert!(matches!(cfg.reporter, ReporterConfig::File { .. }));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_tick_rejected() {
        let cfg: FieldclockConfig = toml_from("[resolution.custom]\nmillis_per_tick = 0\n");
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroTick));
    }

    #[test]
    fn zero_period_rejected_by_name() {
        let cfg: FieldclockConfig = toml_from("[tasks]\nsoil = 0\n");
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::ZeroPeriod {
                name: "soil".to_string()
            })
        );
    }

    #[test]
    fn fault_rate_must_be_a_probability() {
        let cfg: FieldclockConfig = toml_from("[simulation]\nfault_rate = 1.5\n");
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::FaultRate { .. })
        ));
    }

    #[test]
    fn empty_voltage_range_rejected() {
        let cfg: FieldclockConfig =
            toml_from("[wind_calibration]\nvolts_min = 2.0\nvolts_max = 0.4\n");
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Calibration { .. })
        ));
    }

    fn toml_from(text: &str) -> FieldclockConfig {
        config::Config::builder()
            .add_source(config::File::from_str(text, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }
}
