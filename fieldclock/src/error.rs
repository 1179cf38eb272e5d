//! Error types for configuration, sampling, and reporting failures.
//!
//! The taxonomy mirrors how failures are handled at runtime: a
//! [`ConfigError`] is always fatal and is only ever produced before the
//! scheduler starts ticking; a [`SensorError`] or [`ReportError`] belongs to
//! a single worker's cycle, is reported and logged, and never terminates the
//! process or touches another task's schedule.

use thiserror::Error;

/// Invalid configuration or task registration. Always fatal at startup.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// A task was registered with a period of zero ticks.
    #[error("task `{name}` has a zero sampling period")]
    ZeroPeriod {
        /// Name of the offending task.
        name: String,
    },

    /// Two tasks were registered under the same name.
    #[error("duplicate task name `{name}`")]
    DuplicateTask {
        /// The name registered twice.
        name: String,
    },

    /// The engine was started with no tasks registered.
    #[error("no tasks registered")]
    NoTasks,

    /// A custom tick resolution of zero milliseconds.
    #[error("tick resolution must be at least one millisecond")]
    ZeroTick,

    /// The least common multiple of the configured periods overflowed.
    #[error("combined task periods overflow the elapsed-time counter")]
    PeriodOverflow,

    /// A sensor calibration value that cannot produce a reading.
    #[error("invalid calibration: {detail}")]
    Calibration {
        /// Human-readable description of the bad value.
        detail: String,
    },

    /// A simulation fault rate outside the `[0, 1]` probability range.
    #[error("fault rate {rate} is not a probability")]
    FaultRate {
        /// The rejected value.
        rate: f64,
    },
}

/// A sampling collaborator failed to produce a measurement.
///
/// Recovered locally by the owning worker: the cycle is reported as a fault
/// and the worker keeps polling.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SensorError {
    /// The probe did not answer on its bus.
    #[error("probe not responding")]
    Unreachable,

    /// The probe answered with a value outside its plausible range.
    #[error("implausible reading: {detail}")]
    BadReading {
        /// What was read and why it was rejected.
        detail: String,
    },
}

/// The report sink could not accept an entry.
///
/// Surfaced to the worker whose cycle produced the entry; other workers and
/// their due flags are unaffected.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The underlying destination failed.
    #[error("report destination unavailable: {0}")]
    Io(#[from] std::io::Error),
}
