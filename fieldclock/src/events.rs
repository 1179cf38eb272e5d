//! Defines the public event types broadcast by the Fieldclock engine.
//!
//! This module is the engine's observation surface. Listeners subscribe to
//! these strongly-typed streams for logging, dashboards, or tests. Events
//! are deliberately not part of the scheduling mechanism itself: workers are
//! driven by their due flags alone, and dropping every receiver changes
//! nothing about when tasks fire.

use crate::common::TaskKey;
use tokio::time::Instant;

/// Events related to the lifecycle of the engine itself.
#[derive(Debug, Clone)]
pub enum StationEvent {
    /// Fired when a task is successfully added to the registry.
    TaskRegistered {
        /// Registry key of the new task.
        key: TaskKey,
        /// The task's configured name.
        name: String,
    },
    /// Fired once when the clock and workers have been spawned.
    SchedulerStarted {
        /// When the scheduler came up.
        timestamp: Instant,
    },
    /// Fired when an interrupt asks the scheduler to wind down.
    ShutdownRequested,
    /// Fired once when every loop has stopped.
    SchedulerStopped,
}

/// The outcome of one worker servicing cycle.
#[derive(Debug, Clone)]
pub enum CycleEvent {
    /// The collaborator produced a measurement and it was reported.
    Sampled {
        /// Registry key of the task.
        key: TaskKey,
        /// The task's configured name.
        task: String,
        /// First line of the formatted measurement.
        summary: String,
    },
    /// The collaborator failed; the cycle was reported as a fault.
    SampleFailed {
        /// Registry key of the task.
        key: TaskKey,
        /// The task's configured name.
        task: String,
        /// Rendered failure.
        error: String,
    },
    /// The sink refused the entry for this cycle.
    ReportFailed {
        /// Registry key of the task.
        key: TaskKey,
        /// The task's configured name.
        task: String,
        /// Rendered failure.
        error: String,
    },
}
