//! # Fieldclock
//!
//! An interval-multiplexing scheduler for periodic sampling tasks.
//!
//! Fieldclock provides the core engine of a small sensor station: several
//! tasks, each with its own sampling period, coordinated through one shared
//! clock instead of one timer apiece. It is designed to be a library that a
//! daemon embeds, with the task set and all timing supplied at startup.
//!
//! ## Core Concepts
//!
//! - **Shared Clock**: A single ticker owns elapsed time. On every tick it
//!   tests each task's period by divisibility and raises the due flags of
//!   the tasks whose interval just elapsed.
//! - **Due Flags**: One atomic boolean per task, split into a raise-only
//!   handle for the clock and a take-only handle for the owning worker.
//!   Flags are the entire coordination surface; there is no shared lock.
//! - **Decoupled Workers**: Each task's worker polls its own flag at a
//!   short fixed delay and services a firing by sampling a collaborator and
//!   reporting the reading. A slow or failing task never disturbs the
//!   clock or its neighbors.
//! - **Event-Driven Observation**: Ticks, cycle outcomes, and lifecycle
//!   changes are broadcast as strongly-typed events for logging and tests;
//!   dropping every subscriber changes nothing about scheduling.
//! - **Configuration-Driven**: Tick resolution, poll delay, task periods,
//!   report destination, and timezone are defined at startup via a
//!   `FieldclockConfig` object, often loaded from a file.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use fieldclock::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // 1. Create a default configuration: one-second ticks, 100 ms polls.
//!     let config = FieldclockConfig::default();
//!
//!     // 2. Create the engine.
//!     let engine = FieldclockEngine::new(config);
//!
//!     // 3. Subscribe to an event stream before starting the engine.
//!     let mut cycles = engine.subscribe_cycle_events();
//!     tokio::spawn(async move {
//!         while let Ok(event) = cycles.recv().await {
//!             println!("cycle: {event:?}");
//!         }
//!     });
//!
//!     // 4. Register tasks: a name, a period in ticks, and a sampler.
//!     engine
//!         .on_period("wind", 3, || Ok(Measurement::Wind { speed_mps: 4.2 }))
//!         .await?;
//!
//!     // 5. Run the engine. It will shut down on Ctrl+C.
//!     engine.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub const ENGINE_NAME: &str = "Field Engine";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Declare all the modules in the crate.
pub mod clock;
pub mod common;
pub mod config;
pub mod due;
pub mod engine;
pub mod error;
pub mod events;
pub mod interval;
pub mod report;
pub mod sensors;
pub mod worker;

/// A prelude module for easy importing of the most common Fieldclock types.
pub mod prelude {
    pub use crate::clock::TickEvent;
    pub use crate::common::TaskKey;
    pub use crate::config::{FieldclockConfig, ReporterConfig, TaskSpec, TickResolution};
    pub use crate::engine::{EngineHandle, FieldclockEngine};
    pub use crate::error::{ConfigError, ReportError, SensorError};
    pub use crate::events::{CycleEvent, StationEvent};
    pub use crate::report::Reporter;
    pub use crate::sensors::{
        Anemometer, EnvironmentProbe, Measurement, Sampler, SoilProbe,
    };
}
