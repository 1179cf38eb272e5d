//! The core engine that orchestrates the entire Fieldclock system.

use crate::clock::{SampleClock, TickEvent, TickTask, Timeline};
use crate::common::TaskKey;
use crate::config::{FieldclockConfig, TaskSpec};
use crate::due::due_pair;
use crate::error::{ConfigError, SensorError};
use crate::events::{CycleEvent, StationEvent};
use crate::report::Reporter;
use crate::sensors::{Measurement, Sampler};
use crate::worker::SampleWorker;
use slotmap::SlotMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// One registered task, parked until `start` hands its pieces to the clock
/// and a worker.
struct Registration {
    spec: TaskSpec,
    /// Taken by `start`; `None` afterwards.
    sampler: Option<Box<dyn Sampler>>,
}

/// The main Fieldclock engine.
///
/// This struct is the central point of control. It holds the system's
/// configuration, the task registry, and the broadcast channels every
/// listener subscribes to. The engine is designed to be cloned and shared
/// across tasks, providing a handle to the running instance.
///
/// Scheduling itself never runs through this struct: once started, the
/// clock raises due flags and each worker consumes its own. The engine only
/// assembles those pieces and carries the observation streams.
#[derive(Clone)]
pub struct FieldclockEngine {
    config: Arc<FieldclockConfig>,
    tick_sender: broadcast::Sender<Arc<TickEvent>>,
    cycle_sender: broadcast::Sender<CycleEvent>,
    station_sender: broadcast::Sender<StationEvent>,
    registry: Arc<RwLock<SlotMap<TaskKey, Registration>>>,
}

impl FieldclockEngine {
    /// Creates a new `FieldclockEngine` with the given configuration.
    pub fn new(config: FieldclockConfig) -> Self {
        const CHANNEL_CAPACITY: usize = 256;
        let (tick_sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        let (cycle_sender, _) = broadcast::channel(64);
        let (station_sender, _) = broadcast::channel(64);

        Self {
            config: Arc::new(config),
            tick_sender,
            cycle_sender,
            station_sender,
            registry: Arc::new(RwLock::new(SlotMap::with_key())),
        }
    }

    /// Registers a periodic sampling task.
    ///
    /// Fails fast on a zero period or a duplicate name; nothing is ever
    /// rejected at tick time. There is no removal: the task set is part of
    /// the schedule's identity and is fixed once `start` has run.
    pub async fn add_task(
        &self,
        spec: TaskSpec,
        sampler: Box<dyn Sampler>,
    ) -> Result<TaskKey, ConfigError> {
        if spec.period == 0 {
            return Err(ConfigError::ZeroPeriod {
                name: spec.name.clone(),
            });
        }
        let mut registry = self.registry.write().await;
        if registry.values().any(|r| r.spec.name == spec.name) {
            return Err(ConfigError::DuplicateTask {
                name: spec.name.clone(),
            });
        }
        let name = spec.name.clone();
        let key = registry.insert(Registration {
            spec,
            sampler: Some(sampler),
        });
        self.station_sender
            .send(StationEvent::TaskRegistered {
                key,
                name: name.clone(),
            })
            .ok();
        info!(task = %name, "task registered");
        Ok(key)
    }

    /// Registers a task from a name, a period in ticks, and a plain
    /// sampling closure.
    pub async fn on_period<F>(
        &self,
        name: &str,
        period: u64,
        sampler: F,
    ) -> Result<TaskKey, ConfigError>
    where
        F: FnMut() -> Result<Measurement, SensorError> + Send + 'static,
    {
        self.add_task(TaskSpec::new(name, period), Box::new(sampler))
            .await
    }

    /// Validates the task set, builds the shared machinery, and spawns the
    /// clock task plus one worker task per registered task.
    ///
    /// The returned [`EngineHandle`] owns the shutdown broadcast and the
    /// join handles; dropping it does not stop the scheduler.
    pub async fn start(&self) -> anyhow::Result<EngineHandle> {
        let mut registry = self.registry.write().await;
        if registry.is_empty() {
            return Err(ConfigError::NoTasks.into());
        }
        if registry.values().any(|r| r.sampler.is_none()) {
            return Err(anyhow::anyhow!("engine already started"));
        }

        // Everything fallible happens before the first spawn.
        self.config.validate()?;
        let reporter = Reporter::from_config(&self.config.reporter)?;

        let poll_delay = self.config.poll_delay();
        let tick = self.config.tick_duration();
        let min_period = registry
            .values()
            .map(|r| r.spec.period)
            .min()
            .unwrap_or(u64::MAX);
        // Liveness bound: a worker must notice a raised flag before the
        // next firing can land on it.
        if poll_delay.as_millis() >= tick.as_millis().saturating_mul(min_period as u128) {
            warn!(
                poll_ms = poll_delay.as_millis() as u64,
                shortest_period_ticks = min_period,
                "poll delay is not smaller than the shortest task period; firings may merge"
            );
        }

        let (shutdown_tx, _) = broadcast::channel(1);
        let mut tick_tasks = Vec::with_capacity(registry.len());
        let mut pending_workers = Vec::with_capacity(registry.len());
        for (key, registration) in registry.iter_mut() {
            let (setter, consumer) = due_pair();
            tick_tasks.push(TickTask {
                key,
                name: registration.spec.name.clone(),
                period: registration.spec.period,
                due: setter,
            });
            let Some(sampler) = registration.sampler.take() else {
                return Err(anyhow::anyhow!("engine already started"));
            };
            pending_workers.push(SampleWorker {
                key,
                name: registration.spec.name.clone(),
                due: consumer,
                sampler,
                reporter: reporter.clone(),
                timezone: self.config.timezone,
                poll_delay,
                cycle_sender: self.cycle_sender.clone(),
            });
        }
        drop(registry);

        let timeline = Timeline::new(tick_tasks)?;
        info!(
            tasks = pending_workers.len(),
            floor = timeline.wrap().floor,
            ceiling = timeline.wrap().ceiling,
            "scheduler starting"
        );

        let mut join_handles = Vec::with_capacity(pending_workers.len() + 1);
        for worker in pending_workers {
            let name = worker.name.clone();
            join_handles.push((name, tokio::spawn(worker.run(shutdown_tx.subscribe()))));
        }
        let clock = SampleClock::new(
            timeline,
            self.config.resolution.clone(),
            self.tick_sender.clone(),
        );
        join_handles.push((
            "clock".to_string(),
            tokio::spawn(clock.run(shutdown_tx.subscribe())),
        ));

        self.station_sender
            .send(StationEvent::SchedulerStarted {
                timestamp: tokio::time::Instant::now(),
            })
            .ok();

        Ok(EngineHandle {
            shutdown_tx,
            join_handles,
            station_sender: self.station_sender.clone(),
        })
    }

    /// Runs the scheduler until a shutdown signal is received.
    ///
    /// This method will:
    /// 1. Start the clock and worker tasks.
    /// 2. Wait for a Ctrl+C signal to initiate a graceful shutdown.
    /// 3. Broadcast shutdown and wait for every loop, with a grace timeout.
    ///
    /// The interrupt is the orderly exit path, not an error: on a clean
    /// return the process can exit zero.
    pub async fn run(&self) -> anyhow::Result<()> {
        info!("FieldclockEngine starting up...");
        let handle = self.start().await?;
        info!(
            "Engine running at {:?}. Press Ctrl+C to shut down.",
            self.config.resolution
        );
        tokio::signal::ctrl_c().await?;

        info!("Shutdown signal received. Broadcasting to all tasks...");
        handle.shutdown().await;
        info!("FieldclockEngine has shut down.");
        Ok(())
    }

    /// Subscribes to the tick stream.
    pub fn subscribe_ticks(&self) -> broadcast::Receiver<Arc<TickEvent>> {
        self.tick_sender.subscribe()
    }

    /// Subscribes to the per-cycle outcome stream.
    pub fn subscribe_cycle_events(&self) -> broadcast::Receiver<CycleEvent> {
        self.cycle_sender.subscribe()
    }

    /// Subscribes to the engine lifecycle stream.
    pub fn subscribe_station_events(&self) -> broadcast::Receiver<StationEvent> {
        self.station_sender.subscribe()
    }
}

/// Handle to a started scheduler.
///
/// Owns the shutdown broadcast and the join handles of the clock and
/// workers. The scheduler keeps running if the handle is dropped; only
/// [`EngineHandle::shutdown`] stops it.
pub struct EngineHandle {
    shutdown_tx: broadcast::Sender<()>,
    join_handles: Vec<(String, JoinHandle<()>)>,
    station_sender: broadcast::Sender<StationEvent>,
}

impl EngineHandle {
    /// How long `shutdown` waits for each loop before giving up on it.
    pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

    /// Broadcasts shutdown and waits for every loop, warning on laggards.
    ///
    /// Clock and workers exit at their next suspension point; no in-flight
    /// cycle needs recovery.
    pub async fn shutdown(self) {
        self.station_sender.send(StationEvent::ShutdownRequested).ok();
        if self.shutdown_tx.send(()).is_err() {
            error!("no scheduler loops are listening for shutdown");
        }
        for (name, handle) in self.join_handles {
            match tokio::time::timeout(Self::SHUTDOWN_GRACE, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => error!(task = %name, error = %err, "scheduler loop panicked"),
                Err(_) => warn!(task = %name, "loop did not stop within the grace period"),
            }
        }
        self.station_sender.send(StationEvent::SchedulerStopped).ok();
        info!("scheduler stopped");
    }
}
