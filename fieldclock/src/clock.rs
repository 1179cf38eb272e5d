//! The shared clock: the single source of elapsed time.
//!
//! [`Timeline`] is the synchronous state machine — a counter, a wrap policy,
//! and the raise side of every task's due flag. [`SampleClock`] is its async
//! shell: one tokio task that calls [`Timeline::advance`] once per tick and
//! broadcasts a [`TickEvent`] afterwards. Workers never see either type;
//! they watch their flags.

use crate::common::TaskKey;
use crate::config::TickResolution;
use crate::due::DueSetter;
use crate::error::ConfigError;
use crate::interval::{is_due, WrapPolicy};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, warn};

/// A snapshot of one clock tick, broadcast after every flag raise for that
/// tick has completed. Observation only: dropping all receivers changes
/// nothing about scheduling.
#[derive(Debug, Clone)]
pub struct TickEvent {
    /// Monotonic tick number since startup. Never wraps.
    pub seq: u64,
    /// The counter value this tick tested against the task periods.
    pub elapsed: u64,
    /// Tasks that became due on this tick.
    pub raised: Vec<TaskKey>,
    /// Tasks whose flag was still raised from an earlier tick, so the two
    /// firings merged into one.
    pub merged: Vec<TaskKey>,
    /// Whether the counter wrapped back to the floor on this tick.
    pub wrapped: bool,
    /// When the tick fired.
    pub timestamp: Instant,
}

/// What one [`Timeline::advance`] call did.
#[derive(Debug, Clone, PartialEq)]
pub struct TickSummary {
    /// The counter value this tick tested. When `wrapped` is set, the
    /// stored counter has already been reset to the wrap floor.
    pub elapsed: u64,
    /// Tasks that became due on this tick.
    pub raised: Vec<TaskKey>,
    /// Tasks whose previous firing was still unconsumed.
    pub merged: Vec<TaskKey>,
    /// Whether the counter wrapped back to the floor on this tick.
    pub wrapped: bool,
}

/// The clock's view of one registered task.
#[derive(Debug)]
pub struct TickTask {
    /// Registry key, carried through ticks and events.
    pub key: TaskKey,
    /// Configured name, used in log fields.
    pub name: String,
    /// Sampling period in ticks. Nonzero; validated at registration.
    pub period: u64,
    /// Raise side of the task's due flag.
    pub due: DueSetter,
}

/// The elapsed-time state machine.
///
/// Nothing here is async; [`SampleClock`] drives it once per tick and tests
/// drive it directly.
#[derive(Debug)]
pub struct Timeline {
    elapsed: u64,
    wrap: WrapPolicy,
    tasks: Vec<TickTask>,
}

impl Timeline {
    /// Builds a timeline for a fixed task set.
    ///
    /// Fails when the set is empty or the combined periods overflow the
    /// counter. Zero periods were already rejected at registration.
    pub fn new(tasks: Vec<TickTask>) -> Result<Self, ConfigError> {
        let wrap = WrapPolicy::for_periods(tasks.iter().map(|t| t.period))?;
        Ok(Self {
            elapsed: 0,
            wrap,
            tasks,
        })
    }

    /// The stored counter value. Starts at 0 and stays below the ceiling.
    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    /// The wrap policy computed from the task set.
    pub fn wrap(&self) -> WrapPolicy {
        self.wrap
    }

    /// Name of a registered task.
    pub fn task_name(&self, key: TaskKey) -> Option<&str> {
        self.tasks
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.name.as_str())
    }

    /// Advances time by one tick and raises every due flag.
    ///
    /// The counter increments before it is tested, so the value 0 is never
    /// tested and nothing fires at startup. On reaching the ceiling the
    /// counter resets to the floor, the next value every period divides,
    /// which keeps the modulo pattern identical to an unbounded counter.
    pub fn advance(&mut self) -> TickSummary {
        self.elapsed += 1;
        let tested = self.elapsed;

        let mut raised = Vec::new();
        let mut merged = Vec::new();
        for task in &self.tasks {
            if is_due(tested, task.period) {
                raised.push(task.key);
                if task.due.raise() {
                    merged.push(task.key);
                }
            }
        }

        let wrapped = tested == self.wrap.ceiling;
        if wrapped {
            self.elapsed = self.wrap.floor;
        }

        TickSummary {
            elapsed: tested,
            raised,
            merged,
            wrapped,
        }
    }
}

/// The async shell around [`Timeline`].
///
/// The first tick fires one full tick duration after startup, so elapsed
/// value 1 corresponds to one tick of wall time. All flag raises for a tick
/// complete before the task suspends again.
pub struct SampleClock {
    timeline: Timeline,
    resolution: TickResolution,
    tick_sender: broadcast::Sender<Arc<TickEvent>>,
}

impl SampleClock {
    pub fn new(
        timeline: Timeline,
        resolution: TickResolution,
        tick_sender: broadcast::Sender<Arc<TickEvent>>,
    ) -> Self {
        Self {
            timeline,
            resolution,
            tick_sender,
        }
    }

    /// Drives the timeline until the shutdown broadcast fires or closes.
    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) {
        let tick = self.resolution.tick_duration();
        let mut ticker = interval_at(Instant::now() + tick, tick);
        let mut seq: u64 = 0;
        info!(
            tick_ms = tick.as_millis() as u64,
            floor = self.timeline.wrap().floor,
            ceiling = self.timeline.wrap().ceiling,
            "clock task started"
        );
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    debug!("clock task shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    seq += 1;
                    let summary = self.timeline.advance();
                    for key in &summary.merged {
                        // A slow worker left its flag raised; the firings merge.
                        let task = self.timeline.task_name(*key).unwrap_or("?");
                        warn!(task, elapsed = summary.elapsed, "due flag unconsumed since an earlier tick; firings merged");
                    }
                    if summary.wrapped {
                        debug!(
                            elapsed = summary.elapsed,
                            floor = self.timeline.wrap().floor,
                            "elapsed counter wrapped"
                        );
                    }
                    let event = TickEvent {
                        seq,
                        elapsed: summary.elapsed,
                        raised: summary.raised,
                        merged: summary.merged,
                        wrapped: summary.wrapped,
                        timestamp: Instant::now(),
                    };
                    self.tick_sender.send(Arc::new(event)).ok();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::due::{due_pair, DueConsumer};
    use slotmap::SlotMap;

    fn task_set(periods: &[(&str, u64)]) -> (Vec<TickTask>, Vec<(u64, DueConsumer)>) {
        let mut registry: SlotMap<TaskKey, ()> = SlotMap::with_key();
        let mut tasks = Vec::new();
        let mut consumers = Vec::new();
        for (name, period) in periods {
            let (setter, consumer) = due_pair();
            tasks.push(TickTask {
                key: registry.insert(()),
                name: name.to_string(),
                period: *period,
                due: setter,
            });
            consumers.push((*period, consumer));
        }
        (tasks, consumers)
    }

    #[test]
    fn nothing_fires_on_a_fresh_timeline_until_a_period_elapses() {
        let (tasks, consumers) = task_set(&[("wind", 3), ("environment", 5), ("soil", 6)]);
        let mut timeline = Timeline::new(tasks).unwrap();
        for expected in 1..3 {
            let summary = timeline.advance();
            assert_eq!(summary.elapsed, expected);
            assert!(summary.raised.is_empty());
        }
        for (_, consumer) in &consumers {
            assert!(!consumer.is_raised());
        }
    }

    #[test]
    fn flags_follow_the_modulo_rule_across_many_ticks() {
        let (tasks, consumers) = task_set(&[("wind", 3), ("environment", 5), ("soil", 6)]);
        let mut timeline = Timeline::new(tasks).unwrap();
        // Two full wrap cycles; the pattern must match an unbounded counter.
        for tick in 1..=120u64 {
            let summary = timeline.advance();
            for (period, consumer) in &consumers {
                assert_eq!(
                    consumer.take(),
                    tick % period == 0,
                    "tick {tick}, period {period}"
                );
            }
            assert_eq!(summary.raised.len(), consumers.iter().filter(|(p, _)| tick % p == 0).count());
        }
    }

    #[test]
    fn counter_wraps_from_the_ceiling_to_the_floor() {
        let (tasks, consumers) = task_set(&[("wind", 3), ("environment", 5), ("soil", 6)]);
        let mut timeline = Timeline::new(tasks).unwrap();
        let mut last = None;
        for _ in 1..=60 {
            last = Some(timeline.advance());
            for (_, consumer) in &consumers {
                consumer.take();
            }
        }
        let wrap_tick = last.unwrap();
        assert_eq!(wrap_tick.elapsed, 60);
        assert!(wrap_tick.wrapped);
        assert_eq!(wrap_tick.raised.len(), 3, "the ceiling is a common multiple");
        assert_eq!(timeline.elapsed(), 30, "counter resets to the floor, never zero");

        let after = timeline.advance();
        assert_eq!(after.elapsed, 31);
        assert!(!after.wrapped);
    }

    #[test]
    fn unconsumed_firings_merge_and_are_reported() {
        let (tasks, consumers) = task_set(&[("wind", 3)]);
        let key = tasks[0].key;
        let mut timeline = Timeline::new(tasks).unwrap();
        let (_, consumer) = &consumers[0];

        // Fire at tick 3 and leave the flag raised.
        for _ in 1..=3 {
            timeline.advance();
        }
        assert!(consumer.is_raised());

        // The tick-6 firing lands on the raised flag and merges.
        for _ in 4..=6 {
            let summary = timeline.advance();
            if summary.elapsed == 6 {
                assert_eq!(summary.merged, vec![key]);
            } else {
                assert!(summary.merged.is_empty());
            }
        }

        // Two firings, one service.
        assert!(consumer.take());
        assert!(!consumer.take());
    }

    #[test]
    fn single_task_wraps_at_twice_its_period() {
        let (tasks, consumers) = task_set(&[("soil", 7)]);
        let mut timeline = Timeline::new(tasks).unwrap();
        assert_eq!(timeline.wrap(), WrapPolicy { floor: 7, ceiling: 14 });
        let (_, consumer) = &consumers[0];
        let mut fired_at = Vec::new();
        for _ in 1..=28 {
            let summary = timeline.advance();
            if consumer.take() {
                fired_at.push(summary.elapsed);
            }
        }
        assert_eq!(fired_at, vec![7, 14, 14, 14]);
    }

    #[test]
    fn empty_task_set_is_rejected() {
        assert_eq!(
            Timeline::new(Vec::new()).unwrap_err(),
            ConfigError::NoTasks
        );
    }
}
