//! The polling worker that services one task's due flag.
//!
//! Each worker owns its task end to end: the consume side of the due flag,
//! the boxed sampling collaborator, and a handle to the shared reporter.
//! The loop is a poll, not a wake: every `poll_delay` the worker takes the
//! flag and, when it was raised, runs one servicing cycle. Nothing here
//! reads another task's state, and nothing feeds back into the clock.

use crate::common::TaskKey;
use crate::due::DueConsumer;
use crate::events::CycleEvent;
use crate::report::{ReportEntry, Reporter};
use crate::sensors::Sampler;
use chrono_tz::Tz;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing::{debug, error, warn};

/// One task's servicing loop.
///
/// Built by the engine at start time and moved into its own tokio task.
pub struct SampleWorker {
    /// Registry key, carried into cycle events.
    pub key: TaskKey,
    /// Configured task name.
    pub name: String,
    /// Consume side of the task's due flag.
    pub due: DueConsumer,
    /// The sampling collaborator.
    pub sampler: Box<dyn Sampler>,
    /// Shared report destination.
    pub reporter: Reporter,
    /// Zone report timestamps are rendered in.
    pub timezone: Tz,
    /// Sleep between flag polls. Kept below the shortest task period by
    /// configuration.
    pub poll_delay: Duration,
    /// Outcome stream for listeners and tests.
    pub cycle_sender: broadcast::Sender<CycleEvent>,
}

impl SampleWorker {
    /// Polls until the shutdown broadcast fires or closes.
    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) {
        debug!(
            task = %self.name,
            poll_ms = self.poll_delay.as_millis() as u64,
            "worker task started"
        );
        loop {
            tokio::select! {
                biased;
                _ = shutdown_rx.recv() => {
                    debug!(task = %self.name, "worker task shutting down");
                    break;
                }
                _ = sleep(self.poll_delay) => {
                    if self.due.take() {
                        self.cycle().await;
                    }
                }
            }
        }
    }

    /// One servicing cycle: sample, stamp, report.
    ///
    /// The flag was taken before this runs, so a firing that lands
    /// mid-cycle stays pending and is picked up on the next poll.
    async fn cycle(&mut self) {
        match self.sampler.sample() {
            Ok(measurement) => {
                let body = measurement.to_string();
                let entry = ReportEntry::now(self.timezone, &self.name, &body, false);
                match self.reporter.write(&entry).await {
                    Ok(()) => {
                        let summary = body.lines().next().unwrap_or_default().to_string();
                        self.cycle_sender
                            .send(CycleEvent::Sampled {
                                key: self.key,
                                task: self.name.clone(),
                                summary,
                            })
                            .ok();
                    }
                    Err(err) => self.report_failed(err.to_string()),
                }
            }
            Err(err) => {
                warn!(task = %self.name, error = %err, "sampling failed");
                let entry = ReportEntry::now(self.timezone, &self.name, err.to_string(), true);
                if let Err(report_err) = self.reporter.write(&entry).await {
                    self.report_failed(report_err.to_string());
                }
                self.cycle_sender
                    .send(CycleEvent::SampleFailed {
                        key: self.key,
                        task: self.name.clone(),
                        error: err.to_string(),
                    })
                    .ok();
            }
        }
    }

    fn report_failed(&self, error: String) {
        error!(task = %self.name, error = %error, "report sink refused the entry");
        self.cycle_sender
            .send(CycleEvent::ReportFailed {
                key: self.key,
                task: self.name.clone(),
                error,
            })
            .ok();
    }
}
