//! End-to-end scheduler behavior on virtual time: modulo firing patterns,
//! wraparound, liveness over a long run, failure isolation, and graceful
//! shutdown.

use fieldclock::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const TICK_MS: u64 = 100;

fn test_config(poll_delay_ms: u64) -> FieldclockConfig {
    FieldclockConfig {
        resolution: TickResolution::Custom {
            millis_per_tick: TICK_MS,
        },
        poll_delay_ms,
        ..FieldclockConfig::default()
    }
}

fn counting_sampler(
    counter: Arc<AtomicU64>,
) -> impl FnMut() -> Result<Measurement, SensorError> + Send + 'static {
    move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Measurement::Wind { speed_mps: 0.0 })
    }
}

/// Sleeps far enough into virtual time that ticks `1..=n` have fired and
/// their workers, polling well below one tick, have serviced them.
async fn ticks(n: u64) {
    tokio::time::sleep(Duration::from_millis(n * TICK_MS + TICK_MS / 2)).await;
}

/// Registers the classic station task set and returns key → (name, period).
async fn station_tasks(engine: &FieldclockEngine) -> HashMap<TaskKey, (&'static str, u64)> {
    let mut names = HashMap::new();
    for (name, period) in [("wind", 3u64), ("environment", 5), ("soil", 6)] {
        let key = engine
            .on_period(name, period, || Ok(Measurement::Wind { speed_mps: 0.0 }))
            .await
            .unwrap();
        names.insert(key, (name, period));
    }
    names
}

#[tokio::test(start_paused = true)]
async fn due_pattern_matches_the_modulo_rule_over_thirty_ticks() {
    let engine = FieldclockEngine::new(test_config(10));
    let names = station_tasks(&engine).await;
    let mut tick_rx = engine.subscribe_ticks();
    let handle = engine.start().await.unwrap();

    for tick in 1..=30u64 {
        let event = tick_rx.recv().await.unwrap();
        assert_eq!(event.seq, tick);
        assert_eq!(event.elapsed, tick);

        let mut raised: Vec<&str> = event.raised.iter().map(|k| names[k].0).collect();
        raised.sort_unstable();
        let mut expected: Vec<&str> = names
            .values()
            .filter(|(_, period)| tick % period == 0)
            .map(|(name, _)| *name)
            .collect();
        expected.sort_unstable();

        assert_eq!(raised, expected, "tick {tick}");
        assert!(event.merged.is_empty(), "tick {tick} should not merge");
        assert!(!event.wrapped);
    }

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn wraparound_is_invisible_to_the_firing_pattern() {
    let engine = FieldclockEngine::new(test_config(10));
    let names = station_tasks(&engine).await;
    let mut tick_rx = engine.subscribe_ticks();
    let handle = engine.start().await.unwrap();

    let mut wrapped_at = None;
    for seq in 1..=66u64 {
        let event = tick_rx.recv().await.unwrap();
        assert_eq!(event.seq, seq);
        // The oracle runs on the unbounded tick number; the counter reset
        // must not change what fires.
        for (key, (name, period)) in &names {
            assert_eq!(
                event.raised.contains(key),
                seq % period == 0,
                "task {name} at tick {seq}"
            );
        }
        if event.wrapped {
            wrapped_at = Some((seq, event.elapsed));
        }
    }
    assert_eq!(wrapped_at, Some((60, 60)));

    handle.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn every_due_event_is_serviced_across_a_thousand_ticks() {
    let engine = FieldclockEngine::new(test_config(10));
    let wind = Arc::new(AtomicU64::new(0));
    let environment = Arc::new(AtomicU64::new(0));
    let soil = Arc::new(AtomicU64::new(0));
    for (name, period, counter) in [
        ("wind", 3u64, &wind),
        ("environment", 5, &environment),
        ("soil", 6, &soil),
    ] {
        engine
            .on_period(name, period, counting_sampler(counter.clone()))
            .await
            .unwrap();
    }

    let handle = engine.start().await.unwrap();
    ticks(1000).await;
    handle.shutdown().await;

    // Exact counts: every firing was serviced before the next one could
    // land, so nothing merged and nothing was missed.
    assert_eq!(wind.load(Ordering::SeqCst), 333);
    assert_eq!(environment.load(Ordering::SeqCst), 200);
    assert_eq!(soil.load(Ordering::SeqCst), 166);
}

#[tokio::test(start_paused = true)]
async fn a_failing_collaborator_never_disturbs_its_neighbors() {
    let engine = FieldclockEngine::new(test_config(10));
    let good = Arc::new(AtomicU64::new(0));
    engine
        .on_period("environment", 5, counting_sampler(good.clone()))
        .await
        .unwrap();

    let attempts = Arc::new(AtomicU64::new(0));
    let bad_attempts = attempts.clone();
    engine
        .on_period("soil", 6, move || {
            bad_attempts.fetch_add(1, Ordering::SeqCst);
            Err(SensorError::Unreachable)
        })
        .await
        .unwrap();

    let mut cycle_rx = engine.subscribe_cycle_events();
    let handle = engine.start().await.unwrap();
    ticks(30).await;
    handle.shutdown().await;

    assert_eq!(good.load(Ordering::SeqCst), 6, "environment fires at 5..=30");
    assert_eq!(
        attempts.load(Ordering::SeqCst),
        5,
        "each soil firing is still serviced despite the failures"
    );

    let mut failures = 0;
    while let Ok(event) = cycle_rx.try_recv() {
        match event {
            CycleEvent::SampleFailed { task, .. } => {
                assert_eq!(task, "soil");
                failures += 1;
            }
            CycleEvent::Sampled { task, .. } => assert_eq!(task, "environment"),
            CycleEvent::ReportFailed { .. } => panic!("console reports do not fail"),
        }
    }
    assert_eq!(failures, 5);
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_every_loop_and_reports_the_lifecycle() {
    let engine = FieldclockEngine::new(test_config(10));
    let mut station_rx = engine.subscribe_station_events();
    engine
        .on_period("wind", 3, || Ok(Measurement::Wind { speed_mps: 1.0 }))
        .await
        .unwrap();

    let handle = engine.start().await.unwrap();
    ticks(4).await;
    handle.shutdown().await;

    let mut seen = Vec::new();
    while let Ok(event) = station_rx.try_recv() {
        seen.push(event);
    }
    assert_eq!(seen.len(), 4);
    assert!(matches!(seen[0], StationEvent::TaskRegistered { .. }));
    assert!(matches!(seen[1], StationEvent::SchedulerStarted { .. }));
    assert!(matches!(seen[2], StationEvent::ShutdownRequested));
    assert!(matches!(seen[3], StationEvent::SchedulerStopped));
}
