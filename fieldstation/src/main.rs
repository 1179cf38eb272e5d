use anyhow::{Context, Result};
use colored::Colorize;
use fieldclock::prelude::*;
use fieldclock::{ENGINE_NAME, VERSION as LIB_VERSION};
use std::env;
use std::path::PathBuf;
use tracing::{info, warn};

const STATION_VERSION: &str = env!("CARGO_PKG_VERSION");

/// How often the tick listener echoes the clock, in ticks.
const TICK_ECHO_EVERY: u64 = 10;

fn print_banner() {
    if env::var("QUIET_MODE").is_ok() {
        return;
    }
    // The `include_str!` macro reads the file at COMPILE time and embeds
    // the text directly into the binary. It assumes `logo.log` is in the
    // root of the `fieldstation` crate.
    const LOGO_TEXT: &str = include_str!("../logo.log");
    println!("{}", LOGO_TEXT.cyan());

    let version_string = format!(
        "          Station v{:<8} Library   v{:<8}",
        STATION_VERSION, LIB_VERSION
    );

    println!("{}", "-----------------------------------------------------------------------------------------------".dimmed());

    let license_blurb = "
    This software is provided 'as is', without warranty of any kind.
    Distributed under the MIT OR Apache-2.0 license. Use at your own risk.
    ";

    println!("{}", version_string);
    println!("{}", license_blurb.dimmed());

    println!("{}", "-----------------------------------------------------------------------------------------------".dimmed());
}

/// Spawns several tasks, each subscribing to a different event stream from
/// the engine.
fn spawn_event_listeners(engine: &FieldclockEngine) {
    // Lifecycle listener.
    let mut station_rx = engine.subscribe_station_events();
    tokio::spawn(async move {
        while let Ok(event) = station_rx.recv().await {
            info!("station event: {:?}", event);
        }
    });

    // Cycle listener. Successful readings already reach the configured
    // reporter, so only trouble is echoed here.
    let mut cycle_rx = engine.subscribe_cycle_events();
    tokio::spawn(async move {
        while let Ok(event) = cycle_rx.recv().await {
            match event {
                CycleEvent::SampleFailed { task, error, .. } => {
                    warn!(task = %task, error = %error, "sampling cycle failed");
                }
                CycleEvent::ReportFailed { task, error, .. } => {
                    warn!(task = %task, error = %error, "report sink refused an entry");
                }
                CycleEvent::Sampled { .. } => {}
            }
        }
    });

    // Tick listener, throttled to every Nth tick.
    let mut tick_rx = engine.subscribe_ticks();
    tokio::spawn(async move {
        while let Ok(event) = tick_rx.recv().await {
            if event.seq % TICK_ECHO_EVERY == 0 {
                info!(
                    "tick #{} (elapsed {}, {} due)",
                    event.seq,
                    event.elapsed,
                    event.raised.len()
                );
            }
        }
    });
}

/// Registers the compiled-in station tasks with their configured periods:
/// the anemometer, the air probe, and the soil probe.
async fn register_station_tasks(
    engine: &FieldclockEngine,
    config: &FieldclockConfig,
) -> Result<()> {
    let sim = config.simulation;

    let anemometer = Anemometer::new(config.wind_calibration, &sim)
        .context("anemometer initialization failed")?;
    engine
        .add_task(TaskSpec::new("wind", config.tasks.wind), Box::new(anemometer))
        .await?;

    engine
        .add_task(
            TaskSpec::new("environment", config.tasks.environment),
            Box::new(EnvironmentProbe::new(&sim)),
        )
        .await?;

    engine
        .add_task(
            TaskSpec::new("soil", config.tasks.soil),
            Box::new(SoilProbe::new(&sim)),
        )
        .await?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    let config_path = env::args().nth(1).map(PathBuf::from);
    if let Some(path) = &config_path {
        info!("loading configuration from {}", path.display());
    }
    let config = FieldclockConfig::load(config_path.as_deref())
        .context("loading station configuration")?;

    let engine = FieldclockEngine::new(config.clone());
    spawn_event_listeners(&engine);

    register_station_tasks(&engine, &config)
        .await
        .context("initializing station tasks")?;

    info!("Starting {} v{}...", ENGINE_NAME.cyan(), LIB_VERSION);
    engine.run().await?;

    println!("\nExiting program...");
    Ok(())
}
