// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Ekko - companion robot behavior engine
//!
//! Runs the arbitration core headless: producer services feed snapshots and
//! commands, and a fixed-rate tick loop applies them.

use anyhow::Result;
use clap::Parser;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use ekko_behavior::comms::OfflineMedia;
use ekko_behavior::core::MonotonicClock;
use ekko_behavior::sensors::{LineSensor, SensorPoller, SensorSource, TofSimulator};
use ekko_behavior::services::{ConsoleComms, ServiceError};
use ekko_behavior::{BehaviorEngine, Collaborators, Config, EngineOptions, NAME, VERSION};

/// Ekko - companion robot behavior engine
#[derive(Parser, Debug)]
#[command(name = "ekko")]
#[command(author = "bad-antics")]
#[command(version = VERSION)]
#[command(about = "Behavior arbitration for a small companion robot")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// Demo mode with a simulated range sensor
    #[arg(long)]
    demo: bool,

    /// Tick rate in Hz
    #[arg(long)]
    tick_hz: Option<u32>,

    /// Schedule rule file
    #[arg(long)]
    schedule: Option<PathBuf>,

    /// Gesture IPC socket path
    #[arg(long)]
    gesture_socket: Option<PathBuf>,

    /// Disable the gesture socket
    #[arg(long)]
    no_gesture: bool,

    /// Do not read control-link messages from stdin
    #[arg(long)]
    no_console: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load or create configuration
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;

    // Initialize logging
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        config.log_level.parse().unwrap_or(Level::INFO)
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let build = ekko_behavior::build_info();
    info!("{} v{} - behavior engine", NAME, build.version);
    debug!("Built for {}/{} with features {:?}", build.os, build.target, build.features);

    // Override with command line args
    if args.demo {
        config.sensors.demo = true;
        config.sensors.device = None;
    }
    if let Some(tick_hz) = args.tick_hz {
        config.engine.tick_hz = tick_hz;
    }
    if let Some(schedule) = args.schedule {
        config.schedule.path = schedule;
    }
    if let Some(socket) = args.gesture_socket {
        config.gesture.socket_path = socket;
    }
    if args.no_gesture {
        config.gesture.enabled = false;
    }
    if args.no_console {
        config.comms.console = false;
    }
    config.validate()?;

    info!("Configuration loaded from {:?}", config_path);
    info!("Demo mode: {}", config.sensors.demo);

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(run_headless(config));
    // stdin reads park a blocking thread that never returns on its own
    rt.shutdown_timeout(Duration::from_millis(500));
    result
}

fn spawn_service<F>(name: &'static str, service: F) -> JoinHandle<()>
where
    F: Future<Output = Result<(), ServiceError>> + Send + 'static,
{
    tokio::spawn(async move {
        match service.await {
            Ok(()) => debug!("{} finished", name),
            Err(e) => warn!("{} stopped: {}", name, e),
        }
    })
}

fn sensor_source(config: &Config) -> Option<Box<dyn SensorSource>> {
    match (&config.sensors.device, config.sensors.demo) {
        (Some(device), _) => Some(Box::new(LineSensor::open("sensor-board", device.clone()))),
        (None, true) => Some(Box::new(TofSimulator::new("tof-sim"))),
        (None, false) => None,
    }
}

/// Run the engine until Ctrl+C
async fn run_headless(config: Config) -> Result<()> {
    info!("Initializing headless mode...");

    let clock = Arc::new(MonotonicClock::new());
    let media = OfflineMedia::new(config.comms.gif_dir.clone(), config.comms.default_gif.clone());
    let parts = Collaborators::new(clock)
        .with_media(Arc::new(media))
        .with_schedule_file(&config.schedule.path);
    let mut engine = BehaviorEngine::new(EngineOptions::from(&config), parts)?;

    let (shutdown_tx, _) = broadcast::channel::<()>(4);
    let mut services = Vec::new();

    match sensor_source(&config) {
        Some(source) => {
            let poller = SensorPoller::new(source, engine.sensor_slot())
                .with_poll_interval(Duration::from_millis(config.sensors.poll_interval_ms));
            services.push(spawn_service("Sensor poller", poller.run(shutdown_tx.subscribe())));
        }
        None => warn!("No sensor device configured; proximity triggers disabled"),
    }

    #[cfg(all(unix, feature = "gesture-ipc"))]
    {
        use ekko_behavior::comms::GestureTranslator;
        use ekko_behavior::services::GestureListener;

        if config.gesture.enabled {
            let translator = GestureTranslator::with_mapping(engine.commands(), config.gesture.state_mapping()?);
            match GestureListener::bind(&config.gesture.socket_path, translator) {
                Ok(listener) => {
                    services.push(spawn_service("Gesture IPC", listener.run(shutdown_tx.subscribe())))
                }
                Err(e) => warn!("Gesture IPC unavailable: {}", e),
            }
        }
    }

    if config.comms.console {
        let console = ConsoleComms::new(engine.comms_slot());
        services.push(spawn_service("Console comms", console.run_stdin(shutdown_tx.subscribe())));
    }

    let period = Duration::from_secs_f64(1.0 / f64::from(config.engine.tick_hz));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    info!("Ekko running at {} Hz", config.engine.tick_hz);
    info!("   Press Ctrl+C to shutdown");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = engine.tick();
                if engine.ticks() % (u64::from(config.engine.tick_hz) * 60) == 0 {
                    debug!("Tick {}: {} ({:?})", engine.ticks(), report.state, report.follower);
                }
            }
            signal = &mut ctrl_c => {
                if let Err(e) = signal {
                    warn!("Signal handler failed: {}", e);
                }
                break;
            }
        }
    }

    info!("Shutdown signal received, cleaning up...");

    // Receivers may already be gone
    let _ = shutdown_tx.send(());
    for service in services {
        if let Err(e) = service.await {
            warn!("Service task failed: {}", e);
        }
    }
    engine.shutdown();

    info!("Ekko shutdown complete");

    Ok(())
}
