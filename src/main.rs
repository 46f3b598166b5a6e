//! Headless harness for the particle field scheduler
//!
//! Mounts the field on the recording backend, drives it with a ~60 Hz
//! interval (the cadence `requestAnimationFrame` would give) and logs what the
//! throttle, debounce and teardown paths did.
//!
//! Run with: cargo run --features cli --bin field-cli
//!
//! Environment:
//! - HERO_FIELD_CONFIG: path to a JSON config (partial overrides allowed)
//! - HERO_FIELD_RUN_MS: run time in milliseconds (default 3000)
//! - HERO_FIELD_DUMP: write the generated points to this file as JSON

use std::time::Duration;

use hero_field::core::{field_rng, generate, FrameScheduler, LifecycleState, Viewport};
use hero_field::render::HeadlessBackend;
use hero_field::time::now_millis;
use hero_field::FieldConfig;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_RUN_MS: f64 = 3000.0;
const FRAME_PERIOD: Duration = Duration::from_micros(16_667);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hero_field=debug,field_cli=debug"));
    fmt().with_env_filter(filter).with_target(true).init();

    let config = match std::env::var("HERO_FIELD_CONFIG") {
        Ok(path) => {
            info!(path = %path, "Loading field config");
            FieldConfig::from_path(&path)?
        }
        Err(_) => FieldConfig::default(),
    };

    let run_ms = std::env::var("HERO_FIELD_RUN_MS")
        .ok()
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(DEFAULT_RUN_MS);

    if let Ok(path) = std::env::var("HERO_FIELD_DUMP") {
        // Matches the mounted field only when the config carries a seed
        let field = generate(&config.generator, &mut field_rng(config.generator.seed));
        std::fs::write(&path, serde_json::to_string_pretty(field.points())?)?;
        info!(path = %path, points = field.len(), "Point field written");
    }

    let backend = HeadlessBackend::new();
    let report = backend.report();
    let mut scheduler = FrameScheduler::new(config);

    let initial = Viewport::new(1920, 1080, 1.0);
    if scheduler.mount(|_| Ok(backend), initial) != LifecycleState::Running {
        warn!(error = ?scheduler.degraded(), "Field did not start");
        return Ok(());
    }
    let Some(ticket) = scheduler.request_frame() else {
        return Ok(());
    };

    info!(run_ms, "Driving scheduler");

    let start = now_millis();
    let mut frames = tokio::time::interval(FRAME_PERIOD);
    let mut stats_interval = tokio::time::interval(Duration::from_secs(1));
    let mut resize_burst_sent = false;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = frames.tick() => {
                let now = now_millis() - start;
                if now >= run_ms {
                    break;
                }

                // Halfway through, simulate a window being dragged to a new size
                if !resize_burst_sent && now >= run_ms / 2.0 {
                    for i in 0..10u32 {
                        scheduler.schedule_resize(Viewport::new(1280 + i * 32, 720 + i * 18, 2.0), now);
                    }
                    resize_burst_sent = true;
                }

                scheduler.poll_resize(now);
                scheduler.on_frame(ticket, now);
            }
            _ = stats_interval.tick() => {
                let stats = scheduler.stats();
                info!(
                    ticks = stats.ticks,
                    rendered = stats.rendered,
                    throttled = stats.throttled,
                    resizes = stats.resizes_applied,
                    "stats"
                );
            }
            _ = &mut ctrl_c => {
                warn!("Interrupted");
                break;
            }
        }
    }

    let stats = scheduler.stats();
    scheduler.unmount();

    let report = report.borrow();
    info!(
        stats = %serde_json::to_string(&stats)?,
        backend = %serde_json::to_string(&*report)?,
        live_resources = report.live_resources(),
        "Field unmounted"
    );
    if report.live_resources() > 0 {
        warn!(live = report.live_resources(), "Resources leaked on teardown");
    }

    Ok(())
}
