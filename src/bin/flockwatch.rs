//! flockwatch - count distinct objects across a frame stream and drive an alert actuator.
//!
//! This daemon:
//! 1. Pulls frames from the configured source (trace file or stub://)
//! 2. Runs the detector on each frame
//! 3. Drops detections with the wrong label, low confidence or implausible geometry
//! 4. Counts detections that are not re-detections of an already counted object
//! 5. Forwards alert-on/alert-off to the actuator for every newly counted object
//! 6. Stops on source exhaustion, Ctrl-C or the optional frame limit

use anyhow::{Context, Result};
use clap::Parser;
use std::io::IsTerminal;
use std::path::PathBuf;

use flockwatch::config::{ActuatorKind, FlockwatchConfig};
use flockwatch::ui::Ui;
use flockwatch::{open_source, ReplayDetector, SessionLoop, SessionSummary, StopHandle};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Count distinct objects in a detection stream and signal every Nth one"
)]
struct Args {
    /// Config file (TOML when the extension is .toml, JSON otherwise).
    #[arg(long, env = "FLOCKWATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Frame source: stub://<name> or a JSON-lines trace file.
    #[arg(long)]
    source: Option<String>,

    /// Fire an alert every time the unique count passes a multiple of this.
    #[arg(long)]
    alert_interval: Option<i64>,

    /// Centers closer than this many pixels to a known object are re-detections.
    #[arg(long)]
    distance_threshold: Option<f64>,

    /// Comma-separated class labels to count (empty = all).
    #[arg(long)]
    labels: Option<String>,

    /// Minimum detector confidence.
    #[arg(long)]
    min_confidence: Option<f32>,

    /// Actuator kind: log, serial or mqtt.
    #[arg(long)]
    actuator: Option<String>,

    /// Serial device path for the serial actuator.
    #[arg(long)]
    serial_device: Option<PathBuf>,

    /// Serial line speed (default 9600).
    #[arg(long)]
    serial_baud: Option<u32>,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<u64>,

    /// Frames emitted by a stub:// source.
    #[arg(long)]
    frames: Option<u64>,

    /// Pace a stub:// source at this rate.
    #[arg(long)]
    fps: Option<u32>,

    /// Seed for a stub:// source.
    #[arg(long)]
    seed: Option<u64>,

    /// Output style: auto, plain or pretty.
    #[arg(long, default_value = "auto")]
    ui: String,

    /// Print the end-of-session summary as JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let ui = Ui::from_flag(Some(&args.ui), std::io::stderr().is_terminal());

    let cfg = {
        let _stage = ui.stage("load configuration");
        let mut cfg = FlockwatchConfig::load_layers(args.config.as_deref())?;
        apply_args(&mut cfg, &args)?;
        cfg.validate()?;
        cfg
    };
    log::info!(
        "flockwatch {} source={} interval={} threshold={}px labels={:?}",
        env!("CARGO_PKG_VERSION"),
        cfg.source.uri,
        cfg.alert_interval,
        cfg.distance_threshold,
        cfg.filter.labels
    );

    let (mut source, mut actuator) = {
        let _stage = ui.stage("open source + actuator");
        (open_source(&cfg.source)?, cfg.build_actuator()?)
    };
    let mut detector = ReplayDetector::new();
    let mut observer = ui.session_progress(cfg.build_observer());

    let stop = StopHandle::new();
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || {
        log::info!("stop requested, finishing current frame");
        handler_stop.request_stop();
    })
    .context("failed to install Ctrl-C handler")?;

    let mut session_loop = SessionLoop::new(cfg.build_session()?)
        .with_stop_handle(stop)
        .with_max_frames(args.max_frames);

    let summary = session_loop.run(
        source.as_mut(),
        &mut detector,
        actuator.as_mut(),
        &mut observer,
    )?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn apply_args(cfg: &mut FlockwatchConfig, args: &Args) -> Result<()> {
    if let Some(source) = &args.source {
        cfg.source.uri = source.clone();
    }
    if let Some(interval) = args.alert_interval {
        cfg.alert_interval = interval;
    }
    if let Some(threshold) = args.distance_threshold {
        cfg.distance_threshold = threshold;
    }
    if let Some(labels) = &args.labels {
        cfg.filter.labels = labels
            .split(',')
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(min_confidence) = args.min_confidence {
        cfg.filter.min_confidence = min_confidence;
    }
    if let Some(kind) = &args.actuator {
        cfg.actuator.kind = kind.parse::<ActuatorKind>()?;
    }
    if let Some(device) = &args.serial_device {
        cfg.actuator.serial_device = Some(device.clone());
    }
    if let Some(baud) = args.serial_baud {
        cfg.actuator.serial_baud = baud;
    }
    if let Some(frames) = args.frames {
        cfg.source.synthetic_frames = frames;
    }
    if args.fps.is_some() {
        cfg.source.target_fps = args.fps;
    }
    if let Some(seed) = args.seed {
        cfg.source.seed = seed;
    }
    Ok(())
}

fn print_summary(summary: &SessionSummary) {
    println!("session summary:");
    println!("  source: {}", summary.source);
    println!(
        "  frames processed: {} (source emitted {}{})",
        summary.frames_processed,
        summary.source_frames,
        if summary.source_exhausted { ", exhausted" } else { "" }
    );
    println!("  unique objects: {}", summary.unique_objects);
    println!("  alerts fired: {}", summary.alerts_fired);
    println!("  peak frame occupancy: {}", summary.peak_occupancy);
    println!("  detector failures: {}", summary.detector_failures);
    println!("  actuator failures: {}", summary.actuator_failures);
    println!("  stopped: {:?}", summary.stop_reason);
}
