//! count_frame - count labelled detections in a single still frame.
//!
//! Reads one frame of recorded detector output (a JSON array of detections,
//! or an object with a `detections` array) from a file or stdin and prints
//! how many detections carry a counted label with enough confidence.
//! Nothing is deduplicated and no alert is raised.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::io::Read;
use std::path::PathBuf;

use flockwatch::{count_labels, LabelGate, LabelPredicate, RawDetection};

#[derive(Parser, Debug)]
#[command(author, version, about = "Count labelled detections in one frame")]
struct Args {
    /// Detection file (defaults to stdin).
    #[arg(long)]
    input: Option<PathBuf>,

    /// Comma-separated labels to count (empty = all).
    #[arg(long, env = "FLOCKWATCH_LABELS", default_value = "")]
    labels: String,

    /// Minimum detector confidence.
    #[arg(long, default_value_t = 0.5)]
    min_confidence: f32,

    /// Print each counted detection.
    #[arg(long)]
    verbose: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FrameDocument {
    Frame { detections: Vec<RawDetection> },
    Bare(Vec<RawDetection>),
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let raw = match &args.input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };
    let document: FrameDocument =
        serde_json::from_str(raw.trim()).context("invalid frame document")?;
    let detections = match document {
        FrameDocument::Frame { detections } | FrameDocument::Bare(detections) => detections,
    };

    let labels: Vec<&str> = args
        .labels
        .split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .collect();
    let gate = LabelGate::new(LabelPredicate::allowlist(labels), args.min_confidence)?;

    if args.verbose {
        let counted = detections.iter().filter(|det| gate.admits(det));
        for (i, det) in counted.enumerate() {
            println!(
                "{} {:.2} {} at ({}, {}) {}x{}",
                det.label,
                det.confidence,
                i + 1,
                det.x,
                det.y,
                det.w,
                det.h
            );
        }
    }
    let count = count_labels(&detections, &gate);
    log::info!("{} of {} detections counted", count, detections.len());
    println!("{}", count);
    Ok(())
}
