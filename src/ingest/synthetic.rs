//! Seeded synthetic scene (`stub://<name>`).
//!
//! Objects land at random positions and drift slowly across the frame for a
//! number of frames while the detector re-reports them with a few pixels of
//! jitter, then leave. A share
//! of frames also carries spurious boxes (too small or too elongated) so the
//! admission filter has something to reject.

use std::time::{Duration, Instant};

use anyhow::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{FrameSource, SourceStats};
use crate::detect::RawDetection;
use crate::frame::Frame;

pub(crate) const DEFAULT_FRAMES: u64 = 300;

const OBJECT_SIZE: i32 = 40;
const JITTER: i32 = 3;
/// Per-axis drift bound in px/frame; a full linger stays inside the default dedup radius.
const DRIFT: i32 = 1;
const LINGER_FRAMES: std::ops::Range<u32> = 5..20;
const SPAWN_CHANCE: f64 = 0.08;
const NOISE_CHANCE: f64 = 0.1;

#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    pub name: String,
    /// Total frames before the source reports exhaustion.
    pub frames: u64,
    pub seed: u64,
    pub width: u32,
    pub height: u32,
    /// When set, `next_frame` sleeps to hold this rate.
    pub target_fps: Option<u32>,
    pub label: String,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            name: "flock".to_string(),
            frames: DEFAULT_FRAMES,
            seed: 0,
            width: 640,
            height: 480,
            target_fps: None,
            label: "bird".to_string(),
        }
    }
}

struct Visitor {
    x: i32,
    y: i32,
    vx: i32,
    vy: i32,
    remaining: u32,
}

impl Visitor {
    /// Move by one frame of drift, bouncing off the `[0, max_x] x [0, max_y]` box.
    fn advance(&mut self, max_x: i32, max_y: i32) {
        (self.x, self.vx) = bounce(self.x + self.vx, self.vx, max_x);
        (self.y, self.vy) = bounce(self.y + self.vy, self.vy, max_y);
    }
}

fn bounce(pos: i32, velocity: i32, max: i32) -> (i32, i32) {
    if pos < 0 {
        (0, velocity.abs())
    } else if pos > max {
        (max, -velocity.abs())
    } else {
        (pos, velocity)
    }
}

pub struct SyntheticSource {
    config: SyntheticConfig,
    rng: StdRng,
    visitors: Vec<Visitor>,
    stats: SourceStats,
    last_emit: Option<Instant>,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.seed);
        Self {
            config,
            rng,
            visitors: Vec::new(),
            stats: SourceStats::default(),
            last_emit: None,
        }
    }

    fn pace(&mut self) {
        let Some(fps) = self.config.target_fps.filter(|fps| *fps > 0) else {
            return;
        };
        let period = Duration::from_secs_f64(1.0 / f64::from(fps));
        if let Some(last) = self.last_emit {
            let elapsed = last.elapsed();
            if elapsed < period {
                std::thread::sleep(period - elapsed);
            }
        }
        self.last_emit = Some(Instant::now());
    }

    fn step_scene(&mut self) -> Vec<RawDetection> {
        self.visitors.retain(|v| v.remaining > 0);

        let max_x = (self.config.width as i32 - OBJECT_SIZE).max(1);
        let max_y = (self.config.height as i32 - OBJECT_SIZE).max(1);
        if self.rng.gen_bool(SPAWN_CHANCE) {
            let visitor = Visitor {
                x: self.rng.gen_range(0..max_x),
                y: self.rng.gen_range(0..max_y),
                vx: self.rng.gen_range(-DRIFT..=DRIFT),
                vy: self.rng.gen_range(-DRIFT..=DRIFT),
                remaining: self.rng.gen_range(LINGER_FRAMES),
            };
            self.visitors.push(visitor);
        }

        let mut detections = Vec::with_capacity(self.visitors.len() + 1);
        for visitor in &mut self.visitors {
            visitor.remaining -= 1;
            visitor.advance(max_x, max_y);
            let dx = self.rng.gen_range(-JITTER..=JITTER);
            let dy = self.rng.gen_range(-JITTER..=JITTER);
            let confidence = self.rng.gen_range(0.55..0.99);
            detections.push(
                RawDetection::new(visitor.x + dx, visitor.y + dy, OBJECT_SIZE, OBJECT_SIZE)
                    .with_label(self.config.label.clone(), confidence),
            );
        }

        if self.rng.gen_bool(NOISE_CHANCE) {
            let x = self.rng.gen_range(0..self.config.width.max(1) as i32);
            let y = self.rng.gen_range(0..self.config.height.max(1) as i32);
            let (w, h) = if self.rng.gen_bool(0.5) {
                (12, 12)
            } else {
                (150, 30)
            };
            detections.push(
                RawDetection::new(x, y, w, h).with_label(self.config.label.clone(), 0.3),
            );
        }

        detections
    }
}

impl FrameSource for SyntheticSource {
    fn describe(&self) -> String {
        format!("stub://{}", self.config.name)
    }

    fn connect(&mut self) -> Result<()> {
        log::info!(
            "SyntheticSource: connected to stub://{} ({} frames, seed {})",
            self.config.name,
            self.config.frames,
            self.config.seed
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.stats.frames_emitted >= self.config.frames {
            self.stats.exhausted = true;
            return Ok(None);
        }
        self.pace();
        let detections = self.step_scene();
        let frame = Frame::with_detections(
            self.stats.frames_emitted,
            self.config.width,
            self.config.height,
            detections,
        );
        self.stats.frames_emitted += 1;
        Ok(Some(frame))
    }

    fn stats(&self) -> SourceStats {
        self.stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(config: SyntheticConfig) -> Vec<Vec<RawDetection>> {
        let mut source = SyntheticSource::new(config);
        let mut frames = Vec::new();
        while let Some(frame) = source.next_frame().unwrap() {
            frames.push(frame.recorded_detections().unwrap().to_vec());
        }
        frames
    }

    #[test]
    fn emits_configured_frame_count() {
        let config = SyntheticConfig {
            frames: 25,
            ..SyntheticConfig::default()
        };
        let mut source = SyntheticSource::new(config);
        let mut count = 0;
        while source.next_frame().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 25);
        assert!(source.stats().exhausted);
    }

    #[test]
    fn same_seed_same_scene() {
        let config = SyntheticConfig {
            frames: 60,
            seed: 42,
            ..SyntheticConfig::default()
        };
        assert_eq!(drain(config.clone()), drain(config));
    }

    #[test]
    fn visitors_drift_and_bounce_at_edges() {
        let mut visitor = Visitor {
            x: 10,
            y: 3,
            vx: 1,
            vy: -1,
            remaining: 10,
        };
        for _ in 0..5 {
            visitor.advance(600, 440);
        }
        assert_eq!((visitor.x, visitor.y), (15, 1));
        assert_eq!(visitor.vy, 1);

        visitor.advance(600, 440);
        assert_eq!((visitor.x, visitor.y), (16, 2));

        let mut edge = Visitor {
            x: 600,
            y: 200,
            vx: 1,
            vy: 0,
            remaining: 3,
        };
        edge.advance(600, 440);
        assert_eq!((edge.x, edge.vx), (600, -1));
        edge.advance(600, 440);
        assert_eq!(edge.x, 599);
    }

    #[test]
    fn boxes_stay_inside_jitter_of_a_visitor() {
        let frames = drain(SyntheticConfig {
            frames: 200,
            seed: 7,
            ..SyntheticConfig::default()
        });
        assert!(frames.iter().any(|dets| !dets.is_empty()));
        for det in frames.iter().flatten() {
            assert!(det.w > 0 && det.h > 0);
            assert_eq!(det.label, "bird");
        }
    }
}
