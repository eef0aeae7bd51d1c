use anyhow::{anyhow, Result};

use crate::detect::backend::Detector;
use crate::detect::result::RawDetection;
use crate::frame::Frame;

/// Replays detections that were recorded alongside the frame.
///
/// Trace files and the synthetic source attach detector output to each
/// frame; this backend hands it back unchanged.
#[derive(Default)]
pub struct ReplayDetector {
    frames_seen: u64,
}

impl ReplayDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }
}

impl Detector for ReplayDetector {
    fn name(&self) -> &'static str {
        "replay"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>> {
        self.frames_seen += 1;
        frame
            .recorded_detections()
            .map(<[RawDetection]>::to_vec)
            .ok_or_else(|| anyhow!("frame {} carries no recorded detections", frame.index))
    }
}
