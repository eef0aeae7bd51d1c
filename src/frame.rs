//! Frames as they move through a session.
//!
//! A `Frame` is transient: it is produced by a [`FrameSource`](crate::ingest::FrameSource),
//! handed to a detector, and dropped once its detections have been processed.
//! Sources that replay detector output (trace files, the synthetic generator)
//! attach the recorded boxes to the frame itself.

use std::time::Instant;

use crate::detect::RawDetection;

#[derive(Debug)]
pub struct Frame {
    /// Zero-based position in the source.
    pub index: u64,
    pub width: u32,
    pub height: u32,
    /// Monotonic capture instant (pacing and health logging only).
    captured_at: Instant,
    recorded: Option<Vec<RawDetection>>,
}

impl Frame {
    /// A frame without recorded detector output.
    pub fn blank(index: u64, width: u32, height: u32) -> Self {
        Self {
            index,
            width,
            height,
            captured_at: Instant::now(),
            recorded: None,
        }
    }

    /// A frame carrying detector output captured elsewhere.
    pub fn with_detections(
        index: u64,
        width: u32,
        height: u32,
        detections: Vec<RawDetection>,
    ) -> Self {
        Self {
            recorded: Some(detections),
            ..Self::blank(index, width, height)
        }
    }

    pub fn recorded_detections(&self) -> Option<&[RawDetection]> {
        self.recorded.as_deref()
    }

    pub fn age_millis(&self) -> u128 {
        self.captured_at.elapsed().as_millis()
    }
}
