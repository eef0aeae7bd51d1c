//! Observability sinks.
//!
//! Observers see per-frame reports and the running unique count. They never
//! feed back into counting decisions.

use std::time::{Duration, Instant};

use crate::session::{FrameReport, SessionSummary};

pub const DEFAULT_CROWDED_FRAME_THRESHOLD: usize = 3;
pub const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(5);

pub trait Observer {
    fn on_frame(&mut self, report: &FrameReport, unique_count: u64);

    fn on_session_end(&mut self, _summary: &SessionSummary) {}
}

/// Discards everything.
#[derive(Default)]
pub struct NullObserver;

impl Observer for NullObserver {
    fn on_frame(&mut self, _report: &FrameReport, _unique_count: u64) {}
}

/// Logs unique count changes, crowded frames and periodic health lines.
pub struct LogObserver {
    crowded_threshold: usize,
    health_interval: Duration,
    last_health: Instant,
    last_unique: u64,
    frames: u64,
    crowded_frames: u64,
}

impl LogObserver {
    pub fn new(crowded_threshold: usize, health_interval: Duration) -> Self {
        Self {
            crowded_threshold,
            health_interval,
            last_health: Instant::now(),
            last_unique: 0,
            frames: 0,
            crowded_frames: 0,
        }
    }

    pub fn crowded_frames(&self) -> u64 {
        self.crowded_frames
    }

    fn is_crowded(&self, occupancy: usize) -> bool {
        self.crowded_threshold > 0 && occupancy >= self.crowded_threshold
    }
}

impl Default for LogObserver {
    fn default() -> Self {
        Self::new(DEFAULT_CROWDED_FRAME_THRESHOLD, DEFAULT_HEALTH_INTERVAL)
    }
}

impl Observer for LogObserver {
    fn on_frame(&mut self, report: &FrameReport, unique_count: u64) {
        self.frames += 1;

        if self.is_crowded(report.occupancy) {
            self.crowded_frames += 1;
            log::info!(
                "detected {} objects in frame {}",
                report.occupancy,
                report.frame_index
            );
        }

        if unique_count != self.last_unique {
            log::info!("total unique objects: {}", unique_count);
            self.last_unique = unique_count;
        }

        if self.last_health.elapsed() >= self.health_interval {
            log::info!(
                "health: frames={} unique={} crowded_frames={}",
                self.frames,
                unique_count,
                self.crowded_frames
            );
            self.last_health = Instant::now();
        }
    }

    fn on_session_end(&mut self, summary: &SessionSummary) {
        log::info!(
            ">>> total unique objects detected during the session: {}",
            summary.unique_objects
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(occupancy: usize) -> FrameReport {
        FrameReport {
            occupancy,
            ..FrameReport::default()
        }
    }

    #[test]
    fn counts_crowded_frames_at_threshold() {
        let mut observer = LogObserver::new(3, Duration::from_secs(3600));
        observer.on_frame(&report(2), 0);
        observer.on_frame(&report(3), 1);
        observer.on_frame(&report(5), 1);
        assert_eq!(observer.crowded_frames(), 2);
    }

    #[test]
    fn zero_threshold_disables_crowding() {
        let mut observer = LogObserver::new(0, Duration::from_secs(3600));
        observer.on_frame(&report(10), 0);
        assert_eq!(observer.crowded_frames(), 0);
    }
}
