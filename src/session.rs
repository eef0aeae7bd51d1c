//! Detection sessions.
//!
//! A [`Session`] owns everything that lives for one run of a frame source:
//! the center history, the alert state and the admission policy. Nothing is
//! persisted; dropping the session discards the count.
//!
//! [`SessionLoop`] drives a session from a frame source through a detector,
//! forwarding alert symbols to an actuator and reports to an observer. All
//! work for one frame finishes before the next frame is pulled.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde::Serialize;

use crate::actuator::Actuator;
use crate::alert::{AlertController, AlertSignal};
use crate::dedup::{CenterHistory, Classification, SpatialDeduplicator};
use crate::detect::{Center, DetectionFilter, Detector, LabelGate, RawDetection};
use crate::ingest::FrameSource;
use crate::observe::Observer;

/// Session lifecycle. Transitions only move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    Running,
    Stopped,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Running => "running",
            SessionState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// A detection counted as a previously unseen object.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NewObject {
    pub center: Center,
    /// Unique count right after this object was recorded.
    pub unique_count: u64,
    pub signal: AlertSignal,
}

/// Outcome of one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    pub frame_index: u64,
    /// Admitted detections in this frame, before deduplication.
    pub occupancy: usize,
    /// Detections dropped by the label gate or the geometry filter.
    pub rejected: usize,
    /// Admitted detections matched to an already counted object.
    pub duplicates: usize,
    pub new_objects: Vec<NewObject>,
}

impl FrameReport {
    pub fn alert_fired(&self) -> bool {
        self.new_objects
            .iter()
            .any(|obj| obj.signal == AlertSignal::On)
    }
}

pub struct Session {
    state: SessionState,
    gate: LabelGate,
    filter: DetectionFilter,
    dedup: SpatialDeduplicator,
    history: CenterHistory,
    alerts: AlertController,
    frames_processed: u64,
    alerts_fired: u64,
    peak_occupancy: usize,
}

impl Session {
    pub fn new(
        gate: LabelGate,
        filter: DetectionFilter,
        dedup: SpatialDeduplicator,
        alerts: AlertController,
    ) -> Self {
        Self {
            state: SessionState::Idle,
            gate,
            filter,
            dedup,
            history: CenterHistory::new(),
            alerts,
            frames_processed: 0,
            alerts_fired: 0,
            peak_occupancy: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn unique_count(&self) -> u64 {
        self.alerts.count()
    }

    pub fn history(&self) -> &CenterHistory {
        &self.history
    }

    pub fn alerts(&self) -> &AlertController {
        &self.alerts
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn alerts_fired(&self) -> u64 {
        self.alerts_fired
    }

    pub fn peak_occupancy(&self) -> usize {
        self.peak_occupancy
    }

    /// Idle -> Running. Starting a running session is a no-op.
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            SessionState::Idle => {
                self.state = SessionState::Running;
                Ok(())
            }
            SessionState::Running => Ok(()),
            SessionState::Stopped => Err(anyhow!("session already stopped")),
        }
    }

    /// Enter the terminal state.
    pub fn stop(&mut self) {
        self.state = SessionState::Stopped;
    }

    /// Admit, deduplicate and count one frame's detections, in order.
    ///
    /// An idle session starts on its first frame.
    pub fn process_frame(
        &mut self,
        frame_index: u64,
        detections: &[RawDetection],
    ) -> Result<FrameReport> {
        self.start()?;

        let mut report = FrameReport {
            frame_index,
            ..FrameReport::default()
        };

        for det in detections {
            if !self.gate.admits(det) || !self.filter.accepts(det) {
                report.rejected += 1;
                continue;
            }
            report.occupancy += 1;

            let center = det.center();
            match self.dedup.classify(center, &self.history) {
                Classification::New => {
                    self.history.commit(center);
                    let unique_count = self.alerts.record_new_object();
                    let signal = self.alerts.decide();
                    if signal == AlertSignal::On {
                        self.alerts_fired += 1;
                    }
                    log::debug!(
                        "new object #{} at ({}, {}) in frame {}",
                        unique_count,
                        center.x,
                        center.y,
                        frame_index
                    );
                    report.new_objects.push(NewObject {
                        center,
                        unique_count,
                        signal,
                    });
                }
                Classification::Seen { nearest, distance } => {
                    log::trace!(
                        "re-detection at ({}, {}) {:.1}px from ({}, {})",
                        center.x,
                        center.y,
                        distance,
                        nearest.x,
                        nearest.y
                    );
                    report.duplicates += 1;
                }
            }
        }

        debug_assert_eq!(self.history.len() as u64, self.alerts.count());
        self.frames_processed += 1;
        self.peak_occupancy = self.peak_occupancy.max(report.occupancy);
        Ok(report)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(
            LabelGate::default(),
            DetectionFilter::default(),
            SpatialDeduplicator::default(),
            AlertController::default(),
        )
    }
}

/// Cooperative stop flag, checked between frames.
#[derive(Clone, Debug, Default)]
pub struct StopHandle {
    requested: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum StopReason {
    SourceExhausted,
    StopRequested,
    FrameLimit,
}

/// End-of-session totals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub source: String,
    pub unique_objects: u64,
    pub frames_processed: u64,
    pub alerts_fired: u64,
    pub peak_occupancy: usize,
    pub detector_failures: u64,
    pub actuator_failures: u64,
    pub stop_reason: StopReason,
    /// Frames the source produced, as reported by [`FrameSource::stats`].
    pub source_frames: u64,
    pub source_exhausted: bool,
}

pub struct SessionLoop {
    session: Session,
    stop: StopHandle,
    max_frames: Option<u64>,
}

impl SessionLoop {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            stop: StopHandle::new(),
            max_frames: None,
        }
    }

    /// Share an externally owned stop flag (e.g. a Ctrl-C handler).
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    pub fn with_max_frames(mut self, max_frames: Option<u64>) -> Self {
        self.max_frames = max_frames;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run until the source is exhausted, a stop is requested or the frame
    /// limit is reached. The session ends `Stopped` on every path.
    pub fn run(
        &mut self,
        source: &mut dyn FrameSource,
        detector: &mut dyn Detector,
        actuator: &mut dyn Actuator,
        observer: &mut dyn Observer,
    ) -> Result<SessionSummary> {
        let result = self.drive(source, detector, actuator, observer);
        self.session.stop();
        let summary = result?;
        observer.on_session_end(&summary);
        Ok(summary)
    }

    fn drive(
        &mut self,
        source: &mut dyn FrameSource,
        detector: &mut dyn Detector,
        actuator: &mut dyn Actuator,
        observer: &mut dyn Observer,
    ) -> Result<SessionSummary> {
        source.connect()?;
        detector.warm_up()?;
        self.session.start()?;
        log::info!(
            "session running: source={} detector={} actuator={}",
            source.describe(),
            detector.name(),
            actuator.name()
        );

        let mut detector_failures = 0u64;
        let mut actuator_failures = 0u64;

        let stop_reason = loop {
            if self.stop.is_stop_requested() {
                break StopReason::StopRequested;
            }
            if self
                .max_frames
                .is_some_and(|max| self.session.frames_processed() >= max)
            {
                break StopReason::FrameLimit;
            }
            let Some(frame) = source.next_frame()? else {
                break StopReason::SourceExhausted;
            };

            let detections = match detector.detect(&frame) {
                Ok(detections) => detections,
                Err(e) => {
                    log::warn!(
                        "detector {} failed on frame {}: {}",
                        detector.name(),
                        frame.index,
                        e
                    );
                    detector_failures += 1;
                    Vec::new()
                }
            };

            let report = self.session.process_frame(frame.index, &detections)?;
            for obj in &report.new_objects {
                if obj.signal == AlertSignal::On {
                    log::warn!(
                        "alert: unique count reached {} (multiple #{} of {})",
                        obj.unique_count,
                        self.session.alerts().last_alerted_multiple(),
                        self.session.alerts().interval()
                    );
                }
                if let Err(e) = actuator.send(obj.signal) {
                    log::warn!(
                        "actuator {} failed to send {}: {:#}",
                        actuator.name(),
                        obj.signal,
                        e
                    );
                    actuator_failures += 1;
                }
            }
            observer.on_frame(&report, self.session.unique_count());
            log::trace!("frame {} done after {}ms", frame.index, frame.age_millis());
        };

        log::info!(
            "session stopping ({:?}) after {} frames",
            stop_reason,
            self.session.frames_processed()
        );

        let source_stats = source.stats();
        Ok(SessionSummary {
            source: source.describe(),
            unique_objects: self.session.unique_count(),
            frames_processed: self.session.frames_processed(),
            alerts_fired: self.session.alerts_fired(),
            peak_occupancy: self.session.peak_occupancy(),
            detector_failures,
            actuator_failures,
            stop_reason,
            source_frames: source_stats.frames_emitted,
            source_exhausted: source_stats.exhausted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::LabelPredicate;

    fn square_at(cx: i32, cy: i32) -> RawDetection {
        RawDetection::new(cx - 20, cy - 20, 40, 40)
    }

    #[test]
    fn starts_idle_and_runs_on_first_frame() {
        let mut session = Session::default();
        assert_eq!(session.state(), SessionState::Idle);
        session.process_frame(0, &[]).unwrap();
        assert_eq!(session.state(), SessionState::Running);
    }

    #[test]
    fn stopped_session_cannot_restart() {
        let mut session = Session::default();
        session.start().unwrap();
        session.stop();
        assert!(session.start().is_err());
        assert!(session.process_frame(0, &[square_at(100, 100)]).is_err());
        assert_eq!(session.state(), SessionState::Stopped);
        assert_eq!(session.unique_count(), 0);
    }

    #[test]
    fn occupancy_is_independent_of_unique_count() {
        let mut session = Session::default();
        let frame = [square_at(100, 100), square_at(300, 300), square_at(500, 100)];

        let first = session.process_frame(0, &frame).unwrap();
        assert_eq!(first.occupancy, 3);
        assert_eq!(first.new_objects.len(), 3);

        let second = session.process_frame(1, &frame).unwrap();
        assert_eq!(second.occupancy, 3);
        assert_eq!(second.duplicates, 3);
        assert!(second.new_objects.is_empty());
        assert_eq!(session.unique_count(), 3);
        assert_eq!(session.peak_occupancy(), 3);
    }

    #[test]
    fn duplicates_within_one_frame_count_once() {
        let mut session = Session::default();
        let report = session
            .process_frame(0, &[square_at(100, 100), square_at(110, 105)])
            .unwrap();
        assert_eq!(report.occupancy, 2);
        assert_eq!(report.new_objects.len(), 1);
        assert_eq!(report.duplicates, 1);
    }

    #[test]
    fn rejected_detections_never_reach_history() {
        let gate = LabelGate::new(LabelPredicate::allowlist(["bird"]), 0.5).unwrap();
        let mut session = Session::new(
            gate,
            DetectionFilter::default(),
            SpatialDeduplicator::default(),
            AlertController::default(),
        );
        let report = session
            .process_frame(
                0,
                &[
                    square_at(100, 100).with_label("bird", 0.9),
                    square_at(300, 300).with_label("cat", 0.9),
                    square_at(500, 100).with_label("bird", 0.2),
                    RawDetection::new(0, 0, 10, 10).with_label("bird", 0.9),
                ],
            )
            .unwrap();
        assert_eq!(report.rejected, 3);
        assert_eq!(report.occupancy, 1);
        assert_eq!(session.history().as_slice(), &[Center::new(100, 100)]);
    }

    #[test]
    fn history_length_tracks_alert_count() {
        let mut session = Session::new(
            LabelGate::default(),
            DetectionFilter::default(),
            SpatialDeduplicator::default(),
            AlertController::new(3).unwrap(),
        );
        let mut signals = Vec::new();
        for i in 0..7 {
            let report = session
                .process_frame(i, &[square_at(60 + i as i32 * 70, 200)])
                .unwrap();
            signals.extend(report.new_objects.iter().map(|o| o.signal));
            assert_eq!(session.history().len() as u64, session.unique_count());
        }
        assert_eq!(session.alerts_fired(), 2);
        assert_eq!(signals[2], AlertSignal::On);
        assert_eq!(signals[5], AlertSignal::On);
        assert_eq!(signals.iter().filter(|s| **s == AlertSignal::On).count(), 2);
    }

    #[test]
    fn stop_handle_is_shared() {
        let handle = StopHandle::new();
        let clone = handle.clone();
        assert!(!handle.is_stop_requested());
        clone.request_stop();
        assert!(handle.is_stop_requested());
    }
}
