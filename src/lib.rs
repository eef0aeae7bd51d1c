//! flockwatch
//!
//! Counts distinct objects across a video stream from noisy per-frame
//! detections, and signals an actuator each time the count crosses a
//! multiple of the alert interval.
//!
//! # Pipeline
//!
//! For every frame pulled from a [`FrameSource`]:
//!
//! 1. A [`Detector`] reports raw boxes.
//! 2. The [`LabelGate`] and [`DetectionFilter`] drop boxes with the wrong
//!    class, low confidence or implausible geometry.
//! 3. The [`SpatialDeduplicator`] matches each remaining center against the
//!    session's [`CenterHistory`]; a center strictly closer than the
//!    threshold to any known center is a re-detection.
//! 4. Each new center is committed to history and counted by the
//!    [`AlertController`], whose decision is forwarded to the [`Actuator`].
//!
//! # Module Structure
//!
//! - `detect`: raw detections, admission policy, detector backends
//! - `dedup`: center history and nearest-neighbour matching
//! - `alert`: unique count and alert cadence
//! - `session`: per-run state, lifecycle and the frame loop
//! - `ingest`: trace-file and synthetic frame sources
//! - `actuator`: serial, MQTT and logging signal sinks
//! - `observe`: occupancy and count reporting
//! - `config`: file + environment configuration

pub mod actuator;
pub mod alert;
pub mod config;
pub mod dedup;
pub mod detect;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod observe;
pub mod session;
pub mod ui;

pub use actuator::{Actuator, LogActuator, MqttActuator, RecordingActuator, SerialActuator};
pub use alert::{AlertController, AlertSignal, DEFAULT_ALERT_INTERVAL};
pub use config::FlockwatchConfig;
pub use dedup::{CenterHistory, Classification, SpatialDeduplicator, DEFAULT_DISTANCE_THRESHOLD};
pub use detect::{
    count_labels, Center, DetectionFilter, Detector, LabelGate, LabelPredicate, RawDetection,
    ReplayDetector,
};
pub use error::ConfigError;
pub use frame::Frame;
pub use ingest::{open_source, FrameSource, SourceSettings, SyntheticSource, TraceSource};
pub use observe::{LogObserver, NullObserver, Observer};
pub use session::{
    FrameReport, NewObject, Session, SessionLoop, SessionState, SessionSummary, StopHandle,
    StopReason,
};
