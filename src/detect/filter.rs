//! Per-frame admission policy.
//!
//! Two independent checks run before spatial matching:
//! - [`LabelGate`]: class label predicate and confidence floor.
//! - [`DetectionFilter`]: box geometry (area and aspect ratio).

use std::fmt;
use std::sync::Arc;

use crate::detect::result::RawDetection;
use crate::error::ConfigError;

pub const DEFAULT_MIN_AREA: f64 = 1000.0;
pub const DEFAULT_MIN_ASPECT: f64 = 0.5;
pub const DEFAULT_MAX_ASPECT: f64 = 2.0;

/// Why a box failed the geometry check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// Non-positive width or height.
    Degenerate,
    TooSmall,
    AspectOutOfRange,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterVerdict {
    Accepted,
    Rejected(RejectReason),
}

impl FilterVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, FilterVerdict::Accepted)
    }
}

/// Rejects boxes whose geometry cannot plausibly be a target object.
///
/// Accepts iff `area >= min_area` and `min_aspect <= w/h <= max_aspect`.
/// Confidence and label are ignored here.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionFilter {
    min_area: f64,
    min_aspect: f64,
    max_aspect: f64,
}

impl DetectionFilter {
    pub fn new(min_area: f64, min_aspect: f64, max_aspect: f64) -> Result<Self, ConfigError> {
        if !min_area.is_finite() || min_area < 0.0 {
            return Err(ConfigError::InvalidMinArea(min_area));
        }
        if !min_aspect.is_finite()
            || !max_aspect.is_finite()
            || min_aspect < 0.0
            || min_aspect > max_aspect
        {
            return Err(ConfigError::InvalidAspectBounds {
                min: min_aspect,
                max: max_aspect,
            });
        }
        Ok(Self {
            min_area,
            min_aspect,
            max_aspect,
        })
    }

    pub fn min_area(&self) -> f64 {
        self.min_area
    }

    pub fn aspect_bounds(&self) -> (f64, f64) {
        (self.min_aspect, self.max_aspect)
    }

    pub fn verdict(&self, det: &RawDetection) -> FilterVerdict {
        // Two negative extents would otherwise yield a positive area and ratio.
        if det.w <= 0 || det.h <= 0 {
            return FilterVerdict::Rejected(RejectReason::Degenerate);
        }
        if (det.area() as f64) < self.min_area {
            return FilterVerdict::Rejected(RejectReason::TooSmall);
        }
        let aspect = det.aspect_ratio();
        if aspect < self.min_aspect || aspect > self.max_aspect {
            return FilterVerdict::Rejected(RejectReason::AspectOutOfRange);
        }
        FilterVerdict::Accepted
    }

    pub fn accepts(&self, det: &RawDetection) -> bool {
        self.verdict(det).is_accepted()
    }
}

impl Default for DetectionFilter {
    fn default() -> Self {
        Self {
            min_area: DEFAULT_MIN_AREA,
            min_aspect: DEFAULT_MIN_ASPECT,
            max_aspect: DEFAULT_MAX_ASPECT,
        }
    }
}

/// Predicate over class labels, injected at session construction.
#[derive(Clone)]
pub struct LabelPredicate {
    matcher: Arc<dyn Fn(&str) -> bool + Send + Sync>,
    description: String,
}

impl LabelPredicate {
    /// Accept every label, including the empty one.
    pub fn any() -> Self {
        Self {
            matcher: Arc::new(|_: &str| true),
            description: "any".to_string(),
        }
    }

    /// Accept labels that exactly match one of `labels`.
    ///
    /// An empty allowlist accepts everything.
    pub fn allowlist<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Self::any();
        }
        let description = labels.join(",");
        Self {
            matcher: Arc::new(move |label: &str| {
                labels.iter().any(|allowed| allowed == label)
            }),
            description,
        }
    }

    pub fn from_fn<F>(description: impl Into<String>, f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            matcher: Arc::new(f),
            description: description.into(),
        }
    }

    pub fn matches(&self, label: &str) -> bool {
        (self.matcher)(label)
    }
}

impl Default for LabelPredicate {
    fn default() -> Self {
        Self::any()
    }
}

impl fmt::Debug for LabelPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LabelPredicate")
            .field(&self.description)
            .finish()
    }
}

/// Label predicate plus confidence floor.
#[derive(Clone, Debug, Default)]
pub struct LabelGate {
    predicate: LabelPredicate,
    min_confidence: f32,
}

impl LabelGate {
    pub fn new(predicate: LabelPredicate, min_confidence: f32) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&min_confidence) {
            return Err(ConfigError::InvalidConfidence(min_confidence));
        }
        Ok(Self {
            predicate,
            min_confidence,
        })
    }

    pub fn admits(&self, det: &RawDetection) -> bool {
        det.confidence >= self.min_confidence && self.predicate.matches(&det.label)
    }
}

/// Stateless count of gated detections in a single frame.
///
/// No geometry filter, no deduplication, no alerting.
pub fn count_labels(detections: &[RawDetection], gate: &LabelGate) -> usize {
    detections.iter().filter(|det| gate.admits(det)).count()
}
