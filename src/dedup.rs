//! Spatial deduplication of object centers.
//!
//! A center is a re-detection when it lies strictly closer than the distance
//! threshold to any center already in the session history. A center exactly
//! at the threshold counts as a new object.

use crate::detect::Center;
use crate::error::ConfigError;

pub const DEFAULT_DISTANCE_THRESHOLD: f64 = 50.0;

/// Append-only record of accepted object centers, in acceptance order.
///
/// Its length is the session's unique object count.
#[derive(Clone, Debug, Default)]
pub struct CenterHistory {
    centers: Vec<Center>,
}

impl CenterHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.centers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.centers.is_empty()
    }

    pub fn as_slice(&self) -> &[Center] {
        &self.centers
    }

    pub fn iter(&self) -> impl Iterator<Item = &Center> + '_ {
        self.centers.iter()
    }

    /// Only the session commits centers, so the history never drifts from
    /// the alert controller's count.
    pub(crate) fn commit(&mut self, center: Center) {
        self.centers.push(center);
    }
}

/// Outcome of matching a center against history.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Classification {
    New,
    Seen { nearest: Center, distance: f64 },
}

impl Classification {
    pub fn is_new(&self) -> bool {
        matches!(self, Classification::New)
    }
}

/// Nearest-neighbour matcher over [`CenterHistory`].
///
/// Linear scan per query; history stays in the hundreds for a single camera
/// session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpatialDeduplicator {
    threshold: f64,
}

impl SpatialDeduplicator {
    pub fn new(threshold: f64) -> Result<Self, ConfigError> {
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(ConfigError::InvalidDistanceThreshold(threshold));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Classify `center` against `history`. Never mutates; the caller commits
    /// new centers.
    pub fn classify(&self, center: Center, history: &CenterHistory) -> Classification {
        let nearest = history
            .iter()
            .map(|prev| (*prev, center.distance_to(prev)))
            .min_by(|a, b| a.1.total_cmp(&b.1));

        match nearest {
            Some((nearest, distance)) if distance < self.threshold => {
                Classification::Seen { nearest, distance }
            }
            _ => Classification::New,
        }
    }
}

impl Default for SpatialDeduplicator {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_DISTANCE_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn admit(dedup: &SpatialDeduplicator, history: &mut CenterHistory, center: Center) -> bool {
        let new = dedup.classify(center, history).is_new();
        if new {
            history.commit(center);
        }
        new
    }

    #[test]
    fn far_apart_centers_are_all_new_in_order() {
        let dedup = SpatialDeduplicator::default();
        let mut history = CenterHistory::new();
        let centers: Vec<Center> = (0..6).map(|i| Center::new(i * 60, i * 60)).collect();

        for (i, c) in centers.iter().enumerate() {
            assert!(admit(&dedup, &mut history, *c));
            assert_eq!(history.len(), i + 1);
        }
        assert_eq!(history.as_slice(), centers.as_slice());
    }

    #[test]
    fn near_duplicates_leave_history_unchanged() {
        let dedup = SpatialDeduplicator::default();
        let mut history = CenterHistory::new();
        assert!(admit(&dedup, &mut history, Center::new(100, 100)));

        for _ in 0..5 {
            // distance sqrt(34^2 + 35^2) ~= 48.8
            assert!(!admit(&dedup, &mut history, Center::new(134, 135)));
        }
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn exact_threshold_distance_is_new() {
        let dedup = SpatialDeduplicator::default();
        let mut history = CenterHistory::new();
        history.commit(Center::new(0, 0));

        assert_eq!(dedup.classify(Center::new(30, 40), &history), Classification::New);
        assert_eq!(dedup.classify(Center::new(50, 0), &history), Classification::New);
        assert!(!dedup.classify(Center::new(49, 0), &history).is_new());
    }

    #[test]
    fn seen_reports_nearest_center() {
        let dedup = SpatialDeduplicator::default();
        let mut history = CenterHistory::new();
        history.commit(Center::new(0, 0));
        history.commit(Center::new(100, 0));

        match dedup.classify(Center::new(90, 0), &history) {
            Classification::Seen { nearest, distance } => {
                assert_eq!(nearest, Center::new(100, 0));
                assert_eq!(distance, 10.0);
            }
            Classification::New => panic!("expected a match"),
        }
    }

    #[test]
    fn rejects_non_positive_threshold() {
        assert_eq!(
            SpatialDeduplicator::new(0.0),
            Err(ConfigError::InvalidDistanceThreshold(0.0))
        );
        assert!(SpatialDeduplicator::new(-5.0).is_err());
        assert!(SpatialDeduplicator::new(f64::INFINITY).is_err());
    }
}
