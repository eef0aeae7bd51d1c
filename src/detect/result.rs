use serde::{Deserialize, Serialize};

/// One raw box reported by a detector for a single frame.
///
/// Coordinates are integer pixels: `(x, y)` is the top-left corner.
/// Nothing here is validated; degenerate boxes are rejected later by
/// [`DetectionFilter`](crate::detect::DetectionFilter).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
    #[serde(default = "full_confidence")]
    pub confidence: f32,
    #[serde(default)]
    pub label: String,
}

fn full_confidence() -> f32 {
    1.0
}

impl RawDetection {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self {
            x,
            y,
            w,
            h,
            confidence: 1.0,
            label: String::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>, confidence: f32) -> Self {
        self.label = label.into();
        self.confidence = confidence;
        self
    }

    /// Box area in square pixels.
    pub fn area(&self) -> i64 {
        i64::from(self.w) * i64::from(self.h)
    }

    /// Width over height, defined as 0 when the height is 0.
    pub fn aspect_ratio(&self) -> f64 {
        if self.h == 0 {
            0.0
        } else {
            f64::from(self.w) / f64::from(self.h)
        }
    }

    /// Pixel midpoint, using floor division on the half extents.
    pub fn center(&self) -> Center {
        Center {
            x: self.x.saturating_add(self.w.div_euclid(2)),
            y: self.y.saturating_add(self.h.div_euclid(2)),
        }
    }
}

/// Integer pixel midpoint of a detection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Center {
    pub x: i32,
    pub y: i32,
}

impl Center {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in pixels.
    pub fn distance_to(&self, other: &Center) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        dx.hypot(dy)
    }
}
