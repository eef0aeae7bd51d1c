mod backend;
mod backends;
mod filter;
mod result;

pub use backend::Detector;
pub use backends::ReplayDetector;
pub use filter::{
    count_labels, DetectionFilter, FilterVerdict, LabelGate, LabelPredicate, RejectReason,
    DEFAULT_MAX_ASPECT, DEFAULT_MIN_AREA, DEFAULT_MIN_ASPECT,
};
pub use result::{Center, RawDetection};
