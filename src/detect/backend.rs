use anyhow::Result;

use crate::detect::result::RawDetection;
use crate::frame::Frame;

/// Detector backend trait.
///
/// A detector turns one frame into zero or more raw boxes. The session never
/// relies on state kept between calls; each frame is evaluated on its own.
pub trait Detector: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    ///
    /// An error here costs the frame its detections but does not end the
    /// session.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<RawDetection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
