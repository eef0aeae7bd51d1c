//! Frame ingestion sources.
//!
//! - Trace files: JSON lines of recorded detector output, one line per frame
//! - Synthetic source (`stub://...`): seeded generator for demos and tests
//!
//! A source yields frames until it is exhausted (`Ok(None)`). Exhaustion is
//! the normal way a session ends; errors are reserved for unreadable input.

mod synthetic;
mod trace;

use anyhow::{anyhow, Result};

use crate::frame::Frame;

pub use synthetic::{SyntheticConfig, SyntheticSource};
pub use trace::{TraceConfig, TraceSource};

/// Pull-based frame producer.
pub trait FrameSource {
    /// Human-readable origin, for logs.
    fn describe(&self) -> String;

    /// Prepare the source. Called once before the first frame.
    fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    /// Next frame, or `None` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    fn stats(&self) -> SourceStats;
}

/// Running statistics for a source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceStats {
    pub frames_emitted: u64,
    pub exhausted: bool,
}

/// Settings shared by every source kind.
#[derive(Clone, Debug)]
pub struct SourceSettings {
    /// `stub://<name>` or a local trace file path.
    pub uri: String,
    /// Pacing for the synthetic source; trace files replay unpaced.
    pub target_fps: Option<u32>,
    /// Frames emitted by the synthetic source.
    pub synthetic_frames: u64,
    pub seed: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            uri: "stub://flock".to_string(),
            target_fps: None,
            synthetic_frames: synthetic::DEFAULT_FRAMES,
            seed: 0,
        }
    }
}

/// Open the source named by `settings.uri`.
pub fn open_source(settings: &SourceSettings) -> Result<Box<dyn FrameSource>> {
    let uri = settings.uri.trim();
    if uri.is_empty() {
        return Err(anyhow!("frame source must not be empty"));
    }
    if let Some(name) = uri.strip_prefix("stub://") {
        let config = SyntheticConfig {
            name: name.to_string(),
            frames: settings.synthetic_frames,
            seed: settings.seed,
            target_fps: settings.target_fps,
            ..SyntheticConfig::default()
        };
        return Ok(Box::new(SyntheticSource::new(config)));
    }
    if uri.contains("://") {
        return Err(anyhow!(
            "unsupported frame source {} (expected stub://<name> or a local trace file)",
            uri
        ));
    }
    Ok(Box::new(TraceSource::new(TraceConfig {
        path: uri.into(),
    })?))
}
