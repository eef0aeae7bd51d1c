//! Recorded detector output, one JSON document per line.
//!
//! Each non-blank line is one frame, either an object
//! `{"detections": [...], "width": 640, "height": 480}` or a bare array of
//! detections. Box fields follow [`RawDetection`].

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use super::{FrameSource, SourceStats};
use crate::detect::RawDetection;
use crate::frame::Frame;

const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;

#[derive(Clone, Debug)]
pub struct TraceConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TraceRecord {
    Frame {
        detections: Vec<RawDetection>,
        #[serde(default)]
        width: Option<u32>,
        #[serde(default)]
        height: Option<u32>,
    },
    Bare(Vec<RawDetection>),
}

pub struct TraceSource {
    config: TraceConfig,
    lines: Option<Lines<BufReader<File>>>,
    line_no: u64,
    stats: SourceStats,
}

impl TraceSource {
    pub fn new(config: TraceConfig) -> Result<Self> {
        if config.path.as_os_str().is_empty() {
            return Err(anyhow!("trace path must not be empty"));
        }
        Ok(Self {
            config,
            lines: None,
            line_no: 0,
            stats: SourceStats::default(),
        })
    }

    fn parse_line(&self, line: &str) -> Result<Frame> {
        let record: TraceRecord = serde_json::from_str(line).with_context(|| {
            format!(
                "invalid trace record at {}:{}",
                self.config.path.display(),
                self.line_no
            )
        })?;
        let index = self.stats.frames_emitted;
        let frame = match record {
            TraceRecord::Frame {
                detections,
                width,
                height,
            } => Frame::with_detections(
                index,
                width.unwrap_or(DEFAULT_WIDTH),
                height.unwrap_or(DEFAULT_HEIGHT),
                detections,
            ),
            TraceRecord::Bare(detections) => {
                Frame::with_detections(index, DEFAULT_WIDTH, DEFAULT_HEIGHT, detections)
            }
        };
        Ok(frame)
    }
}

impl FrameSource for TraceSource {
    fn describe(&self) -> String {
        format!("trace:{}", self.config.path.display())
    }

    fn connect(&mut self) -> Result<()> {
        let file = File::open(&self.config.path)
            .with_context(|| format!("failed to open trace {}", self.config.path.display()))?;
        self.lines = Some(BufReader::new(file).lines());
        log::info!("TraceSource: opened {}", self.config.path.display());
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.stats.exhausted {
            return Ok(None);
        }
        if self.lines.is_none() {
            self.connect()?;
        }
        loop {
            let next = match self.lines.as_mut() {
                Some(lines) => lines.next(),
                None => None,
            };
            let Some(line) = next else {
                self.stats.exhausted = true;
                return Ok(None);
            };
            self.line_no += 1;
            let line = line.with_context(|| {
                format!("failed to read trace {}", self.config.path.display())
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let frame = self.parse_line(line.trim())?;
            self.stats.frames_emitted += 1;
            return Ok(Some(frame));
        }
    }

    fn stats(&self) -> SourceStats {
        self.stats.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn trace_with(contents: &str) -> (NamedTempFile, TraceSource) {
        let mut file = NamedTempFile::new().expect("temp trace");
        file.write_all(contents.as_bytes()).expect("write trace");
        let source = TraceSource::new(TraceConfig {
            path: file.path().to_path_buf(),
        })
        .expect("trace source");
        (file, source)
    }

    #[test]
    fn reads_frames_until_exhausted() -> Result<()> {
        let (_file, mut source) = trace_with(
            r#"{"detections":[{"x":80,"y":80,"w":40,"h":40,"confidence":0.9,"label":"bird"}]}

[{"x":480,"y":480,"w":40,"h":40}]
{"detections":[],"width":1280,"height":720}
"#,
        );
        source.connect()?;

        let first = source.next_frame()?.expect("first frame");
        assert_eq!(first.index, 0);
        assert_eq!(first.recorded_detections().unwrap()[0].label, "bird");

        let second = source.next_frame()?.expect("second frame");
        assert_eq!(second.index, 1);
        assert_eq!(second.recorded_detections().unwrap()[0].x, 480);

        let third = source.next_frame()?.expect("third frame");
        assert_eq!(third.width, 1280);
        assert!(third.recorded_detections().unwrap().is_empty());

        assert!(source.next_frame()?.is_none());
        assert!(source.next_frame()?.is_none());
        assert_eq!(
            source.stats(),
            SourceStats {
                frames_emitted: 3,
                exhausted: true
            }
        );
        Ok(())
    }

    #[test]
    fn malformed_line_reports_position() {
        let (_file, mut source) = trace_with("[]\n{not json}\n");
        assert!(source.next_frame().unwrap().is_some());
        let err = source.next_frame().unwrap_err();
        assert!(format!("{:#}", err).contains(":2"));
    }

    #[test]
    fn missing_file_fails_on_connect() {
        let mut source = TraceSource::new(TraceConfig {
            path: PathBuf::from("/nonexistent/flockwatch/trace.jsonl"),
        })
        .unwrap();
        assert!(source.connect().is_err());
    }
}
