//! Terminal progress for the CLI.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

use crate::observe::Observer;
use crate::session::{FrameReport, SessionSummary};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UiMode {
    Auto,
    Plain,
    Pretty,
}

#[derive(Clone, Debug)]
pub struct Ui {
    mode: UiMode,
    is_tty: bool,
}

impl Ui {
    pub fn new(mode: UiMode, is_tty: bool) -> Self {
        Self { mode, is_tty }
    }

    pub fn from_flag(ui_flag: Option<&str>, is_tty: bool) -> Self {
        let mode = match ui_flag {
            Some("plain") => UiMode::Plain,
            Some("pretty") => UiMode::Pretty,
            _ => UiMode::Auto,
        };
        Self::new(mode, is_tty)
    }

    fn use_pretty(&self) -> bool {
        self.is_tty && self.mode != UiMode::Plain
    }

    pub fn stage(&self, name: &str) -> StageGuard {
        if self.use_pretty() {
            let spinner = spinner();
            spinner.set_message(format!("{name}…"));
            StageGuard::new(name.to_string(), Some(spinner))
        } else {
            eprintln!("==> {}", name);
            StageGuard::new(name.to_string(), None)
        }
    }

    /// Wrap an observer with a live frame/unique counter when pretty output
    /// is enabled.
    pub fn session_progress<O: Observer>(&self, inner: O) -> SessionProgress<O> {
        let bar = self.use_pretty().then(spinner);
        SessionProgress { inner, bar }
    }
}

fn spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_draw_target(ProgressDrawTarget::stderr());
    spinner.enable_steady_tick(Duration::from_millis(120));
    let style = ProgressStyle::with_template("{spinner} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner
}

pub struct StageGuard {
    name: String,
    start: Instant,
    spinner: Option<ProgressBar>,
}

impl StageGuard {
    fn new(name: String, spinner: Option<ProgressBar>) -> Self {
        Self {
            name,
            start: Instant::now(),
            spinner,
        }
    }
}

impl Drop for StageGuard {
    fn drop(&mut self) {
        let message = format!("✔ {} ({})", self.name, format_duration(self.start.elapsed()));
        if let Some(spinner) = &self.spinner {
            spinner.finish_with_message(message);
        } else {
            eprintln!("{message}");
        }
    }
}

pub struct SessionProgress<O> {
    inner: O,
    bar: Option<ProgressBar>,
}

impl<O: Observer> Observer for SessionProgress<O> {
    fn on_frame(&mut self, report: &FrameReport, unique_count: u64) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!(
                "frame {} · in frame {} · unique {}",
                report.frame_index, report.occupancy, unique_count
            ));
        }
        self.inner.on_frame(report, unique_count);
    }

    fn on_session_end(&mut self, summary: &SessionSummary) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
        self.inner.on_session_end(summary);
    }
}

fn format_duration(duration: Duration) -> String {
    if duration.as_secs() >= 1 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::NullObserver;

    #[test]
    fn plain_mode_never_draws() {
        let ui = Ui::from_flag(Some("plain"), true);
        assert!(!ui.use_pretty());
        let progress = ui.session_progress(NullObserver);
        assert!(progress.bar.is_none());
    }

    #[test]
    fn non_tty_falls_back_to_plain() {
        assert!(!Ui::from_flag(Some("pretty"), false).use_pretty());
        assert!(Ui::from_flag(None, true).use_pretty());
    }

    #[test]
    fn formats_short_and_long_durations() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    }
}
