//! Serial-attached microcontroller.
//!
//! The port is opened once at the configured line speed (9600 baud unless
//! overridden); each signal is one byte, `b'1'` for alert-on and `b'0'`
//! for alert-off.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serialport::SerialPort;

use super::Actuator;
use crate::alert::AlertSignal;

/// Boards that reset on open need a moment before they read input.
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(2);
pub const DEFAULT_BAUD: u32 = 9600;
const WRITE_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Clone, Debug)]
pub struct SerialConfig {
    pub device: PathBuf,
    pub baud: u32,
    pub settle: Duration,
}

impl SerialConfig {
    pub fn new(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
            baud: DEFAULT_BAUD,
            settle: DEFAULT_SETTLE,
        }
    }
}

/// Writes alert bytes to `P`, a serial port in production.
pub struct SerialActuator<P = Box<dyn SerialPort>> {
    device: String,
    port: P,
    bytes_written: u64,
}

impl SerialActuator {
    pub fn open(config: SerialConfig) -> Result<Self> {
        let device = config.device.to_string_lossy().into_owned();
        let port = serialport::new(device.as_str(), config.baud)
            .timeout(WRITE_TIMEOUT)
            .open()
            .with_context(|| format!("failed to open serial device {device}"))?;
        if !config.settle.is_zero() {
            std::thread::sleep(config.settle);
        }
        log::info!("serial actuator ready on {} at {} baud", device, config.baud);
        Ok(Self::with_port(device, port))
    }
}

impl<P: Write> SerialActuator<P> {
    /// Wrap an already-open writer, named `device` in logs and errors.
    pub fn with_port(device: impl Into<String>, port: P) -> Self {
        Self {
            device: device.into(),
            port,
            bytes_written: 0,
        }
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn port(&self) -> &P {
        &self.port
    }
}

impl<P: Write> Actuator for SerialActuator<P> {
    fn name(&self) -> &'static str {
        "serial"
    }

    fn send(&mut self, signal: AlertSignal) -> Result<()> {
        self.port
            .write_all(&[signal.as_byte()])
            .and_then(|()| self.port.flush())
            .with_context(|| format!("serial write to {} failed", self.device))?;
        self.bytes_written += 1;
        Ok(())
    }
}
