//! Periodic threshold alerts over the unique object count.

use std::fmt;

use crate::error::ConfigError;

pub const DEFAULT_ALERT_INTERVAL: u64 = 8;

/// Binary symbol forwarded to the actuator for every newly counted object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AlertSignal {
    On,
    Off,
}

impl AlertSignal {
    /// Single byte written to serial actuators.
    pub fn as_byte(self) -> u8 {
        match self {
            AlertSignal::On => b'1',
            AlertSignal::Off => b'0',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlertSignal::On => "alert-on",
            AlertSignal::Off => "alert-off",
        }
    }
}

impl From<bool> for AlertSignal {
    fn from(fire: bool) -> Self {
        if fire {
            AlertSignal::On
        } else {
            AlertSignal::Off
        }
    }
}

impl fmt::Display for AlertSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unique object count and alert cadence.
///
/// Invariant: `last_alerted_multiple <= count / interval`.
#[derive(Clone, Debug)]
pub struct AlertController {
    interval: u64,
    count: u64,
    last_alerted_multiple: u64,
}

impl AlertController {
    pub fn new(interval: i64) -> Result<Self, ConfigError> {
        if interval <= 0 {
            return Err(ConfigError::InvalidAlertInterval(interval));
        }
        Ok(Self {
            interval: interval as u64,
            count: 0,
            last_alerted_multiple: 0,
        })
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn last_alerted_multiple(&self) -> u64 {
        self.last_alerted_multiple
    }

    /// Count one more unique object. Returns the new count.
    pub fn record_new_object(&mut self) -> u64 {
        self.count += 1;
        self.count
    }

    /// True once per crossed multiple of the interval.
    pub fn should_alert(&mut self) -> bool {
        let multiple = self.count / self.interval;
        if multiple > self.last_alerted_multiple {
            self.last_alerted_multiple = multiple;
            true
        } else {
            false
        }
    }

    /// [`should_alert`](Self::should_alert) as the symbol to forward.
    pub fn decide(&mut self) -> AlertSignal {
        AlertSignal::from(self.should_alert())
    }
}

impl Default for AlertController {
    fn default() -> Self {
        Self {
            interval: DEFAULT_ALERT_INTERVAL,
            count: 0,
            last_alerted_multiple: 0,
        }
    }
}
