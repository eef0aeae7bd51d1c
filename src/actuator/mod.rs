//! Alert actuators.
//!
//! The session forwards one [`AlertSignal`] per newly counted object. Delivery
//! is best effort: a failed `send` is logged and counted by the session, and
//! processing continues with the next detection.

mod mqtt;
mod serial;

use anyhow::Result;

use crate::alert::AlertSignal;

pub use mqtt::{parse_mqtt_endpoint, MqttActuator, MqttEndpoint};
pub use serial::{SerialActuator, SerialConfig, DEFAULT_BAUD};

pub trait Actuator {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    fn send(&mut self, signal: AlertSignal) -> Result<()>;
}

/// Logs signals instead of driving hardware.
#[derive(Default)]
pub struct LogActuator {
    sent: u64,
}

impl LogActuator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Actuator for LogActuator {
    fn name(&self) -> &'static str {
        "log"
    }

    fn send(&mut self, signal: AlertSignal) -> Result<()> {
        self.sent += 1;
        match signal {
            AlertSignal::On => log::info!("actuator: {} (signal #{})", signal, self.sent),
            AlertSignal::Off => log::debug!("actuator: {} (signal #{})", signal, self.sent),
        }
        Ok(())
    }
}

/// Keeps every forwarded signal in memory.
#[derive(Clone, Debug, Default)]
pub struct RecordingActuator {
    signals: Vec<AlertSignal>,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signals(&self) -> &[AlertSignal] {
        &self.signals
    }
}

impl Actuator for RecordingActuator {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn send(&mut self, signal: AlertSignal) -> Result<()> {
        self.signals.push(signal);
        Ok(())
    }
}

impl<A: Actuator + ?Sized> Actuator for Box<A> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn send(&mut self, signal: AlertSignal) -> Result<()> {
        (**self).send(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_actuator_keeps_order() {
        let mut actuator = RecordingActuator::new();
        actuator.send(AlertSignal::Off).unwrap();
        actuator.send(AlertSignal::On).unwrap();
        assert_eq!(actuator.signals(), &[AlertSignal::Off, AlertSignal::On]);
    }

    #[test]
    fn boxed_actuator_delegates() {
        let mut actuator: Box<dyn Actuator> = Box::new(LogActuator::new());
        assert_eq!(actuator.name(), "log");
        assert!(actuator.send(AlertSignal::On).is_ok());
    }
}
