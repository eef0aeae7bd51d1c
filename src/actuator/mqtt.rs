//! MQTT actuator: publishes each signal as `1`/`0` to a topic.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use rumqttc::v5::{mqttbytes::QoS, Client, Connection, Event, MqttOptions};
use rumqttc::Transport;

use super::Actuator;
use crate::alert::AlertSignal;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MqttEndpoint {
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
}

const MQTT_PORT: u16 = 1883;
const MQTTS_PORT: u16 = 8883;

/// Broker address: `host[:port]`, optionally prefixed with `mqtt://` or
/// `mqtts://`. IPv6 hosts go in brackets. The port defaults to 1883, or
/// 8883 over TLS.
pub fn parse_mqtt_endpoint(addr: &str) -> Result<MqttEndpoint> {
    let addr = addr.trim();
    let (use_tls, authority) = match addr.split_once("://") {
        None => (false, addr),
        Some(("mqtt", rest)) => (false, rest),
        Some(("mqtts", rest)) => (true, rest),
        Some((scheme, _)) => {
            return Err(anyhow!("unsupported MQTT scheme {scheme:?} in {addr}"));
        }
    };

    let (host, port) = match authority.strip_prefix('[') {
        Some(bracketed) => {
            let (host, tail) = bracketed
                .split_once(']')
                .ok_or_else(|| anyhow!("unclosed '[' in MQTT address {addr}"))?;
            let port = match tail {
                "" => None,
                tail => Some(
                    tail.strip_prefix(':')
                        .ok_or_else(|| anyhow!("unexpected {tail:?} after host in {addr}"))?,
                ),
            };
            (host, port)
        }
        None => match authority.split_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (authority, None),
        },
    };

    if host.is_empty() || host.contains('/') {
        return Err(anyhow!("invalid MQTT host in {addr}"));
    }
    let port = match port {
        Some(port) => match port.parse::<u16>() {
            Ok(port) if port > 0 => port,
            _ => return Err(anyhow!("invalid MQTT port {port:?} in {addr}")),
        },
        None if use_tls => MQTTS_PORT,
        None => MQTT_PORT,
    };
    Ok(MqttEndpoint {
        host: host.to_string(),
        port,
        use_tls,
    })
}

pub struct MqttActuator {
    client: Client,
    topic: String,
    connection_handle: Option<std::thread::JoinHandle<()>>,
}

impl MqttActuator {
    pub fn connect(endpoint: &MqttEndpoint, client_id: &str, topic: &str) -> Result<Self> {
        let mut options = MqttOptions::new(client_id, &endpoint.host, endpoint.port);
        options.set_keep_alive(Duration::from_secs(60));
        options.set_clean_start(true);
        options.set_transport(if endpoint.use_tls {
            Transport::tls_with_default_config()
        } else {
            Transport::tcp()
        });

        let (client, connection) = Client::new(options, 10);
        let handle = spawn_event_loop(connection);
        log::info!(
            "MQTT actuator publishing to {} via {}:{} (TLS: {})",
            topic,
            endpoint.host,
            endpoint.port,
            endpoint.use_tls
        );
        Ok(Self {
            client,
            topic: topic.to_string(),
            connection_handle: Some(handle),
        })
    }
}

fn spawn_event_loop(mut connection: Connection) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        for event in connection.iter() {
            match event {
                Ok(Event::Incoming(_)) | Ok(Event::Outgoing(_)) => {}
                Err(e) => {
                    log::warn!("MQTT connection error: {}", e);
                    break;
                }
            }
        }
    })
}

impl Actuator for MqttActuator {
    fn name(&self) -> &'static str {
        "mqtt"
    }

    fn send(&mut self, signal: AlertSignal) -> Result<()> {
        self.client
            .publish(
                self.topic.as_str(),
                QoS::AtLeastOnce,
                false,
                vec![signal.as_byte()],
            )
            .with_context(|| format!("MQTT publish to {} failed", self.topic))?;
        Ok(())
    }
}

impl Drop for MqttActuator {
    fn drop(&mut self) {
        if let Err(e) = self.client.disconnect() {
            log::debug!("MQTT disconnect: {}", e);
        }
        if let Some(handle) = self.connection_handle.take() {
            let _ = handle.join();
        }
    }
}
