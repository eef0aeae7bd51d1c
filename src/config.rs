use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::actuator::{
    parse_mqtt_endpoint, Actuator, LogActuator, MqttActuator, SerialActuator, SerialConfig,
    DEFAULT_BAUD,
};
use crate::alert::{AlertController, DEFAULT_ALERT_INTERVAL};
use crate::dedup::{SpatialDeduplicator, DEFAULT_DISTANCE_THRESHOLD};
use crate::detect::{
    DetectionFilter, LabelGate, LabelPredicate, DEFAULT_MAX_ASPECT, DEFAULT_MIN_AREA,
    DEFAULT_MIN_ASPECT,
};
use crate::error::ConfigError;
use crate::ingest::SourceSettings;
use crate::observe::{LogObserver, DEFAULT_CROWDED_FRAME_THRESHOLD, DEFAULT_HEALTH_INTERVAL};
use crate::session::Session;

const DEFAULT_MQTT_TOPIC: &str = "flockwatch/alert";
const DEFAULT_MQTT_CLIENT_ID: &str = "flockwatch";
const DEFAULT_SERIAL_SETTLE_MS: u64 = 2000;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct FlockwatchConfigFile {
    source: Option<SourceConfigFile>,
    filter: Option<FilterConfigFile>,
    dedup: Option<DedupConfigFile>,
    alert: Option<AlertConfigFile>,
    actuator: Option<ActuatorConfigFile>,
    observe: Option<ObserveConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SourceConfigFile {
    uri: Option<String>,
    target_fps: Option<u32>,
    frames: Option<u64>,
    seed: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct FilterConfigFile {
    min_area: Option<f64>,
    min_aspect: Option<f64>,
    max_aspect: Option<f64>,
    min_confidence: Option<f32>,
    labels: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct DedupConfigFile {
    distance_threshold: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct AlertConfigFile {
    interval: Option<i64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ActuatorConfigFile {
    kind: Option<ActuatorKind>,
    serial_device: Option<PathBuf>,
    serial_baud: Option<u32>,
    serial_settle_ms: Option<u64>,
    mqtt_broker: Option<String>,
    mqtt_topic: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ObserveConfigFile {
    crowded_frame_threshold: Option<usize>,
    health_interval_secs: Option<u64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActuatorKind {
    #[default]
    Log,
    Serial,
    Mqtt,
}

impl FromStr for ActuatorKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" => Ok(ActuatorKind::Log),
            "serial" => Ok(ActuatorKind::Serial),
            "mqtt" => Ok(ActuatorKind::Mqtt),
            other => Err(anyhow!(
                "unknown actuator kind {} (expected log, serial or mqtt)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FlockwatchConfig {
    pub source: SourceSettings,
    pub filter: FilterSettings,
    pub distance_threshold: f64,
    pub alert_interval: i64,
    pub actuator: ActuatorSettings,
    pub observe: ObserveSettings,
}

#[derive(Debug, Clone)]
pub struct FilterSettings {
    pub min_area: f64,
    pub min_aspect: f64,
    pub max_aspect: f64,
    pub min_confidence: f32,
    /// Empty accepts every label.
    pub labels: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ActuatorSettings {
    pub kind: ActuatorKind,
    pub serial_device: Option<PathBuf>,
    /// Line speed of the serial port.
    pub serial_baud: u32,
    pub serial_settle: Duration,
    pub mqtt_broker: Option<String>,
    pub mqtt_topic: String,
}

#[derive(Debug, Clone)]
pub struct ObserveSettings {
    pub crowded_frame_threshold: usize,
    pub health_interval: Duration,
}

impl FlockwatchConfig {
    /// Load from `$FLOCKWATCH_CONFIG` (if set), then apply environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("FLOCKWATCH_CONFIG").ok();
        Self::load_from(config_path.as_deref().map(Path::new))
    }

    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let cfg = Self::load_layers(path)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// File and environment layers without validation. Callers that apply
    /// further overrides (command-line flags) must call [`Self::validate`].
    pub fn load_layers(path: Option<&Path>) -> Result<Self> {
        let file_cfg = match path {
            Some(path) => Some(read_config_file(path)?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        Ok(cfg)
    }

    fn from_file(file: FlockwatchConfigFile) -> Self {
        let source_file = file.source.unwrap_or_default();
        let source_defaults = SourceSettings::default();
        let source = SourceSettings {
            uri: source_file.uri.unwrap_or(source_defaults.uri),
            target_fps: source_file.target_fps,
            synthetic_frames: source_file
                .frames
                .unwrap_or(source_defaults.synthetic_frames),
            seed: source_file.seed.unwrap_or(source_defaults.seed),
        };

        let filter_file = file.filter.unwrap_or_default();
        let filter = FilterSettings {
            min_area: filter_file.min_area.unwrap_or(DEFAULT_MIN_AREA),
            min_aspect: filter_file.min_aspect.unwrap_or(DEFAULT_MIN_ASPECT),
            max_aspect: filter_file.max_aspect.unwrap_or(DEFAULT_MAX_ASPECT),
            min_confidence: filter_file.min_confidence.unwrap_or(0.0),
            labels: filter_file.labels.unwrap_or_default(),
        };

        let actuator_file = file.actuator.unwrap_or_default();
        let actuator = ActuatorSettings {
            kind: actuator_file.kind.unwrap_or_default(),
            serial_device: actuator_file.serial_device,
            serial_baud: actuator_file.serial_baud.unwrap_or(DEFAULT_BAUD),
            serial_settle: Duration::from_millis(
                actuator_file
                    .serial_settle_ms
                    .unwrap_or(DEFAULT_SERIAL_SETTLE_MS),
            ),
            mqtt_broker: actuator_file.mqtt_broker,
            mqtt_topic: actuator_file
                .mqtt_topic
                .unwrap_or_else(|| DEFAULT_MQTT_TOPIC.to_string()),
        };

        let observe_file = file.observe.unwrap_or_default();
        let observe = ObserveSettings {
            crowded_frame_threshold: observe_file
                .crowded_frame_threshold
                .unwrap_or(DEFAULT_CROWDED_FRAME_THRESHOLD),
            health_interval: observe_file
                .health_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_HEALTH_INTERVAL),
        };

        Self {
            source,
            filter,
            distance_threshold: file
                .dedup
                .and_then(|dedup| dedup.distance_threshold)
                .unwrap_or(DEFAULT_DISTANCE_THRESHOLD),
            alert_interval: file
                .alert
                .and_then(|alert| alert.interval)
                .unwrap_or(DEFAULT_ALERT_INTERVAL as i64),
            actuator,
            observe,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(uri) = std::env::var("FLOCKWATCH_SOURCE") {
            if !uri.trim().is_empty() {
                self.source.uri = uri;
            }
        }
        if let Ok(interval) = std::env::var("FLOCKWATCH_ALERT_INTERVAL") {
            self.alert_interval = interval
                .trim()
                .parse()
                .map_err(|_| anyhow!("FLOCKWATCH_ALERT_INTERVAL must be an integer"))?;
        }
        if let Ok(threshold) = std::env::var("FLOCKWATCH_DISTANCE_THRESHOLD") {
            self.distance_threshold = threshold
                .trim()
                .parse()
                .map_err(|_| anyhow!("FLOCKWATCH_DISTANCE_THRESHOLD must be a number"))?;
        }
        if let Ok(labels) = std::env::var("FLOCKWATCH_LABELS") {
            let parsed = split_csv(&labels);
            if !parsed.is_empty() {
                self.filter.labels = parsed;
            }
        }
        if let Ok(kind) = std::env::var("FLOCKWATCH_ACTUATOR") {
            if !kind.trim().is_empty() {
                self.actuator.kind = kind.parse()?;
            }
        }
        if let Ok(device) = std::env::var("FLOCKWATCH_SERIAL_DEVICE") {
            if !device.trim().is_empty() {
                self.actuator.serial_device = Some(PathBuf::from(device));
            }
        }
        if let Ok(broker) = std::env::var("FLOCKWATCH_MQTT_BROKER") {
            if !broker.trim().is_empty() {
                self.actuator.mqtt_broker = Some(broker);
            }
        }
        Ok(())
    }

    /// Check every setting, building the session parts once to surface
    /// their construction errors.
    pub fn validate(&self) -> Result<()> {
        self.build_session()?;
        if self.source.target_fps == Some(0) {
            return Err(anyhow!("source target_fps must be >= 1"));
        }
        match self.actuator.kind {
            ActuatorKind::Log => {}
            ActuatorKind::Serial => {
                if self.actuator.serial_device.is_none() {
                    return Err(anyhow!("serial actuator requires a serial_device path"));
                }
                if self.actuator.serial_baud == 0 {
                    return Err(anyhow!("serial_baud must be >= 1"));
                }
            }
            ActuatorKind::Mqtt => {
                let broker = self
                    .actuator
                    .mqtt_broker
                    .as_deref()
                    .ok_or_else(|| anyhow!("mqtt actuator requires mqtt_broker"))?;
                parse_mqtt_endpoint(broker)?;
                if self.actuator.mqtt_topic.trim().is_empty() {
                    return Err(anyhow!("mqtt actuator requires a non-empty mqtt_topic"));
                }
            }
        }
        Ok(())
    }

    pub fn label_gate(&self) -> Result<LabelGate, ConfigError> {
        LabelGate::new(
            LabelPredicate::allowlist(self.filter.labels.iter().cloned()),
            self.filter.min_confidence,
        )
    }

    /// Fresh session with this configuration's policy.
    pub fn build_session(&self) -> Result<Session, ConfigError> {
        let gate = self.label_gate()?;
        let filter = DetectionFilter::new(
            self.filter.min_area,
            self.filter.min_aspect,
            self.filter.max_aspect,
        )?;
        let dedup = SpatialDeduplicator::new(self.distance_threshold)?;
        let alerts = AlertController::new(self.alert_interval)?;
        Ok(Session::new(gate, filter, dedup, alerts))
    }

    pub fn build_actuator(&self) -> Result<Box<dyn Actuator>> {
        match self.actuator.kind {
            ActuatorKind::Log => Ok(Box::new(LogActuator::new())),
            ActuatorKind::Serial => {
                let device = self
                    .actuator
                    .serial_device
                    .clone()
                    .ok_or_else(|| anyhow!("serial actuator requires a serial_device path"))?;
                let actuator = SerialActuator::open(SerialConfig {
                    device,
                    baud: self.actuator.serial_baud,
                    settle: self.actuator.serial_settle,
                })?;
                Ok(Box::new(actuator))
            }
            ActuatorKind::Mqtt => {
                let broker = self
                    .actuator
                    .mqtt_broker
                    .as_deref()
                    .ok_or_else(|| anyhow!("mqtt actuator requires mqtt_broker"))?;
                let endpoint = parse_mqtt_endpoint(broker)?;
                let actuator = MqttActuator::connect(
                    &endpoint,
                    DEFAULT_MQTT_CLIENT_ID,
                    &self.actuator.mqtt_topic,
                )?;
                Ok(Box::new(actuator))
            }
        }
    }

    pub fn build_observer(&self) -> LogObserver {
        LogObserver::new(
            self.observe.crowded_frame_threshold,
            self.observe.health_interval,
        )
    }
}

fn read_config_file(path: &Path) -> Result<FlockwatchConfigFile> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg: FlockwatchConfigFile = if is_toml {
        toml::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}
