use std::sync::Mutex;

use tempfile::Builder;

use flockwatch::config::{ActuatorKind, FlockwatchConfig};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn clear_env() {
    for key in [
        "FLOCKWATCH_CONFIG",
        "FLOCKWATCH_SOURCE",
        "FLOCKWATCH_ALERT_INTERVAL",
        "FLOCKWATCH_DISTANCE_THRESHOLD",
        "FLOCKWATCH_LABELS",
        "FLOCKWATCH_ACTUATOR",
        "FLOCKWATCH_SERIAL_DEVICE",
        "FLOCKWATCH_MQTT_BROKER",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn loads_json_config_with_env_overrides() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new().suffix(".json").tempfile().expect("temp config");
    let json = r#"{
        "source": { "uri": "stub://yard", "frames": 120, "seed": 9 },
        "filter": { "min_area": 800, "labels": ["Dead_chicken", "Healthly"], "min_confidence": 0.5 },
        "dedup": { "distance_threshold": 40 },
        "alert": { "interval": 4 },
        "actuator": { "kind": "serial", "serial_device": "/dev/ttyUSB0", "serial_baud": 115200, "serial_settle_ms": 0 },
        "observe": { "crowded_frame_threshold": 5, "health_interval_secs": 30 }
    }"#;
    std::io::Write::write_all(&mut file, json.as_bytes()).expect("write config");

    std::env::set_var("FLOCKWATCH_CONFIG", file.path());
    std::env::set_var("FLOCKWATCH_ALERT_INTERVAL", "6");
    std::env::set_var("FLOCKWATCH_SERIAL_DEVICE", "/dev/ttyACM0");

    let cfg = FlockwatchConfig::load().expect("load config");

    assert_eq!(cfg.source.uri, "stub://yard");
    assert_eq!(cfg.source.synthetic_frames, 120);
    assert_eq!(cfg.source.seed, 9);
    assert_eq!(cfg.filter.min_area, 800.0);
    assert_eq!(cfg.filter.labels, vec!["Dead_chicken", "Healthly"]);
    assert_eq!(cfg.distance_threshold, 40.0);
    assert_eq!(cfg.alert_interval, 6);
    assert_eq!(cfg.actuator.kind, ActuatorKind::Serial);
    assert_eq!(
        cfg.actuator.serial_device.as_deref(),
        Some(std::path::Path::new("/dev/ttyACM0"))
    );
    assert_eq!(cfg.actuator.serial_baud, 115200);
    assert_eq!(cfg.actuator.serial_settle.as_millis(), 0);
    assert_eq!(cfg.observe.crowded_frame_threshold, 5);
    assert_eq!(cfg.observe.health_interval.as_secs(), 30);

    clear_env();
}

#[test]
fn loads_toml_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new().suffix(".toml").tempfile().expect("temp config");
    let toml = r#"
        [source]
        uri = "captures/run1.jsonl"

        [alert]
        interval = 10

        [actuator]
        kind = "mqtt"
        mqtt_broker = "mqtt://127.0.0.1:1883"
        mqtt_topic = "farm/coop/alert"
    "#;
    std::io::Write::write_all(&mut file, toml.as_bytes()).expect("write config");

    let cfg = FlockwatchConfig::load_from(Some(file.path())).expect("load config");
    assert_eq!(cfg.source.uri, "captures/run1.jsonl");
    assert_eq!(cfg.alert_interval, 10);
    assert_eq!(cfg.actuator.kind, ActuatorKind::Mqtt);
    assert_eq!(cfg.actuator.mqtt_topic, "farm/coop/alert");

    clear_env();
}

#[test]
fn rejects_invalid_interval_from_env() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    std::env::set_var("FLOCKWATCH_ALERT_INTERVAL", "0");
    let err = FlockwatchConfig::load().unwrap_err();
    assert!(err.to_string().contains("alert interval"));

    std::env::set_var("FLOCKWATCH_ALERT_INTERVAL", "eight");
    assert!(FlockwatchConfig::load().is_err());

    clear_env();
}

#[test]
fn unknown_config_sections_are_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new().suffix(".json").tempfile().expect("temp config");
    std::io::Write::write_all(&mut file, br#"{ "tracker": { "iou": 0.3 } }"#).expect("write");
    assert!(FlockwatchConfig::load_from(Some(file.path())).is_err());

    clear_env();
}

#[test]
fn overrides_applied_after_loading_complete_the_config() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new().suffix(".json").tempfile().expect("temp config");
    std::io::Write::write_all(
        &mut file,
        br#"{ "actuator": { "kind": "serial", "serial_settle_ms": 0 } }"#,
    )
    .expect("write");

    let err = FlockwatchConfig::load_from(Some(file.path())).unwrap_err();
    assert!(err.to_string().contains("serial_device"));

    let mut cfg = FlockwatchConfig::load_layers(Some(file.path())).expect("load layers");
    assert_eq!(cfg.actuator.kind, ActuatorKind::Serial);
    assert_eq!(cfg.actuator.serial_baud, 9600);
    assert!(cfg.validate().is_err());
    cfg.actuator.serial_device = Some(std::path::PathBuf::from("/dev/ttyUSB0"));
    cfg.validate().expect("device supplied after loading");

    clear_env();
}

#[test]
fn misspelled_section_keys_are_rejected() {
    let _guard = ENV_LOCK.lock().unwrap();
    clear_env();

    let mut file = Builder::new().suffix(".json").tempfile().expect("temp config");
    std::io::Write::write_all(&mut file, br#"{ "dedup": { "distance": 40 } }"#).expect("write");
    let err = FlockwatchConfig::load_from(Some(file.path())).unwrap_err();
    assert!(format!("{err:#}").contains("distance"));

    let mut file = Builder::new().suffix(".toml").tempfile().expect("temp config");
    std::io::Write::write_all(&mut file, b"[actuator]\nbaud = 9600\n").expect("write");
    assert!(FlockwatchConfig::load_from(Some(file.path())).is_err());

    clear_env();
}
