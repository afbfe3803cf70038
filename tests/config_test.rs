use hydronic_controller::config::{Config, MAX_WINDOW_HOURS};
use pretty_assertions::assert_eq;
use serial_test::serial;

const MINIMAL: &str = r#"
mqtt:
  host: "localhost"
  port: 1883
actuators:
  base_url: "http://localhost:4000"
"#;

#[test]
#[serial]
fn test_example_config_loads() {
    std::env::remove_var("MQTT_HOST");
    std::env::set_var("MQTT_USERNAME", "controller");
    std::env::set_var("MQTT_PASSWORD", "hunter2");

    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/config.example.yaml");
    let cfg = Config::load(path).unwrap();

    assert_eq!(cfg.mqtt.username.as_deref(), Some("controller"));
    assert_eq!(cfg.mqtt.password.as_deref(), Some("hunter2"));
    assert_eq!(cfg.topics.full(&cfg.topics.thermostats), "burlo/controller/thermostats/#");
    assert_eq!(cfg.actuators.cooling_mode.channel, 1);
    assert_eq!(cfg.actuators.dewpoint.hub_port, 1);
    assert_eq!(cfg.notify.as_ref().map(|n| n.topic.as_str()), Some("burlo"));
    assert_eq!(cfg.control.mode_dwell_hours, 24);

    std::env::remove_var("MQTT_USERNAME");
    std::env::remove_var("MQTT_PASSWORD");
}

#[test]
#[serial]
fn test_defaults_fill_missing_sections() {
    std::env::remove_var("MQTT_HOST");
    let cfg = Config::from_yaml(MINIMAL).unwrap();

    assert_eq!(cfg.mqtt.client_id, "controllerd");
    assert_eq!(cfg.mqtt.qos, 1);
    assert!(cfg.notify.is_none());
    assert_eq!(cfg.http.port, 8080);
    assert_eq!(cfg.actuators.zone_circulator.name, "ZoneCirculator");
    assert_eq!(cfg.control.stale_after_hours, 6);
    assert_eq!(cfg.control.ventilation.max_aqhi, 5);
    assert_eq!(cfg.control.mode.cold_mean_below, 16.0);
}

#[test]
#[serial]
fn test_mqtt_host_env_override() {
    std::env::set_var("MQTT_HOST", "broker.internal");
    let cfg = Config::from_yaml(MINIMAL).unwrap();
    std::env::remove_var("MQTT_HOST");

    assert_eq!(cfg.mqtt.host, "broker.internal");
}

#[test]
#[serial]
fn test_validation_rejects_bad_values() {
    std::env::remove_var("MQTT_HOST");

    let zero_port = MINIMAL.replace("port: 1883", "port: 0");
    assert!(Config::from_yaml(&zero_port).is_err());

    let no_dwell = format!("{}control:\n  mode_dwell_hours: 0\n", MINIMAL);
    assert!(Config::from_yaml(&no_dwell).is_err());

    let inverted = format!(
        "{}control:\n  ventilation:\n    heat_open_min: 25.0\n    heat_open_max: 18.0\n",
        MINIMAL
    );
    assert!(Config::from_yaml(&inverted).is_err());

    let empty_topic = format!("{}topics:\n  aqhi: \"\"\n", MINIMAL);
    assert!(Config::from_yaml(&empty_topic).is_err());
}

#[test]
#[serial]
fn test_hour_windows_are_bounded() {
    std::env::remove_var("MQTT_HOST");

    let huge_stale = format!("{}control:\n  stale_after_hours: {}\n", MINIMAL, i64::MAX);
    assert!(Config::from_yaml(&huge_stale).is_err());

    let long_dwell = format!(
        "{}control:\n  mode_dwell_hours: {}\n",
        MINIMAL,
        MAX_WINDOW_HOURS + 1
    );
    assert!(Config::from_yaml(&long_dwell).is_err());

    let at_limit = format!(
        "{}control:\n  stale_after_hours: {}\n  mode_dwell_hours: {}\n",
        MINIMAL, MAX_WINDOW_HOURS, MAX_WINDOW_HOURS
    );
    let cfg = Config::from_yaml(&at_limit).unwrap();
    assert_eq!(cfg.control.mode_dwell().num_hours(), MAX_WINDOW_HOURS);
}
