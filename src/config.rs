use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub mqtt: MqttConfig,
    #[serde(default)]
    pub topics: TopicsConfig,
    pub actuators: ActuatorsConfig,
    #[serde(default)]
    pub notify: Option<NotifyConfig>,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub control: ControlConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive_secs: Option<u64>,
    pub clean_session: Option<bool>,
    #[serde(default = "default_qos")]
    pub qos: u8,
}

fn default_client_id() -> String {
    "controllerd".into()
}
fn default_qos() -> u8 {
    1
}

/// Topic filters, relative to `prefix`. MQTT wildcards `+` and `#` are allowed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopicsConfig {
    pub prefix: String,
    pub thermostats: String,
    pub humidistats: String,
    pub current_weather: String,
    pub forecast: String,
    pub aqhi: String,
}

impl Default for TopicsConfig {
    fn default() -> Self {
        Self {
            prefix: "burlo".into(),
            thermostats: "controller/thermostats/#".into(),
            humidistats: "controller/humidistat/#".into(),
            current_weather: "weather/current".into(),
            forecast: "weather/forecast".into(),
            aqhi: "weather/aqhi".into(),
        }
    }
}

impl TopicsConfig {
    /// Full topic filter with the prefix applied.
    pub fn full(&self, filter: &str) -> String {
        if self.prefix.is_empty() {
            filter.to_string()
        } else {
            format!("{}/{}", self.prefix.trim_end_matches('/'), filter)
        }
    }

    pub fn filters(&self) -> [&str; 5] {
        [
            self.thermostats.as_str(),
            self.humidistats.as_str(),
            self.current_weather.as_str(),
            self.forecast.as_str(),
            self.aqhi.as_str(),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActuatorsConfig {
    /// e.g. "http://actuators.local:4000"
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_cooling_mode")]
    pub cooling_mode: ChannelConfig,
    #[serde(default = "default_zone_circulator")]
    pub zone_circulator: ChannelConfig,
    #[serde(default = "default_dewpoint")]
    pub dewpoint: ChannelConfig,
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub name: String,
    pub hub_port: i32,
    pub channel: i32,
}

fn default_cooling_mode() -> ChannelConfig {
    ChannelConfig {
        name: "CoolingMode".into(),
        hub_port: 0,
        channel: 1,
    }
}
fn default_zone_circulator() -> ChannelConfig {
    ChannelConfig {
        name: "ZoneCirculator".into(),
        hub_port: 0,
        channel: 0,
    }
}
fn default_dewpoint() -> ChannelConfig {
    ChannelConfig {
        name: "Dewpoint".into(),
        hub_port: 1,
        channel: 0,
    }
}

impl Default for ActuatorsConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:4000".into(),
            timeout_secs: default_timeout_secs(),
            cooling_mode: default_cooling_mode(),
            zone_circulator: default_zone_circulator(),
            dewpoint: default_dewpoint(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// ntfy server, e.g. "http://ntfy.local"
    pub server: String,
    #[serde(default = "default_notify_topic")]
    pub topic: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_notify_topic() -> String {
    "burlo".into()
}
fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

/// Upper bound for the hour-valued windows: one year.
pub const MAX_WINDOW_HOURS: i64 = 24 * 366;

/// Thresholds for the decision engine. Temperatures in °C.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Sensor readings older than this are dropped from aggregation.
    pub stale_after_hours: i64,
    /// Minimum time between heat/cool mode changes.
    pub mode_dwell_hours: i64,
    pub low_battery_percent: i32,
    /// Shared hysteresis margin for "room too hot/cold".
    pub setpoint_margin: f64,
    pub mode: ModeThresholds,
    pub ventilation: VentilationThresholds,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            stale_after_hours: 6,
            mode_dwell_hours: 24,
            low_battery_percent: 20,
            setpoint_margin: 0.5,
            mode: ModeThresholds::default(),
            ventilation: VentilationThresholds::default(),
        }
    }
}

impl ControlConfig {
    pub fn stale_after(&self) -> chrono::Duration {
        chrono::Duration::hours(self.stale_after_hours)
    }

    pub fn mode_dwell(&self) -> chrono::Duration {
        chrono::Duration::hours(self.mode_dwell_hours)
    }
}

/// 24h outdoor statistics that qualify as "cold out" / "hot out".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeThresholds {
    pub cold_mean_below: f64,
    pub cold_max_below: f64,
    pub hot_mean_above: f64,
    pub hot_min_above: f64,
}

impl Default for ModeThresholds {
    fn default() -> Self {
        Self {
            cold_mean_below: 16.0,
            cold_max_below: 20.0,
            hot_mean_above: 20.0,
            hot_min_above: 16.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VentilationThresholds {
    /// Windows stay closed above this AQHI.
    pub max_aqhi: i32,
    pub heat_open_min: f64,
    pub heat_open_max: f64,
    /// Outdoor dewpoint that never raises indoor humidity.
    pub humid_dewpoint: f64,
    /// Outdoor colder than indoor by at least this much counts as strongly favorable.
    pub strong_differential: f64,
    /// Windows close when outdoor drops this far below the heat setpoint.
    pub cooling_floor_offset: f64,
    pub comfort_min: f64,
    pub comfort_max: f64,
}

impl Default for VentilationThresholds {
    fn default() -> Self {
        Self {
            max_aqhi: 5,
            heat_open_min: 18.0,
            heat_open_max: 24.0,
            humid_dewpoint: 12.0,
            strong_differential: 2.0,
            cooling_floor_offset: 3.0,
            comfort_min: 18.0,
            comfort_max: 24.0,
        }
    }
}

impl Config {
    /// Load YAML from disk, substitute $(VAR)/${VAR} with env vars, then parse.
    /// Afterwards, if MQTT_HOST env is set, override `mqtt.host`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref()).map_err(|e| {
            AppError::Config(format!("cannot read {}: {}", path.as_ref().display(), e))
        })?;
        let expanded = expand_env_placeholders(&raw)?;
        Self::from_yaml(&expanded)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut cfg: Self =
            serde_yaml::from_str(yaml).map_err(|e| AppError::Config(e.to_string()))?;

        if let Ok(host) = std::env::var("MQTT_HOST") {
            cfg.mqtt.host = host;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.mqtt.host.is_empty() {
            return Err(AppError::Config("mqtt.host cannot be empty".into()));
        }
        if self.mqtt.port == 0 {
            return Err(AppError::Config("mqtt.port cannot be 0".into()));
        }
        if self.topics.filters().iter().any(|t| t.is_empty()) {
            return Err(AppError::Config("topic filters cannot be empty".into()));
        }
        if self.actuators.base_url.is_empty() {
            return Err(AppError::Config("actuators.base_url cannot be empty".into()));
        }

        let c = &self.control;
        let window = 1..=MAX_WINDOW_HOURS;
        if !window.contains(&c.stale_after_hours) || !window.contains(&c.mode_dwell_hours) {
            return Err(AppError::Config(format!(
                "control.stale_after_hours and control.mode_dwell_hours must be within 1..={}",
                MAX_WINDOW_HOURS
            )));
        }
        let v = &c.ventilation;
        if v.heat_open_min > v.heat_open_max || v.comfort_min > v.comfort_max {
            return Err(AppError::Config(
                "ventilation bands must have min <= max".into(),
            ));
        }
        Ok(())
    }
}

/// Expand $(VAR) and ${VAR} placeholders using environment variables.
/// "$$" becomes a literal "$"; any other '$' is kept as-is.
fn expand_env_placeholders(input: &str) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut it = input.chars().peekable();

    while let Some(c) = it.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        let close = match it.peek().copied() {
            Some('$') => {
                it.next();
                out.push('$');
                continue;
            }
            Some('(') => ')',
            Some('{') => '}',
            _ => {
                out.push('$');
                continue;
            }
        };
        it.next();
        let var = read_until(&mut it, close).ok_or_else(|| {
            AppError::Config(format!("unterminated env placeholder: missing '{}'", close))
        })?;
        let val = std::env::var(&var)
            .map_err(|_| AppError::Config(format!("missing environment variable: {}", var)))?;
        out.push_str(&val);
    }

    Ok(out)
}

/// Read characters until we hit `end`, consuming the closing delimiter.
fn read_until<I>(it: &mut std::iter::Peekable<I>, end: char) -> Option<String>
where
    I: Iterator<Item = char>,
{
    let mut buf = String::new();
    for ch in it.by_ref() {
        if ch == end {
            return Some(buf);
        }
        buf.push(ch);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_expand_env_placeholders() {
        std::env::set_var("HC_TEST_USER", "sensor");
        std::env::set_var("HC_TEST_PASS", "s3cret");

        let out = expand_env_placeholders("user: $(HC_TEST_USER)\npass: ${HC_TEST_PASS}").unwrap();
        assert_eq!(out, "user: sensor\npass: s3cret");

        std::env::remove_var("HC_TEST_USER");
        std::env::remove_var("HC_TEST_PASS");
    }

    #[test]
    fn test_expand_keeps_escapes_and_plain_dollars() {
        let out = expand_env_placeholders("price: $$5 and $.path").unwrap();
        assert_eq!(out, "price: $5 and $.path");
    }

    #[test]
    #[serial]
    fn test_expand_missing_variable_fails() {
        std::env::remove_var("HC_TEST_MISSING");
        let err = expand_env_placeholders("pass: $(HC_TEST_MISSING)").unwrap_err();
        assert!(err.to_string().contains("HC_TEST_MISSING"));
    }

    #[test]
    fn test_expand_unterminated_fails() {
        assert!(expand_env_placeholders("pass: ${OOPS").is_err());
    }

    #[test]
    fn test_full_topic_applies_prefix() {
        let topics = TopicsConfig::default();
        assert_eq!(topics.full(&topics.aqhi), "burlo/weather/aqhi");

        let bare = TopicsConfig {
            prefix: String::new(),
            ..TopicsConfig::default()
        };
        assert_eq!(bare.full("weather/current"), "weather/current");
    }
}
