//! Outbound effects: actuator writes and human notifications.
//!
//! Both sinks are fire-and-forget. Implementations log their own failures;
//! nothing flows back into the decision.

use serde::Serialize;
use tracing::info;

use crate::config::ChannelConfig;
use crate::control::{HeatpumpMode, OutdoorConditions, RunState, ThermostatReading, WindowState};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DigitalOutput {
    pub name: String,
    pub hub_port: i32,
    pub channel: i32,
    pub target_state: bool,
}

impl DigitalOutput {
    pub fn new(channel: &ChannelConfig, target_state: bool) -> Self {
        Self {
            name: channel.name.clone(),
            hub_port: channel.hub_port,
            channel: channel.channel,
            target_state,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoltageOutput {
    pub name: String,
    pub hub_port: i32,
    pub channel: i32,
    pub target_voltage: f64,
}

impl VoltageOutput {
    pub fn new(channel: &ChannelConfig, target_voltage: f64) -> Self {
        Self {
            name: channel.name.clone(),
            hub_port: channel.hub_port,
            channel: channel.channel,
            target_voltage,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait Actuator: Send + Sync {
    fn set_digital_output(&self, output: DigitalOutput);
    fn set_voltage_output(&self, output: VoltageOutput);
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
}

fn tags(list: &[&str]) -> Vec<String> {
    list.iter().map(|t| t.to_string()).collect()
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>, tag_list: &[&str]) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            tags: tags(tag_list),
        }
    }

    pub fn mode(mode: HeatpumpMode) -> Option<Self> {
        match mode {
            HeatpumpMode::Heat => Some(Self::new(
                "Heating mode activated",
                "Its getting chilly out there",
                &["house_with_garden", "fire"],
            )),
            HeatpumpMode::Cool => Some(Self::new(
                "Cooling mode activated",
                "Wow its hot out there",
                &["house_with_garden", "snowflake"],
            )),
            HeatpumpMode::Auto => None,
        }
    }

    pub fn run_state(state: RunState) -> Self {
        match state {
            RunState::Off => Self::new(
                "Heat pump standby",
                "Saves energy when there is no need to heat or cool for long periods of time. \
                 Buffer temperature will not be maintained while in standby.",
                &["house_with_garden", "zzz"],
            ),
            RunState::On => Self::new(
                "Heat pump active",
                "Buffer temperature is maintained again",
                &["house_with_garden", "arrow_forward"],
            ),
        }
    }

    pub fn window(window: WindowState, outdoor: &OutdoorConditions) -> Self {
        let conditions = format!(
            "Outdoors: {:.1}°C and {:.0}% relH, AQHI {}",
            outdoor.temperature, outdoor.humidity, outdoor.aqhi
        );
        match window {
            WindowState::Open => Self::new(
                "Its nice out there!",
                format!(
                    "Now is a good time to open those windows and get some fresh air. {}",
                    conditions
                ),
                &["house_with_garden", "sun_behind_small_cloud"],
            ),
            WindowState::Closed => Self::new(
                "Keep windows closed",
                conditions,
                &["house_with_garden", "window"],
            ),
        }
    }

    pub fn low_battery(reading: &ThermostatReading, level: i32) -> Self {
        Self::new(
            "Sensor low battery",
            format!(
                "thermostat with low battery: {}/{} ({}%)",
                reading.id, reading.name, level
            ),
            &["battery"],
        )
    }
}

#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Notifier used when no push server is configured.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        info!(
            title = %notification.title,
            tags = ?notification.tags,
            "{}",
            notification.body
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_notification_carries_conditions() {
        let outdoor = OutdoorConditions {
            temperature: 21.26,
            humidity: 48.4,
            aqhi: 3,
            ..Default::default()
        };
        let n = Notification::window(WindowState::Open, &outdoor);
        assert_eq!(n.title, "Its nice out there!");
        assert!(n.body.ends_with("Outdoors: 21.3°C and 48% relH, AQHI 3"));
        assert_eq!(n.tags, vec!["house_with_garden", "sun_behind_small_cloud"]);

        let closed = Notification::window(WindowState::Closed, &outdoor);
        assert_eq!(closed.body, "Outdoors: 21.3°C and 48% relH, AQHI 3");
    }

    #[test]
    fn test_auto_mode_has_no_notification() {
        assert!(Notification::mode(HeatpumpMode::Auto).is_none());
        assert_eq!(
            Notification::mode(HeatpumpMode::Cool).unwrap().title,
            "Cooling mode activated"
        );
    }

    #[test]
    fn test_digital_output_from_channel() {
        let channel = ChannelConfig {
            name: "ZoneCirculator".into(),
            hub_port: 0,
            channel: 0,
        };
        let out = DigitalOutput::new(&channel, true);
        assert_eq!(
            serde_json::to_value(&out).unwrap(),
            serde_json::json!({
                "name": "ZoneCirculator",
                "hub_port": 0,
                "channel": 0,
                "target_state": true
            })
        );
    }
}
