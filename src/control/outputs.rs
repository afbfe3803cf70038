use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HeatpumpMode {
    /// Not determined yet; the first decision picks heat or cool.
    #[default]
    Auto,
    Heat,
    Cool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunState {
    On,
    #[default]
    Off,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WindowState {
    Open,
    #[default]
    Closed,
}

impl fmt::Display for HeatpumpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeatpumpMode::Auto => write!(f, "AUTO"),
            HeatpumpMode::Heat => write!(f, "HEAT"),
            HeatpumpMode::Cool => write!(f, "COOL"),
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::On => write!(f, "ON"),
            RunState::Off => write!(f, "OFF"),
        }
    }
}

impl fmt::Display for WindowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowState::Open => write!(f, "OPEN"),
            WindowState::Closed => write!(f, "CLOSED"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Heatpump {
    pub mode: HeatpumpMode,
    pub state: RunState,
    pub last_mode_change: Option<DateTime<Utc>>,
}

impl Heatpump {
    /// Move to `mode` unless the last change is younger than `dwell`.
    /// Leaving `Auto` is never held. Returns whether `mode` is now in effect.
    pub fn set_mode(&mut self, mode: HeatpumpMode, now: DateTime<Utc>, dwell: Duration) -> bool {
        if mode == self.mode {
            return true;
        }
        if self.mode != HeatpumpMode::Auto {
            if let Some(last) = self.last_mode_change {
                if now - last < dwell {
                    return false;
                }
            }
        }
        self.force_mode(mode, now);
        true
    }

    /// Change mode without the dwell check (manual override).
    pub fn force_mode(&mut self, mode: HeatpumpMode, now: DateTime<Utc>) {
        if mode != self.mode {
            self.mode = mode;
            self.last_mode_change = Some(now);
        }
    }
}

/// The decision carried between invocations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlOutputs {
    pub heatpump: Heatpump,
    pub window: WindowState,
    /// Indoor dewpoint (°C) driving the analog output.
    pub dewpoint: f64,
    pub zone_call: bool,
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

// Two-point calibration of the dewpoint analog input: (°F, V)
const CAL_HIGH: (f64, f64) = (94.4, 10.0);
const CAL_LOW: (f64, f64) = (32.0, 0.0);

/// Linear through both calibration points, extrapolated outside them.
pub fn fahrenheit_to_voltage(fahrenheit: f64) -> f64 {
    let (x1, y1) = CAL_HIGH;
    let (x2, y2) = CAL_LOW;
    y2 + (y1 - y2) * ((fahrenheit - x2) / (x1 - x2))
}

pub fn dewpoint_to_voltage(dewpoint_c: f64) -> f64 {
    fahrenheit_to_voltage(celsius_to_fahrenheit(dewpoint_c))
}
