//! Payloads published by the sensor and weather daemons.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::control::{dewpoint, ForecastStats, ThermostatReading};
use crate::error::{AppError, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SensorMessage {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub dewpoint_only: bool,
    pub temperature: f64,
    pub humidity: f64,
    #[serde(default)]
    pub dewpoint: Option<f64>,
    #[serde(default)]
    pub heat_setpoint: f64,
    #[serde(default)]
    pub cool_setpoint: f64,
    #[serde(default)]
    pub battery: Option<i32>,
    #[serde(default)]
    pub link_quality: i32,
}

impl SensorMessage {
    /// The published dewpoint is ignored and recomputed so every sensor uses
    /// the same approximation.
    pub fn into_reading(self) -> ThermostatReading {
        ThermostatReading {
            dewpoint: dewpoint(self.temperature, self.humidity),
            id: self.id,
            name: self.name,
            time: self.time,
            dewpoint_only: self.dewpoint_only,
            temperature: self.temperature,
            humidity: self.humidity,
            heat_setpoint: self.heat_setpoint,
            cool_setpoint: self.cool_setpoint,
            battery: self.battery,
            link_quality: self.link_quality,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CurrentWeatherMessage {
    pub temperature: f64,
    pub rel_humidity: f64,
    #[serde(default)]
    pub wind_speed: Option<f64>,
    #[serde(default)]
    pub cloud_cover: Option<f64>,
    #[serde(default)]
    pub precipitation: Option<f64>,
    #[serde(default)]
    pub weather_code: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ForecastMessage {
    pub temperature: Vec<f64>,
    // auxiliary series may be absent or null
    #[serde(default)]
    pub rel_humidity: Option<Vec<f64>>,
    #[serde(default)]
    pub prob_precipitation: Option<Vec<f64>>,
    #[serde(default)]
    pub precipitation_amount: Option<Vec<f64>>,
    #[serde(default)]
    pub cloud_cover: Option<Vec<f64>>,
}

impl ForecastMessage {
    pub fn stats(&self) -> Result<ForecastStats> {
        ForecastStats::from_series(&self.temperature)
            .ok_or_else(|| AppError::EmptyPayload("forecast has no temperatures".into()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AqhiMessage {
    #[serde(rename = "AQHI")]
    pub aqhi: Vec<i32>,
    #[serde(rename = "Time", default)]
    pub time: Option<Vec<DateTime<Utc>>>,
}

impl AqhiMessage {
    /// The first element is the current index.
    pub fn current(&self) -> Result<i32> {
        self.aqhi
            .first()
            .copied()
            .ok_or_else(|| AppError::EmptyPayload("AQHI series is empty".into()))
    }
}

pub fn decode<'a, T: Deserialize<'a>>(payload: &'a [u8]) -> Result<T> {
    if payload.is_empty() {
        return Err(AppError::EmptyPayload("empty message".into()));
    }
    Ok(serde_json::from_slice(payload)?)
}
