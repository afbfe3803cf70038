//! Input side of the decision engine: sensor cache, aggregation and readiness.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One indoor sensor sample.
///
/// `dewpoint_only` marks humidity sensors placed near radiators or at floor
/// level: they give accurate dewpoints but misleading room temperatures, so
/// they only contribute to the dewpoint maximum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermostatReading {
    pub id: String,
    pub name: String,
    pub time: DateTime<Utc>,
    pub dewpoint_only: bool,
    pub temperature: f64,
    pub humidity: f64,
    pub dewpoint: f64,
    pub heat_setpoint: f64,
    pub cool_setpoint: f64,
    /// Percent; `None` when the sensor does not report it.
    pub battery: Option<i32>,
    pub link_quality: i32,
}

/// Simple dewpoint approximation in °C, accurate to about 1°C above 50% relH.
pub fn dewpoint(temperature: f64, rel_humidity: f64) -> f64 {
    if rel_humidity >= 50.0 && temperature >= 25.0 {
        temperature - (100.0 - rel_humidity) / 5.0
    } else {
        temperature - (100.0 - rel_humidity) / 4.0
    }
}

/// Aggregate of the live indoor sensor set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndoorConditions {
    /// Mean over full thermostats.
    pub temperature: f64,
    /// Mean of (temperature - heat setpoint); negative means colder than target.
    pub heat_setpoint_error: f64,
    /// Mean of (temperature - cool setpoint).
    pub cool_setpoint_error: f64,
    /// Maximum over every sensor, dewpoint-only ones included.
    pub dewpoint: f64,
}

impl IndoorConditions {
    pub fn heat_setpoint(&self) -> f64 {
        self.temperature - self.heat_setpoint_error
    }

    pub fn cool_setpoint(&self) -> f64 {
        self.temperature - self.cool_setpoint_error
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OutdoorConditions {
    pub temperature: f64,
    pub humidity: f64,
    pub dewpoint: f64,
    pub aqhi: i32,
    pub t24h_min: f64,
    pub t24h_max: f64,
    pub t24h_mean: f64,
}

/// Min/max/mean of the outdoor temperature over the forecast window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl ForecastStats {
    /// `None` for an empty series.
    pub fn from_series(temps: &[f64]) -> Option<Self> {
        if temps.is_empty() {
            return None;
        }
        let min = temps.iter().copied().fold(f64::INFINITY, f64::min);
        let max = temps.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = temps.iter().sum::<f64>() / temps.len() as f64;
        Some(Self { min, max, mean })
    }
}

/// Which input categories have reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Readiness(u8);

impl Readiness {
    pub const INDOOR: Readiness = Readiness(0b0001);
    pub const CURRENT_WEATHER: Readiness = Readiness(0b0010);
    pub const FORECAST: Readiness = Readiness(0b0100);
    pub const AQHI: Readiness = Readiness(0b1000);
    pub const ALL: Readiness = Readiness(0b1111);

    pub fn set(&mut self, flag: Readiness) {
        self.0 |= flag.0;
    }

    pub fn clear(&mut self, flag: Readiness) {
        self.0 &= !flag.0;
    }

    pub fn contains(&self, flag: Readiness) -> bool {
        self.0 & flag.0 == flag.0
    }

    pub fn is_complete(&self) -> bool {
        self.contains(Self::ALL)
    }

    /// Names of the categories still missing, for logging.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            (Self::INDOOR, "indoor"),
            (Self::CURRENT_WEATHER, "current_weather"),
            (Self::FORECAST, "forecast"),
            (Self::AQHI, "aqhi"),
        ]
        .into_iter()
        .filter(|(flag, _)| !self.contains(*flag))
        .map(|(_, name)| name)
        .collect()
    }
}

/// Everything the decision engine reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlInputs {
    pub ready: Readiness,
    pub indoor: IndoorConditions,
    pub outdoor: OutdoorConditions,
    pub mode_override: Option<super::HeatpumpMode>,
    pub state_override: Option<super::RunState>,
}

/// Live indoor readings keyed by sensor id.
#[derive(Debug, Clone, Default)]
pub struct SensorCache {
    thermostats: HashMap<String, ThermostatReading>,
    humidistats: HashMap<String, ThermostatReading>,
}

impl SensorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop readings older than `max_age`. Returns the evicted ids.
    pub fn evict_stale(&mut self, now: DateTime<Utc>, max_age: Duration) -> Vec<String> {
        let mut evicted = Vec::new();
        for map in [&mut self.thermostats, &mut self.humidistats] {
            map.retain(|id, reading| {
                let keep = now - reading.time <= max_age;
                if !keep {
                    evicted.push(id.clone());
                }
                keep
            });
        }
        evicted
    }

    pub fn upsert(&mut self, reading: ThermostatReading) {
        let id = reading.id.clone();
        if reading.dewpoint_only {
            self.thermostats.remove(&id);
            self.humidistats.insert(id, reading);
        } else {
            self.humidistats.remove(&id);
            self.thermostats.insert(id, reading);
        }
    }

    pub fn thermostat_count(&self) -> usize {
        self.thermostats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.thermostats.is_empty() && self.humidistats.is_empty()
    }

    /// Means over full thermostats, dewpoint max over all sensors.
    /// `None` when no full thermostat is live: there is no room temperature to act on.
    pub fn aggregate(&self) -> Option<IndoorConditions> {
        if self.thermostats.is_empty() {
            return None;
        }
        let n = self.thermostats.len() as f64;
        let mut indoor = IndoorConditions::default();
        for t in self.thermostats.values() {
            indoor.temperature += t.temperature;
            indoor.heat_setpoint_error += t.temperature - t.heat_setpoint;
            indoor.cool_setpoint_error += t.temperature - t.cool_setpoint;
        }
        indoor.temperature /= n;
        indoor.heat_setpoint_error /= n;
        indoor.cool_setpoint_error /= n;
        indoor.dewpoint = self
            .thermostats
            .values()
            .chain(self.humidistats.values())
            .map(|r| r.dewpoint)
            .fold(f64::NEG_INFINITY, f64::max);
        Some(indoor)
    }

    /// All live readings, thermostats first, each group sorted by id.
    pub fn readings(&self) -> Vec<ThermostatReading> {
        let mut tstats: Vec<_> = self.thermostats.values().cloned().collect();
        tstats.sort_by(|a, b| a.id.cmp(&b.id));
        let mut hstats: Vec<_> = self.humidistats.values().cloned().collect();
        hstats.sort_by(|a, b| a.id.cmp(&b.id));
        tstats.extend(hstats);
        tstats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap()
    }

    fn reading(id: &str, temp: f64, dewpoint: f64, dewpoint_only: bool) -> ThermostatReading {
        ThermostatReading {
            id: id.into(),
            name: id.into(),
            time: t0(),
            dewpoint_only,
            temperature: temp,
            humidity: 50.0,
            dewpoint,
            heat_setpoint: 20.0,
            cool_setpoint: 24.0,
            battery: Some(100),
            link_quality: 120,
        }
    }

    #[test]
    fn test_dewpoint_branches() {
        // hot and humid uses the /5 slope
        assert_eq!(dewpoint(30.0, 60.0), 22.0);
        // anything else uses /4
        assert_eq!(dewpoint(20.0, 60.0), 10.0);
        assert_eq!(dewpoint(30.0, 40.0), 15.0);
        assert_eq!(dewpoint(20.0, 100.0), 20.0);
    }

    #[test]
    fn test_forecast_stats() {
        let stats = ForecastStats::from_series(&[4.0, 8.0, 12.0, 8.0]).unwrap();
        assert_eq!(stats.min, 4.0);
        assert_eq!(stats.max, 12.0);
        assert_eq!(stats.mean, 8.0);
        assert!(ForecastStats::from_series(&[]).is_none());
    }

    #[test]
    fn test_readiness_bits() {
        let mut ready = Readiness::default();
        assert!(!ready.is_complete());
        ready.set(Readiness::INDOOR);
        ready.set(Readiness::FORECAST);
        assert_eq!(ready.missing(), vec!["current_weather", "aqhi"]);
        ready.set(Readiness::CURRENT_WEATHER);
        ready.set(Readiness::AQHI);
        assert!(ready.is_complete());
        ready.clear(Readiness::INDOOR);
        assert!(!ready.is_complete());
        assert_eq!(ready.missing(), vec!["indoor"]);
    }

    #[test]
    fn test_aggregate_means_and_max_dewpoint() {
        let mut cache = SensorCache::new();
        cache.upsert(reading("living", 20.0, 9.0, false));
        cache.upsert(reading("office", 22.0, 11.0, false));
        cache.upsert(reading("slab", 15.0, 14.5, true));

        let indoor = cache.aggregate().unwrap();
        assert_eq!(indoor.temperature, 21.0);
        assert_eq!(indoor.heat_setpoint_error, 1.0);
        assert_eq!(indoor.cool_setpoint_error, -3.0);
        // max comes from the dewpoint-only sensor, never a mean
        assert_eq!(indoor.dewpoint, 14.5);
    }

    #[test]
    fn test_aggregate_handles_negative_dewpoints() {
        let mut cache = SensorCache::new();
        cache.upsert(reading("cold-room", 10.0, -3.0, false));
        cache.upsert(reading("colder", 8.0, -5.0, false));
        assert_eq!(cache.aggregate().unwrap().dewpoint, -3.0);
    }

    #[test]
    fn test_aggregate_without_thermostats_is_none() {
        let mut cache = SensorCache::new();
        assert!(cache.aggregate().is_none());
        cache.upsert(reading("slab", 15.0, 14.5, true));
        assert!(cache.aggregate().is_none());
        assert!(!cache.is_empty());
    }

    #[test]
    fn test_upsert_moves_sensor_between_maps() {
        let mut cache = SensorCache::new();
        cache.upsert(reading("s1", 20.0, 9.0, false));
        cache.upsert(reading("s1", 20.0, 9.0, true));
        assert_eq!(cache.thermostat_count(), 0);
        assert_eq!(cache.readings().len(), 1);
    }

    #[test]
    fn test_evict_stale_from_both_maps() {
        let mut cache = SensorCache::new();
        let mut old = reading("old", 18.0, 8.0, false);
        old.time = t0() - Duration::hours(6) - Duration::seconds(1);
        let mut old_h = reading("old-h", 18.0, 8.0, true);
        old_h.time = old.time;
        let mut edge = reading("edge", 21.0, 9.0, false);
        edge.time = t0() - Duration::hours(6);

        cache.upsert(old);
        cache.upsert(old_h);
        cache.upsert(edge);

        let mut evicted = cache.evict_stale(t0(), Duration::hours(6));
        evicted.sort();
        assert_eq!(evicted, vec!["old".to_string(), "old-h".to_string()]);
        assert_eq!(cache.readings().len(), 1);
        assert_eq!(cache.aggregate().unwrap().temperature, 21.0);
    }
}
