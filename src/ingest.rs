use std::sync::Arc;
use tracing::debug;

use crate::config::TopicsConfig;
use crate::controller::Controller;
use crate::error::{AppError, Result};
use crate::messages::{decode, AqhiMessage, CurrentWeatherMessage, ForecastMessage, SensorMessage};
use crate::mqtt::topic_matches;

/// Inbound category a topic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Thermostat,
    Humidistat,
    CurrentWeather,
    Forecast,
    Aqhi,
}

pub struct Ingestor {
    controller: Arc<Controller>,
    routes: Vec<(String, Route)>,
}

impl Ingestor {
    pub fn new(controller: Arc<Controller>, topics: &TopicsConfig) -> Self {
        let routes = vec![
            (topics.full(&topics.thermostats), Route::Thermostat),
            (topics.full(&topics.humidistats), Route::Humidistat),
            (topics.full(&topics.current_weather), Route::CurrentWeather),
            (topics.full(&topics.forecast), Route::Forecast),
            (topics.full(&topics.aqhi), Route::Aqhi),
        ];
        Self { controller, routes }
    }

    /// Subscription filters, prefix applied.
    pub fn filters(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|(filter, _)| filter.as_str())
    }

    pub fn route(&self, topic: &str) -> Option<Route> {
        self.routes
            .iter()
            .find(|(filter, _)| topic_matches(filter, topic))
            .map(|(_, route)| *route)
    }

    /// Decode one bus message and hand it to the controller. Undecodable or
    /// degenerate payloads are returned as errors and leave the inputs untouched.
    pub fn handle_message(&self, topic: &str, payload: &[u8]) -> Result<()> {
        let route = self
            .route(topic)
            .ok_or_else(|| AppError::UnknownTopic(topic.to_string()))?;
        debug!(topic = %topic, route = ?route, bytes = payload.len(), "message received");

        match route {
            Route::Thermostat | Route::Humidistat => {
                let mut reading = decode::<SensorMessage>(payload)?.into_reading();
                if route == Route::Humidistat {
                    reading.dewpoint_only = true;
                }
                self.controller.apply_sensor_reading(reading);
            }
            Route::CurrentWeather => {
                let msg: CurrentWeatherMessage = decode(payload)?;
                self.controller
                    .apply_current_weather(msg.temperature, msg.rel_humidity);
            }
            Route::Forecast => {
                let stats = decode::<ForecastMessage>(payload)?.stats()?;
                self.controller.apply_forecast(stats);
            }
            Route::Aqhi => {
                let index = decode::<AqhiMessage>(payload)?.current()?;
                self.controller.apply_aqhi(index);
            }
        }
        Ok(())
    }
}
