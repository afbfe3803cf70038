//! Input aggregation and decision orchestration behind one lock.
//!
//! Every inbound event takes the lock, folds itself into the inputs, and if
//! all four input categories have reported, runs a full decision before the
//! lock is released. Effects are fire-and-forget, so nothing here blocks.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

use crate::config::{ActuatorsConfig, ControlConfig};
use crate::control::{
    decide, dewpoint, dewpoint_to_voltage, ControlInputs, ControlOutputs, ForecastStats,
    HeatpumpMode, Readiness, RunState, SensorCache, ThermostatReading, Transition, WindowState,
};
use crate::effects::{Actuator, DigitalOutput, Notification, Notifier, VoltageOutput};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Consistent copy of the controller state, taken under the lock.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControllerSnapshot {
    pub inputs: ControlInputs,
    pub outputs: ControlOutputs,
    pub sensors: Vec<ThermostatReading>,
    pub decisions: u64,
}

fn flag(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

impl ControllerSnapshot {
    /// Flat numeric view for energy-monitoring dashboards.
    pub fn metrics(&self) -> BTreeMap<&'static str, f64> {
        let out = &self.outputs;
        BTreeMap::from([
            ("tstat_call", flag(out.zone_call)),
            ("hp_cooling_mode", flag(out.heatpump.mode == HeatpumpMode::Cool)),
            ("hp_running", flag(out.heatpump.state == RunState::On)),
            ("windows_open", flag(out.window == WindowState::Open)),
            ("outdoor_air_temp", self.inputs.outdoor.temperature),
            ("indoor_dewpoint", self.inputs.indoor.dewpoint),
            ("indoor_air_temp", self.inputs.indoor.temperature),
            ("dewpoint_voltage", dewpoint_to_voltage(out.dewpoint)),
        ])
    }
}

#[derive(Debug, Default)]
struct ControllerState {
    inputs: ControlInputs,
    outputs: ControlOutputs,
    sensors: SensorCache,
    decisions: u64,
}

pub struct Controller {
    state: Mutex<ControllerState>,
    config: ControlConfig,
    channels: ActuatorsConfig,
    actuator: Arc<dyn Actuator>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
}

impl Controller {
    pub fn new(
        config: ControlConfig,
        channels: ActuatorsConfig,
        actuator: Arc<dyn Actuator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            state: Mutex::new(ControllerState::default()),
            config,
            channels,
            actuator,
            notifier,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn apply_sensor_reading(&self, reading: ThermostatReading) {
        let now = self.clock.now();
        let mut state = self.lock();

        if let Some(level) = reading
            .battery
            .filter(|b| *b < self.config.low_battery_percent)
        {
            warn!(sensor = %reading.id, battery = level, "sensor battery low");
            self.notifier.notify(Notification::low_battery(&reading, level));
        }

        self.evict_stale(&mut state, now);
        debug!(
            sensor = %reading.id,
            temperature = reading.temperature,
            dewpoint = reading.dewpoint,
            dewpoint_only = reading.dewpoint_only,
            "sensor reading"
        );
        state.sensors.upsert(reading);
        self.aggregate_indoor(&mut state);
        self.try_decide(&mut state, now);
    }

    pub fn apply_current_weather(&self, temperature: f64, rel_humidity: f64) {
        let now = self.clock.now();
        let mut state = self.lock();
        self.refresh_indoor(&mut state, now);

        let outdoor = &mut state.inputs.outdoor;
        outdoor.temperature = temperature;
        outdoor.humidity = rel_humidity;
        outdoor.dewpoint = dewpoint(temperature, rel_humidity);
        state.inputs.ready.set(Readiness::CURRENT_WEATHER);
        self.try_decide(&mut state, now);
    }

    pub fn apply_forecast(&self, stats: ForecastStats) {
        let now = self.clock.now();
        let mut state = self.lock();
        self.refresh_indoor(&mut state, now);

        let outdoor = &mut state.inputs.outdoor;
        outdoor.t24h_min = stats.min;
        outdoor.t24h_max = stats.max;
        outdoor.t24h_mean = stats.mean;
        state.inputs.ready.set(Readiness::FORECAST);
        self.try_decide(&mut state, now);
    }

    pub fn apply_aqhi(&self, index: i32) {
        let now = self.clock.now();
        let mut state = self.lock();
        self.refresh_indoor(&mut state, now);

        state.inputs.outdoor.aqhi = index;
        state.inputs.ready.set(Readiness::AQHI);
        self.try_decide(&mut state, now);
    }

    /// Replace the manual overrides; `None` hands the axis back to the selector.
    pub fn set_overrides(
        &self,
        mode: Option<HeatpumpMode>,
        run_state: Option<RunState>,
    ) -> ControllerSnapshot {
        let now = self.clock.now();
        let mut state = self.lock();
        info!(mode = ?mode, state = ?run_state, "manual override updated");
        state.inputs.mode_override = mode.filter(|m| *m != HeatpumpMode::Auto);
        state.inputs.state_override = run_state;
        self.refresh_indoor(&mut state, now);
        self.try_decide(&mut state, now);
        Self::snapshot(&state)
    }

    pub fn current_state(&self) -> ControllerSnapshot {
        Self::snapshot(&self.lock())
    }

    fn snapshot(state: &ControllerState) -> ControllerSnapshot {
        ControllerSnapshot {
            inputs: state.inputs.clone(),
            outputs: state.outputs,
            sensors: state.sensors.readings(),
            decisions: state.decisions,
        }
    }

    fn evict_stale(&self, state: &mut ControllerState, now: DateTime<Utc>) {
        let evicted = state.sensors.evict_stale(now, self.config.stale_after());
        if !evicted.is_empty() {
            warn!(
                sensors = ?evicted,
                thermostats_left = state.sensors.thermostat_count(),
                "evicted stale sensor readings"
            );
        }
    }

    /// Recompute the indoor aggregate. Without a live thermostat the indoor
    /// category is no longer ready and decisions stop until one reports.
    fn aggregate_indoor(&self, state: &mut ControllerState) {
        match state.sensors.aggregate() {
            Some(indoor) => {
                state.inputs.indoor = indoor;
                state.inputs.ready.set(Readiness::INDOOR);
            }
            None => {
                if state.inputs.ready.contains(Readiness::INDOOR) {
                    warn!("no live thermostats; holding outputs until one reports");
                }
                state.inputs.ready.clear(Readiness::INDOOR);
            }
        }
    }

    fn refresh_indoor(&self, state: &mut ControllerState, now: DateTime<Utc>) {
        self.evict_stale(state, now);
        self.aggregate_indoor(state);
    }

    fn try_decide(&self, state: &mut ControllerState, now: DateTime<Utc>) {
        if !state.inputs.ready.is_complete() {
            debug!(missing = ?state.inputs.ready.missing(), "waiting for inputs");
            return;
        }

        let decision = decide(&state.inputs, &state.outputs, now, &self.config);
        if decision.mode_held {
            debug!(
                mode = %decision.outputs.heatpump.mode,
                since = ?decision.outputs.heatpump.last_mode_change,
                "mode change held by dwell time"
            );
        }

        for transition in &decision.transitions {
            info!(transition = ?transition, "control transition");
            let notification = match *transition {
                Transition::Mode(mode) => Notification::mode(mode),
                Transition::State(run_state) => Some(Notification::run_state(run_state)),
                Transition::Window(window) => {
                    Some(Notification::window(window, &state.inputs.outdoor))
                }
            };
            if let Some(n) = notification {
                self.notifier.notify(n);
            }
        }

        state.outputs = decision.outputs;
        state.decisions += 1;
        self.push_outputs(&state.outputs);
    }

    fn push_outputs(&self, outputs: &ControlOutputs) {
        let voltage = dewpoint_to_voltage(outputs.dewpoint);
        debug!(
            mode = %outputs.heatpump.mode,
            zone_call = outputs.zone_call,
            dewpoint = outputs.dewpoint,
            voltage,
            "pushing outputs"
        );
        self.actuator.set_digital_output(DigitalOutput::new(
            &self.channels.cooling_mode,
            outputs.heatpump.mode == HeatpumpMode::Cool,
        ));
        self.actuator.set_digital_output(DigitalOutput::new(
            &self.channels.zone_circulator,
            outputs.zone_call,
        ));
        self.actuator
            .set_voltage_output(VoltageOutput::new(&self.channels.dewpoint, voltage));
    }
}
