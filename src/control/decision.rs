//! One orchestration step over a consistent input snapshot.
//!
//! Order matters: the window decision reads the new mode, the zone call reads
//! the new mode and window. Old and new outputs are compared once here, and
//! the caller turns the resulting transitions into notifications.

use chrono::{DateTime, Utc};

use super::inputs::ControlInputs;
use super::mode::select_mode;
use super::outputs::{ControlOutputs, HeatpumpMode, RunState, WindowState};
use super::ventilation::select_window;
use super::zone::select_zone_call;
use crate::config::ControlConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Mode(HeatpumpMode),
    State(RunState),
    Window(WindowState),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub outputs: ControlOutputs,
    pub transitions: Vec<Transition>,
    /// The selector asked for a mode change that the dwell time rejected.
    pub mode_held: bool,
}

pub fn decide(
    inputs: &ControlInputs,
    previous: &ControlOutputs,
    now: DateTime<Utc>,
    cfg: &ControlConfig,
) -> Decision {
    let mut out = *previous;
    let selected = select_mode(inputs, previous.heatpump.mode, &cfg.mode);

    let mut mode_held = false;
    match inputs.mode_override.filter(|m| *m != HeatpumpMode::Auto) {
        Some(mode) => out.heatpump.force_mode(mode, now),
        None => mode_held = !out.heatpump.set_mode(selected.mode, now, cfg.mode_dwell()),
    }

    out.heatpump.state = match inputs.state_override {
        Some(state) => state,
        // don't run in the mode the selector just rejected
        None if mode_held => RunState::Off,
        None => selected.state,
    };

    out.dewpoint = inputs.indoor.dewpoint;
    out.window = select_window(inputs, out.heatpump.mode, &cfg.ventilation);
    out.zone_call = select_zone_call(inputs, &out.heatpump, out.window, cfg.setpoint_margin);

    Decision {
        transitions: transitions(previous, &out),
        outputs: out,
        mode_held,
    }
}

/// Value changes between two output records, in notification order.
pub fn transitions(previous: &ControlOutputs, next: &ControlOutputs) -> Vec<Transition> {
    let mut changes = Vec::new();
    if next.heatpump.mode != previous.heatpump.mode && next.heatpump.mode != HeatpumpMode::Auto {
        changes.push(Transition::Mode(next.heatpump.mode));
    }
    if next.heatpump.state != previous.heatpump.state {
        changes.push(Transition::State(next.heatpump.state));
    }
    if next.window != previous.window {
        changes.push(Transition::Window(next.window));
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::inputs::{IndoorConditions, OutdoorConditions, Readiness};
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 3, 8, 0, 0).unwrap()
    }

    /// Indoor 19°C, heat error -1.2, cool error +2.8, dewpoint 10;
    /// outdoor 5°C with 24h mean 8 / max 12, AQHI 2.
    fn winter_morning() -> ControlInputs {
        ControlInputs {
            ready: Readiness::ALL,
            indoor: IndoorConditions {
                temperature: 19.0,
                heat_setpoint_error: -1.2,
                cool_setpoint_error: 2.8,
                dewpoint: 10.0,
            },
            outdoor: OutdoorConditions {
                temperature: 5.0,
                humidity: 70.0,
                dewpoint: -2.5,
                aqhi: 2,
                t24h_min: 3.0,
                t24h_max: 12.0,
                t24h_mean: 8.0,
            },
            mode_override: None,
            state_override: None,
        }
    }

    fn summer_afternoon() -> ControlInputs {
        ControlInputs {
            ready: Readiness::ALL,
            indoor: IndoorConditions {
                temperature: 24.0,
                heat_setpoint_error: 4.0,
                cool_setpoint_error: 1.0,
                dewpoint: 14.0,
            },
            outdoor: OutdoorConditions {
                temperature: 29.0,
                humidity: 60.0,
                dewpoint: 21.0,
                aqhi: 3,
                t24h_min: 19.0,
                t24h_max: 31.0,
                t24h_mean: 24.0,
            },
            mode_override: None,
            state_override: None,
        }
    }

    #[test]
    fn test_winter_morning_heats() {
        let d = decide(&winter_morning(), &ControlOutputs::default(), t0(), &ControlConfig::default());
        assert_eq!(d.outputs.heatpump.mode, HeatpumpMode::Heat);
        assert_eq!(d.outputs.heatpump.state, RunState::On);
        assert_eq!(d.outputs.window, WindowState::Closed);
        assert!(d.outputs.zone_call);
        assert_eq!(d.outputs.dewpoint, 10.0);
        assert_eq!(
            d.transitions,
            vec![Transition::Mode(HeatpumpMode::Heat), Transition::State(RunState::On)]
        );
        assert!(!d.mode_held);
    }

    #[test]
    fn test_unchanged_decision_has_no_transitions() {
        let cfg = ControlConfig::default();
        let first = decide(&winter_morning(), &ControlOutputs::default(), t0(), &cfg);
        let second = decide(&winter_morning(), &first.outputs, t0() + Duration::minutes(15), &cfg);
        assert!(second.transitions.is_empty());
        assert_eq!(second.outputs, first.outputs);
    }

    #[test]
    fn test_dwell_holds_mode_and_idles_plant() {
        let cfg = ControlConfig::default();
        let winter = decide(&winter_morning(), &ControlOutputs::default(), t0(), &cfg);

        let held = decide(&summer_afternoon(), &winter.outputs, t0() + Duration::hours(12), &cfg);
        assert!(held.mode_held);
        assert_eq!(held.outputs.heatpump.mode, HeatpumpMode::Heat);
        assert_eq!(held.outputs.heatpump.state, RunState::Off);
        assert!(!held.outputs.zone_call);
        assert_eq!(held.transitions, vec![Transition::State(RunState::Off)]);

        let switched = decide(&summer_afternoon(), &held.outputs, t0() + Duration::hours(24), &cfg);
        assert!(!switched.mode_held);
        assert_eq!(switched.outputs.heatpump.mode, HeatpumpMode::Cool);
        assert_eq!(switched.outputs.heatpump.state, RunState::On);
        assert_eq!(
            switched.transitions,
            vec![Transition::Mode(HeatpumpMode::Cool), Transition::State(RunState::On)]
        );
    }

    #[test]
    fn test_overrides_bypass_selector_and_dwell() {
        let cfg = ControlConfig::default();
        let winter = decide(&winter_morning(), &ControlOutputs::default(), t0(), &cfg);

        let mut inputs = winter_morning();
        inputs.mode_override = Some(HeatpumpMode::Cool);
        inputs.state_override = Some(RunState::Off);
        let d = decide(&inputs, &winter.outputs, t0() + Duration::minutes(1), &cfg);
        assert_eq!(d.outputs.heatpump.mode, HeatpumpMode::Cool);
        assert_eq!(d.outputs.heatpump.state, RunState::Off);
        assert_eq!(d.outputs.heatpump.last_mode_change, Some(t0() + Duration::minutes(1)));
        assert!(!d.outputs.zone_call);
    }

    #[test]
    fn test_window_decision_uses_new_mode() {
        let mut inputs = winter_morning();
        inputs.outdoor.temperature = 20.0;
        inputs.outdoor.dewpoint = 8.0;
        let d = decide(&inputs, &ControlOutputs::default(), t0(), &ControlConfig::default());
        // previous mode was AUTO, which never opens windows
        assert_eq!(d.outputs.window, WindowState::Open);
        assert!(!d.outputs.zone_call);
        assert!(d.transitions.contains(&Transition::Window(WindowState::Open)));
    }
}
