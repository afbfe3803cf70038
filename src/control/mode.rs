//! Heat pump mode and run-state selection.
//!
//! Two axes: the mode only flips near its own extreme outdoor condition and
//! prefers to stay where it is, while the run-state says whether there is a
//! load at all. A plant can sit in a mode and idle without thrashing modes.

use super::inputs::ControlInputs;
use super::outputs::{HeatpumpMode, RunState};
use crate::config::ModeThresholds;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeDecision {
    pub mode: HeatpumpMode,
    pub state: RunState,
}

/// 24h statistics say the house is losing heat.
pub fn cold_out(inputs: &ControlInputs, t: &ModeThresholds) -> bool {
    inputs.outdoor.t24h_mean < t.cold_mean_below && inputs.outdoor.t24h_max < t.cold_max_below
}

/// 24h statistics say the house is gaining heat.
pub fn hot_out(inputs: &ControlInputs, t: &ModeThresholds) -> bool {
    inputs.outdoor.t24h_mean > t.hot_mean_above && inputs.outdoor.t24h_min > t.hot_min_above
}

/// Halfway between the effective heat and cool setpoints.
pub fn setpoint_midpoint(inputs: &ControlInputs) -> f64 {
    (inputs.indoor.cool_setpoint() + inputs.indoor.heat_setpoint()) / 2.0
}

pub fn select_mode(
    inputs: &ControlInputs,
    current: HeatpumpMode,
    thresholds: &ModeThresholds,
) -> ModeDecision {
    let cold = cold_out(inputs, thresholds);
    let hot = hot_out(inputs, thresholds);
    let midpoint = setpoint_midpoint(inputs);
    let indoor = inputs.indoor.temperature;

    let mode = match current {
        HeatpumpMode::Auto if cold => HeatpumpMode::Heat,
        HeatpumpMode::Auto => HeatpumpMode::Cool,
        m => m,
    };

    if cold {
        if mode == HeatpumpMode::Heat || indoor < midpoint {
            return ModeDecision {
                mode: HeatpumpMode::Heat,
                state: RunState::On,
            };
        }
        return ModeDecision {
            mode,
            state: RunState::Off,
        };
    }

    if hot {
        if mode == HeatpumpMode::Cool || indoor > midpoint {
            return ModeDecision {
                mode: HeatpumpMode::Cool,
                state: RunState::On,
            };
        }
        return ModeDecision {
            mode,
            state: RunState::Off,
        };
    }

    ModeDecision {
        mode,
        state: RunState::On,
    }
}
