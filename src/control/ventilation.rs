//! Free ventilation: should the windows be open?

use super::inputs::ControlInputs;
use super::outputs::{HeatpumpMode, WindowState};
use crate::config::VentilationThresholds;

pub fn select_window(
    inputs: &ControlInputs,
    mode: HeatpumpMode,
    t: &VentilationThresholds,
) -> WindowState {
    if inputs.outdoor.aqhi > t.max_aqhi {
        return WindowState::Closed;
    }
    let open = match mode {
        HeatpumpMode::Heat => heat_window_open(inputs, t),
        HeatpumpMode::Cool => cool_window_open(inputs, t),
        HeatpumpMode::Auto => false,
    };
    if open {
        WindowState::Open
    } else {
        WindowState::Closed
    }
}

/// Free heating from mild outdoor air, but never admit hot humid air.
fn heat_window_open(inputs: &ControlInputs, t: &VentilationThresholds) -> bool {
    let out = &inputs.outdoor;
    let in_band = out.temperature >= t.heat_open_min && out.temperature <= t.heat_open_max;
    let humid = out.dewpoint > t.humid_dewpoint && out.dewpoint > inputs.indoor.dewpoint;
    in_band && !humid
}

fn cool_window_open(inputs: &ControlInputs, t: &VentilationThresholds) -> bool {
    let out = &inputs.outdoor;
    let indoor = &inputs.indoor;

    let favorable = out.temperature < indoor.temperature - t.strong_differential;

    let dry_enough = out.dewpoint <= t.humid_dewpoint
        || out.dewpoint <= indoor.dewpoint
        || (favorable && out.dewpoint <= indoor.dewpoint + t.strong_differential);
    let not_too_warm = out.temperature <= indoor.cool_setpoint() || favorable;
    let above_floor = out.temperature >= indoor.heat_setpoint() - t.cooling_floor_offset;
    let nice_out = out.temperature >= t.comfort_min && out.temperature <= t.comfort_max;
    let benefit = out.temperature < indoor.temperature || nice_out;

    dry_enough && not_too_warm && above_floor && benefit
}
