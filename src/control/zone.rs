use super::inputs::ControlInputs;
use super::outputs::{Heatpump, HeatpumpMode, RunState, WindowState};

/// Room is more than `margin` above its heat setpoint.
pub fn room_too_hot(heat_setpoint_error: f64, margin: f64) -> bool {
    heat_setpoint_error > margin
}

/// Room is more than `margin` below its cool setpoint.
pub fn room_too_cold(cool_setpoint_error: f64, margin: f64) -> bool {
    cool_setpoint_error < -margin
}

/// Should the zone circulator run?
pub fn select_zone_call(
    inputs: &ControlInputs,
    heatpump: &Heatpump,
    window: WindowState,
    margin: f64,
) -> bool {
    // open windows carry the load; an idle plant has nothing to circulate
    if window == WindowState::Open || heatpump.state == RunState::Off {
        return false;
    }
    match heatpump.mode {
        HeatpumpMode::Heat => !room_too_hot(inputs.indoor.heat_setpoint_error, margin),
        HeatpumpMode::Cool => !room_too_cold(inputs.indoor.cool_setpoint_error, margin),
        HeatpumpMode::Auto => false,
    }
}
