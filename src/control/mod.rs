//! Pure decision logic. Nothing in here touches I/O or the clock.

pub mod decision;
pub mod inputs;
pub mod mode;
pub mod outputs;
pub mod ventilation;
pub mod zone;

pub use decision::{decide, transitions, Decision, Transition};
pub use inputs::{
    dewpoint, ControlInputs, ForecastStats, IndoorConditions, OutdoorConditions, Readiness,
    SensorCache, ThermostatReading,
};
pub use mode::{select_mode, ModeDecision};
pub use outputs::{
    celsius_to_fahrenheit, dewpoint_to_voltage, fahrenheit_to_voltage, ControlOutputs, Heatpump,
    HeatpumpMode, RunState, WindowState,
};
pub use ventilation::select_window;
pub use zone::select_zone_call;
