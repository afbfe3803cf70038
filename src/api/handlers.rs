use axum::{extract::State, Json};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::control::{HeatpumpMode, RunState};
use crate::controller::{Controller, ControllerSnapshot};
use crate::error::{AppError, Result};

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<Controller>,
}

/// Override request. `AUTO` or `null` hands the axis back to the selector.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OverrideRequest {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

fn parse_mode(value: Option<&str>) -> Result<Option<HeatpumpMode>> {
    match value.map(str::to_ascii_uppercase).as_deref() {
        None | Some("AUTO") => Ok(None),
        Some("HEAT") => Ok(Some(HeatpumpMode::Heat)),
        Some("COOL") => Ok(Some(HeatpumpMode::Cool)),
        Some(other) => Err(AppError::InvalidInput(format!(
            "mode must be HEAT, COOL or AUTO, got {}",
            other
        ))),
    }
}

fn parse_state(value: Option<&str>) -> Result<Option<RunState>> {
    match value.map(str::to_ascii_uppercase).as_deref() {
        None | Some("AUTO") => Ok(None),
        Some("ON") => Ok(Some(RunState::On)),
        Some("OFF") => Ok(Some(RunState::Off)),
        Some(other) => Err(AppError::InvalidInput(format!(
            "state must be ON, OFF or AUTO, got {}",
            other
        ))),
    }
}

pub async fn health() -> &'static str {
    "OK"
}

/// GET /controller/state
pub async fn get_state(State(state): State<AppState>) -> Json<ControllerSnapshot> {
    Json(state.controller.current_state())
}

/// GET /controller/emoncms
pub async fn get_emoncms(State(state): State<AppState>) -> Json<BTreeMap<&'static str, f64>> {
    Json(state.controller.current_state().metrics())
}

/// PUT /controller/override
pub async fn put_override(
    State(state): State<AppState>,
    Json(req): Json<OverrideRequest>,
) -> Result<Json<ControllerSnapshot>> {
    let mode = parse_mode(req.mode.as_deref())?;
    let run_state = parse_state(req.state.as_deref())?;
    Ok(Json(state.controller.set_overrides(mode, run_state)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_returns_ok() {
        assert_eq!(health().await, "OK");
    }

    #[test]
    fn test_parse_override_values() {
        assert_eq!(parse_mode(Some("heat")).unwrap(), Some(HeatpumpMode::Heat));
        assert_eq!(parse_mode(Some("AUTO")).unwrap(), None);
        assert_eq!(parse_mode(None).unwrap(), None);
        assert!(parse_mode(Some("DEFROST")).is_err());

        assert_eq!(parse_state(Some("OFF")).unwrap(), Some(RunState::Off));
        assert_eq!(parse_state(Some("auto")).unwrap(), None);
        assert!(matches!(parse_state(Some("idle")), Err(AppError::InvalidInput(_))));
    }
}
