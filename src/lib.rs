pub mod actuators;
pub mod api;
pub mod config;
pub mod control;
pub mod controller;
pub mod effects;
pub mod error;
pub mod ingest;
pub mod messages;
pub mod mqtt;
pub mod notify;

pub use controller::{Clock, Controller, ControllerSnapshot, SystemClock};
pub use error::{AppError, Result};
