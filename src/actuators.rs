//! HTTP client for the Phidgets actuator service.
//!
//! Writes are queued and posted one at a time by a single writer task, so a
//! relay always ends up in the state of the last decision.

use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, warn};

use crate::config::ActuatorsConfig;
use crate::effects::{Actuator, DigitalOutput, VoltageOutput};
use crate::error::{AppError, Result};

const QUEUE_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum OutputCommand {
    Digital(DigitalOutput),
    Voltage(VoltageOutput),
}

impl OutputCommand {
    fn name(&self) -> &str {
        match self {
            OutputCommand::Digital(o) => &o.name,
            OutputCommand::Voltage(o) => &o.name,
        }
    }
}

/// Queue side, handed to the controller.
#[derive(Clone)]
pub struct PhidgetsClient {
    tx: mpsc::Sender<OutputCommand>,
    digital_out_url: String,
    voltage_out_url: String,
}

/// Posting side. Run it on the runtime with `tokio::spawn(writer.run())`.
pub struct PhidgetsWriter {
    client: reqwest::Client,
    rx: mpsc::Receiver<OutputCommand>,
    digital_out_url: String,
    voltage_out_url: String,
}

impl PhidgetsClient {
    pub fn new(cfg: &ActuatorsConfig) -> Result<(Self, PhidgetsWriter)> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;
        let base = cfg.base_url.trim_end_matches('/');
        let digital_out_url = format!("{}/phidgets/digital_out", base);
        let voltage_out_url = format!("{}/phidgets/voltage_out", base);
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);

        let writer = PhidgetsWriter {
            client,
            rx,
            digital_out_url: digital_out_url.clone(),
            voltage_out_url: voltage_out_url.clone(),
        };
        let handle = Self {
            tx,
            digital_out_url,
            voltage_out_url,
        };
        Ok((handle, writer))
    }

    pub fn digital_out_url(&self) -> &str {
        &self.digital_out_url
    }

    pub fn voltage_out_url(&self) -> &str {
        &self.voltage_out_url
    }

    // never waits: called with the controller lock held
    fn enqueue(&self, command: OutputCommand) {
        match self.tx.try_send(command) {
            Ok(()) => {}
            Err(TrySendError::Full(c)) => {
                warn!(output = %c.name(), "actuator queue full; write dropped")
            }
            Err(TrySendError::Closed(c)) => {
                warn!(output = %c.name(), "actuator writer stopped; write dropped")
            }
        }
    }
}

impl Actuator for PhidgetsClient {
    fn set_digital_output(&self, output: DigitalOutput) {
        self.enqueue(OutputCommand::Digital(output));
    }

    fn set_voltage_output(&self, output: VoltageOutput) {
        self.enqueue(OutputCommand::Voltage(output));
    }
}

impl PhidgetsWriter {
    /// Post queued writes in order until every client handle is dropped.
    pub async fn run(mut self) {
        info!(url = %self.digital_out_url, "actuator writer started");
        while let Some(command) = self.rx.recv().await {
            let name = command.name().to_string();
            let res = match &command {
                OutputCommand::Digital(o) => self.post(&self.digital_out_url, o).await,
                OutputCommand::Voltage(o) => self.post(&self.voltage_out_url, o).await,
            };
            match res {
                Ok(()) => debug!(output = %name, "actuator write applied"),
                Err(e) => error!(output = %name, error = %e, "actuator write failed"),
            }
        }
        info!("actuator writer stopped");
    }

    /// POST `body` as JSON, failing on transport errors and non-2xx responses.
    pub async fn post<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<()> {
        let resp = self.client.post(url).json(body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(AppError::Other(anyhow::anyhow!(
                "bad status {}: {}",
                status,
                text
            )));
        }
        Ok(())
    }
}
