//! Push notifications through an ntfy server.

use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, error, warn};

use crate::config::NotifyConfig;
use crate::effects::{Notification, Notifier};
use crate::error::{AppError, Result};

#[derive(Clone)]
pub struct NtfyClient {
    client: reqwest::Client,
    url: String,
}

impl NtfyClient {
    pub fn new(cfg: &NotifyConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        let server = cfg.server.trim_end_matches('/');
        let server = if server.starts_with("http://") || server.starts_with("https://") {
            server.to_string()
        } else {
            format!("http://{}", server)
        };
        Ok(Self {
            client,
            url: format!("{}/{}", server, cfg.topic),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn publish(&self, n: &Notification) -> Result<()> {
        let mut req = self.client.post(&self.url).body(n.body.clone());
        if !n.title.is_empty() {
            req = req.header("Title", n.title.as_str());
        }
        if !n.tags.is_empty() {
            req = req.header("Tags", n.tags.join(","));
        }
        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(AppError::Other(anyhow::anyhow!(
                "ntfy responded with {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

impl Notifier for NtfyClient {
    fn notify(&self, notification: Notification) {
        let Ok(handle) = Handle::try_current() else {
            warn!(title = %notification.title, "no async runtime; notification dropped");
            return;
        };
        let client = self.clone();
        handle.spawn(async move {
            match client.publish(&notification).await {
                Ok(()) => debug!(title = %notification.title, "notification sent"),
                Err(e) => error!(title = %notification.title, error = %e, "notification failed"),
            }
        });
    }
}
