use std::sync::Arc;

use hydronic_controller::actuators::PhidgetsClient;
use hydronic_controller::api;
use hydronic_controller::config::Config;
use hydronic_controller::controller::Controller;
use hydronic_controller::effects::{LogNotifier, Notifier};
use hydronic_controller::ingest::Ingestor;
use hydronic_controller::mqtt;
use hydronic_controller::notify::NtfyClient;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let cfg_path =
        std::env::var("APP_CONFIG").unwrap_or_else(|_| "config/config.example.yaml".into());
    let cfg = Config::load(&cfg_path)?;
    info!(path = %cfg_path, "loaded config");

    let (actuator, writer) = PhidgetsClient::new(&cfg.actuators)?;
    let actuator = Arc::new(actuator);
    let writer = tokio::spawn(writer.run());
    info!(base_url = %cfg.actuators.base_url, "actuator client ready");

    let notifier: Arc<dyn Notifier> = match &cfg.notify {
        Some(n) if n.enabled => {
            let client = NtfyClient::new(n)?;
            info!(url = %client.url(), "push notifications enabled");
            Arc::new(client)
        }
        _ => {
            info!("push notifications disabled; logging only");
            Arc::new(LogNotifier)
        }
    };

    let controller = Arc::new(Controller::new(
        cfg.control.clone(),
        cfg.actuators.clone(),
        actuator,
        notifier,
    ));

    let app = api::create_router(controller.clone());
    let bind_addr = format!("{}:{}", cfg.http.host, cfg.http.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Starting API server on {}", bind_addr);
    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!(error = %e, "API server stopped");
        }
    });

    let opts = mqtt::build_options(&cfg.mqtt)?;
    let (client, mut eventloop) = mqtt::new(opts);
    let ingestor = Ingestor::new(controller, &cfg.topics);
    for filter in ingestor.filters() {
        client.subscribe(filter, mqtt::qos(cfg.mqtt.qos)).await?;
        info!(filter = %filter, "subscribed");
    }

    let sig = shutdown_signal();
    tokio::pin!(sig);
    loop {
        tokio::select! {
            biased;
            _ = &mut sig => {
                info!("shutdown requested");
                break;
            }
            res = mqtt::next_publish(&mut eventloop) => {
                match res {
                    Ok(Some(msg)) => {
                        let topic = match std::str::from_utf8(&msg.topic) {
                            Ok(s) => s.to_string(),
                            Err(_) => {
                                warn!(topic_bytes = ?msg.topic, "non-utf8 topic; skipping message");
                                continue;
                            }
                        };
                        if let Err(e) = ingestor.handle_message(&topic, msg.payload.as_ref()) {
                            warn!(topic = %topic, error = %e, "discarded incoming message");
                        }
                    }
                    Ok(None) => continue,
                    Err(e) => {
                        warn!("mqtt error: {e}; reconnecting after short delay");
                        tokio::time::sleep(std::time::Duration::from_secs(2)).await;
                    }
                }
            }
        }
    }

    server.abort();
    writer.abort();
    info!("controller shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
