//! Listen for Pushover messages and print them.
//!
//! Run with:
//!
//! ```text
//! PUSHOVER_EMAIL=me@example.com PUSHOVER_PASSWORD=... \
//!     cargo run -p pushover-listen -- [config.toml]
//! ```
//!
//! The config path may also come from `PUSHOVER_CONFIG`. `RUST_LOG` controls
//! log output.

use std::{env, path::PathBuf, sync::Arc};

use anyhow::Context;
use pushover_listener_client::{ClientConfig, ClientRegistry, Credentials, PushoverClient};
use pushover_listener_core::MessageEvent;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_DEVICE_NAME: &str = "pushover-listen";
const ENTRY_ID: &str = "default";

fn load_config() -> anyhow::Result<ClientConfig> {
    let path = env::args_os()
        .nth(1)
        .or_else(|| env::var_os("PUSHOVER_CONFIG"))
        .map(PathBuf::from);
    let Some(path) = path else {
        return Ok(ClientConfig::default());
    };
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("reading {}", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn credentials() -> anyhow::Result<Credentials> {
    let email = env::var("PUSHOVER_EMAIL").context("PUSHOVER_EMAIL is not set")?;
    let password = env::var("PUSHOVER_PASSWORD").context("PUSHOVER_PASSWORD is not set")?;
    let device_name =
        env::var("PUSHOVER_DEVICE_NAME").unwrap_or_else(|_| DEFAULT_DEVICE_NAME.to_string());
    Ok(Credentials::new(email, password, device_name)?)
}

fn print_event(event: &MessageEvent) {
    let body = event
        .get("message")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    println!("[{}] {}", event.summary(), body);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = load_config()?;
    let credentials = credentials()?;
    tracing::info!(email = %credentials.email, device_name = %credentials.device_name, "Starting");

    let (tx, mut rx) = mpsc::unbounded_channel();
    let client = Arc::new(PushoverClient::new(config, credentials, Arc::new(tx))?);
    let registry = ClientRegistry::new();
    registry.start_entry(ENTRY_ID, client).await?;

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Some(event) => print_event(&event),
                None => break,
            },
            result = tokio::signal::ctrl_c() => {
                result.context("waiting for ctrl-c")?;
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    registry.stop_all().await;
    Ok(())
}
