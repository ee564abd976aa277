//! # dossier-watch
//!
//! Connects to one customer's event channel and prints every inbound frame
//! to stdout as a JSON line. Lifecycle changes go to stderr.

#![deny(unsafe_code)]

mod render;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use dossier_core::logging::init_subscriber;
use dossier_core::{AuthToken, SessionId};
use dossier_settings::{DossierSettings, load_settings_from_path, settings_path};
use dossier_stream::events::names;
use dossier_stream::{ClientConfig, EventStreamClient, Listener, StreamEvent};
use tokio::time::{Instant, Interval};
use tracing::info;

/// Watch a customer's document event stream.
#[derive(Parser, Debug)]
#[command(name = "dossier-watch", about = "Watch a customer's document event stream")]
struct Cli {
    /// Customer whose channel to join.
    #[arg(long)]
    customer: String,

    /// Auth token passed in the endpoint query.
    #[arg(long, env = "DOSSIER_TOKEN", hide_env_values = true)]
    token: String,

    /// API base address (overrides settings).
    #[arg(long)]
    base_url: Option<String>,

    /// Reconnect ceiling (overrides settings).
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Base reconnect delay in milliseconds (overrides settings).
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Log filter, e.g. `info` or `dossier_stream=debug`.
    #[arg(long)]
    log_level: Option<String>,

    /// Send a `ping` frame every N seconds while connected.
    #[arg(long)]
    ping_secs: Option<u64>,

    /// Settings file (defaults to `~/.dossier/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,
}

impl Cli {
    fn apply(&self, settings: &mut DossierSettings) {
        if let Some(url) = &self.base_url {
            settings.stream.api_base_url.clone_from(url);
        }
        if let Some(n) = self.max_attempts {
            settings.stream.max_reconnect_attempts = n;
        }
        if let Some(ms) = self.delay_ms {
            settings.stream.reconnect_delay_ms = ms;
        }
        if let Some(level) = &self.log_level {
            settings.logging.level.clone_from(level);
        }
    }

    fn ping_interval(&self) -> Option<Interval> {
        let period = Duration::from_secs(self.ping_secs.filter(|s| *s > 0)?);
        Some(tokio::time::interval_at(Instant::now() + period, period))
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            let _ = interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Cli::parse();

    let path = args.settings.clone().unwrap_or_else(settings_path);
    let mut settings = load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    args.apply(&mut settings);
    settings.validate().context("Invalid settings")?;
    init_subscriber(&settings.logging.level);

    let session_id = SessionId::new(args.customer.as_str()).context("Invalid --customer")?;
    let client = EventStreamClient::new(ClientConfig::from(&settings.stream));

    let (status_listener, mut status) = Listener::channel();
    for key in [
        names::CONNECTED,
        names::ERROR,
        names::DISCONNECTED,
        names::MAX_RECONNECT_ATTEMPTS,
    ] {
        client.on(key, &status_listener);
    }
    let (_frames_listener, mut frames) = client.subscribe(names::MESSAGE);

    client.connect(session_id, AuthToken::new(args.token.as_str()));
    let mut ping = args.ping_interval();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let code = loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("interrupted, disconnecting");
                break ExitCode::SUCCESS;
            }
            Some(event) = frames.recv() => {
                if let Some(line) = render::frame_line(&event) {
                    println!("{line}");
                }
            }
            Some(event) = status.recv() => {
                if let Some(line) = render::status_line(&event) {
                    eprintln!("{line}");
                }
                if matches!(event, StreamEvent::MaxReconnectAttempts { .. }) {
                    break ExitCode::FAILURE;
                }
            }
            () = tick(&mut ping) => {
                let _ = client.send_empty("ping");
            }
        }
    };

    client.disconnect();
    Ok(code)
}
