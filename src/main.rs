mod api;
mod config;
mod error;
mod logger;
mod status;
mod telegram;
mod watcher;

use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::api::PracticumClient;
use crate::config::Config;
use crate::telegram::TelegramClient;
use crate::watcher::Watcher;

const HTTP_TIMEOUT_SECS: u64 = 30;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = logger::init_logging();

    let config = Config::from_env().map_err(|err| {
        tracing::error!(error = %err, "Missing required credentials, refusing to start");
        err
    })?;

    tracing::info!(
        poll_interval_secs = config.poll_interval.as_secs(),
        "Starting homework status watcher"
    );

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
        .build()
        .context("Failed to build HTTP client")?;

    let source = PracticumClient::new(http.clone(), config.practicum_token);
    let notifier = TelegramClient::new(http, config.telegram_token, config.telegram_chat_id);
    let watcher = Watcher::new(source, notifier, config.poll_interval);

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_token.cancel();
        }
    });

    watcher.run(shutdown).await;
    tracing::info!("Watcher stopped");
    Ok(())
}
