mod config;
mod forwarder;
mod payload;
mod platform;
mod webhook;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::forwarder::MentionForwarder;
use crate::webhook::WebhookClient;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is fine; values may come from the real environment
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,mention_forwarder=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration; fail before touching the gateway
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::load(config_path.as_deref()).context("Failed to load configuration")?;

    info!("Configuration loaded successfully");
    info!("  Target bot: {}", config.target_bot_id);
    info!("  Webhook: {}", config.webhook_url);

    let webhook = WebhookClient::new(config.webhook_url.clone())?;
    let forwarder = Arc::new(MentionForwarder::new(
        config.target_bot_id,
        Arc::new(webhook),
    ));

    platform::discord::run(&config.bot_token, forwarder).await?;

    Ok(())
}
