use std::num::NonZeroU16;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use serenity::async_trait;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use tracing::{debug, error, info};

use crate::forwarder::{MentionForwarder, Outcome};
use crate::platform::{InboundAttachment, InboundAuthor, InboundMessage, MentionedUser};

/// Milliseconds between the Unix epoch and the first second of 2015.
const DISCORD_EPOCH_MS: i64 = 1_420_070_400_000;

/// Creation time encoded in a Discord snowflake.
fn snowflake_time(id: u64) -> Option<DateTime<Utc>> {
    let millis = i64::try_from(id >> 22).ok()? + DISCORD_EPOCH_MS;
    DateTime::from_timestamp_millis(millis)
}

/// Legacy four-digit tag, or `"0"` for users on unique usernames.
fn legacy_discriminator(discriminator: Option<NonZeroU16>) -> String {
    match discriminator {
        Some(d) => format!("{:04}", d.get()),
        None => "0".to_string(),
    }
}

impl TryFrom<&Message> for InboundMessage {
    type Error = anyhow::Error;

    fn try_from(msg: &Message) -> Result<Self> {
        let created_at = snowflake_time(msg.id.get())
            .with_context(|| format!("Message id {} has no valid timestamp", msg.id))?;

        Ok(Self {
            id: msg.id.get(),
            channel_id: msg.channel_id.get(),
            guild_id: msg.guild_id.map(|g| g.get()),
            author: InboundAuthor {
                id: msg.author.id.get(),
                username: msg.author.name.clone(),
                discriminator: legacy_discriminator(msg.author.discriminator),
                global_name: msg.author.global_name.clone(),
                bot: msg.author.bot,
            },
            content: msg.content.clone(),
            mentions: msg
                .mentions
                .iter()
                .map(|u| MentionedUser {
                    id: u.id.get(),
                    username: u.name.clone(),
                })
                .collect(),
            attachments: msg
                .attachments
                .iter()
                .map(|a| InboundAttachment {
                    id: a.id.get(),
                    name: a.filename.clone(),
                    url: a.url.clone(),
                })
                .collect(),
            created_at,
        })
    }
}

struct Handler {
    forwarder: Arc<MentionForwarder>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("Logged in as {} (id: {})", ready.user.tag(), ready.user.id);
    }

    // Serenity runs each event on its own task, so a slow webhook never
    // blocks the gateway.
    async fn message(&self, _ctx: Context, msg: Message) {
        let inbound = match InboundMessage::try_from(&msg) {
            Ok(m) => m,
            Err(e) => {
                error!("Error handling message: {:#}", e);
                return;
            }
        };

        if let Outcome::Ignored(reason) = self.forwarder.handle(&inbound).await {
            debug!("Ignored message {}: {}", inbound.id, reason);
        }
    }
}

/// Gateway capabilities the forwarder needs: guild messages and their content.
pub fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT
}

/// Connect to the gateway and dispatch messages until shutdown.
pub async fn run(token: &str, forwarder: Arc<MentionForwarder>) -> Result<()> {
    info!("Starting Discord gateway client...");

    let mut client = Client::builder(token, intents())
        .event_handler(Handler { forwarder })
        .await
        .context("Failed to create Discord client")?;

    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received, closing gateway connection");
            shard_manager.shutdown_all().await;
        }
    });

    client
        .start()
        .await
        .context("Discord gateway client stopped with an error")?;

    info!("Discord gateway client stopped");
    Ok(())
}
