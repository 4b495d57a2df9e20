use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use crate::platform::InboundMessage;

/// JSON body posted to the webhook for every forwarded mention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundPayload {
    pub content: String,
    pub author: PayloadAuthor,
    pub channel_id: String,
    pub guild_id: String,
    pub message_id: String,
    pub mentions: Vec<PayloadMention>,
    pub attachments: Vec<PayloadAttachment>,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadAuthor {
    pub id: String,
    pub username: String,
    pub discriminator: String,
    /// Serialized as `null` when the user has no display name
    pub global_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadMention {
    pub id: String,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadAttachment {
    pub id: String,
    pub name: String,
    pub url: String,
}

impl OutboundPayload {
    /// Build the payload for a guild message. Returns `None` for direct
    /// messages, which never carry a guild id to forward.
    pub fn from_message(msg: &InboundMessage) -> Option<Self> {
        let guild_id = msg.guild_id?;

        Some(Self {
            content: msg.content.clone(),
            author: PayloadAuthor {
                id: msg.author.id.to_string(),
                username: msg.author.username.clone(),
                discriminator: msg.author.discriminator.clone(),
                global_name: msg.author.global_name.clone(),
            },
            channel_id: msg.channel_id.to_string(),
            guild_id: guild_id.to_string(),
            message_id: msg.id.to_string(),
            mentions: msg
                .mentions
                .iter()
                .map(|m| PayloadMention {
                    id: m.id.to_string(),
                    username: m.username.clone(),
                })
                .collect(),
            attachments: msg
                .attachments
                .iter()
                .map(|a| PayloadAttachment {
                    id: a.id.to_string(),
                    name: a.name.clone(),
                    url: a.url.clone(),
                })
                .collect(),
            timestamp: msg
                .created_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        })
    }
}
