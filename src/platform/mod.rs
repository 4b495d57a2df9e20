pub mod discord;

use chrono::{DateTime, Utc};

/// A chat message received from the gateway, reduced to the fields the
/// forwarder reads. Ids are platform snowflakes.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub id: u64,
    pub channel_id: u64,
    /// `None` for direct messages
    pub guild_id: Option<u64>,
    pub author: InboundAuthor,
    pub content: String,
    /// Users explicitly mentioned, in gateway order
    pub mentions: Vec<MentionedUser>,
    pub attachments: Vec<InboundAttachment>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InboundAuthor {
    pub id: u64,
    pub username: String,
    /// Legacy tag, `"0"` for accounts migrated to unique usernames
    pub discriminator: String,
    pub global_name: Option<String>,
    pub bot: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MentionedUser {
    pub id: u64,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InboundAttachment {
    pub id: u64,
    pub name: String,
    pub url: String,
}

impl InboundMessage {
    /// Whether the user appears in the gateway-provided mention set.
    /// Raw `<@id>` text in the content is not considered.
    pub fn mentions_user(&self, user_id: u64) -> bool {
        self.mentions.iter().any(|m| m.id == user_id)
    }
}
