use std::fmt;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::payload::OutboundPayload;
use crate::platform::InboundMessage;
use crate::webhook::{DeliveryError, WebhookSink};

/// Why a message was not forwarded. Not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    DirectMessage,
    BotAuthor,
    NotMentioned,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::DirectMessage => write!(f, "direct message"),
            SkipReason::BotAuthor => write!(f, "bot author"),
            SkipReason::NotMentioned => write!(f, "target not mentioned"),
        }
    }
}

/// Result of handling one inbound message.
#[derive(Debug)]
pub enum Outcome {
    Ignored(SkipReason),
    Forwarded,
    #[allow(dead_code)]
    Failed(DeliveryError),
}

/// Forwards guild messages that mention the target bot to a webhook.
/// Holds no per-message state; every call to [`handle`](Self::handle) is independent.
pub struct MentionForwarder {
    target_bot_id: u64,
    sink: Arc<dyn WebhookSink>,
}

impl MentionForwarder {
    pub fn new(target_bot_id: u64, sink: Arc<dyn WebhookSink>) -> Self {
        Self {
            target_bot_id,
            sink,
        }
    }

    /// Eligibility filter: guild context, human author, explicit mention.
    pub fn check(&self, msg: &InboundMessage) -> Result<(), SkipReason> {
        if msg.guild_id.is_none() {
            return Err(SkipReason::DirectMessage);
        }
        if msg.author.bot {
            return Err(SkipReason::BotAuthor);
        }

        let mentioned = msg.mentions_user(self.target_bot_id);
        debug!("Message {} mentions target: {}", msg.id, mentioned);
        if !mentioned {
            return Err(SkipReason::NotMentioned);
        }

        Ok(())
    }

    /// Filter, build and deliver. Makes at most one delivery attempt and
    /// never propagates a failure to the caller beyond the returned outcome.
    pub async fn handle(&self, msg: &InboundMessage) -> Outcome {
        if let Err(reason) = self.check(msg) {
            return Outcome::Ignored(reason);
        }

        let payload = match OutboundPayload::from_message(msg) {
            Some(p) => p,
            None => return Outcome::Ignored(SkipReason::DirectMessage),
        };

        match self.sink.deliver(&payload).await {
            Ok(()) => {
                info!(
                    "Forwarded mention from @{} in #{}",
                    msg.author.username, msg.channel_id
                );
                Outcome::Forwarded
            }
            Err(e) => {
                error!("Error forwarding message {}: {}", msg.id, e.report());
                Outcome::Failed(e)
            }
        }
    }
}
