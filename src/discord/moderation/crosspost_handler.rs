// Discord-specific crosspost handling - feeds guild messages to the detector
// and carries out its deletions and notices.

use crate::core::crosspost::normalizer::{normalized_len, MIN_MESSAGE_LENGTH};
use crate::core::crosspost::{CrosspostVerdict, GatewayError, InboundMessage, ModerationGateway, Notice};
use crate::discord::moderation::member_access::resolve_member_access;
use crate::discord::moderation::mod_log::view_warnings_row;
use crate::discord::{Data, Error};
use async_trait::async_trait;
use chrono::Utc;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// `ModerationGateway` over the serenity HTTP client.
pub struct DiscordGateway {
    http: Arc<serenity::Http>,
    bot_user_id: u64,
}

impl DiscordGateway {
    pub fn new(http: Arc<serenity::Http>, bot_user_id: u64) -> Self {
        Self { http, bot_user_id }
    }
}

#[async_trait]
impl ModerationGateway for DiscordGateway {
    fn bot_user_id(&self) -> u64 {
        self.bot_user_id
    }

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<(), GatewayError> {
        serenity::ChannelId::new(channel_id)
            .delete_message(&self.http, serenity::MessageId::new(message_id))
            .await
            .map_err(|e| GatewayError(e.to_string()))
    }

    async fn send_notice(&self, channel_id: u64, notice: &Notice) -> Result<(), GatewayError> {
        let mut message = serenity::CreateMessage::new().content(&notice.content);
        if let Some(user_id) = notice.view_warnings_for {
            message = message.components(vec![view_warnings_row(user_id)]);
        }
        serenity::ChannelId::new(channel_id)
            .send_message(&self.http, message)
            .await
            .map(|_| ())
            .map_err(|e| GatewayError(e.to_string()))
    }
}

/// Check a message for crossposting and apply the outcome.
///
/// Returns `true` if the message was a crosspost and was handled.
pub async fn handle_message_for_crossposts(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    data: &Data,
) -> Result<bool, Error> {
    // Member lookups can hit the API, so only do it for messages that will be checked.
    let member = match msg.guild_id {
        Some(guild_id)
            if !msg.author.bot && normalized_len(&msg.content) >= MIN_MESSAGE_LENGTH =>
        {
            match resolve_member_access(ctx, guild_id, msg.author.id).await {
                Ok(access) => Some(access),
                Err(e) => {
                    tracing::debug!(user_id = msg.author.id.get(), "Could not resolve member: {}", e);
                    None
                }
            }
        }
        _ => None,
    };

    let inbound = InboundMessage {
        guild_id: msg.guild_id.map(|g| g.get()),
        channel_id: msg.channel_id.get(),
        message_id: msg.id.get(),
        author_id: msg.author.id.get(),
        author_is_bot: msg.author.bot,
        content: msg.content.clone(),
        received_at: Utc::now(),
        member,
    };

    let gateway = DiscordGateway::new(ctx.http.clone(), ctx.cache.current_user().id.get());
    let verdict = data.crosspost.on_message(&inbound, &gateway).await?;

    match verdict {
        CrosspostVerdict::Crosspost(outcome) => {
            tracing::info!(
                guild_id = outcome.incident.guild_id,
                user_id = outcome.incident.user_id,
                action = outcome.incident.action.as_str(),
                warning_count = outcome.warning_count,
                "Crosspost handled"
            );
            Ok(true)
        }
        CrosspostVerdict::Ignored(reason) => {
            tracing::trace!(message_id = inbound.message_id, ?reason, "Message not checked");
            Ok(false)
        }
        CrosspostVerdict::Clean => Ok(false),
    }
}
