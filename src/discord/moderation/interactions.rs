// Button handling for warning and ban-confirmation messages.
//
// Custom ids are `<action>:<param>`; they are decoded once into
// `ComponentAction` and everything below works on the enum.

use crate::core::access::is_moderator;
use crate::core::warnings::PendingClaim;
use crate::discord::moderation::member_access::resolve_member_access;
use crate::discord::moderation::mod_log;
use crate::discord::{Data, Error};
use poise::serenity_prelude as serenity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentAction {
    ViewWarnings { user_id: u64 },
    BanUser { action_id: String },
    ContinueWarning { action_id: String },
    CancelAction { action_id: String },
}

impl ComponentAction {
    pub fn parse(custom_id: &str) -> Option<Self> {
        let (action, param) = custom_id.split_once(':')?;
        if param.is_empty() {
            return None;
        }
        let action_id = param.to_string();
        match action {
            "view_warnings" => param
                .parse()
                .ok()
                .map(|user_id| ComponentAction::ViewWarnings { user_id }),
            "ban_user" => Some(ComponentAction::BanUser { action_id }),
            "continue_warn" => Some(ComponentAction::ContinueWarning { action_id }),
            "cancel_action" => Some(ComponentAction::CancelAction { action_id }),
            _ => None,
        }
    }

    pub fn custom_id(&self) -> String {
        match self {
            ComponentAction::ViewWarnings { user_id } => format!("view_warnings:{user_id}"),
            ComponentAction::BanUser { action_id } => format!("ban_user:{action_id}"),
            ComponentAction::ContinueWarning { action_id } => format!("continue_warn:{action_id}"),
            ComponentAction::CancelAction { action_id } => format!("cancel_action:{action_id}"),
        }
    }
}

async fn reply_ephemeral(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
    content: impl Into<String>,
) -> Result<(), Error> {
    interaction
        .create_response(
            &ctx.http,
            serenity::CreateInteractionResponse::Message(
                serenity::CreateInteractionResponseMessage::new()
                    .content(content)
                    .ephemeral(true),
            ),
        )
        .await?;
    Ok(())
}

/// Replace the message the button sits on, dropping its embeds and buttons.
async fn update_message(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
    content: impl Into<String>,
) -> Result<(), Error> {
    interaction
        .create_response(
            &ctx.http,
            serenity::CreateInteractionResponse::UpdateMessage(
                serenity::CreateInteractionResponseMessage::new()
                    .content(content)
                    .embeds(vec![])
                    .components(vec![]),
            ),
        )
        .await?;
    Ok(())
}

const EXPIRED: &str = "This action has expired. Please run the command again.";
const NOT_YOURS: &str = "This action is not for you.";

/// Entry point for every button click.
pub async fn handle_component(
    ctx: &serenity::Context,
    interaction: &serenity::ComponentInteraction,
    data: &Data,
) -> Result<(), Error> {
    let Some(action) = ComponentAction::parse(&interaction.data.custom_id) else {
        return Ok(());
    };
    let Some(guild_id) = interaction.guild_id else {
        return Ok(());
    };
    let actor_id = interaction.user.id.get();

    match action {
        ComponentAction::ViewWarnings { user_id } => {
            let settings = data.settings.get(guild_id.get()).await?;
            let mod_viewing = match resolve_member_access(ctx, guild_id, interaction.user.id).await {
                Ok(access) => is_moderator(&access, &settings),
                Err(_) => false,
            };
            if actor_id != user_id && !mod_viewing {
                return reply_ephemeral(ctx, interaction, "This button is not for you.").await;
            }

            let display_name = match serenity::UserId::new(user_id).to_user(ctx).await {
                Ok(user) => user.tag(),
                Err(_) => format!("Unknown ({user_id})"),
            };
            let warnings = data.warnings.list(guild_id.get(), user_id).await?;
            let embed = mod_log::warnings_embed(&warnings, format!("Warnings for {display_name}"));

            interaction
                .create_response(
                    &ctx.http,
                    serenity::CreateInteractionResponse::Message(
                        serenity::CreateInteractionResponseMessage::new()
                            .embed(embed)
                            .ephemeral(true),
                    ),
                )
                .await?;
        }

        ComponentAction::BanUser { action_id } => {
            let pending = match data.warnings.pending_for(&action_id, actor_id) {
                PendingClaim::Expired => return reply_ephemeral(ctx, interaction, EXPIRED).await,
                PendingClaim::NotOwner => return reply_ephemeral(ctx, interaction, NOT_YOURS).await,
                PendingClaim::Claimed(pending) => pending,
            };

            let audit_reason = format!(
                "Banned by {}: accumulated warnings",
                interaction.user.tag()
            );
            if let Err(e) = guild_id
                .ban_with_reason(&ctx.http, serenity::UserId::new(pending.target_id), 0, &audit_reason)
                .await
            {
                tracing::error!(target_id = pending.target_id, "Failed to ban user: {}", e);
                return reply_ephemeral(ctx, interaction, format!("Failed to ban user: {e}")).await;
            }

            data.warnings.resolve_pending(&action_id);
            tracing::info!(
                guild_id = guild_id.get(),
                target_id = pending.target_id,
                moderator_id = actor_id,
                "User banned after reaching warning threshold"
            );

            update_message(
                ctx,
                interaction,
                format!(
                    "<@{}> has been banned. All warnings have been preserved in the log.",
                    pending.target_id
                ),
            )
            .await?;

            let settings = data.settings.get(guild_id.get()).await?;
            if settings.ban_log_channel_id.is_some() {
                let total = data.warnings.count(guild_id.get(), pending.target_id).await?;
                mod_log::post_log(
                    &ctx.http,
                    settings.ban_log_channel_id,
                    mod_log::ban_log_embed(pending.target_id, actor_id, total, &pending.reason),
                )
                .await;
            }
        }

        ComponentAction::ContinueWarning { action_id } => {
            let (pending, warning, total) =
                match data.warnings.confirm_pending(&action_id, actor_id).await? {
                    PendingClaim::Expired => return reply_ephemeral(ctx, interaction, EXPIRED).await,
                    PendingClaim::NotOwner => {
                        return reply_ephemeral(ctx, interaction, NOT_YOURS).await
                    }
                    PendingClaim::Claimed(claimed) => claimed,
                };

            update_message(
                ctx,
                interaction,
                format!(
                    "Warning issued to <@{}> (now has {} total warning(s)).\n**Reason:** {}",
                    pending.target_id, total, pending.reason
                ),
            )
            .await?;

            let settings = data.settings.get(guild_id.get()).await?;
            mod_log::announce_warning(
                &ctx.http,
                &settings,
                guild_id.get(),
                interaction.channel_id.get(),
                &warning,
                total,
                pending.source,
            )
            .await;
        }

        ComponentAction::CancelAction { action_id } => {
            data.warnings.resolve_pending(&action_id);
            update_message(ctx, interaction, "Action cancelled.").await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_actions() {
        assert_eq!(
            ComponentAction::parse("view_warnings:123"),
            Some(ComponentAction::ViewWarnings { user_id: 123 })
        );
        assert_eq!(
            ComponentAction::parse("ban_user:ab12cd34"),
            Some(ComponentAction::BanUser {
                action_id: "ab12cd34".into()
            })
        );
        assert_eq!(
            ComponentAction::parse("continue_warn:ab12cd34"),
            Some(ComponentAction::ContinueWarning {
                action_id: "ab12cd34".into()
            })
        );
        assert_eq!(
            ComponentAction::parse("cancel_action:ab12cd34"),
            Some(ComponentAction::CancelAction {
                action_id: "ab12cd34".into()
            })
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(ComponentAction::parse("view_warnings:abc"), None);
        assert_eq!(ComponentAction::parse("ban_user:"), None);
        assert_eq!(ComponentAction::parse("ban_user"), None);
        assert_eq!(ComponentAction::parse("something_else:1"), None);
    }

    #[test]
    fn test_custom_id_is_parseable() {
        let action = ComponentAction::ContinueWarning {
            action_id: "0badf00d".into(),
        };
        assert_eq!(action.custom_id(), "continue_warn:0badf00d");
        assert_eq!(ComponentAction::parse(&action.custom_id()), Some(action));
    }
}
