// Discord commands for manual warnings.
//
// Same pattern as the rest of the command layer:
// 1. Extract primitive data from Discord types
// 2. Check access with the core predicates
// 3. Call the warning service and format the result

use crate::core::access::{can_warn, is_exempt, is_moderator};
use crate::core::warnings::{ManualWarnOutcome, ManualWarning, SourceMessage};
use crate::discord::moderation::member_access::resolve_member_access;
use crate::discord::moderation::mod_log;
use crate::discord::{Context, Data, Error};
use poise::serenity_prelude as serenity;
use std::time::Duration;

const NO_PERMISSION: &str = "You do not have permission to use this command.";

async fn say_ephemeral(ctx: Context<'_>, content: impl Into<String>) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .content(content)
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Whether the invoking member passes `check` under this guild's settings.
async fn invoker_passes(
    ctx: Context<'_>,
    guild_id: serenity::GuildId,
    check: fn(&crate::core::access::MemberAccess, &crate::core::settings::GuildSettings) -> bool,
) -> Result<bool, Error> {
    let settings = ctx.data().settings.get(guild_id.get()).await?;
    match resolve_member_access(ctx.serenity_context(), guild_id, ctx.author().id).await {
        Ok(access) => Ok(check(&access, &settings)),
        Err(_) => Ok(false),
    }
}

/// Shared by `/warn` and the "Warn User" context menu.
async fn issue_warning(
    ctx: Context<'_>,
    target: &serenity::User,
    reason: String,
    source: Option<SourceMessage>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let settings = ctx.data().settings.get(guild_id.get()).await?;

    let Ok(issuer) = resolve_member_access(ctx.serenity_context(), guild_id, ctx.author().id).await
    else {
        return say_ephemeral(ctx, NO_PERMISSION).await;
    };
    if !can_warn(&issuer, &settings) {
        return say_ephemeral(ctx, NO_PERMISSION).await;
    }
    if target.bot {
        return say_ephemeral(ctx, "You cannot warn a bot.").await;
    }
    let Ok(target_access) = resolve_member_access(ctx.serenity_context(), guild_id, target.id).await
    else {
        return say_ephemeral(ctx, "Could not find that user in this server.").await;
    };
    if is_exempt(&target_access, &settings) {
        return say_ephemeral(
            ctx,
            "You cannot warn a moderator or someone with a higher role.",
        )
        .await;
    }

    let outcome = ctx
        .data()
        .warnings
        .issue_manual(
            ManualWarning {
                guild_id: guild_id.get(),
                target_id: target.id.get(),
                moderator_id: ctx.author().id.get(),
                reason: reason.clone(),
                source,
            },
            settings.warning_threshold,
        )
        .await?;

    match outcome {
        ManualWarnOutcome::Issued { warning, total } => {
            say_ephemeral(
                ctx,
                format!(
                    "Warning issued to <@{}> (now has {} total warning(s)).\n**Reason:** {}",
                    target.id, total, reason
                ),
            )
            .await?;

            let notice_channel = source
                .map(|s| s.channel_id)
                .unwrap_or_else(|| ctx.channel_id().get());
            mod_log::announce_warning(
                &ctx.serenity_context().http,
                &settings,
                guild_id.get(),
                notice_channel,
                &warning,
                total,
                source,
            )
            .await;
        }
        ManualWarnOutcome::NeedsConfirmation {
            action_id,
            existing,
            threshold,
        } => {
            let embed = mod_log::threshold_embed(&existing, &target.tag(), threshold);
            ctx.send(
                poise::CreateReply::default()
                    .content(format!("**New warning reason:** {}", reason))
                    .embed(embed)
                    .components(vec![mod_log::confirmation_row(
                        &action_id,
                        issuer.ban_members,
                    )])
                    .ephemeral(true),
            )
            .await?;
        }
    }

    Ok(())
}

/// Issue a warning to a user.
#[poise::command(slash_command, guild_only, default_member_permissions = "MODERATE_MEMBERS")]
pub async fn warn(
    ctx: Context<'_>,
    #[description = "The user to warn"] user: serenity::User,
    #[description = "Reason for the warning"] reason: String,
) -> Result<(), Error> {
    issue_warning(ctx, &user, reason, None).await
}

#[derive(Debug, poise::Modal)]
#[name = "Warn user"]
struct WarnReasonModal {
    #[name = "Reason for warning"]
    #[placeholder = "Enter the reason for this warning..."]
    #[paragraph]
    #[max_length = 1024]
    reason: Option<String>,
}

/// Warn the author of a message.
#[poise::command(
    context_menu_command = "Warn User",
    guild_only,
    default_member_permissions = "MODERATE_MEMBERS"
)]
pub async fn warn_user(
    ctx: poise::ApplicationContext<'_, Data, Error>,
    message: serenity::Message,
) -> Result<(), Error> {
    if message.author.bot {
        return say_ephemeral(poise::Context::Application(ctx), "You cannot warn a bot.").await;
    }

    let Some(form) =
        poise::execute_modal(ctx, None::<WarnReasonModal>, Some(Duration::from_secs(600))).await?
    else {
        return Ok(());
    };
    let reason = form
        .reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| "No reason provided".to_string());

    let source = SourceMessage {
        channel_id: message.channel_id.get(),
        message_id: message.id.get(),
    };
    issue_warning(
        poise::Context::Application(ctx),
        &message.author,
        reason,
        Some(source),
    )
    .await
}

/// View warnings for a user.
#[poise::command(slash_command, guild_only, default_member_permissions = "MODERATE_MEMBERS")]
pub async fn warnings(
    ctx: Context<'_>,
    #[description = "The user to check"] user: serenity::User,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    if !invoker_passes(ctx, guild_id, is_moderator).await? {
        return say_ephemeral(ctx, NO_PERMISSION).await;
    }

    let list = ctx.data().warnings.list(guild_id.get(), user.id.get()).await?;
    let embed = mod_log::warnings_embed(&list, format!("Warnings for {}", user.tag()));
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// View your own warnings.
#[poise::command(slash_command, guild_only)]
pub async fn mywarnings(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let list = ctx
        .data()
        .warnings
        .list(guild_id.get(), ctx.author().id.get())
        .await?;
    let embed = mod_log::warnings_embed(&list, "Your Warnings");
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// Which warning(s) `/clearwarning` should remove.
#[derive(Debug, PartialEq, Eq)]
enum ClearTarget {
    All,
    /// 1-based, oldest first.
    Number(usize),
}

fn parse_clear_target(input: &str) -> Option<ClearTarget> {
    let input = input.trim().to_lowercase();
    if input == "all" {
        return Some(ClearTarget::All);
    }
    match input.parse::<usize>() {
        Ok(n) if n >= 1 => Some(ClearTarget::Number(n)),
        _ => None,
    }
}

/// Remove a warning from a user (still logged). Use "all" to clear all warnings.
#[poise::command(slash_command, guild_only, default_member_permissions = "MODERATE_MEMBERS")]
pub async fn clearwarning(
    ctx: Context<'_>,
    #[description = "The user to remove a warning from"] user: serenity::User,
    #[description = "Warning number as shown in /warnings (1 = first warning received), or \"all\""]
    number: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    if !invoker_passes(ctx, guild_id, is_moderator).await? {
        return say_ephemeral(ctx, NO_PERMISSION).await;
    }

    let data = ctx.data();
    let list = data.warnings.list(guild_id.get(), user.id.get()).await?;
    if list.is_empty() {
        return say_ephemeral(ctx, format!("<@{}> has no warnings to remove.", user.id)).await;
    }

    let settings = data.settings.get(guild_id.get()).await?;
    let http = &ctx.serenity_context().http;

    match parse_clear_target(&number) {
        None => {
            say_ephemeral(
                ctx,
                "Please provide a valid warning number (e.g. `1`) or `all`.",
            )
            .await
        }
        Some(ClearTarget::All) => {
            let removed = data.warnings.clear_all(guild_id.get(), user.id.get()).await?;
            say_ephemeral(
                ctx,
                format!("Cleared all **{}** warning(s) from <@{}>.", removed, user.id),
            )
            .await?;
            mod_log::post_log(
                http,
                settings.warn_log_channel_id,
                mod_log::warnings_cleared_embed(user.id.get(), ctx.author().id.get(), removed),
            )
            .await;
            Ok(())
        }
        Some(ClearTarget::Number(n)) if n > list.len() => {
            say_ephemeral(
                ctx,
                format!(
                    "<@{}> only has **{}** warning(s). Please provide a number between 1 and {}, or `all`.",
                    user.id,
                    list.len(),
                    list.len()
                ),
            )
            .await
        }
        Some(ClearTarget::Number(n)) => {
            let warning = &list[n - 1];
            data.warnings.delete_one(warning.id, guild_id.get()).await?;
            say_ephemeral(
                ctx,
                format!(
                    "Removed warning #{} from <@{}>.\n**Reason was:** {}",
                    n, user.id, warning.reason
                ),
            )
            .await?;
            mod_log::post_log(
                http,
                settings.warn_log_channel_id,
                mod_log::warning_removed_embed(
                    warning,
                    ctx.author().id.get(),
                    (list.len() - 1) as u64,
                ),
            )
            .await;
            Ok(())
        }
    }
}

/// Clear all warnings for a user.
#[poise::command(slash_command, guild_only, default_member_permissions = "MODERATE_MEMBERS")]
pub async fn clearwarnings(
    ctx: Context<'_>,
    #[description = "The user to clear warnings for"] user: serenity::User,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    if !invoker_passes(ctx, guild_id, is_moderator).await? {
        return say_ephemeral(ctx, NO_PERMISSION).await;
    }

    let count = ctx.data().warnings.count(guild_id.get(), user.id.get()).await?;
    if count == 0 {
        return say_ephemeral(ctx, format!("<@{}> has no warnings to clear.", user.id)).await;
    }

    let removed = ctx
        .data()
        .warnings
        .clear_all(guild_id.get(), user.id.get())
        .await?;
    say_ephemeral(
        ctx,
        format!("Cleared **{}** warning(s) for <@{}>.", removed, user.id),
    )
    .await
}
