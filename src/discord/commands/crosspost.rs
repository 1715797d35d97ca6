// Crosspost slash commands - guild configuration and history views.

use crate::core::crosspost::CrosspostIncident;
use crate::core::page::Page;
use crate::core::settings::{GuildSettings, SettingKey, SettingUpdate, SettingsError};
use crate::core::warnings::Warning;
use crate::discord::{Context, Error};
use poise::serenity_prelude as serenity;

/// Crosspost detection commands.
///
/// Configure crosspost detection and review incidents for your server.
#[poise::command(
    slash_command,
    subcommands("status", "set", "exempt", "unexempt", "incidents", "warning_history"),
    required_permissions = "MANAGE_GUILD",
    guild_only
)]
pub async fn crosspost(_ctx: Context<'_>) -> Result<(), Error> {
    // Parent command - shows help
    Ok(())
}

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum SettingChoice {
    #[name = "Moderator role"]
    ModeratorRole,
    #[name = "Warn role"]
    WarnRole,
    #[name = "Similarity threshold (%)"]
    CrosspostThreshold,
    #[name = "Detection window (seconds)"]
    DetectionWindowSecs,
    #[name = "Repeat window (hours)"]
    RepeatWindowHours,
    #[name = "Warning threshold"]
    WarningThreshold,
    #[name = "First offense message"]
    FirstOffenseMessage,
    #[name = "Repeat offense message"]
    RepeatOffenseMessage,
    #[name = "Public warning message"]
    WarnPublicMessage,
    #[name = "Warn log channel"]
    WarnLogChannel,
    #[name = "Ban log channel"]
    BanLogChannel,
}

impl From<SettingChoice> for SettingKey {
    fn from(choice: SettingChoice) -> Self {
        match choice {
            SettingChoice::ModeratorRole => SettingKey::ModeratorRole,
            SettingChoice::WarnRole => SettingKey::WarnRole,
            SettingChoice::CrosspostThreshold => SettingKey::CrosspostThreshold,
            SettingChoice::DetectionWindowSecs => SettingKey::DetectionWindowSecs,
            SettingChoice::RepeatWindowHours => SettingKey::RepeatWindowHours,
            SettingChoice::WarningThreshold => SettingKey::WarningThreshold,
            SettingChoice::FirstOffenseMessage => SettingKey::FirstOffenseMessage,
            SettingChoice::RepeatOffenseMessage => SettingKey::RepeatOffenseMessage,
            SettingChoice::WarnPublicMessage => SettingKey::WarnPublicMessage,
            SettingChoice::WarnLogChannel => SettingKey::WarnLogChannel,
            SettingChoice::BanLogChannel => SettingKey::BanLogChannel,
        }
    }
}

fn role_or_unset(id: Option<u64>) -> String {
    id.map(|id| format!("<@&{id}>"))
        .unwrap_or_else(|| "Not set".to_string())
}

fn channel_or_unset(id: Option<u64>) -> String {
    id.map(|id| format!("<#{id}>"))
        .unwrap_or_else(|| "Not set".to_string())
}

fn template_or_default(text: &Option<String>) -> String {
    text.clone().unwrap_or_else(|| "*Default*".to_string())
}

fn settings_embed(settings: &GuildSettings) -> serenity::CreateEmbed {
    let exempt = if settings.exempt_channels.is_empty() {
        "None".to_string()
    } else {
        settings
            .exempt_channels
            .iter()
            .map(|id| format!("<#{id}>"))
            .collect::<Vec<_>>()
            .join(", ")
    };

    serenity::CreateEmbed::new()
        .title("🔁 Crosspost Detection")
        .color(0x5865F2)
        .field(
            "Detection",
            format!(
                "Similarity ≥ {}% within {} seconds",
                settings.crosspost_threshold, settings.detection_window_secs
            ),
            false,
        )
        .field(
            "Escalation",
            format!(
                "Repeat within {} hours → warning\nBan prompt at {} warning(s)",
                settings.repeat_window_hours, settings.warning_threshold
            ),
            false,
        )
        .field("Moderator role", role_or_unset(settings.moderator_role_id), true)
        .field("Warn role", role_or_unset(settings.warn_role_id), true)
        .field("Exempt channels", exempt, false)
        .field("Warn log", channel_or_unset(settings.warn_log_channel_id), true)
        .field("Ban log", channel_or_unset(settings.ban_log_channel_id), true)
        .field(
            "First offense message",
            template_or_default(&settings.first_offense_message),
            false,
        )
        .field(
            "Repeat offense message",
            template_or_default(&settings.repeat_offense_message),
            false,
        )
        .field(
            "Public warning message",
            template_or_default(&settings.warn_public_message),
            false,
        )
}

/// Show the current crosspost settings.
#[poise::command(slash_command, guild_only)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let settings = ctx.data().settings.get(guild_id.get()).await?;
    ctx.send(poise::CreateReply::default().embed(settings_embed(&settings)))
        .await?;
    Ok(())
}

/// Change a crosspost setting. Use "none" to clear optional values.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn set(
    ctx: Context<'_>,
    #[description = "Setting to change"] setting: SettingChoice,
    #[description = "New value (number, role/channel mention, text, or \"none\")"] value: String,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;
    let key = SettingKey::from(setting);

    let result = match SettingUpdate::parse(key, &value) {
        Ok(update) => ctx.data().settings.apply(guild_id.get(), update).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(settings) => {
            tracing::info!(guild_id = guild_id.get(), setting = key.as_str(), "Setting updated");
            ctx.send(
                poise::CreateReply::default()
                    .content(format!("✅ `{}` updated.", key))
                    .embed(settings_embed(&settings)),
            )
            .await?;
        }
        Err(e @ SettingsError::StorageError(_)) => return Err(e.into()),
        Err(e) => {
            ctx.send(
                poise::CreateReply::default()
                    .content(format!("❌ {}", e))
                    .ephemeral(true),
            )
            .await?;
        }
    }
    Ok(())
}

/// Stop checking a channel for crossposts.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn exempt(
    ctx: Context<'_>,
    #[description = "Channel to exempt"] channel: serenity::GuildChannel,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let exempt = ctx
        .data()
        .settings
        .add_exempt_channel(guild_id.get(), channel.id.get())
        .await?;
    ctx.say(format!(
        "✅ <#{}> is now exempt from crosspost detection ({} exempt channel(s)).",
        channel.id,
        exempt.len()
    ))
    .await?;
    Ok(())
}

/// Resume checking a channel for crossposts.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn unexempt(
    ctx: Context<'_>,
    #[description = "Channel to check again"] channel: serenity::GuildChannel,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let exempt = ctx
        .data()
        .settings
        .remove_exempt_channel(guild_id.get(), channel.id.get())
        .await?;
    ctx.say(format!(
        "✅ <#{}> is checked for crossposts again ({} exempt channel(s)).",
        channel.id,
        exempt.len()
    ))
    .await?;
    Ok(())
}

fn incident_line(incident: &CrosspostIncident) -> String {
    format!(
        "**#{}** {} | <@{}> | <#{}> → <#{}> | {:.1}% | {}",
        incident.id,
        incident.created_at.format("%b %-d, %Y %H:%M"),
        incident.user_id,
        incident.original_channel_id,
        incident.duplicate_channel_id,
        incident.similarity,
        incident.action
    )
}

fn history_warning_line(warning: &Warning) -> String {
    format!(
        "**#{}** {} | <@{}> | {} | By <@{}> | {}",
        warning.id,
        warning.created_at.format("%b %-d, %Y"),
        warning.user_id,
        warning.kind,
        warning.moderator_id,
        warning.reason
    )
}

fn page_embed<T>(
    title: &str,
    page: &Page<T>,
    noun: &str,
    line: impl Fn(&T) -> String,
) -> serenity::CreateEmbed {
    let description = if page.items.is_empty() {
        format!("No {noun}s on this page.")
    } else {
        page.items.iter().map(line).collect::<Vec<_>>().join("\n")
    };
    // Embed descriptions cap at 4096 characters.
    let description: String = description.chars().take(4096).collect();

    serenity::CreateEmbed::new()
        .title(title)
        .color(0x5865F2)
        .description(description)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Page {}/{} • {} {}(s)",
            page.page,
            page.total_pages.max(1),
            page.total,
            noun
        )))
}

/// Recent crosspost incidents, newest first.
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn incidents(
    ctx: Context<'_>,
    #[description = "Page number (default: 1)"] page: Option<u32>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let history = ctx
        .data()
        .crosspost
        .incident_history(guild_id.get(), page)
        .await?;
    let embed = page_embed("Crosspost Incidents", &history, "incident", incident_line);
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

/// All warnings in this server, newest first.
#[poise::command(
    slash_command,
    guild_only,
    rename = "warnings",
    required_permissions = "MANAGE_GUILD"
)]
pub async fn warning_history(
    ctx: Context<'_>,
    #[description = "Page number (default: 1)"] page: Option<u32>,
) -> Result<(), Error> {
    let guild_id = ctx.guild_id().ok_or("Must be used in a server")?;

    let history = ctx
        .data()
        .warnings
        .guild_history(guild_id.get(), page)
        .await?;
    let embed = page_embed("Warning History", &history, "warning", history_warning_line);
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::crosspost::IncidentAction;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_every_choice_maps_to_a_distinct_key() {
        let choices = [
            SettingChoice::ModeratorRole,
            SettingChoice::WarnRole,
            SettingChoice::CrosspostThreshold,
            SettingChoice::DetectionWindowSecs,
            SettingChoice::RepeatWindowHours,
            SettingChoice::WarningThreshold,
            SettingChoice::FirstOffenseMessage,
            SettingChoice::RepeatOffenseMessage,
            SettingChoice::WarnPublicMessage,
            SettingChoice::WarnLogChannel,
            SettingChoice::BanLogChannel,
        ];
        let keys: Vec<SettingKey> = choices.into_iter().map(SettingKey::from).collect();
        for key in SettingKey::ALL {
            assert_eq!(keys.iter().filter(|k| **k == key).count(), 1, "{key}");
        }
    }

    #[test]
    fn test_incident_line() {
        let incident = CrosspostIncident {
            id: 4,
            guild_id: 1,
            user_id: 2,
            original_message_id: 100,
            duplicate_message_id: 101,
            original_channel_id: 10,
            duplicate_channel_id: 11,
            original_content: "wts keyboard".into(),
            duplicate_content: "WTS keyboard".into(),
            similarity: 91.27,
            action: IncidentAction::Warned,
            created_at: Utc.with_ymd_and_hms(2024, 7, 9, 14, 30, 0).unwrap(),
        };
        assert_eq!(
            incident_line(&incident),
            "**#4** Jul 9, 2024 14:30 | <@2> | <#10> → <#11> | 91.3% | Warned"
        );
    }
}
