// Moderation embeds, public warning notices and log-channel posts.

use crate::core::settings::GuildSettings;
use crate::core::warnings::{SourceMessage, Warning};
use crate::discord::moderation::interactions::ComponentAction;
use poise::serenity_prelude as serenity;

pub const WARN_COLOR: u32 = 0xFFA500;
pub const BAN_COLOR: u32 = 0xFF0000;
pub const CLEAR_COLOR: u32 = 0x00CC66;

const EMBED_DESCRIPTION_LIMIT: usize = 4096;
const EMBED_FIELD_LIMIT: usize = 1024;
const OVERFLOW_LINES: usize = 20;
const VIEW_REASON_LABEL: &str = "View reason";

pub fn format_date(warning: &Warning) -> String {
    warning.created_at.format("%b %-d, %Y").to_string()
}

/// One line per warning, numbered from the oldest (as `/clearwarning` expects).
pub fn warning_lines(warnings: &[Warning]) -> String {
    if warnings.is_empty() {
        return "No warnings on record.".to_string();
    }

    let lines: Vec<String> = warnings
        .iter()
        .enumerate()
        .map(|(i, w)| {
            format!(
                "**{}.** {} | {} | By <@{}> | {}",
                i + 1,
                format_date(w),
                w.kind,
                w.moderator_id,
                w.reason
            )
        })
        .collect();

    let joined = lines.join("\n");
    if joined.chars().count() <= EMBED_DESCRIPTION_LIMIT {
        return joined;
    }

    // Show at most OVERFLOW_LINES lines, and only as many as fit with the suffix.
    let mut shown: Vec<&str> = Vec::new();
    let mut used = 0;
    for line in lines.iter().take(OVERFLOW_LINES) {
        let separator = usize::from(!shown.is_empty());
        let hidden = lines.len() - shown.len() - 1;
        let needed = used + separator + line.chars().count() + overflow_suffix(hidden).chars().count();
        if needed > EMBED_DESCRIPTION_LIMIT {
            break;
        }
        used += separator + line.chars().count();
        shown.push(line);
    }

    let hidden = lines.len() - shown.len();
    if shown.is_empty() {
        return overflow_suffix(hidden).trim_start().to_string();
    }
    format!("{}{}", shown.join("\n"), overflow_suffix(hidden))
}

fn overflow_suffix(hidden: usize) -> String {
    format!("\n\n*...and {hidden} more*")
}

pub fn truncate_field(text: &str) -> String {
    if text.chars().count() <= EMBED_FIELD_LIMIT {
        return text.to_string();
    }
    let head: String = text.chars().take(EMBED_FIELD_LIMIT - 3).collect();
    format!("{head}...")
}

pub fn warnings_embed(warnings: &[Warning], title: impl Into<String>) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title(title)
        .color(WARN_COLOR)
        .description(warning_lines(warnings))
        .timestamp(serenity::Timestamp::now());
    if !warnings.is_empty() {
        embed = embed.footer(serenity::CreateEmbedFooter::new(format!(
            "Total: {} warning(s)",
            warnings.len()
        )));
    }
    embed
}

/// Shown to a moderator whose warn would push a user past the threshold.
pub fn threshold_embed(
    warnings: &[Warning],
    display_name: &str,
    threshold: u32,
) -> serenity::CreateEmbed {
    warnings_embed(
        warnings,
        format!("{} already has {} warning(s)", display_name, warnings.len()),
    )
    .color(BAN_COLOR)
    .description(format!(
        "**This user has reached the warning threshold ({}).**\n\n{}",
        threshold,
        warning_lines(warnings)
    ))
}

pub fn view_warnings_row(user_id: u64) -> serenity::CreateActionRow {
    serenity::CreateActionRow::Buttons(vec![serenity::CreateButton::new(
        ComponentAction::ViewWarnings { user_id }.custom_id(),
    )
    .label(VIEW_REASON_LABEL)
    .style(serenity::ButtonStyle::Secondary)])
}

/// The ban / continue / cancel row for a pending warning.
pub fn confirmation_row(action_id: &str, can_ban: bool) -> serenity::CreateActionRow {
    let mut buttons = Vec::new();
    if can_ban {
        buttons.push(
            serenity::CreateButton::new(
                ComponentAction::BanUser {
                    action_id: action_id.to_string(),
                }
                .custom_id(),
            )
            .label("Ban instead")
            .style(serenity::ButtonStyle::Danger),
        );
    }
    buttons.push(
        serenity::CreateButton::new(
            ComponentAction::ContinueWarning {
                action_id: action_id.to_string(),
            }
            .custom_id(),
        )
        .label("Continue with warning")
        .style(serenity::ButtonStyle::Primary),
    );
    buttons.push(
        serenity::CreateButton::new(
            ComponentAction::CancelAction {
                action_id: action_id.to_string(),
            }
            .custom_id(),
        )
        .label("Cancel")
        .style(serenity::ButtonStyle::Secondary),
    );
    serenity::CreateActionRow::Buttons(buttons)
}

/// Post to a configured log channel; failures only get logged.
pub async fn post_log(http: &serenity::Http, channel_id: Option<u64>, embed: serenity::CreateEmbed) {
    let Some(channel_id) = channel_id else {
        return;
    };
    if let Err(e) = serenity::ChannelId::new(channel_id)
        .send_message(http, serenity::CreateMessage::new().embed(embed))
        .await
    {
        tracing::warn!(channel_id, "Failed to post to log channel: {}", e);
    }
}

/// Public notice in the channel plus the warn-log entry, after a manual warning.
pub async fn announce_warning(
    http: &serenity::Http,
    settings: &GuildSettings,
    guild_id: u64,
    notice_channel: u64,
    warning: &Warning,
    total: u64,
    source: Option<SourceMessage>,
) {
    let notice = serenity::CreateMessage::new()
        .content(settings.public_warning_notice(warning.user_id))
        .components(vec![view_warnings_row(warning.user_id)]);
    if let Err(e) = serenity::ChannelId::new(notice_channel)
        .send_message(http, notice)
        .await
    {
        tracing::warn!("Failed to send public warning notification: {}", e);
    }

    if settings.warn_log_channel_id.is_none() {
        return;
    }

    let mut embed = serenity::CreateEmbed::new()
        .title("Warning Issued")
        .color(WARN_COLOR)
        .field(
            "User",
            format!("<@{0}> ({0})", warning.user_id),
            true,
        )
        .field("Moderator", format!("<@{}>", warning.moderator_id), true)
        .field("Total Warnings", total.to_string(), true)
        .field("Reason", truncate_field(&warning.reason), false)
        .timestamp(serenity::Timestamp::now());

    if let Some(source) = source {
        // The message may be gone by now; the link still goes in.
        if let Ok(message) = serenity::ChannelId::new(source.channel_id)
            .message(http, serenity::MessageId::new(source.message_id))
            .await
        {
            if !message.content.is_empty() {
                embed = embed.field("Message Content", truncate_field(&message.content), false);
            }
        }
        embed = embed.field(
            "Message Link",
            format!(
                "[Jump to message](https://discord.com/channels/{}/{}/{})",
                guild_id, source.channel_id, source.message_id
            ),
            false,
        );
    }

    post_log(http, settings.warn_log_channel_id, embed).await;
}

pub fn ban_log_embed(target_id: u64, moderator_id: u64, total: u64, reason: &str) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title("User Banned")
        .color(BAN_COLOR)
        .field("User", format!("<@{0}> ({0})", target_id), true)
        .field("Banned by", format!("<@{}>", moderator_id), true)
        .field("Total Warnings", total.to_string(), true)
        .field("Reason", truncate_field(reason), false)
        .timestamp(serenity::Timestamp::now())
}

pub fn warning_removed_embed(
    warning: &Warning,
    removed_by: u64,
    remaining: u64,
) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title("Warning Removed")
        .color(CLEAR_COLOR)
        .field("User", format!("<@{0}> ({0})", warning.user_id), true)
        .field("Removed by", format!("<@{}>", removed_by), true)
        .field("Warnings Remaining", remaining.to_string(), true)
        .field("Removed Warning Reason", truncate_field(&warning.reason), false)
        .field("Type", warning.kind.to_string(), true)
        .field("Originally Issued", format_date(warning), true)
        .timestamp(serenity::Timestamp::now())
}

pub fn warnings_cleared_embed(user_id: u64, cleared_by: u64, removed: u64) -> serenity::CreateEmbed {
    serenity::CreateEmbed::new()
        .title("All Warnings Cleared")
        .color(CLEAR_COLOR)
        .field("User", format!("<@{0}> ({0})", user_id), true)
        .field("Cleared by", format!("<@{}>", cleared_by), true)
        .field("Warnings Removed", removed.to_string(), true)
        .timestamp(serenity::Timestamp::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::warnings::WarningKind;
    use chrono::{TimeZone, Utc};

    fn warning(id: i64, reason: &str, kind: WarningKind) -> Warning {
        Warning {
            id,
            guild_id: 1,
            user_id: 2,
            moderator_id: 3,
            reason: reason.to_string(),
            kind,
            created_at: Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_warning_lines() {
        assert_eq!(warning_lines(&[]), "No warnings on record.");

        let text = warning_lines(&[
            warning(1, "spam", WarningKind::Manual),
            warning(2, "crossposting", WarningKind::Crosspost),
        ]);
        assert_eq!(
            text,
            "**1.** Mar 5, 2024 | Manual | By <@3> | spam\n\
             **2.** Mar 5, 2024 | Crosspost | By <@3> | crossposting"
        );
    }

    #[test]
    fn test_warning_lines_overflow() {
        let long_reason = "x".repeat(100);
        let warnings: Vec<Warning> = (0..30)
            .map(|i| warning(i, &long_reason, WarningKind::Manual))
            .collect();

        let text = warning_lines(&warnings);
        assert!(text.ends_with("*...and 10 more*"));
        assert!(text.contains("**20.**"));
        assert!(!text.contains("**21.**"));
    }

    #[test]
    fn test_warning_lines_few_long_reasons_fit_embed() {
        let long_reason = "y".repeat(1000);
        let warnings: Vec<Warning> = (0..5)
            .map(|i| warning(i, &long_reason, WarningKind::Manual))
            .collect();

        let text = warning_lines(&warnings);
        assert!(text.chars().count() <= EMBED_DESCRIPTION_LIMIT);
        assert!(text.contains("**3.**"));
        assert!(!text.contains("**4.**"));
        assert!(text.ends_with("*...and 2 more*"));
    }

    #[test]
    fn test_warning_lines_single_oversized_reason() {
        let warnings = vec![
            warning(1, &"z".repeat(5000), WarningKind::Manual),
            warning(2, "spam", WarningKind::Manual),
        ];
        assert_eq!(warning_lines(&warnings), "*...and 2 more*");
    }

    #[test]
    fn test_view_warnings_row_label_and_target() {
        let row = serde_json::to_value(view_warnings_row(42)).unwrap();
        let button = &row["components"][0];
        assert_eq!(button["label"], VIEW_REASON_LABEL);
        assert_eq!(
            button["custom_id"],
            ComponentAction::ViewWarnings { user_id: 42 }.custom_id()
        );
    }

    #[test]
    fn test_truncate_field() {
        assert_eq!(truncate_field("short"), "short");
        let long = "é".repeat(2000);
        let cut = truncate_field(&long);
        assert_eq!(cut.chars().count(), 1024);
        assert!(cut.ends_with("..."));
    }
}
