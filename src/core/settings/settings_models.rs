// Guild settings - one versioned configuration document per guild.
//
// All defaulting and range checks live here. Storage only ever sees a
// complete `GuildSettings`, and anything read back is passed through
// `sanitized()` so consumers never observe out-of-range values.

use crate::core::crosspost::similarity::DEFAULT_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Bumped whenever the stored document shape changes.
pub const SETTINGS_VERSION: u32 = 1;

pub const DEFAULT_CROSSPOST_THRESHOLD: u8 = DEFAULT_THRESHOLD as u8;
pub const DEFAULT_DETECTION_WINDOW_SECS: u32 = 30;
pub const DEFAULT_REPEAT_WINDOW_HOURS: u32 = 48;
pub const DEFAULT_WARNING_THRESHOLD: u32 = 3;

const THRESHOLD_RANGE: (i64, i64) = (1, 100);
const DETECTION_WINDOW_RANGE: (i64, i64) = (5, 3600);
const REPEAT_WINDOW_RANGE: (i64, i64) = (1, 168);
const WARNING_THRESHOLD_RANGE: (i64, i64) = (1, 50);

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("{setting} must be between {min} and {max} (got {value})")]
    OutOfRange {
        setting: SettingKey,
        min: i64,
        max: i64,
        value: i64,
    },

    #[error("Invalid value for {setting}: {value}")]
    InvalidValue { setting: SettingKey, value: String },

    #[error("Unknown setting: {0}")]
    UnknownSetting(String),
}

/// Per-guild moderation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuildSettings {
    pub version: u32,
    pub moderator_role_id: Option<u64>,
    pub warn_role_id: Option<u64>,
    /// Similarity (1-100) at which two posts are the same message.
    pub crosspost_threshold: u8,
    pub detection_window_secs: u32,
    pub repeat_window_hours: u32,
    /// Warnings at which a moderator is asked to consider a ban.
    pub warning_threshold: u32,
    pub exempt_channels: BTreeSet<u64>,
    pub first_offense_message: Option<String>,
    pub repeat_offense_message: Option<String>,
    pub warn_public_message: Option<String>,
    pub warn_log_channel_id: Option<u64>,
    pub ban_log_channel_id: Option<u64>,
}

impl Default for GuildSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            moderator_role_id: None,
            warn_role_id: None,
            crosspost_threshold: DEFAULT_CROSSPOST_THRESHOLD,
            detection_window_secs: DEFAULT_DETECTION_WINDOW_SECS,
            repeat_window_hours: DEFAULT_REPEAT_WINDOW_HOURS,
            warning_threshold: DEFAULT_WARNING_THRESHOLD,
            exempt_channels: BTreeSet::new(),
            first_offense_message: None,
            repeat_offense_message: None,
            warn_public_message: None,
            warn_log_channel_id: None,
            ban_log_channel_id: None,
        }
    }
}

fn in_range(value: i64, (min, max): (i64, i64)) -> bool {
    value >= min && value <= max
}

impl GuildSettings {
    /// Replace any out-of-range numeric value with its default and stamp the
    /// current version.
    pub fn sanitized(mut self) -> Self {
        if !in_range(self.crosspost_threshold as i64, THRESHOLD_RANGE) {
            self.crosspost_threshold = DEFAULT_CROSSPOST_THRESHOLD;
        }
        if !in_range(self.detection_window_secs as i64, DETECTION_WINDOW_RANGE) {
            self.detection_window_secs = DEFAULT_DETECTION_WINDOW_SECS;
        }
        if !in_range(self.repeat_window_hours as i64, REPEAT_WINDOW_RANGE) {
            self.repeat_window_hours = DEFAULT_REPEAT_WINDOW_HOURS;
        }
        if !in_range(self.warning_threshold as i64, WARNING_THRESHOLD_RANGE) {
            self.warning_threshold = DEFAULT_WARNING_THRESHOLD;
        }
        self.version = SETTINGS_VERSION;
        self
    }

    pub fn is_exempt_channel(&self, channel_id: u64) -> bool {
        self.exempt_channels.contains(&channel_id)
    }

    /// Apply a validated update in place.
    pub fn apply(&mut self, update: SettingUpdate) -> Result<(), SettingsError> {
        match update {
            SettingUpdate::ModeratorRole(id) => self.moderator_role_id = id,
            SettingUpdate::WarnRole(id) => self.warn_role_id = id,
            SettingUpdate::CrosspostThreshold(v) => {
                check_range(SettingKey::CrosspostThreshold, v, THRESHOLD_RANGE)?;
                self.crosspost_threshold = v as u8;
            }
            SettingUpdate::DetectionWindowSecs(v) => {
                check_range(SettingKey::DetectionWindowSecs, v, DETECTION_WINDOW_RANGE)?;
                self.detection_window_secs = v as u32;
            }
            SettingUpdate::RepeatWindowHours(v) => {
                check_range(SettingKey::RepeatWindowHours, v, REPEAT_WINDOW_RANGE)?;
                self.repeat_window_hours = v as u32;
            }
            SettingUpdate::WarningThreshold(v) => {
                check_range(SettingKey::WarningThreshold, v, WARNING_THRESHOLD_RANGE)?;
                self.warning_threshold = v as u32;
            }
            SettingUpdate::FirstOffenseMessage(text) => {
                self.first_offense_message = clean_template(text)
            }
            SettingUpdate::RepeatOffenseMessage(text) => {
                self.repeat_offense_message = clean_template(text)
            }
            SettingUpdate::WarnPublicMessage(text) => self.warn_public_message = clean_template(text),
            SettingUpdate::WarnLogChannel(id) => self.warn_log_channel_id = id,
            SettingUpdate::BanLogChannel(id) => self.ban_log_channel_id = id,
        }
        Ok(())
    }

    /// Notice posted when a user's first crosspost in the window is removed.
    pub fn first_offense_notice(&self, user_id: u64) -> String {
        match &self.first_offense_message {
            Some(template) => render(template, user_id, None),
            None => format!(
                "<@{}>, please do not crosspost the same message across multiple channels. \
                 Use the channel that best fits your topic. Duplicate messages have been removed.",
                user_id
            ),
        }
    }

    /// Notice posted when a repeat crosspost results in a formal warning.
    pub fn repeat_offense_notice(&self, user_id: u64, warning_count: u64) -> String {
        match &self.repeat_offense_message {
            Some(template) => render(template, user_id, Some(warning_count)),
            None => format!(
                "<@{}>, you have repeatedly crossposted the same message across multiple channels. \
                 This is an **official warning** (warning #{}). Continued violations may result in a ban.\n\
                 Please review the channel list and post in the most appropriate channel moving forward.",
                user_id, warning_count
            ),
        }
    }

    /// Public notice posted when a moderator warns someone.
    pub fn public_warning_notice(&self, user_id: u64) -> String {
        match &self.warn_public_message {
            Some(template) => render(template, user_id, None),
            None => format!("<@{}>, you have received an official warning.", user_id),
        }
    }
}

fn check_range(setting: SettingKey, value: i64, (min, max): (i64, i64)) -> Result<(), SettingsError> {
    if in_range(value, (min, max)) {
        Ok(())
    } else {
        Err(SettingsError::OutOfRange {
            setting,
            min,
            max,
            value,
        })
    }
}

fn clean_template(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

fn render(template: &str, user_id: u64, count: Option<u64>) -> String {
    let text = template.replace("{user}", &format!("<@{}>", user_id));
    match count {
        Some(count) => text.replace("{count}", &count.to_string()),
        None => text,
    }
}

/// Names of the settings that can be changed at the settings boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    ModeratorRole,
    WarnRole,
    CrosspostThreshold,
    DetectionWindowSecs,
    RepeatWindowHours,
    WarningThreshold,
    FirstOffenseMessage,
    RepeatOffenseMessage,
    WarnPublicMessage,
    WarnLogChannel,
    BanLogChannel,
}

impl SettingKey {
    pub const ALL: [SettingKey; 11] = [
        SettingKey::ModeratorRole,
        SettingKey::WarnRole,
        SettingKey::CrosspostThreshold,
        SettingKey::DetectionWindowSecs,
        SettingKey::RepeatWindowHours,
        SettingKey::WarningThreshold,
        SettingKey::FirstOffenseMessage,
        SettingKey::RepeatOffenseMessage,
        SettingKey::WarnPublicMessage,
        SettingKey::WarnLogChannel,
        SettingKey::BanLogChannel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::ModeratorRole => "moderator_role_id",
            SettingKey::WarnRole => "warn_role_id",
            SettingKey::CrosspostThreshold => "crosspost_threshold",
            SettingKey::DetectionWindowSecs => "crosspost_detection_seconds",
            SettingKey::RepeatWindowHours => "crosspost_window_hours",
            SettingKey::WarningThreshold => "warning_threshold",
            SettingKey::FirstOffenseMessage => "crosspost_first_message",
            SettingKey::RepeatOffenseMessage => "crosspost_repeat_message",
            SettingKey::WarnPublicMessage => "warn_public_message",
            SettingKey::WarnLogChannel => "warn_log_channel_id",
            SettingKey::BanLogChannel => "ban_log_channel_id",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SettingKey {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        SettingKey::ALL
            .into_iter()
            .find(|key| key.as_str() == wanted)
            .ok_or_else(|| SettingsError::UnknownSetting(s.to_string()))
    }
}

/// A single validated change to a guild's settings.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingUpdate {
    ModeratorRole(Option<u64>),
    WarnRole(Option<u64>),
    CrosspostThreshold(i64),
    DetectionWindowSecs(i64),
    RepeatWindowHours(i64),
    WarningThreshold(i64),
    FirstOffenseMessage(Option<String>),
    RepeatOffenseMessage(Option<String>),
    WarnPublicMessage(Option<String>),
    WarnLogChannel(Option<u64>),
    BanLogChannel(Option<u64>),
}

impl SettingUpdate {
    /// Decode a raw textual value for `key`.
    ///
    /// Ids accept a bare snowflake or mention syntax (`<@&1>`, `<#1>`);
    /// `none`, `clear` or an empty value unset optional fields.
    pub fn parse(key: SettingKey, raw: &str) -> Result<Self, SettingsError> {
        let raw = raw.trim();
        let update = match key {
            SettingKey::ModeratorRole => SettingUpdate::ModeratorRole(parse_id(key, raw)?),
            SettingKey::WarnRole => SettingUpdate::WarnRole(parse_id(key, raw)?),
            SettingKey::WarnLogChannel => SettingUpdate::WarnLogChannel(parse_id(key, raw)?),
            SettingKey::BanLogChannel => SettingUpdate::BanLogChannel(parse_id(key, raw)?),
            SettingKey::CrosspostThreshold => {
                SettingUpdate::CrosspostThreshold(parse_number(key, raw)?)
            }
            SettingKey::DetectionWindowSecs => {
                SettingUpdate::DetectionWindowSecs(parse_number(key, raw)?)
            }
            SettingKey::RepeatWindowHours => {
                SettingUpdate::RepeatWindowHours(parse_number(key, raw)?)
            }
            SettingKey::WarningThreshold => SettingUpdate::WarningThreshold(parse_number(key, raw)?),
            SettingKey::FirstOffenseMessage => {
                SettingUpdate::FirstOffenseMessage(parse_text(raw))
            }
            SettingKey::RepeatOffenseMessage => {
                SettingUpdate::RepeatOffenseMessage(parse_text(raw))
            }
            SettingKey::WarnPublicMessage => SettingUpdate::WarnPublicMessage(parse_text(raw)),
        };
        Ok(update)
    }
}

fn is_clear(raw: &str) -> bool {
    raw.is_empty() || raw.eq_ignore_ascii_case("none") || raw.eq_ignore_ascii_case("clear")
}

fn parse_id(key: SettingKey, raw: &str) -> Result<Option<u64>, SettingsError> {
    if is_clear(raw) {
        return Ok(None);
    }
    let digits = raw
        .trim_start_matches('<')
        .trim_start_matches(['@', '#', '&', '!'])
        .trim_end_matches('>');
    digits
        .parse::<u64>()
        .ok()
        .filter(|id| *id > 0)
        .map(Some)
        .ok_or_else(|| SettingsError::InvalidValue {
            setting: key,
            value: raw.to_string(),
        })
}

fn parse_number(key: SettingKey, raw: &str) -> Result<i64, SettingsError> {
    raw.parse::<i64>().map_err(|_| SettingsError::InvalidValue {
        setting: key,
        value: raw.to_string(),
    })
}

fn parse_text(raw: &str) -> Option<String> {
    if is_clear(raw) {
        None
    } else {
        Some(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = GuildSettings::default();
        assert_eq!(settings.crosspost_threshold, 80);
        assert_eq!(settings.detection_window_secs, 30);
        assert_eq!(settings.repeat_window_hours, 48);
        assert_eq!(settings.warning_threshold, 3);
        assert!(settings.exempt_channels.is_empty());
    }

    #[test]
    fn test_sanitized_replaces_out_of_range() {
        let settings = GuildSettings {
            crosspost_threshold: 0,
            detection_window_secs: 1,
            repeat_window_hours: 500,
            warning_threshold: 0,
            version: 0,
            ..Default::default()
        }
        .sanitized();

        assert_eq!(settings, GuildSettings::default());
    }

    #[test]
    fn test_missing_fields_deserialize_to_defaults() {
        let settings: GuildSettings =
            serde_json::from_str(r#"{"crosspost_threshold": 90}"#).unwrap();
        assert_eq!(settings.crosspost_threshold, 90);
        assert_eq!(settings.detection_window_secs, 30);
    }

    #[test]
    fn test_apply_rejects_out_of_range() {
        let mut settings = GuildSettings::default();
        let err = settings
            .apply(SettingUpdate::CrosspostThreshold(101))
            .unwrap_err();
        assert!(matches!(err, SettingsError::OutOfRange { max: 100, .. }));
        assert_eq!(settings.crosspost_threshold, 80);

        assert!(settings
            .apply(SettingUpdate::DetectionWindowSecs(4))
            .is_err());
        assert!(settings.apply(SettingUpdate::RepeatWindowHours(169)).is_err());
        assert!(settings.apply(SettingUpdate::WarningThreshold(0)).is_err());

        settings.apply(SettingUpdate::CrosspostThreshold(95)).unwrap();
        assert_eq!(settings.crosspost_threshold, 95);
    }

    #[test]
    fn test_templates_trim_and_clear() {
        let mut settings = GuildSettings::default();
        settings
            .apply(SettingUpdate::FirstOffenseMessage(Some("  hi {user}  ".into())))
            .unwrap();
        assert_eq!(settings.first_offense_message.as_deref(), Some("hi {user}"));

        settings
            .apply(SettingUpdate::FirstOffenseMessage(Some("   ".into())))
            .unwrap();
        assert_eq!(settings.first_offense_message, None);
    }

    #[test]
    fn test_notice_rendering() {
        let mut settings = GuildSettings::default();
        assert!(settings.first_offense_notice(7).starts_with("<@7>, please do not crosspost"));
        assert!(settings.repeat_offense_notice(7, 2).contains("warning #2"));
        assert_eq!(
            settings.public_warning_notice(7),
            "<@7>, you have received an official warning."
        );

        settings.repeat_offense_message = Some("{user} strike {count}, {user}!".into());
        assert_eq!(settings.repeat_offense_notice(7, 3), "<@7> strike 3, <@7>!");
    }

    #[test]
    fn test_setting_key_parsing() {
        assert_eq!(
            "crosspost_threshold".parse::<SettingKey>().unwrap(),
            SettingKey::CrosspostThreshold
        );
        assert_eq!(
            "bogus".parse::<SettingKey>().unwrap_err(),
            SettingsError::UnknownSetting("bogus".into())
        );
    }

    #[test]
    fn test_setting_update_parsing() {
        assert_eq!(
            SettingUpdate::parse(SettingKey::ModeratorRole, "<@&123>").unwrap(),
            SettingUpdate::ModeratorRole(Some(123))
        );
        assert_eq!(
            SettingUpdate::parse(SettingKey::WarnLogChannel, "<#456>").unwrap(),
            SettingUpdate::WarnLogChannel(Some(456))
        );
        assert_eq!(
            SettingUpdate::parse(SettingKey::WarnRole, "none").unwrap(),
            SettingUpdate::WarnRole(None)
        );
        assert_eq!(
            SettingUpdate::parse(SettingKey::WarningThreshold, " 5 ").unwrap(),
            SettingUpdate::WarningThreshold(5)
        );
        assert!(SettingUpdate::parse(SettingKey::WarningThreshold, "five").is_err());
        assert!(SettingUpdate::parse(SettingKey::ModeratorRole, "moderators").is_err());
    }
}
