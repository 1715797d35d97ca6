// Crosspost domain models - cached messages, incidents and detector verdicts.

use crate::core::access::MemberAccess;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A recently seen guild message, kept only for cross-channel comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedMessage {
    pub guild_id: u64,
    pub channel_id: u64,
    pub user_id: u64,
    pub message_id: u64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// What the detector did about a crosspost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentAction {
    /// First offense in the window: duplicates removed, notice posted.
    Deleted,
    /// Repeat offense: duplicates removed and a formal warning issued.
    Warned,
}

impl IncidentAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentAction::Deleted => "deleted",
            IncidentAction::Warned => "warned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "deleted" => Some(IncidentAction::Deleted),
            "warned" => Some(IncidentAction::Warned),
            _ => None,
        }
    }
}

impl fmt::Display for IncidentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncidentAction::Deleted => write!(f, "Deleted"),
            IncidentAction::Warned => write!(f, "Warned"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewIncident {
    pub guild_id: u64,
    pub user_id: u64,
    pub original_message_id: u64,
    pub duplicate_message_id: u64,
    pub original_channel_id: u64,
    pub duplicate_channel_id: u64,
    pub original_content: String,
    pub duplicate_content: String,
    /// 0-100, as computed by the similarity engine.
    pub similarity: f64,
    pub action: IncidentAction,
    pub created_at: DateTime<Utc>,
}

/// An append-only record of a detected crosspost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrosspostIncident {
    pub id: i64,
    pub guild_id: u64,
    pub user_id: u64,
    pub original_message_id: u64,
    pub duplicate_message_id: u64,
    pub original_channel_id: u64,
    pub duplicate_channel_id: u64,
    pub original_content: String,
    pub duplicate_content: String,
    pub similarity: f64,
    pub action: IncidentAction,
    pub created_at: DateTime<Utc>,
}

/// Platform-neutral view of an incoming message.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// `None` for direct messages.
    pub guild_id: Option<u64>,
    pub channel_id: u64,
    pub message_id: u64,
    pub author_id: u64,
    pub author_is_bot: bool,
    pub content: String,
    pub received_at: DateTime<Utc>,
    /// `None` when the author's membership could not be resolved.
    pub member: Option<MemberAccess>,
}

/// Why a message was not checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Bot,
    DirectMessage,
    EmptyContent,
    TooShort,
    ExemptChannel,
    MemberUnavailable,
    ExemptMember,
}

/// Everything that happened while handling one crosspost.
#[derive(Debug, Clone, PartialEq)]
pub struct CrosspostOutcome {
    pub incident: CrosspostIncident,
    /// Total warnings after this incident, if one was issued.
    pub warning_count: Option<u64>,
    pub deleted_duplicate: bool,
    pub deleted_original: bool,
    pub notice_sent: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CrosspostVerdict {
    Ignored(IgnoreReason),
    /// Checked, no earlier message matched.
    Clean,
    Crosspost(CrosspostOutcome),
}

/// A channel notice, optionally with a "view warnings" button.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub content: String,
    pub view_warnings_for: Option<u64>,
}
