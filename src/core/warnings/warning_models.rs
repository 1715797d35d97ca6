// Warning domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a warning came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningKind {
    /// Issued by a moderator.
    Manual,
    /// Issued automatically for a repeat crosspost.
    Crosspost,
}

impl WarningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningKind::Manual => "manual",
            WarningKind::Crosspost => "crosspost",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(WarningKind::Manual),
            "crosspost" => Some(WarningKind::Crosspost),
            _ => None,
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningKind::Manual => write!(f, "Manual"),
            WarningKind::Crosspost => write!(f, "Crosspost"),
        }
    }
}

/// A stored warning. Never edited; only inserted or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub id: i64,
    pub guild_id: u64,
    pub user_id: u64,
    pub moderator_id: u64,
    pub reason: String,
    pub kind: WarningKind,
    pub created_at: DateTime<Utc>,
}

/// A warning about to be written.
#[derive(Debug, Clone)]
pub struct NewWarning {
    pub guild_id: u64,
    pub user_id: u64,
    pub moderator_id: u64,
    pub reason: String,
    pub kind: WarningKind,
    pub created_at: DateTime<Utc>,
}

/// The message a manual warning was issued from (context-menu warns).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceMessage {
    pub channel_id: u64,
    pub message_id: u64,
}

/// A moderator's warn request that needs a ban/continue/cancel decision.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAction {
    pub guild_id: u64,
    pub target_id: u64,
    pub moderator_id: u64,
    pub reason: String,
    pub source: Option<SourceMessage>,
}

/// Input to a manual warn.
#[derive(Debug, Clone)]
pub struct ManualWarning {
    pub guild_id: u64,
    pub target_id: u64,
    pub moderator_id: u64,
    pub reason: String,
    pub source: Option<SourceMessage>,
}

/// Result of a manual warn request.
#[derive(Debug, Clone)]
pub enum ManualWarnOutcome {
    /// Below the threshold: warning written.
    Issued { warning: Warning, total: u64 },
    /// At or above the threshold: parked until the moderator decides.
    NeedsConfirmation {
        action_id: String,
        existing: Vec<Warning>,
        threshold: u32,
    },
}

/// Result of claiming a pending action on a moderator's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingClaim<T> {
    /// Expired, resolved already, or never existed.
    Expired,
    /// Someone other than the issuing moderator pressed the button.
    NotOwner,
    Claimed(T),
}
