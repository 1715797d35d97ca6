// Discord layer - commands, event handlers and the shared command data.

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "moderation/mod.rs"]
pub mod moderation;

use crate::config::BotConfig;
use crate::core::crosspost::CrosspostDetector;
use crate::core::settings::SettingsService;
use crate::core::warnings::WarningService;
use crate::infra::crosspost::{SqliteIncidentLedger, SqliteMessageCache};
use crate::infra::settings::SqliteSettingsStore;
use crate::infra::warnings::SqliteWarningStore;
use std::sync::Arc;

/// Type alias for our bot's context.
/// This is what every command receives as its first parameter.
pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

pub type Detector = CrosspostDetector<
    SqliteMessageCache,
    SqliteIncidentLedger,
    SqliteSettingsStore,
    SqliteWarningStore,
>;

/// Data that's shared across all commands.
/// This is where we store our services and configuration.
pub struct Data {
    pub crosspost: Arc<Detector>,
    pub warnings: Arc<WarningService<SqliteWarningStore>>,
    pub settings: Arc<SettingsService<SqliteSettingsStore>>,
    pub config: Arc<BotConfig>,
}
