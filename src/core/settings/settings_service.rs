// Settings service - read-mostly access to per-guild configuration.

use super::settings_models::{GuildSettings, SettingUpdate, SettingsError};
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Persistence port for guild settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Load settings, creating the default row on first access.
    async fn load_or_create(&self, guild_id: u64) -> Result<GuildSettings, SettingsError>;

    async fn save(&self, guild_id: u64, settings: &GuildSettings) -> Result<(), SettingsError>;
}

pub struct SettingsService<S: SettingsStore> {
    store: S,
}

impl<S: SettingsStore> SettingsService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Current settings for a guild, defaults substituted for anything invalid.
    pub async fn get(&self, guild_id: u64) -> Result<GuildSettings, SettingsError> {
        Ok(self.store.load_or_create(guild_id).await?.sanitized())
    }

    /// Validate and persist a single change. Returns the updated settings.
    pub async fn apply(
        &self,
        guild_id: u64,
        update: SettingUpdate,
    ) -> Result<GuildSettings, SettingsError> {
        let mut settings = self.get(guild_id).await?;
        settings.apply(update)?;
        self.store.save(guild_id, &settings).await?;
        Ok(settings)
    }

    pub async fn exempt_channels(&self, guild_id: u64) -> Result<BTreeSet<u64>, SettingsError> {
        Ok(self.get(guild_id).await?.exempt_channels)
    }

    /// Returns the exempt set after the change.
    pub async fn add_exempt_channel(
        &self,
        guild_id: u64,
        channel_id: u64,
    ) -> Result<BTreeSet<u64>, SettingsError> {
        let mut settings = self.get(guild_id).await?;
        if settings.exempt_channels.insert(channel_id) {
            self.store.save(guild_id, &settings).await?;
        }
        Ok(settings.exempt_channels)
    }

    pub async fn remove_exempt_channel(
        &self,
        guild_id: u64,
        channel_id: u64,
    ) -> Result<BTreeSet<u64>, SettingsError> {
        let mut settings = self.get(guild_id).await?;
        if settings.exempt_channels.remove(&channel_id) {
            self.store.save(guild_id, &settings).await?;
        }
        Ok(settings.exempt_channels)
    }
}
