// Runtime configuration, read once from the environment (and `.env`).

use anyhow::Context as _;
use std::str::FromStr;

pub const DEFAULT_DATABASE_PATH: &str = "data/crosspost_guard.db";
pub const DEFAULT_CACHE_RETENTION_HOURS: u32 = 48;
pub const DEFAULT_CACHE_SWEEP_MINUTES: u32 = 30;

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub discord_token: String,
    pub database_path: String,
    /// Register commands in this guild only (instant updates while developing).
    pub dev_guild_id: Option<u64>,
    pub cache_retention_hours: u32,
    pub cache_sweep_minutes: u32,
}

impl BotConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let discord_token = std::env::var("DISCORD_TOKEN").context(
            "Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.",
        )?;

        Ok(Self {
            discord_token,
            database_path: std::env::var("DATABASE_PATH")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string()),
            dev_guild_id: parse_optional("DEV_GUILD_ID", std::env::var("DEV_GUILD_ID").ok()),
            cache_retention_hours: parse_or(
                "CACHE_RETENTION_HOURS",
                std::env::var("CACHE_RETENTION_HOURS").ok(),
                DEFAULT_CACHE_RETENTION_HOURS,
            ),
            cache_sweep_minutes: parse_or(
                "CACHE_SWEEP_MINUTES",
                std::env::var("CACHE_SWEEP_MINUTES").ok(),
                DEFAULT_CACHE_SWEEP_MINUTES,
            ),
        })
    }
}

/// Parse a positive number, falling back to `default` (with a warning) on junk.
fn parse_or<T>(name: &str, raw: Option<String>, default: T) -> T
where
    T: FromStr + PartialOrd + Default + Copy + std::fmt::Display,
{
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => value,
        _ => {
            tracing::warn!("Invalid {} value {:?}, using default {}", name, raw, default);
            default
        }
    }
}

fn parse_optional(name: &str, raw: Option<String>) -> Option<u64> {
    let raw = raw?;
    if raw.trim().is_empty() {
        return None;
    }
    match raw.trim().parse::<u64>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Invalid {} value {:?}, ignoring", name, raw);
            None
        }
    }
}
